//! One-shot depot setup: open a backend, make sure a CA and a service
//! certificate exist, and hand back the depot.
// 中文: 一次性引导仓库：创建后端、确保 CA 与服务证书存在。

use tracing::info;

use crate::config::{BootstrapDepotConfig, DepotOptions};
use crate::depot::{CertDepot, FileDepot};
use crate::error::{Result, ResultExt};
use crate::tag::{Tag, format_depot_name};

/// Builds the configured depot and provisions the CA and service identities.
///
/// Supplied PEM material is stored when not already present; otherwise the
/// CA is initialized and the service certificate issued when absent. An
/// existing depot is left as it is.
pub fn bootstrap_depot(conf: BootstrapDepotConfig) -> Result<Box<dyn CertDepot>> {
    conf.validate().context("invalid bootstrap configuration")?;

    let depot = open_depot(&conf)?;
    provision_ca(&*depot, &conf)?;
    provision_service(&*depot, &conf)?;

    info!(op = "bootstrap", ca = %conf.ca_name, service = %conf.service_name, "depot ready");
    Ok(depot)
}

fn open_depot(conf: &BootstrapDepotConfig) -> Result<Box<dyn CertDepot>> {
    if let Some(dir) = &conf.file_depot {
        let options = DepotOptions {
            ca: conf.ca_name.clone(),
            default_expiration: conf
                .service_opts
                .as_ref()
                .map(|opts| opts.expires)
                .unwrap_or_default(),
        };
        let depot = FileDepot::with_options(dir, options)
            .with_context(|| format!("creating file depot at {}", dir.display()))?;
        return Ok(Box::new(depot));
    }
    open_sqlite(conf)
}

#[cfg(feature = "sqlite")]
fn open_sqlite(conf: &BootstrapDepotConfig) -> Result<Box<dyn CertDepot>> {
    let opts = match &conf.sqlite_depot {
        Some(opts) => opts,
        None => {
            return Err(crate::error::Error::Validation(
                "must specify a depot backend".into(),
            ));
        }
    };
    let depot = crate::depot::SqliteDepot::open(opts).context("creating sqlite depot")?;
    Ok(Box::new(depot))
}

#[cfg(not(feature = "sqlite"))]
fn open_sqlite(_conf: &BootstrapDepotConfig) -> Result<Box<dyn CertDepot>> {
    Err(crate::error::Error::Validation(
        "sqlite depot support is not compiled in".into(),
    ))
}

fn put_if_absent(depot: &dyn CertDepot, tag: Tag, pem: &str) -> Result<()> {
    if depot.check_with_error(&tag)? {
        return Ok(());
    }
    depot
        .put(&tag, pem.as_bytes())
        .with_context(|| format!("adding {}", tag))
}

fn provision_ca(depot: &dyn CertDepot, conf: &BootstrapDepotConfig) -> Result<()> {
    let name = format_depot_name(&conf.ca_name);

    if !conf.ca_cert.is_empty() {
        put_if_absent(depot, Tag::certificate(&name), &conf.ca_cert)?;
        put_if_absent(depot, Tag::private_key(&name), &conf.ca_key)?;
        return Ok(());
    }

    if depot.check_with_error(&Tag::certificate(&name))? {
        return Ok(());
    }
    if let Some(opts) = &conf.ca_opts {
        opts.init(depot)
            .with_context(|| format!("initializing CA '{}'", conf.ca_name))?;
        info!(op = "bootstrap", id = %name, "initialized CA");
    }
    Ok(())
}

fn provision_service(depot: &dyn CertDepot, conf: &BootstrapDepotConfig) -> Result<()> {
    let name = format_depot_name(&conf.service_name);

    if !conf.service_cert.is_empty() {
        put_if_absent(depot, Tag::certificate(&name), &conf.service_cert)?;
        put_if_absent(depot, Tag::private_key(&name), &conf.service_key)?;
        return Ok(());
    }

    if depot.check_with_error(&Tag::certificate(&name))? {
        return Ok(());
    }
    if let Some(opts) = &conf.service_opts {
        let mut opts = opts.clone();
        opts.create_certificate(depot)
            .with_context(|| format!("creating certificate for '{}'", conf.service_name))?;
        info!(op = "bootstrap", id = %name, ca = %conf.ca_name, "issued service certificate");
    }
    Ok(())
}
