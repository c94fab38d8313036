//! Credential-bundle operations shared by every backend: save, find, generate.
// 中文: 所有后端共用的凭据包操作。

use tracing::{debug, info, warn};

use super::traits::Depot;
use crate::config::DepotOptions;
use crate::credentials::Credentials;
use crate::error::{Error, Result, ResultExt};
use crate::expiration::record_ttl;
use crate::options::CertificateOptions;
use crate::pki::Certificate;
use crate::tag::Tag;

/// Deletes every tag that currently exists, attempting all of them.
///
/// Returns the first failure, annotated with how many deletions failed.
pub fn delete_if_exists<D: Depot + ?Sized>(depot: &D, tags: &[Tag]) -> Result<()> {
    let mut first: Option<Error> = None;
    let mut failures = 0usize;

    for tag in tags {
        if !depot.check(tag) {
            continue;
        }
        if let Err(err) = depot.delete(tag) {
            warn!(op = "delete", id = %tag.storage_name(), kind = %tag.kind(), error = %err, "delete failed");
            failures += 1;
            if first.is_none() {
                first = Some(err);
            }
        }
    }

    match first {
        None => Ok(()),
        Some(err) => Err(err).context(format!(
            "{} of {} deletions failed",
            failures,
            tags.len()
        )),
    }
}

pub(crate) fn save<D: Depot + ?Sized>(depot: &D, name: &str, creds: &Credentials) -> Result<()> {
    delete_if_exists(
        depot,
        &[
            Tag::csr(name),
            Tag::private_key(name),
            Tag::certificate(name),
        ],
    )
    .with_context(|| format!("removing existing credentials for '{}'", name))?;

    depot
        .put(&Tag::private_key(name), &creds.key)
        .context("saving key")?;
    depot
        .put(&Tag::certificate(name), &creds.cert)
        .context("saving certificate")?;

    let info = Certificate::from_pem(&creds.cert)
        .and_then(|crt| crt.info())
        .context("reading saved certificate")?;
    record_ttl(depot, name, info.not_after).context("putting expiration on credentials")?;

    debug!(op = "save", id = name, not_after = %info.not_after, "saved credentials");
    Ok(())
}

pub(crate) fn find<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
    defaults: &DepotOptions,
) -> Result<Credentials> {
    let ca = depot
        .get(&Tag::certificate(&defaults.ca))
        .with_context(|| format!("getting CA certificate '{}'", defaults.ca))?;
    let crt = depot
        .get(&Tag::certificate(name))
        .with_context(|| format!("getting certificate '{}'", name))?;
    let key = depot
        .get(&Tag::private_key(name))
        .with_context(|| format!("getting key '{}'", name))?;

    Ok(Credentials::new(ca, crt, key)?.with_server_name(name))
}

pub(crate) fn generate_default<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
    defaults: &DepotOptions,
) -> Result<Credentials> {
    let opts = CertificateOptions {
        common_name: name.to_string(),
        host: name.to_string(),
        ..Default::default()
    };
    generate(depot, name, defaults, opts)
}

/// Issues credentials entirely in memory; nothing is written to the depot.
pub(crate) fn generate<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
    defaults: &DepotOptions,
    mut opts: CertificateOptions,
) -> Result<Credentials> {
    if opts.ca.is_empty() {
        opts.ca = defaults.ca.clone();
    }
    if opts.expires.is_zero() {
        opts.expires = defaults.default_expiration;
    }
    if opts.host.is_empty() {
        return Err(Error::Validation("must provide name of host".into()));
    }

    let key_pem = {
        let (_, key) = opts
            .cert_request_in_memory()
            .context("generating certificate request")?;
        key.export_private()?
    };

    let ca = depot
        .get(&Tag::certificate(&opts.ca))
        .with_context(|| format!("getting CA certificate '{}'", opts.ca))?;

    let crt = opts
        .sign_in_memory(depot)
        .context("signing certificate request")?;

    let creds = Credentials::new(ca, crt.export().to_vec(), key_pem.as_bytes().to_vec())?
        .with_server_name(name);
    info!(op = "generate", id = name, ca = %opts.ca, "issued in-memory credentials");
    Ok(creds)
}
