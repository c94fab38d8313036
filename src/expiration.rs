//! Expiration checks on stored certificates.
// 中文: 证书过期检查与清理。

use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::depot::{Depot, check_certificate_with_error, delete_certificate, delete_if_exists, get_certificate};
use crate::error::{Error, Result, ResultExt};
use crate::tag::Tag;

/// Deletes the certificate of `name`, its key and (for non-CA certificates)
/// its request when the certificate expires within `after` from now.
///
/// Returns `false` when there is no certificate or it is still valid long
/// enough.
pub fn delete_on_expiration<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
    after: Duration,
) -> Result<bool> {
    if !check_certificate_with_error(depot, name)? {
        return Ok(false);
    }
    let info = get_certificate(depot, name)?.info()?;

    let window = chrono::Duration::from_std(after)
        .map_err(|_| Error::Validation(format!("window {:?} is out of range", after)))?;
    let deadline = Utc::now()
        .checked_add_signed(window)
        .ok_or_else(|| Error::Validation(format!("window {:?} is out of range", after)))?;
    if info.not_after >= deadline {
        debug!(op = "expiration_check", id = name, not_after = %info.not_after, "certificate still valid");
        return Ok(false);
    }

    delete_certificate(depot, name).context("deleting expiring certificate")?;
    let mut rest = vec![Tag::private_key(name)];
    if !info.is_ca {
        rest.push(Tag::csr(name));
    }
    delete_if_exists(depot, &rest).context("deleting expiring key material")?;

    info!(op = "delete_on_expiration", id = name, not_after = %info.not_after, "deleted expiring certificate");
    Ok(true)
}

/// The `(not_before, not_after)` validity window of the certificate of `name`.
pub fn validity_bounds<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let info = get_certificate(depot, name)
        .with_context(|| format!("getting certificate '{}'", name))?
        .info()?;
    Ok((info.not_before, info.not_after))
}

/// Records the expiration of `name` on depots that track TTLs.
pub(crate) fn record_ttl<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
    expiration: DateTime<Utc>,
) -> Result<()> {
    match depot.ttl() {
        Some(ttl) => ttl.put_ttl(name, expiration),
        None => Ok(()),
    }
}
