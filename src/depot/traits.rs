//! Traits for abstracting depot storage.
// 中文: 用于抽象仓库存储的 Trait。

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::credentials::Credentials;
use crate::error::Result;
use crate::options::CertificateOptions;
use crate::tag::Tag;

use super::record::DepotRecord;

/// The storage contract every backend satisfies.
///
/// A depot is a byte-blob store addressed by [`Tag`]. Both backends behave the
/// same for every operation except `delete` of an absent artifact, which is an
/// error for the filesystem backend and a no-op for the database backend.
///
/// 中文: 所有后端都满足的存储契约。除删除不存在的工件外，两个后端的行为完全一致。
pub trait Depot: Send + Sync {
    /// Stores `data` under `tag`.
    ///
    /// Fails when `data` is empty or when an artifact already exists at `tag`.
    fn put(&self, tag: &Tag, data: &[u8]) -> Result<()>;

    /// Reads the artifact at `tag`. Empty artifacts are reported as not found.
    fn get(&self, tag: &Tag) -> Result<Vec<u8>>;

    /// Reports whether an artifact exists at `tag`, surfacing storage errors
    /// and malformed tags separately from "does not exist".
    fn check_with_error(&self, tag: &Tag) -> Result<bool>;

    /// Reports whether an artifact exists at `tag`.
    ///
    /// Storage errors are logged and reported as `false`.
    fn check(&self, tag: &Tag) -> bool {
        match self.check_with_error(tag) {
            Ok(exists) => exists,
            Err(err) => {
                warn!(op = "check", id = tag.name(), kind = %tag.kind(), error = %err, "depot check failed");
                false
            }
        }
    }

    /// Removes only the artifact at `tag`; other kinds for the same identity
    /// are left untouched.
    fn delete(&self, tag: &Tag) -> Result<()>;

    /// TTL tracking, when the backend supports it.
    fn ttl(&self) -> Option<&dyn TtlDepot> {
        None
    }
}

/// Expiration tracking for backends with a per-identity TTL field.
pub trait TtlDepot {
    /// Sets the expiration of an existing identity.
    fn put_ttl(&self, name: &str, expiration: DateTime<Utc>) -> Result<()>;

    /// All identities whose expiration is at or before `cutoff`.
    fn find_expires_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<DepotRecord>>;

    /// Removes every identity whose expiration is at or before `cutoff`,
    /// returning how many were removed.
    fn delete_expires_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// The depot contract used by the lifecycle layer: storage plus credential
/// bundles and one-call issuance.
pub trait CertDepot: Depot {
    /// Replaces any stored CSR, key and certificate for `name` with `creds`
    /// and records the certificate's expiration where supported.
    ///
    /// The writes are not transactional.
    fn save(&self, name: &str, creds: &Credentials) -> Result<()>;

    /// Loads the configured CA certificate and the certificate and key of `name`.
    fn find(&self, name: &str) -> Result<Credentials>;

    /// Issues credentials for `name` in memory using the depot defaults.
    fn generate(&self, name: &str) -> Result<Credentials>;

    /// Issues credentials in memory from `opts`, filling the CA name and
    /// expiration from the depot defaults when unset.
    fn generate_with_options(&self, opts: CertificateOptions) -> Result<Credentials>;
}
