//! The per-identity record kept by document-style backends.

use chrono::{DateTime, Utc};

use crate::tag::ArtifactKind;

/// One stored identity: every artifact kind plus its expiration.
///
/// A field that is absent and a field that is empty both mean "not stored".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepotRecord {
    pub id: String,
    pub cert: Option<Vec<u8>>,
    pub private_key: Option<Vec<u8>>,
    pub cert_req: Option<Vec<u8>>,
    pub cert_revoc_list: Option<Vec<u8>>,
    pub ttl: Option<DateTime<Utc>>,
}

impl DepotRecord {
    /// The stored bytes for `kind`, treating empty as absent.
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&[u8]> {
        let field = match kind {
            ArtifactKind::Certificate => &self.cert,
            ArtifactKind::PrivateKey => &self.private_key,
            ArtifactKind::CertificateSigningRequest => &self.cert_req,
            ArtifactKind::CertificateRevocationList => &self.cert_revoc_list,
        };
        field.as_deref().filter(|data| !data.is_empty())
    }
}
