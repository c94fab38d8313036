//! Certificate revocation lists.

use chrono::{DateTime, Utc};
use rcgen::{CertificateRevocationListParams, Issuer, KeyIdMethod, SerialNumber};

use super::{Certificate, Key, to_offset_date_time};
use crate::error::Result;

/// A PEM-encoded X.509 CRL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRevocationList {
    pem: String,
}

impl CertificateRevocationList {
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        Ok(Self {
            pem: super::pem_str(pem, "certificate revocation list")?,
        })
    }

    pub fn export(&self) -> &[u8] {
        self.pem.as_bytes()
    }

    pub fn pem(&self) -> &str {
        &self.pem
    }
}

/// Creates an empty CRL signed by the CA, with its next update at `expires`.
pub fn create_certificate_revocation_list(
    key: &Key,
    ca: &Certificate,
    expires: DateTime<Utc>,
) -> Result<CertificateRevocationList> {
    let issuer = Issuer::from_ca_cert_pem(ca.pem(), key.key_pair()?)?;
    let params = CertificateRevocationListParams {
        this_update: to_offset_date_time(Utc::now())?,
        next_update: to_offset_date_time(expires)?,
        crl_number: SerialNumber::from(1u64),
        issuing_distribution_point: None,
        revoked_certs: Vec::new(),
        key_identifier_method: KeyIdMethod::Sha256,
    };
    let crl = params.signed_by(&issuer)?;
    Ok(CertificateRevocationList { pem: crl.pem()? })
}
