//! PKI primitives: RSA keys, CSRs, certificates and CRLs.
//!
//! Everything here is pure computation over in-memory values; persistence is
//! the job of the [`depot`](crate::depot) module. The heavy lifting is done by
//! `rsa` (key material), `rcgen` (building and signing) and `x509-parser`
//! (reading certificates back).
// 中文: PKI 原语：RSA 密钥、CSR、证书与 CRL。本模块不涉及存储。

pub mod certificate;
pub mod key;
pub mod request;
pub mod revocation;
pub mod san;

pub use certificate::{
    Certificate, CertificateInfo, create_certificate_authority, create_certificate_host,
    create_intermediate_certificate_authority,
};
pub use key::{DEFAULT_KEY_BITS, Key};
pub use request::{CertificateSigningRequest, create_certificate_signing_request};
pub use revocation::{CertificateRevocationList, create_certificate_revocation_list};
pub use san::{parse_and_validate_ips, parse_and_validate_uris};

use chrono::{DateTime, Utc};
use rcgen::{DistinguishedName, DnType, SerialNumber};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Subject fields shared by CA creation and certificate requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Subject {
    pub common_name: String,
    pub organization: String,
    pub organizational_unit: String,
    pub country: String,
    pub province: String,
    pub locality: String,
}

impl Subject {
    /// Builds the X.509 distinguished name, omitting empty fields.
    pub(crate) fn distinguished_name(&self) -> DistinguishedName {
        let mut dn = DistinguishedName::new();
        let fields = [
            (DnType::CountryName, &self.country),
            (DnType::StateOrProvinceName, &self.province),
            (DnType::LocalityName, &self.locality),
            (DnType::OrganizationName, &self.organization),
            (DnType::OrganizationalUnitName, &self.organizational_unit),
            (DnType::CommonName, &self.common_name),
        ];
        for (ty, value) in fields {
            if !value.is_empty() {
                dn.push(ty, value.as_str());
            }
        }
        dn
    }
}

/// Random positive serial number, unique per issuance.
pub(crate) fn new_serial_number() -> SerialNumber {
    let mut bytes = *Uuid::new_v4().as_bytes();
    bytes[0] &= 0x7f;
    SerialNumber::from_slice(&bytes)
}

pub(crate) fn to_offset_date_time(at: DateTime<Utc>) -> Result<time::OffsetDateTime> {
    time::OffsetDateTime::from_unix_timestamp(at.timestamp())
        .map_err(|e| Error::Pki(format!("timestamp {} out of range: {}", at, e)))
}

pub(crate) fn from_unix_timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| Error::Pki(format!("timestamp {} out of range", secs)))
}

fn pem_str(pem: &[u8], what: &str) -> Result<String> {
    let text = std::str::from_utf8(pem)
        .map_err(|_| Error::Pki(format!("{} PEM is not valid UTF-8", what)))?;
    if text.trim().is_empty() {
        return Err(Error::Pki(format!("{} PEM is empty", what)));
    }
    Ok(text.to_string())
}
