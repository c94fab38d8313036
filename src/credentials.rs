//! In-memory credential bundles returned by issuance and lookup.

use std::fmt;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::pki::{Certificate, CertificateInfo};

/// A CA certificate, a leaf certificate and its private key, all PEM.
///
/// Credentials are never persisted by themselves; use
/// [`CertDepot::save`](crate::depot::CertDepot::save) to store them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Credentials {
    #[serde(with = "serde_bytes")]
    pub ca_cert: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub cert: Vec<u8>,
    #[serde(with = "serde_bytes")]
    pub key: Vec<u8>,
    #[serde(default)]
    pub server_name: String,
}

impl Credentials {
    /// Bundles the three PEM blobs; none of them may be empty.
    pub fn new(ca_cert: Vec<u8>, cert: Vec<u8>, key: Vec<u8>) -> Result<Self> {
        if ca_cert.is_empty() {
            return Err(Error::Validation("must provide CA certificate".into()));
        }
        if cert.is_empty() {
            return Err(Error::Validation("must provide certificate".into()));
        }
        if key.is_empty() {
            return Err(Error::Validation("must provide key".into()));
        }
        Ok(Self {
            ca_cert,
            cert,
            key,
            server_name: String::new(),
        })
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = name.into();
        self
    }

    /// Parses the leaf certificate.
    pub fn certificate_info(&self) -> Result<CertificateInfo> {
        Certificate::from_pem(&self.cert)?.info()
    }

    /// Serializes the bundle as JSON.
    pub fn export(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(json: &[u8]) -> Result<Self> {
        let creds: Self = serde_json::from_slice(json)?;
        let server_name = creds.server_name.clone();
        Ok(Self::new(creds.ca_cert.clone(), creds.cert.clone(), creds.key.clone())?
            .with_server_name(server_name))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ca_cert", &String::from_utf8_lossy(&self.ca_cert))
            .field("cert", &String::from_utf8_lossy(&self.cert))
            .field("key", &"<redacted>")
            .field("server_name", &self.server_name)
            .finish()
    }
}
