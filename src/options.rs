//! # 证书选项与生命周期
//!
//! [`CertificateOptions`] drives every lifecycle step: creating a CA
//! ([`init`](CertificateOptions::init)), generating a request
//! ([`cert_request`](CertificateOptions::cert_request)), signing it
//! ([`sign`](CertificateOptions::sign)) and the combined issuance and
//! rotation helpers.
//!
//! The options cache the request and the signed certificate between steps.
//! Each cache moves from empty to computed to persisted; calling an in-memory
//! step twice returns the cached value, and persisting twice is refused.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::depot::{
    Depot, check_certificate_signing_request_with_error, check_certificate_with_error,
    check_private_key_with_error, get_certificate, get_certificate_signing_request,
    get_encrypted_private_key, get_private_key, put_certificate,
    put_certificate_revocation_list, put_certificate_signing_request,
};
use crate::depot::artifacts::put_key_with_passphrase;
use crate::error::{Error, Result, ResultExt};
use crate::expiration::{delete_on_expiration, record_ttl};
use crate::pki::{
    self, Certificate, CertificateSigningRequest, DEFAULT_KEY_BITS, Key, Subject,
    create_certificate_authority, create_certificate_host,
    create_certificate_revocation_list, create_certificate_signing_request,
    create_intermediate_certificate_authority,
};
use crate::tag::{Tag, format_depot_name, format_request_name};

/// Where a cached lifecycle artifact stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Nothing computed yet.
    #[default]
    Empty,
    /// Computed in memory, not yet stored.
    Computed,
    /// Stored in a depot.
    Persisted,
}

#[derive(Debug, Clone)]
enum Cached<T> {
    Empty,
    Computed(T),
    Persisted(T),
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Cached::Empty
    }
}

impl<T> Cached<T> {
    fn get(&self) -> Option<&T> {
        match self {
            Cached::Empty => None,
            Cached::Computed(v) | Cached::Persisted(v) => Some(v),
        }
    }

    fn state(&self) -> LifecycleState {
        match self {
            Cached::Empty => LifecycleState::Empty,
            Cached::Computed(_) => LifecycleState::Computed,
            Cached::Persisted(_) => LifecycleState::Persisted,
        }
    }

    fn mark_persisted(&mut self) {
        *self = match std::mem::take(self) {
            Cached::Computed(v) | Cached::Persisted(v) => Cached::Persisted(v),
            Cached::Empty => Cached::Empty,
        };
    }
}

#[derive(Debug, Clone)]
struct PendingRequest {
    csr: CertificateSigningRequest,
    key: Key,
}

/// The request and signed certificate carried between lifecycle steps.
///
/// Opaque; inspect it through [`CertificateOptions::request_state`] and
/// [`CertificateOptions::sign_state`].
#[derive(Debug, Clone, Default)]
pub struct LifecycleCache {
    request: Cached<PendingRequest>,
    signed: Cached<Certificate>,
}

/// 证书选项
///
/// Options for CA creation, request generation and signing. Which fields
/// matter depends on the step:
///
/// * `init` and `cert_request`: passphrase, key bits, subject fields, SANs, key path
/// * `init` and `sign`: expires
/// * `sign`: host, CA name, CA passphrase, intermediate
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificateOptions {
    /// Encrypts the stored private key when non-empty.
    pub passphrase: String,
    /// RSA modulus size; 0 means 2048.
    pub key_bits: usize,
    pub organization: String,
    pub country: String,
    pub locality: String,
    pub common_name: String,
    pub organizational_unit: String,
    pub province: String,
    /// IP SANs; each entry may hold several comma-separated addresses.
    pub ip: Vec<String>,
    /// DNS SANs.
    pub domain: Vec<String>,
    /// URI SANs; each entry may hold several comma-separated URIs.
    pub uri: Vec<String>,
    /// PEM file with an existing private key to use instead of generating one.
    pub key_path: Option<PathBuf>,
    /// Validity period counted from the moment of issuance.
    pub expires: Duration,

    /// Identity whose request is signed and under which the certificate is stored.
    pub host: String,
    /// Name of the signing CA.
    pub ca: String,
    /// Passphrase of the CA's private key, when it is stored encrypted.
    pub ca_passphrase: String,
    /// Issue a CA that may sign leaf certificates only.
    pub intermediate: bool,

    /// In-memory lifecycle state; never serialized.
    #[serde(skip)]
    pub cache: LifecycleCache,
}

impl fmt::Debug for CertificateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateOptions")
            .field("common_name", &self.common_name)
            .field("organization", &self.organization)
            .field("organizational_unit", &self.organizational_unit)
            .field("country", &self.country)
            .field("province", &self.province)
            .field("locality", &self.locality)
            .field("ip", &self.ip)
            .field("domain", &self.domain)
            .field("uri", &self.uri)
            .field("key_bits", &self.key_bits)
            .field("key_path", &self.key_path)
            .field("expires", &self.expires)
            .field("host", &self.host)
            .field("ca", &self.ca)
            .field("intermediate", &self.intermediate)
            .field("encrypted", &!self.passphrase.is_empty())
            .field("request", &self.cache.request.state())
            .field("signed", &self.cache.signed.state())
            .finish_non_exhaustive()
    }
}

impl CertificateOptions {
    pub fn request_state(&self) -> LifecycleState {
        self.cache.request.state()
    }

    pub fn sign_state(&self) -> LifecycleState {
        self.cache.signed.state()
    }

    /// Drops the cached request and certificate so the next steps start over.
    pub fn reset(&mut self) {
        self.cache.request = Cached::Empty;
        self.cache.signed = Cached::Empty;
    }

    fn subject(&self) -> Subject {
        Subject {
            common_name: self.common_name.clone(),
            organization: self.organization.clone(),
            organizational_unit: self.organizational_unit.clone(),
            country: self.country.clone(),
            province: self.province.clone(),
            locality: self.locality.clone(),
        }
    }

    fn expires_at(&self) -> Result<DateTime<Utc>> {
        chrono::Duration::from_std(self.expires)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .ok_or_else(|| {
                Error::Validation(format!("expiration {:?} is out of range", self.expires))
            })
    }

    fn get_or_create_private_key(&self) -> Result<Key> {
        match &self.key_path {
            Some(path) => {
                let pem = std::fs::read(path)
                    .with_context(|| format!("reading private key {}", path.display()))?;
                Key::from_pem(&pem)
                    .with_context(|| format!("decoding private key {}", path.display()))
            }
            None => {
                let bits = if self.key_bits == 0 {
                    DEFAULT_KEY_BITS
                } else {
                    self.key_bits
                };
                Key::generate(bits).context("creating RSA key")
            }
        }
    }

    /// The request name: the common name, else the first domain.
    pub(crate) fn certificate_request_name(&self) -> Result<String> {
        if !self.common_name.is_empty() {
            return Ok(self.common_name.clone());
        }
        self.domain
            .first()
            .filter(|d| !d.is_empty())
            .cloned()
            .ok_or_else(|| {
                Error::Validation("must provide a common name or domain to request a certificate".into())
            })
    }

    fn formatted_request_name(&self) -> Result<String> {
        Ok(format_request_name(&self.certificate_request_name()?))
    }

    /// Creates a self-signed CA with its key and an empty CRL, all stored
    /// under the formatted common name.
    ///
    /// Fails without touching storage if any of the three already exists.
    pub fn init<D: Depot + ?Sized>(&self, depot: &D) -> Result<()> {
        if self.common_name.is_empty() {
            return Err(Error::Validation("must provide common name of CA".into()));
        }
        let name = format_depot_name(&self.common_name);

        let exists = check_certificate_with_error(depot, &name)?
            || check_private_key_with_error(depot, &name)?
            || depot.check_with_error(&Tag::crl(&name))?;
        if exists {
            return Err(Error::Conflict(format!("CA '{}' already exists", name)));
        }

        let key = self.get_or_create_private_key()?;
        let expires = self.expires_at()?;

        let crt = create_certificate_authority(&key, &self.subject(), expires)
            .context("creating certificate authority")?;
        let crl = create_certificate_revocation_list(&key, &crt, expires)
            .context("creating certificate revocation list")?;

        put_certificate(depot, &name, &crt).context("saving certificate authority")?;
        put_key_with_passphrase(depot, &name, &key, &self.passphrase)?;
        put_certificate_revocation_list(depot, &name, &crl)
            .context("saving certificate revocation list")?;
        record_ttl(depot, &name, crt.info()?.not_after).context("saving CA expiration")?;

        info!(op = "init", id = %name, not_after = %expires, "created certificate authority");
        Ok(())
    }

    /// Generates the key and request in memory, or returns the cached pair.
    pub fn cert_request_in_memory(&mut self) -> Result<(&CertificateSigningRequest, &Key)> {
        if self.cache.request.get().is_none() {
            let name = self.certificate_request_name()?;
            let ips = pki::parse_and_validate_ips(&self.ip)?;
            let uris = pki::parse_and_validate_uris(&self.uri)?;
            let key = self.get_or_create_private_key()?;
            let csr = create_certificate_signing_request(
                &key,
                &self.subject(),
                &ips,
                &self.domain,
                &uris,
                &name,
            )
            .context("creating certificate request")?;
            debug!(op = "cert_request", id = %name, "created certificate request");
            self.cache.request = Cached::Computed(PendingRequest { csr, key });
        }

        match self.cache.request.get() {
            Some(pending) => Ok((&pending.csr, &pending.key)),
            None => Err(Error::Validation("certificate request was not created".into())),
        }
    }

    /// Stores the cached request and key under the formatted request name.
    pub fn put_cert_request_from_memory<D: Depot + ?Sized>(&mut self, depot: &D) -> Result<()> {
        if self.cache.request.state() == LifecycleState::Persisted {
            return Err(Error::Conflict(
                "certificate request has already been put into the depot".into(),
            ));
        }
        let pending = self.cache.request.get().ok_or_else(|| {
            Error::Validation("must make cert request first before putting into depot".into())
        })?;
        let name = self.formatted_request_name()?;

        if check_certificate_signing_request_with_error(depot, &name)?
            || check_private_key_with_error(depot, &name)?
        {
            return Err(Error::Conflict(format!(
                "certificate request or private key already exists for '{}'",
                name
            )));
        }

        put_certificate_signing_request(depot, &name, &pending.csr)
            .context("saving certificate request")?;
        put_key_with_passphrase(depot, &name, &pending.key, &self.passphrase)?;

        self.cache.request.mark_persisted();
        debug!(op = "put_cert_request", id = %name, "stored certificate request");
        Ok(())
    }

    /// Generates and stores a request for the common name.
    pub fn cert_request<D: Depot + ?Sized>(&mut self, depot: &D) -> Result<()> {
        self.cert_request_in_memory()?;
        self.put_cert_request_from_memory(depot)
    }

    /// Signs the host's request with the CA, or returns the cached certificate.
    ///
    /// The request comes from memory when one was made, else from the depot.
    pub fn sign_in_memory<D: Depot + ?Sized>(&mut self, depot: &D) -> Result<&Certificate> {
        if self.cache.signed.get().is_none() {
            let crt = self.sign_request(depot)?;
            self.cache.signed = Cached::Computed(crt);
        }
        self.cache.signed
            .get()
            .ok_or_else(|| Error::Validation("certificate was not signed".into()))
    }

    fn sign_request<D: Depot + ?Sized>(&self, depot: &D) -> Result<Certificate> {
        if self.host.is_empty() {
            return Err(Error::Validation("must provide name of host".into()));
        }
        if self.ca.is_empty() {
            return Err(Error::Validation("must provide name of CA".into()));
        }
        let host = format_depot_name(&self.host);
        let ca_name = format_depot_name(&self.ca);

        let csr = match self.cache.request.get() {
            Some(pending) => pending.csr.clone(),
            None => get_certificate_signing_request(depot, &host)
                .context("getting host's certificate request")?,
        };

        let ca = get_certificate(depot, &ca_name).context("getting CA certificate")?;
        if !ca.info()?.is_ca {
            return Err(Error::Constraint(format!(
                "'{}' is not allowed to sign certificates",
                self.ca
            )));
        }

        let ca_key = if self.ca_passphrase.is_empty() {
            get_private_key(depot, &ca_name).context("getting unencrypted (assumed) CA key")?
        } else {
            get_encrypted_private_key(depot, &ca_name, self.ca_passphrase.as_bytes())
                .context("getting encrypted CA key")?
        };

        let expires = self.expires_at()?;
        let crt = if self.intermediate {
            create_intermediate_certificate_authority(&ca, &ca_key, &csr, expires)
        } else {
            create_certificate_host(&ca, &ca_key, &csr, expires)
        }
        .context("creating certificate")?;

        debug!(op = "sign", id = %host, ca = %ca_name, intermediate = self.intermediate, "signed certificate");
        Ok(crt)
    }

    /// Stores the cached certificate under the formatted host name and
    /// records its expiration where the depot tracks TTLs.
    pub fn put_cert_from_memory<D: Depot + ?Sized>(&mut self, depot: &D) -> Result<()> {
        if self.cache.signed.state() == LifecycleState::Persisted {
            return Err(Error::Conflict(
                "certificate has already been put into the depot".into(),
            ));
        }
        let crt = self.cache.signed.get().ok_or_else(|| {
            Error::Validation("must sign cert first before putting into depot".into())
        })?;
        let host = format_depot_name(&self.host);

        if check_certificate_with_error(depot, &host)? {
            return Err(Error::Conflict(format!(
                "certificate already exists for '{}'",
                host
            )));
        }

        put_certificate(depot, &host, crt).context("saving certificate")?;
        record_ttl(depot, &host, crt.info()?.not_after).context("saving certificate expiration")?;

        self.cache.signed.mark_persisted();
        info!(op = "put_cert", id = %host, ca = %self.ca, "stored certificate");
        Ok(())
    }

    /// Signs and stores the host's certificate.
    pub fn sign<D: Depot + ?Sized>(&mut self, depot: &D) -> Result<()> {
        self.sign_in_memory(depot)?;
        self.put_cert_from_memory(depot)
    }

    /// Requests, signs and stores a certificate in one call.
    pub fn create_certificate<D: Depot + ?Sized>(&mut self, depot: &D) -> Result<()> {
        self.cert_request(depot)?;
        self.sign(depot)
    }

    /// Issues a new certificate when none exists for the common name or the
    /// existing one expires within `after`. Returns whether one was issued.
    pub fn create_certificate_on_expiration<D: Depot + ?Sized>(
        &mut self,
        depot: &D,
        after: Duration,
    ) -> Result<bool> {
        if self.common_name.is_empty() {
            return Err(Error::Validation("must provide a common name".into()));
        }
        let name = format_depot_name(&self.common_name);

        let exists = check_certificate_with_error(depot, &name)?;
        if exists && !delete_on_expiration(depot, &name, after)? {
            return Ok(false);
        }

        self.reset();
        self.create_certificate(depot)
            .with_context(|| format!("creating certificate for '{}'", name))?;
        info!(op = "rotate", id = %name, replaced = exists, "issued certificate on expiration");
        Ok(true)
    }
}
