//! Typed helpers for reading and writing PKI artifacts through a [`Depot`].

use super::Depot;
use crate::error::{Result, ResultExt};
use crate::pki::{Certificate, CertificateRevocationList, CertificateSigningRequest, Key};
use crate::tag::Tag;

pub fn put_certificate<D: Depot + ?Sized>(depot: &D, name: &str, crt: &Certificate) -> Result<()> {
    depot.put(&Tag::certificate(name), crt.export())
}

pub fn get_certificate<D: Depot + ?Sized>(depot: &D, name: &str) -> Result<Certificate> {
    let pem = depot.get(&Tag::certificate(name))?;
    Certificate::from_pem(&pem).with_context(|| format!("decoding certificate '{}'", name))
}

pub fn delete_certificate<D: Depot + ?Sized>(depot: &D, name: &str) -> Result<()> {
    depot.delete(&Tag::certificate(name))
}

pub fn put_private_key<D: Depot + ?Sized>(depot: &D, name: &str, key: &Key) -> Result<()> {
    let pem = key.export_private()?;
    depot.put(&Tag::private_key(name), pem.as_bytes())
}

pub fn put_encrypted_private_key<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
    key: &Key,
    passphrase: &[u8],
) -> Result<()> {
    let pem = key.export_encrypted_private(passphrase)?;
    depot.put(&Tag::private_key(name), pem.as_bytes())
}

/// Stores `key`, encrypted when `passphrase` is non-empty.
pub(crate) fn put_key_with_passphrase<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
    key: &Key,
    passphrase: &str,
) -> Result<()> {
    if passphrase.is_empty() {
        put_private_key(depot, name, key).context("saving private key")
    } else {
        put_encrypted_private_key(depot, name, key, passphrase.as_bytes())
            .context("saving encrypted private key")
    }
}

pub fn get_private_key<D: Depot + ?Sized>(depot: &D, name: &str) -> Result<Key> {
    let pem = depot.get(&Tag::private_key(name))?;
    Key::from_pem(&pem).with_context(|| format!("decoding private key '{}'", name))
}

pub fn get_encrypted_private_key<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
    passphrase: &[u8],
) -> Result<Key> {
    let pem = depot.get(&Tag::private_key(name))?;
    Key::from_encrypted_pem(&pem, passphrase)
        .with_context(|| format!("decrypting private key '{}'", name))
}

pub fn put_certificate_signing_request<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
    csr: &CertificateSigningRequest,
) -> Result<()> {
    depot.put(&Tag::csr(name), csr.export())
}

pub fn get_certificate_signing_request<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
) -> Result<CertificateSigningRequest> {
    let pem = depot.get(&Tag::csr(name))?;
    CertificateSigningRequest::from_pem(&pem)
        .with_context(|| format!("decoding certificate request '{}'", name))
}

pub fn delete_certificate_signing_request<D: Depot + ?Sized>(depot: &D, name: &str) -> Result<()> {
    depot.delete(&Tag::csr(name))
}

pub fn put_certificate_revocation_list<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
    crl: &CertificateRevocationList,
) -> Result<()> {
    depot.put(&Tag::crl(name), crl.export())
}

pub fn get_certificate_revocation_list<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
) -> Result<CertificateRevocationList> {
    let pem = depot.get(&Tag::crl(name))?;
    CertificateRevocationList::from_pem(&pem)
}

pub fn check_certificate_with_error<D: Depot + ?Sized>(depot: &D, name: &str) -> Result<bool> {
    depot
        .check_with_error(&Tag::certificate(name))
        .with_context(|| format!("checking certificate '{}'", name))
}

pub fn check_private_key_with_error<D: Depot + ?Sized>(depot: &D, name: &str) -> Result<bool> {
    depot
        .check_with_error(&Tag::private_key(name))
        .with_context(|| format!("checking private key '{}'", name))
}

pub fn check_certificate_signing_request_with_error<D: Depot + ?Sized>(
    depot: &D,
    name: &str,
) -> Result<bool> {
    depot
        .check_with_error(&Tag::csr(name))
        .with_context(|| format!("checking certificate request '{}'", name))
}
