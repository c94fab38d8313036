//! RSA private keys and their PEM forms.

use std::fmt;

use rcgen::KeyPair;
use rsa::RsaPrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::traits::PublicKeyParts;
use zeroize::Zeroizing;

use crate::error::{Error, Result};

/// Key size used when the caller does not pick one.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// An RSA private key.
#[derive(Clone)]
pub struct Key {
    inner: RsaPrivateKey,
}

impl Key {
    /// Generates a fresh RSA key of `bits` bits.
    pub fn generate(bits: usize) -> Result<Self> {
        let mut rng = OsRng;
        let inner = RsaPrivateKey::new(&mut rng, bits)
            .map_err(|e| Error::Pki(format!("generating {}-bit RSA key: {}", bits, e)))?;
        Ok(Self { inner })
    }

    /// Parses an unencrypted PKCS#8 or PKCS#1 PEM block.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let pem = super::pem_str(pem, "private key")?;
        if let Ok(inner) = RsaPrivateKey::from_pkcs8_pem(&pem) {
            return Ok(Self { inner });
        }
        RsaPrivateKey::from_pkcs1_pem(&pem)
            .map(|inner| Self { inner })
            .map_err(|e| Error::Pki(format!("parsing private key PEM: {}", e)))
    }

    /// Parses a passphrase-encrypted PKCS#8 PEM block.
    pub fn from_encrypted_pem(pem: &[u8], passphrase: &[u8]) -> Result<Self> {
        let pem = super::pem_str(pem, "encrypted private key")?;
        let inner = RsaPrivateKey::from_pkcs8_encrypted_pem(&pem, passphrase)
            .map_err(|e| Error::Pki(format!("decrypting private key PEM: {}", e)))?;
        Ok(Self { inner })
    }

    /// PKCS#8 PEM, unencrypted.
    pub fn export_private(&self) -> Result<Zeroizing<String>> {
        Ok(self.inner.to_pkcs8_pem(LineEnding::LF)?)
    }

    /// PKCS#8 PEM encrypted under `passphrase`.
    pub fn export_encrypted_private(&self, passphrase: &[u8]) -> Result<Zeroizing<String>> {
        Ok(self
            .inner
            .to_pkcs8_encrypted_pem(OsRng, passphrase, LineEnding::LF)?)
    }

    pub fn bits(&self) -> usize {
        self.inner.size() * 8
    }

    /// The key as an rcgen signing key pair (RSA PKCS#1 v1.5 with SHA-256).
    pub(crate) fn key_pair(&self) -> Result<KeyPair> {
        let pem = self.export_private()?;
        Ok(KeyPair::from_pkcs8_pem_and_sign_algo(
            &pem,
            &rcgen::PKCS_RSA_SHA256,
        )?)
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key").field("bits", &self.bits()).finish_non_exhaustive()
    }
}
