//! Storage addressing: artifact kinds, tags and name normalization.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The four kinds of PKI artifact a depot stores per identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactKind {
    Certificate,
    PrivateKey,
    CertificateSigningRequest,
    CertificateRevocationList,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Certificate,
        ArtifactKind::PrivateKey,
        ArtifactKind::CertificateSigningRequest,
        ArtifactKind::CertificateRevocationList,
    ];

    /// File extension used by the filesystem backend.
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Certificate => "crt",
            ArtifactKind::PrivateKey => "key",
            ArtifactKind::CertificateSigningRequest => "csr",
            ArtifactKind::CertificateRevocationList => "crl",
        }
    }

    /// Field name used by the database backend.
    pub fn field(self) -> &'static str {
        match self {
            ArtifactKind::Certificate => "cert",
            ArtifactKind::PrivateKey => "key",
            ArtifactKind::CertificateSigningRequest => "cert_req",
            ArtifactKind::CertificateRevocationList => "cert_revoc_list",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.extension() == ext)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// An (identity, kind) pair: the only way to address storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    name: String,
    kind: ArtifactKind,
}

impl Tag {
    pub fn new(name: impl Into<String>, kind: ArtifactKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn certificate(name: impl Into<String>) -> Self {
        Self::new(name, ArtifactKind::Certificate)
    }

    pub fn private_key(name: impl Into<String>) -> Self {
        Self::new(name, ArtifactKind::PrivateKey)
    }

    pub fn csr(name: impl Into<String>) -> Self {
        Self::new(name, ArtifactKind::CertificateSigningRequest)
    }

    pub fn crl(name: impl Into<String>) -> Self {
        Self::new(name, ArtifactKind::CertificateRevocationList)
    }

    /// The identity as given by the caller.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// The identity after normalization, as used for the storage key.
    pub fn storage_name(&self) -> String {
        match self.kind {
            ArtifactKind::CertificateSigningRequest => format_request_name(&self.name),
            _ => format_depot_name(&self.name),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.storage_name(), self.kind)
    }
}

/// Replaces spaces with underscores.
pub fn format_depot_name(name: &str) -> String {
    name.replace(' ', "_")
}

/// Restricts a certificate request name to `[a-zA-Z0-9._-]`.
pub fn format_request_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
