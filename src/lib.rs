//! # Cert-Depot: Storage and Lifecycle for X.509 Material
//!
//! `cert-depot` stores certificates, private keys, certificate signing requests
//! and revocation lists under logical names, and drives their lifecycle: CA
//! creation, request generation, signing, and rotation of expiring leaves.
//!
//! ## Core Concepts
//!
//! - **`Depot`**: a byte-blob store addressed by [`Tag`]s. Two backends are provided,
//!   [`FileDepot`] (one file per artifact) and `SqliteDepot` (one row per identity,
//!   with TTL tracking).
//! - **`CertDepot`**: adds credential bundles (`save`, `find`) and one-call issuance
//!   (`generate`).
//! - **`CertificateOptions`**: the two-phase "compute in memory, then persist" workflow
//!   for CA initialization, requests and signing.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use cert_depot::{CertificateOptions, FileDepot, Result};
//!
//! fn main() -> Result<()> {
//!     let depot = FileDepot::new("certs")?;
//!
//!     CertificateOptions {
//!         common_name: "root".into(),
//!         expires: Duration::from_secs(365 * 24 * 3600),
//!         ..Default::default()
//!     }
//!     .init(&depot)?;
//!
//!     let mut host = CertificateOptions {
//!         common_name: "localhost".into(),
//!         host: "localhost".into(),
//!         ca: "root".into(),
//!         domain: vec!["localhost".into()],
//!         expires: Duration::from_secs(30 * 24 * 3600),
//!         ..Default::default()
//!     };
//!     host.create_certificate(&depot)?;
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod config;
pub mod credentials;
pub mod depot;
pub mod error;
pub mod expiration;
pub mod options;
pub mod pki;
pub mod tag;

pub use bootstrap::bootstrap_depot;
pub use config::{BootstrapDepotConfig, DepotOptions, SqliteDepotOptions};
pub use credentials::Credentials;
#[cfg(feature = "sqlite")]
pub use depot::SqliteDepot;
pub use depot::{CertDepot, Depot, DepotRecord, FileDepot, TtlDepot};
pub use error::{Error, ErrorKind, Result};
pub use expiration::{delete_on_expiration, validity_bounds};
pub use options::{CertificateOptions, LifecycleCache, LifecycleState};
pub use tag::{ArtifactKind, Tag};

/// The version of the `cert-depot` crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
