//!
//! # 配置模块
//!
//! 证书仓库各后端与引导流程使用的配置结构。
//! 所有结构都支持 serde，可直接从 JSON 配置文件加载。
//!
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result, ResultExt};
use crate::options::CertificateOptions;

/// Defaults applied by the superset depot operations (find, generate).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct DepotOptions {
    /// Name of the CA used by `find` and `generate`.
    pub ca: String,
    /// Expiration used by `generate` when the options leave it unset.
    pub default_expiration: Duration,
}

/// Default name of the table holding one row per identity.
pub const DEFAULT_TABLE: &str = "certs";

/// Options for the database-backed depot.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SqliteDepotOptions {
    /// Database file; an in-memory database is used when absent.
    pub path: Option<PathBuf>,
    /// Table ("collection") holding the depot records.
    pub table: String,
    #[serde(flatten)]
    pub depot: DepotOptions,
}

impl Default for SqliteDepotOptions {
    fn default() -> Self {
        Self {
            path: None,
            table: DEFAULT_TABLE.to_string(),
            depot: DepotOptions::default(),
        }
    }
}

impl SqliteDepotOptions {
    pub fn validate(&self) -> Result<()> {
        // 表名会直接拼接进 SQL，只允许标识符字符
        if self.table.is_empty()
            || !self
                .table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::Validation(format!(
                "table name '{}' must be a non-empty [A-Za-z0-9_] identifier",
                self.table
            )));
        }
        Ok(())
    }
}

/// Configuration for [`bootstrap_depot`](crate::bootstrap::bootstrap_depot).
///
/// Exactly one of `file_depot` and `sqlite_depot` selects the backend. CA and
/// service material is either supplied as PEM or generated from the options.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct BootstrapDepotConfig {
    /// Directory of a filesystem depot.
    pub file_depot: Option<PathBuf>,
    /// Database depot options.
    pub sqlite_depot: Option<SqliteDepotOptions>,
    pub ca_name: String,
    pub service_name: String,
    /// Existing CA certificate PEM.
    pub ca_cert: String,
    /// Existing CA private key PEM.
    pub ca_key: String,
    /// Existing service certificate PEM.
    pub service_cert: String,
    /// Existing service private key PEM.
    pub service_key: String,
    pub ca_opts: Option<CertificateOptions>,
    pub service_opts: Option<CertificateOptions>,
}

impl BootstrapDepotConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading bootstrap config {}", path.display()))?;
        Self::from_json(&json).with_context(|| format!("parsing bootstrap config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        match (&self.file_depot, &self.sqlite_depot) {
            (Some(_), Some(_)) => {
                return Err(Error::Validation(
                    "cannot specify more than one depot backend".into(),
                ));
            }
            (None, None) => return Err(Error::Validation("must specify a depot backend".into())),
            (Some(dir), None) if dir.as_os_str().is_empty() => {
                return Err(Error::Validation("file depot path must not be empty".into()));
            }
            (None, Some(opts)) => opts.validate()?,
            _ => {}
        }

        if self.ca_name.is_empty() {
            return Err(Error::Validation("must specify the name of the CA".into()));
        }
        if self.service_name.is_empty() {
            return Err(Error::Validation("must specify the name of the service".into()));
        }

        let ca_pem = !self.ca_cert.is_empty() || !self.ca_key.is_empty();
        if ca_pem && (self.ca_cert.is_empty() || self.ca_key.is_empty()) {
            return Err(Error::Validation(
                "must provide both the CA certificate and key".into(),
            ));
        }
        if !ca_pem && self.ca_opts.is_none() {
            return Err(Error::Validation(
                "must provide either the CA certificate and key or options to create them".into(),
            ));
        }

        let service_pem = !self.service_cert.is_empty() || !self.service_key.is_empty();
        if service_pem && (self.service_cert.is_empty() || self.service_key.is_empty()) {
            return Err(Error::Validation(
                "must provide both the service certificate and key".into(),
            ));
        }
        if !service_pem && self.service_opts.is_none() {
            return Err(Error::Validation(
                "must provide either the service certificate and key or options to create them"
                    .into(),
            ));
        }

        if let Some(opts) = &self.ca_opts {
            if opts.common_name != self.ca_name {
                return Err(Error::Validation(format!(
                    "CA common name '{}' does not match CA name '{}'",
                    opts.common_name, self.ca_name
                )));
            }
        }
        if let Some(opts) = &self.service_opts {
            if opts.ca != self.ca_name {
                return Err(Error::Validation(format!(
                    "service CA '{}' does not match CA name '{}'",
                    opts.ca, self.ca_name
                )));
            }
            if opts.common_name != self.service_name {
                return Err(Error::Validation(format!(
                    "service common name '{}' does not match service name '{}'",
                    opts.common_name, self.service_name
                )));
            }
        }

        Ok(())
    }
}
