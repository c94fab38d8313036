//! Defines the custom error type for the `cert-depot` crate.
// 中文: 定义 `cert-depot` crate 的错误类型。

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The main error type for the `cert-depot` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is missing or a value is malformed.
    #[error("validation error: {0}")]
    Validation(String),

    /// The artifact already exists where a creation was requested.
    #[error("already exists: {0}")]
    Conflict(String),

    /// A referenced artifact is absent, or present but empty.
    #[error("not found: {0}")]
    NotFound(String),

    /// The signing certificate lacks CA authority.
    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "sqlite")]
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    LockPoisoned,

    /// Failure inside the PKI primitives (key, CSR, certificate or CRL handling).
    #[error("PKI error: {0}")]
    Pki(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Coarse classification of an [`Error`], stable across context wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Constraint,
    Storage,
    Pki,
}

impl Error {
    /// Returns the classification of the innermost error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) => ErrorKind::Validation,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Constraint(_) => ErrorKind::Constraint,
            Error::Io(_) | Error::LockPoisoned | Error::Serialization(_) => ErrorKind::Storage,
            #[cfg(feature = "sqlite")]
            Error::Database(_) => ErrorKind::Storage,
            Error::Pki(_) => ErrorKind::Pki,
            Error::Context { source, .. } => source.kind(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }

    fn wrap(self, context: String) -> Self {
        Error::Context {
            context,
            source: Box::new(self),
        }
    }
}

/// Adds operation and identity context to a failing result.
pub trait ResultExt<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T>;

    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|e| e.into().wrap(context.into()))
    }

    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|e| e.into().wrap(f().into()))
    }
}

// 手动实现一些无法使用 #[from] 的转换
impl From<rcgen::Error> for Error {
    fn from(err: rcgen::Error) -> Self {
        Error::Pki(format!("certificate builder: {}", err))
    }
}

impl From<rsa::Error> for Error {
    fn from(err: rsa::Error) -> Self {
        Error::Pki(format!("RSA: {}", err))
    }
}

impl From<pkcs8::Error> for Error {
    fn from(err: pkcs8::Error) -> Self {
        Error::Pki(format!("PKCS#8: {}", err))
    }
}
