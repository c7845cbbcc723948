//! Error types for the libvirt pool provider

use thiserror::Error;

/// Result type alias using the provider Error
pub type Result<T> = std::result::Result<T, Error>;

/// Provider error types
///
/// Every lifecycle failure is terminal for the invocation that produced it.
/// Nothing is retried and partially applied changes are left in place.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("The libvirt connection is nil or unavailable")]
    ConnectionUnavailable,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Error defining libvirt pool: {0}")]
    Definition(String),

    #[error("Storage pool not found: {0}")]
    NotFound(String),

    #[error("Error looking up storage pool {what}: {message}")]
    Lookup { what: String, message: String },

    #[error("Error setting storage pool autostart: {0}")]
    Autostart(String),

    #[error("Error building storage pool: {0}")]
    Build(String),

    #[error("Error starting storage pool: {0}")]
    Start(String),

    #[error("Error destroying storage pool: {0}")]
    Destroy(String),

    #[error("Error undefining storage pool: {0}")]
    Undefine(String),
}

impl Error {
    /// Lookup failure for the given attribute or key (`"by name"`, `"uuid"`, ...)
    pub fn lookup(what: impl Into<String>, message: impl ToString) -> Self {
        Error::Lookup {
            what: what.into(),
            message: message.to_string(),
        }
    }

    /// Whether the failure means the pool does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}
