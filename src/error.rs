//! Error types shared across the memory service.
//!
//! [`MemoryError`] is the typed error every operation returns; its
//! [`ErrorKind`] is what batch callers see per item as `{kind, message}`.
//! Infrastructure plumbing (server wiring, CLI) still uses `anyhow` at the
//! edges.

use serde::Serialize;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, MemoryError>;

/// Typed errors for memory operations.
#[derive(Error, Debug)]
pub enum MemoryError {
    /// A file, section, or marker does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The target path already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The caller supplied an invalid parameter.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A concurrent operation collided; the request was coalesced or dropped.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The embedding provider is temporarily unreachable (retryable).
    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The embedding provider configuration or response is permanently wrong.
    #[error("embedding provider invalid: {0}")]
    ProviderInvalid(String),

    /// The index store is unreachable or disabled (file-only mode).
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),

    /// The operation was cancelled before it completed.
    #[error("cancelled")]
    Cancelled,
}

impl MemoryError {
    /// Stable kind string reported to RPC callers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NotFound",
            Self::AlreadyExists(_) => "AlreadyExists",
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::Conflict(_) => "Conflict",
            Self::ProviderUnavailable(_) => "ProviderUnavailable",
            Self::ProviderInvalid(_) => "ProviderInvalid",
            Self::StorageUnavailable(_) => "StorageUnavailable",
            Self::Internal(_) => "Internal",
            Self::Cancelled => "Cancelled",
        }
    }

    /// True when a retry with backoff may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::StorageUnavailable(_)
        )
    }
}

impl From<std::io::Error> for MemoryError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(err.to_string()),
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists(err.to_string()),
            _ => Self::Internal(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for MemoryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<sqlx::Error> for MemoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => Self::NotFound(err.to_string()),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                Self::StorageUnavailable(err.to_string())
            }
            _ => Self::Internal(err.to_string()),
        }
    }
}

/// Wire form of an error inside a batch item result.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub kind: String,
    pub message: String,
}

impl From<&MemoryError> for ErrorPayload {
    fn from(err: &MemoryError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}
