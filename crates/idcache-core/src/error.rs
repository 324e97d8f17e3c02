//! Error types for idcache core.

use thiserror::Error;

/// Errors raised while interpreting identity data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed user record: {0}")]
    MalformedUser(#[from] serde_json::Error),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
