//! Error types for the sync module.

use idcache_core::CoreError;
use thiserror::Error;

/// Errors that can occur while talking to the identity service.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Transport-level failure (connection, I/O, encoding).
    #[error("transport error: {0}")]
    Transport(String),

    /// The service answered with an error.
    #[error("request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The transport found the session invalid and already reported it.
    ///
    /// Consumed by the controller; never surfaced from a refresh.
    #[error("session no longer valid")]
    SessionHandled,

    /// The request did not complete in time.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The service answered with data that could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] CoreError),

    /// Invalid controller configuration.
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
