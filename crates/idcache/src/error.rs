//! Error types for the identity cache.

use idcache_core::CoreError;
use idcache_sync::SyncError;
use thiserror::Error;

/// Errors that can occur during identity cache operations.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Identity service or session error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// Malformed identity data.
    #[error("identity data error: {0}")]
    Core(#[from] CoreError),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for identity cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
