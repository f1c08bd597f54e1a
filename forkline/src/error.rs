//! Error types for the forkline crate

use std::future::Future;
use std::time::Duration;

use thiserror::Error;

use crate::metadata::MetadataError;
use crate::source::ChainError;

/// Result type for forkline operations
pub type Result<T> = std::result::Result<T, ForklineError>;

/// Top-level error for lineage, activity and catalog loads
#[derive(Debug, Error)]
pub enum ForklineError {
    /// Chain log source failed (transport, RPC or payload)
    #[error("Chain error: {0}")]
    Chain(#[from] ChainError),

    /// Metadata document could not be resolved
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// An external call did not finish in time
    #[error("Timed out after {after_ms}ms: {operation}")]
    Timeout { operation: String, after_ms: u64 },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid TOML for [`crate::ForklineConfig`]
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ForklineError {
    /// Whether this error came from a deadline rather than the remote side.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ForklineError::Timeout { .. })
    }
}

/// Run `fut` with a deadline, mapping expiry to [`ForklineError::Timeout`].
pub async fn with_deadline<T, E, F>(
    limit: Duration,
    operation: impl Into<String>,
    fut: F,
) -> Result<T>
where
    F: Future<Output = std::result::Result<T, E>>,
    E: Into<ForklineError>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Into::into),
        Err(_) => Err(ForklineError::Timeout {
            operation: operation.into(),
            after_ms: limit.as_millis() as u64,
        }),
    }
}
