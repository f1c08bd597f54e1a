//! Core trait for chain log sources.
//!
//! This module defines the `ChainLogSource` trait - the read-only view of the
//! chain that the lineage builder, activity aggregator and catalog share.

use alloy_primitives::Address;
use async_trait::async_trait;

use crate::types::{LogFilter, RawLog};

/// Error types for chain reads.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// Source is not reachable or refused the request
    #[error("Transport error: {0}")]
    Transport(String),

    /// Node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    /// Node answered with something that is not a valid result
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Source is disabled
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to block height, logs and view calls.
#[async_trait]
pub trait ChainLogSource: Send + Sync {
    /// Identifier used in logs (endpoint URL or mock name).
    fn id(&self) -> &str;

    /// Current block height.
    async fn block_number(&self) -> Result<u64, ChainError>;

    /// Logs emitted by `filter.address` in `[from_block, to_block]`, in chain order.
    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ChainError>;

    /// Execute a read-only call against `to` and return the raw return data.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError>;
}
