//! Common types shared by the lineage, activity and catalog loaders.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Serialize};

/// Content item identifier. Assigned sequentially from 1 by the minting contract.
pub type TokenId = u64;

/// Directed parent → child relationship between two content items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForkEdge {
    pub parent: TokenId,
    pub child: TokenId,
}

impl ForkEdge {
    pub fn new(parent: TokenId, child: TokenId) -> Self {
        Self { parent, child }
    }
}

/// A raw log entry as returned by the chain log source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLog {
    /// Emitting contract
    pub address: Address,
    /// Indexed words; `topics[0]` is the event selector for non-anonymous events
    pub topics: Vec<B256>,
    /// ABI-encoded non-indexed fields
    pub data: Vec<u8>,
    /// Block the log was included in
    pub block_number: u64,
    /// Transaction that emitted the log
    pub transaction_hash: B256,
    /// Position within the block, when the source reports it
    pub log_index: Option<u64>,
}

/// Log query: one address over an inclusive block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogFilter {
    pub address: Address,
    pub from_block: u64,
    pub to_block: u64,
}

/// Vote statistics for one content item, from the voting pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenStats {
    pub votes: alloy_primitives::U256,
    pub total_value: alloy_primitives::U256,
}
