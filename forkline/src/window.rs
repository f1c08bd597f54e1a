//! Bounded block windows and chunked log retrieval.
//!
//! Full-history scans against public endpoints are slow and often rejected,
//! so every log query covers a trailing window of recent blocks. Logs older
//! than the window are not seen.

use std::time::Duration;

use alloy_primitives::Address;
use serde::Serialize;
use tracing::debug;

use crate::error::{with_deadline, Result};
use crate::source::ChainLogSource;
use crate::types::{LogFilter, RawLog};

/// Inclusive block range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockWindow {
    pub from_block: u64,
    pub to_block: u64,
}

impl BlockWindow {
    /// `[max(0, head - span), head]`.
    pub fn trailing(head: u64, span: u64) -> Self {
        Self {
            from_block: head.saturating_sub(span),
            to_block: head,
        }
    }

    /// Number of blocks covered.
    pub fn block_count(&self) -> u64 {
        self.to_block - self.from_block + 1
    }

    /// Split into consecutive sub-ranges of at most `max_range` blocks.
    ///
    /// `None` or zero keeps the window whole.
    pub fn chunks(&self, max_range: Option<u64>) -> Vec<BlockWindow> {
        let max = match max_range {
            Some(m) if m > 0 => m,
            _ => return vec![*self],
        };

        let mut out = Vec::new();
        let mut start = self.from_block;
        loop {
            let end = start.saturating_add(max - 1).min(self.to_block);
            out.push(BlockWindow {
                from_block: start,
                to_block: end,
            });
            if end == self.to_block {
                break;
            }
            start = end + 1;
        }
        out
    }
}

/// Read the head and derive the trailing window of `span` blocks.
pub async fn current_window(
    source: &dyn ChainLogSource,
    span: u64,
    timeout: Duration,
) -> Result<BlockWindow> {
    let head = with_deadline(timeout, "eth_blockNumber", source.block_number()).await?;
    Ok(BlockWindow::trailing(head, span))
}

/// Fetch every log `address` emitted in `window`, chunk by chunk, in order.
pub async fn fetch_logs(
    source: &dyn ChainLogSource,
    address: Address,
    window: BlockWindow,
    max_block_range: Option<u64>,
    timeout: Duration,
) -> Result<Vec<RawLog>> {
    let mut logs = Vec::new();
    for chunk in window.chunks(max_block_range) {
        let filter = LogFilter {
            address,
            from_block: chunk.from_block,
            to_block: chunk.to_block,
        };
        let batch = with_deadline(
            timeout,
            format!("eth_getLogs {}..={}", chunk.from_block, chunk.to_block),
            source.get_logs(&filter),
        )
        .await?;
        debug!(
            %address,
            from = chunk.from_block,
            to = chunk.to_block,
            count = batch.len(),
            "fetched log chunk"
        );
        logs.extend(batch);
    }
    Ok(logs)
}
