//! Forkline - fork lineage and activity views over an on-chain content collection
//!
//! Provides:
//! - Lineage forest reconstruction from fork-registry logs, with a
//!   metadata or `parentOf` fallback when the log window is empty
//! - A newest-first, capped activity feed decoded from contract logs
//! - A catalog of items with parsed metadata and vote stats
//! - Stale-result discard for overlapping refreshes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            ForklineClient               │
//! │   (LoadGuard per view: lineage,         │
//! │    activity, catalog)                   │
//! └────────────────┬────────────────────────┘
//!                  │
//!      ┌───────────┼───────────────┐
//!      ▼           ▼               ▼
//! ┌──────────┐ ┌──────────┐ ┌──────────────┐
//! │ Lineage  │ │ Activity │ │ Catalog      │
//! │ Builder  │ │ Aggreg.  │ │ Loader       │
//! └────┬─────┘ └────┬─────┘ └──────┬───────┘
//!      │            │              │
//!      ▼            ▼              ▼
//! ┌─────────────────────────┐ ┌──────────────────┐
//! │ ChainLogSource          │ │ MetadataResolver │
//! │ (JSON-RPC / Mock)       │ │ (Gateways / Mock)│
//! │  + EventRegistry decode │ │                  │
//! └─────────────────────────┘ └──────────────────┘
//! ```

pub mod abi;
pub mod activity;
pub mod catalog;
pub mod client;
pub mod config;
pub mod contract;
pub mod display;
pub mod error;
pub mod events;
pub mod guard;
pub mod lineage;
pub mod metadata;
pub mod source;
pub mod types;
pub mod window;

// Re-export main types for convenience
pub use activity::ActivityAggregator;
pub use catalog::{CatalogItem, CatalogLoader};
pub use client::ForklineClient;
pub use config::{DuplicateChildPolicy, FallbackStrategy, ForklineConfig};
pub use error::{ForklineError, Result};
pub use events::{DecodedEvent, EventName, EventRegistry, NoMatch};
pub use guard::{CommitOutcome, LoadGuard, LoadState, LoadTicket};
pub use lineage::{EdgeOrigin, LineageBuilder, LineageForest, SearchHit};
pub use metadata::{ContentMetadata, GatewayResolver, MetadataError, MetadataResolver, MockResolver};
pub use source::{ChainError, ChainLogSource, JsonRpcSource, MockChainSource};
pub use types::*;
