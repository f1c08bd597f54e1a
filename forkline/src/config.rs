//! Forkline configuration

use std::path::Path;
use std::time::Duration;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{ForklineError, Result};
use crate::metadata::DEFAULT_GATEWAYS;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForklineConfig {
    #[serde(default)]
    pub rpc: RpcConfig,
    #[serde(default)]
    pub contracts: ContractsConfig,
    #[serde(default)]
    pub lineage: LineageConfig,
    #[serde(default)]
    pub activity: ActivityConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// JSON-RPC endpoint
    #[serde(default = "default_rpc_url")]
    pub url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_rpc_timeout")]
    pub timeout_secs: u64,

    /// Largest block span a single `eth_getLogs` may cover (unset = no limit)
    #[serde(default)]
    pub max_block_range: Option<u64>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: default_rpc_url(),
            timeout_secs: default_rpc_timeout(),
            max_block_range: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContractsConfig {
    /// Content collection (ERC-721)
    #[serde(default)]
    pub content: Address,

    /// Fork registry
    #[serde(default)]
    pub registry: Option<Address>,

    /// Voting pool
    #[serde(default)]
    pub voting_pool: Option<Address>,
}

/// What to do when the registry window yields no fork edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FallbackStrategy {
    /// Read `parentTokenId` from each item's metadata document
    #[default]
    Metadata,
    /// Call `parentOf(id)` on the registry for each item
    RegistryCall,
    None,
}

/// Which parent wins when a child is registered more than once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicateChildPolicy {
    #[default]
    FirstSeen,
    LastSeen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineageConfig {
    /// Trailing window scanned for fork registrations
    #[serde(default = "default_lineage_window")]
    pub window_blocks: u64,

    #[serde(default)]
    pub fallback: FallbackStrategy,

    #[serde(default)]
    pub duplicate_child: DuplicateChildPolicy,
}

impl Default for LineageConfig {
    fn default() -> Self {
        Self {
            window_blocks: default_lineage_window(),
            fallback: FallbackStrategy::default(),
            duplicate_child: DuplicateChildPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    /// Trailing window scanned for the feed
    #[serde(default = "default_activity_window")]
    pub window_blocks: u64,

    /// Feed cap
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// Also read fork registrations from the registry
    #[serde(default)]
    pub include_registry: bool,

    /// Also read votes from the voting pool
    #[serde(default)]
    pub include_voting_pool: bool,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            window_blocks: default_activity_window(),
            max_entries: default_max_entries(),
            include_registry: false,
            include_voting_pool: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// IPFS gateways, tried in order
    #[serde(default = "default_gateways")]
    pub gateways: Vec<String>,

    /// Per-fetch timeout in seconds
    #[serde(default = "default_metadata_timeout")]
    pub timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            gateways: default_gateways(),
            timeout_secs: default_metadata_timeout(),
        }
    }
}

// Defaults
fn default_rpc_url() -> String { "http://127.0.0.1:8545".to_string() }
fn default_rpc_timeout() -> u64 { 15 }
fn default_lineage_window() -> u64 { 50_000 }
fn default_activity_window() -> u64 { 10_000 }
fn default_max_entries() -> usize { 100 }
fn default_metadata_timeout() -> u64 { 10 }
fn default_gateways() -> Vec<String> {
    DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect()
}

impl ForklineConfig {
    /// Parse a TOML document. Missing sections and fields take their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Reject settings no load could run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.rpc.url.starts_with("http://") || self.rpc.url.starts_with("https://")) {
            return Err(ForklineError::Config(format!(
                "rpc.url must be an http(s) URL, got {:?}",
                self.rpc.url
            )));
        }
        if self.rpc.timeout_secs == 0 || self.metadata.timeout_secs == 0 {
            return Err(ForklineError::Config("timeouts must be at least 1 second".into()));
        }
        if self.rpc.max_block_range == Some(0) {
            return Err(ForklineError::Config("rpc.max_block_range must be positive".into()));
        }
        if self.contracts.content == Address::ZERO {
            return Err(ForklineError::Config("contracts.content is not set".into()));
        }
        if self.lineage.fallback == FallbackStrategy::RegistryCall
            && self.contracts.registry.is_none()
        {
            return Err(ForklineError::Config(
                "lineage.fallback = \"registry-call\" needs contracts.registry".into(),
            ));
        }
        if self.activity.max_entries == 0 {
            return Err(ForklineError::Config("activity.max_entries must be positive".into()));
        }
        if self.metadata.gateways.is_empty() {
            return Err(ForklineError::Config("metadata.gateways is empty".into()));
        }
        Ok(())
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc.timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata.timeout_secs)
    }
}
