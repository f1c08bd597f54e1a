//! Catalog of content items with metadata and vote stats.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ContractsConfig, ForklineConfig};
use crate::contract::ContractReader;
use crate::error::{with_deadline, Result};
use crate::metadata::{ContentMetadata, MetadataResolver};
use crate::source::ChainLogSource;
use crate::types::{TokenId, TokenStats};

/// One listed content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogItem {
    pub id: TokenId,
    pub metadata: ContentMetadata,
    /// `None` when no voting pool is configured or the stats call failed
    pub stats: Option<TokenStats>,
}

pub struct CatalogLoader {
    reader: ContractReader,
    resolver: Arc<dyn MetadataResolver>,
    contracts: ContractsConfig,
    rpc_timeout: Duration,
}

impl CatalogLoader {
    pub fn new(
        source: Arc<dyn ChainLogSource>,
        resolver: Arc<dyn MetadataResolver>,
        config: &ForklineConfig,
    ) -> Self {
        Self {
            reader: ContractReader::new(source),
            resolver,
            contracts: config.contracts.clone(),
            rpc_timeout: config.rpc_timeout(),
        }
    }

    /// Every readable item, newest first. Moderated items are left out
    /// unless `include_hidden`.
    pub async fn load_items(&self, include_hidden: bool) -> Result<Vec<CatalogItem>> {
        let total = with_deadline(
            self.rpc_timeout,
            "totalSupply",
            self.reader.total_supply(self.contracts.content),
        )
        .await?;

        let mut items = Vec::new();
        let mut hidden = 0usize;
        let mut unreadable = 0usize;

        for id in (1..=total).rev() {
            let metadata = match self.metadata(id).await {
                Ok(metadata) => metadata,
                Err(e) => {
                    warn!(token_id = id, error = %e, "skipping unreadable item");
                    unreadable += 1;
                    continue;
                }
            };
            if metadata.is_hidden() && !include_hidden {
                hidden += 1;
                continue;
            }
            let stats = self.stats(id).await;
            items.push(CatalogItem { id, metadata, stats });
        }

        info!(total_supply = total, listed = items.len(), hidden, unreadable, "catalog loaded");
        Ok(items)
    }

    async fn metadata(&self, id: TokenId) -> Result<ContentMetadata> {
        let uri = with_deadline(
            self.rpc_timeout,
            format!("tokenURI({})", id),
            self.reader.token_uri(self.contracts.content, id),
        )
        .await?;
        // The resolver bounds each gateway attempt itself.
        Ok(self.resolver.resolve(&uri).await?)
    }

    async fn stats(&self, id: TokenId) -> Option<TokenStats> {
        let pool = self.contracts.voting_pool?;
        let stats = with_deadline(
            self.rpc_timeout,
            format!("getTokenStats({})", id),
            self.reader.token_stats(pool, id),
        )
        .await;
        match stats {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(token_id = id, error = %e, "vote stats unavailable");
                None
            }
        }
    }
}
