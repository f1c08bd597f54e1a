//! ForklineClient - entry point holding the last committed state of each view.

use std::sync::Arc;

use tracing::info;

use crate::activity::ActivityAggregator;
use crate::catalog::{CatalogItem, CatalogLoader};
use crate::config::ForklineConfig;
use crate::error::Result;
use crate::events::DecodedEvent;
use crate::guard::{CommitOutcome, LoadGuard, LoadState};
use crate::lineage::{LineageBuilder, LineageForest};
use crate::metadata::{GatewayResolver, MetadataResolver};
use crate::source::{ChainLogSource, JsonRpcSource};

/// Lineage, activity and catalog views over one deployment.
///
/// Refreshes may overlap; each view keeps the result of its most recently
/// started refresh, and nothing is committed after [`shutdown`](Self::shutdown).
pub struct ForklineClient {
    config: ForklineConfig,
    source: Arc<dyn ChainLogSource>,
    lineage: LineageBuilder,
    activity: ActivityAggregator,
    catalog: CatalogLoader,
    lineage_state: LoadGuard<LineageForest>,
    activity_state: LoadGuard<Vec<DecodedEvent>>,
    catalog_state: LoadGuard<Vec<CatalogItem>>,
}

impl ForklineClient {
    /// Create a client over explicit backends.
    pub fn new(
        source: Arc<dyn ChainLogSource>,
        resolver: Arc<dyn MetadataResolver>,
        config: ForklineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            lineage: LineageBuilder::new(source.clone(), resolver.clone(), &config),
            activity: ActivityAggregator::new(source.clone(), &config),
            catalog: CatalogLoader::new(source.clone(), resolver, &config),
            source,
            config,
            lineage_state: LoadGuard::new(),
            activity_state: LoadGuard::new(),
            catalog_state: LoadGuard::new(),
        })
    }

    /// Create a client over JSON-RPC and the configured IPFS gateways.
    pub fn connect(config: ForklineConfig) -> Result<Self> {
        config.validate()?;
        let source = JsonRpcSource::new(config.rpc.url.clone(), config.rpc_timeout())?;
        let resolver =
            GatewayResolver::new(config.metadata.gateways.clone(), config.metadata_timeout())?;
        info!(
            rpc = %config.rpc.url,
            content = %config.contracts.content,
            "forkline client connected"
        );
        Self::new(Arc::new(source), Arc::new(resolver), config)
    }

    pub fn config(&self) -> &ForklineConfig {
        &self.config
    }

    pub fn source_id(&self) -> &str {
        self.source.id()
    }

    pub async fn refresh_lineage(&self) -> CommitOutcome {
        self.lineage_state.run(self.lineage.build_forest()).await
    }

    pub async fn refresh_activity(&self) -> CommitOutcome {
        self.activity_state.run(self.activity.load_recent_activity()).await
    }

    pub async fn refresh_catalog(&self, include_hidden: bool) -> CommitOutcome {
        self.catalog_state.run(self.catalog.load_items(include_hidden)).await
    }

    pub async fn lineage(&self) -> LoadState<LineageForest> {
        self.lineage_state.state().await
    }

    pub async fn activity(&self) -> LoadState<Vec<DecodedEvent>> {
        self.activity_state.state().await
    }

    pub async fn catalog(&self) -> LoadState<Vec<CatalogItem>> {
        self.catalog_state.state().await
    }

    /// Stop accepting results. In-flight refreshes finish but are discarded.
    pub fn shutdown(&self) {
        self.lineage_state.close();
        self.activity_state.close();
        self.catalog_state.close();
        info!("forkline client shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.lineage_state.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::mock::document;
    use crate::metadata::MockResolver;
    use crate::source::{fixtures, MockChainSource};
    use alloy_primitives::Address;
    use std::time::Duration;

    const CONTENT: Address = Address::new([0x11; 20]);
    const REGISTRY: Address = Address::new([0x22; 20]);

    fn config() -> ForklineConfig {
        let mut config = ForklineConfig::default();
        config.contracts.content = CONTENT;
        config.contracts.registry = Some(REGISTRY);
        config
    }

    fn source() -> MockChainSource {
        MockChainSource::default()
            .with_block_number(100)
            .with_total_supply(CONTENT, 2)
            .with_token_uri(CONTENT, 1, "ipfs://1")
            .with_token_uri(CONTENT, 2, "ipfs://2")
            .with_log(fixtures::fork_registered(REGISTRY, 1, 2, Address::ZERO, 50))
            .with_log(fixtures::genesis_created(CONTENT, 1, Address::ZERO, "ipfs://1", 40))
    }

    fn resolver() -> MockResolver {
        MockResolver::new()
            .with_document("ipfs://1", document("One", None))
            .with_document("ipfs://2", document("Two", Some(1)))
    }

    #[tokio::test]
    async fn test_refresh_all_views() {
        let client =
            ForklineClient::new(Arc::new(source()), Arc::new(resolver()), config()).unwrap();
        assert!(client.lineage().await.is_idle());

        assert_eq!(client.refresh_lineage().await, CommitOutcome::Committed);
        assert_eq!(client.refresh_activity().await, CommitOutcome::Committed);
        assert_eq!(client.refresh_catalog(false).await, CommitOutcome::Committed);

        let lineage = client.lineage().await;
        assert_eq!(lineage.ready().unwrap().roots(), [1]);
        assert_eq!(client.activity().await.ready().unwrap().len(), 1);
        assert_eq!(client.catalog().await.ready().unwrap().len(), 2);
        assert_eq!(client.source_id(), "mock-chain");
    }

    #[tokio::test]
    async fn test_failed_refresh_recorded() {
        let chain = Arc::new(source());
        let client = ForklineClient::new(chain.clone(), Arc::new(resolver()), config()).unwrap();
        chain.set_available(false);

        client.refresh_activity().await;
        assert!(matches!(client.activity().await, LoadState::Failed(_)));
    }

    #[tokio::test]
    async fn test_shutdown_discards_in_flight_refresh() {
        let chain = source().with_latency(Duration::from_millis(30));
        let client = ForklineClient::new(Arc::new(chain), Arc::new(resolver()), config()).unwrap();

        let (outcome, _) = tokio::join!(client.refresh_lineage(), async {
            tokio::time::sleep(Duration::from_millis(5)).await;
            client.shutdown();
        });

        assert_eq!(outcome, CommitOutcome::Closed);
        assert!(client.lineage().await.is_idle());
        assert!(client.is_shut_down());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = ForklineClient::new(
            Arc::new(MockChainSource::default()),
            Arc::new(MockResolver::new()),
            ForklineConfig::default(),
        );
        assert!(result.is_err());
    }
}
