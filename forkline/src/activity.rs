//! Newest-first feed of decoded contract events.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use tracing::{debug, info};

use crate::config::{ActivityConfig, ContractsConfig, ForklineConfig};
use crate::error::Result;
use crate::events::{DecodedEvent, EventRegistry};
use crate::source::ChainLogSource;
use crate::window::{current_window, fetch_logs};

/// Loads the recent activity feed.
pub struct ActivityAggregator {
    source: Arc<dyn ChainLogSource>,
    registry: EventRegistry,
    contracts: ContractsConfig,
    activity: ActivityConfig,
    max_block_range: Option<u64>,
    rpc_timeout: Duration,
}

impl ActivityAggregator {
    pub fn new(source: Arc<dyn ChainLogSource>, config: &ForklineConfig) -> Self {
        Self {
            source,
            registry: EventRegistry::all(),
            contracts: config.contracts.clone(),
            activity: config.activity.clone(),
            max_block_range: config.rpc.max_block_range,
            rpc_timeout: config.rpc_timeout(),
        }
    }

    /// Contracts read for the feed, in the order their logs are concatenated.
    pub fn addresses(&self) -> Vec<Address> {
        let mut addresses = vec![self.contracts.content];
        if self.activity.include_registry {
            addresses.extend(self.contracts.registry);
        }
        if self.activity.include_voting_pool {
            addresses.extend(self.contracts.voting_pool);
        }
        addresses
    }

    /// Decode every log in the trailing window, newest first, capped at
    /// `max_entries`. Logs no schema accepts are dropped.
    pub async fn load_recent_activity(&self) -> Result<Vec<DecodedEvent>> {
        let window =
            current_window(self.source.as_ref(), self.activity.window_blocks, self.rpc_timeout)
                .await?;

        let mut logs = Vec::new();
        for address in self.addresses() {
            let batch = fetch_logs(
                self.source.as_ref(),
                address,
                window,
                self.max_block_range,
                self.rpc_timeout,
            )
            .await?;
            debug!(%address, count = batch.len(), "activity logs fetched");
            logs.extend(batch);
        }

        let mut events = self.registry.decode_all(&logs);
        let decoded = events.len();

        // stable: equal blocks keep source order
        events.sort_by(|a, b| b.block_number.cmp(&a.block_number));
        events.truncate(self.activity.max_entries);

        info!(
            from = window.from_block,
            to = window.to_block,
            logs = logs.len(),
            decoded,
            shown = events.len(),
            "activity feed loaded"
        );
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventName;
    use crate::source::{fixtures, MockChainSource};
    use alloy_primitives::B256;

    const CONTENT: Address = Address::new([0x11; 20]);
    const REGISTRY: Address = Address::new([0x22; 20]);
    const POOL: Address = Address::new([0x44; 20]);
    const ALICE: Address = Address::new([0xa1; 20]);
    const BOB: Address = Address::new([0xb0; 20]);

    fn config() -> ForklineConfig {
        let mut config = ForklineConfig::default();
        config.contracts.content = CONTENT;
        config.contracts.registry = Some(REGISTRY);
        config.contracts.voting_pool = Some(POOL);
        config
    }

    fn aggregator(source: MockChainSource, config: &ForklineConfig) -> ActivityAggregator {
        ActivityAggregator::new(Arc::new(source), config)
    }

    #[tokio::test]
    async fn test_unrelated_logs_dropped() {
        let source = MockChainSource::default()
            .with_block_number(50)
            .with_log(fixtures::genesis_created(CONTENT, 1, ALICE, "ipfs://one", 10))
            .with_log(fixtures::unrelated(CONTENT, 11));

        let feed = aggregator(source, &config()).load_recent_activity().await.unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].event_name, EventName::GenesisCreated);
        assert_eq!(feed[0].arg("tokenURI").and_then(|v| v.as_str()), Some("ipfs://one"));
    }

    #[tokio::test]
    async fn test_feed_capped_at_newest_entries() {
        let logs = (1..=150u64).map(|i| fixtures::transfer(CONTENT, ALICE, BOB, i, 1_000 + i));
        let source = MockChainSource::default().with_block_number(2_000).with_logs(logs);

        let feed = aggregator(source, &config()).load_recent_activity().await.unwrap();
        assert_eq!(feed.len(), 100);
        assert_eq!(feed[0].block_number, 1_150);
        assert_eq!(feed[99].block_number, 1_051);
        assert!(feed.windows(2).all(|w| w[0].block_number > w[1].block_number));
    }

    #[tokio::test]
    async fn test_same_block_keeps_source_order() {
        let source = MockChainSource::default()
            .with_block_number(100)
            .with_log(fixtures::transfer(CONTENT, Address::ZERO, ALICE, 1, 90))
            .with_log(fixtures::token_uri_updated(CONTENT, 1, "ipfs://new", 95))
            .with_log(fixtures::content_hash_set(CONTENT, 1, B256::repeat_byte(7), 95))
            .with_log(fixtures::genesis_created(CONTENT, 1, ALICE, "ipfs://one", 90));

        let feed = aggregator(source, &config()).load_recent_activity().await.unwrap();
        let names: Vec<EventName> = feed.iter().map(|e| e.event_name).collect();
        assert_eq!(
            names,
            vec![
                EventName::TokenUriUpdated,
                EventName::ContentHashSet,
                EventName::Transfer,
                EventName::GenesisCreated,
            ]
        );
    }

    #[tokio::test]
    async fn test_optional_contracts_included_when_enabled() {
        let mut config = config();
        let source = Arc::new(
            MockChainSource::default()
                .with_block_number(100)
                .with_log(fixtures::genesis_created(CONTENT, 2, ALICE, "ipfs://two", 60))
                .with_log(fixtures::fork_registered(REGISTRY, 1, 2, ALICE, 61))
                .with_log(fixtures::vote_cast(POOL, BOB, 2, Address::ZERO, 10, 3, 70)),
        );

        let feed = ActivityAggregator::new(source.clone(), &config)
            .load_recent_activity()
            .await
            .unwrap();
        assert_eq!(feed.len(), 1);

        config.activity.include_registry = true;
        config.activity.include_voting_pool = true;
        let feed = ActivityAggregator::new(source.clone(), &config)
            .load_recent_activity()
            .await
            .unwrap();
        let names: Vec<EventName> = feed.iter().map(|e| e.event_name).collect();
        assert_eq!(
            names,
            vec![EventName::VoteCast, EventName::ForkRegistered, EventName::GenesisCreated]
        );
    }

    #[tokio::test]
    async fn test_window_and_cap_configurable() {
        let mut config = config();
        config.activity.window_blocks = 20;
        config.activity.max_entries = 2;
        let source = Arc::new(
            MockChainSource::default()
                .with_block_number(100)
                .with_logs((70..=100).map(|b| fixtures::transfer(CONTENT, ALICE, BOB, b, b))),
        );

        let feed = ActivityAggregator::new(source.clone(), &config)
            .load_recent_activity()
            .await
            .unwrap();
        assert_eq!(feed.len(), 2);
        assert_eq!(source.log_queries()[0].from_block, 80);
    }

    #[tokio::test]
    async fn test_source_failure_aborts_feed() {
        let source = MockChainSource::default().with_available(false);
        assert!(aggregator(source, &config()).load_recent_activity().await.is_err());
    }
}
