//! Priority-ordered registry of known event schemas.

use tracing::trace;

use super::schema::{DecodedEvent, EventName, EventParam, EventSchema};
use crate::abi::AbiKind;
use crate::types::RawLog;

/// Schemas emitted by the collection contracts.
pub mod schemas {
    use super::*;

    const UINT256: AbiKind = AbiKind::Uint(256);

    pub fn genesis_created() -> EventSchema {
        EventSchema::new(
            EventName::GenesisCreated,
            vec![
                EventParam::indexed("tokenId", UINT256),
                EventParam::indexed("author", AbiKind::Address),
                EventParam::data("tokenURI", AbiKind::String),
            ],
        )
    }

    pub fn token_uri_updated() -> EventSchema {
        EventSchema::new(
            EventName::TokenUriUpdated,
            vec![
                EventParam::indexed("tokenId", UINT256),
                EventParam::data("newTokenURI", AbiKind::String),
            ],
        )
    }

    pub fn content_hash_set() -> EventSchema {
        EventSchema::new(
            EventName::ContentHashSet,
            vec![
                EventParam::indexed("tokenId", UINT256),
                EventParam::data("contentHash", AbiKind::Bytes32),
            ],
        )
    }

    pub fn transfer() -> EventSchema {
        EventSchema::new(
            EventName::Transfer,
            vec![
                EventParam::indexed("from", AbiKind::Address),
                EventParam::indexed("to", AbiKind::Address),
                EventParam::indexed("tokenId", UINT256),
            ],
        )
    }

    /// Registry v1: `ForkRegistered(uint256,uint256,address)`.
    pub fn fork_registered() -> EventSchema {
        EventSchema::new(
            EventName::ForkRegistered,
            vec![
                EventParam::indexed("parentTokenId", UINT256),
                EventParam::indexed("childTokenId", UINT256),
                EventParam::indexed("caller", AbiKind::Address),
            ],
        )
    }

    /// Registry v2 adds the paid fork cost.
    pub fn fork_registered_with_cost() -> EventSchema {
        EventSchema::new(
            EventName::ForkRegistered,
            vec![
                EventParam::indexed("parentTokenId", UINT256),
                EventParam::indexed("childTokenId", UINT256),
                EventParam::indexed("caller", AbiKind::Address),
                EventParam::data("cost", UINT256),
            ],
        )
    }

    pub fn vote_cast() -> EventSchema {
        EventSchema::new(
            EventName::VoteCast,
            vec![
                EventParam::indexed("voter", AbiKind::Address),
                EventParam::indexed("tokenId", UINT256),
                EventParam::indexed("token", AbiKind::Address),
                EventParam::data("amount", UINT256),
                EventParam::data("votes", UINT256),
                EventParam::data("voterTier", AbiKind::Uint(8)),
            ],
        )
    }
}

/// A fixed set of schemas tried in order; the first structural match wins.
#[derive(Debug, Clone, Default)]
pub struct EventRegistry {
    schemas: Vec<EventSchema>,
}

impl EventRegistry {
    pub fn new(schemas: Vec<EventSchema>) -> Self {
        Self { schemas }
    }

    /// Content (NFT) contract events.
    pub fn content() -> Self {
        Self::new(vec![
            schemas::genesis_created(),
            schemas::token_uri_updated(),
            schemas::content_hash_set(),
            schemas::transfer(),
        ])
    }

    /// Fork registry events, both ABI versions.
    pub fn fork_registry() -> Self {
        Self::new(vec![
            schemas::fork_registered(),
            schemas::fork_registered_with_cost(),
        ])
    }

    pub fn voting_pool() -> Self {
        Self::new(vec![schemas::vote_cast()])
    }

    /// Every known schema, content events first.
    pub fn all() -> Self {
        let mut registry = Self::content();
        registry.extend(Self::fork_registry());
        registry.extend(Self::voting_pool());
        registry
    }

    pub fn extend(&mut self, other: EventRegistry) {
        self.schemas.extend(other.schemas);
    }

    pub fn schemas(&self) -> &[EventSchema] {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Decode `log` against each schema in order. `None` when nothing matches.
    pub fn decode(&self, log: &RawLog) -> Option<DecodedEvent> {
        for schema in &self.schemas {
            match schema.decode(log) {
                Ok(event) => return Some(event),
                Err(reason) => {
                    trace!(signature = schema.signature(), %reason, "schema did not match");
                }
            }
        }
        None
    }

    /// Decode a batch, dropping logs that match no schema. Input order is kept.
    pub fn decode_all<'a>(&self, logs: impl IntoIterator<Item = &'a RawLog>) -> Vec<DecodedEvent> {
        logs.into_iter().filter_map(|log| self.decode(log)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::AbiValue;
    use crate::events::schema::encode_log_parts;
    use alloy_primitives::{Address, B256, U256};

    fn raw(schema: &EventSchema, values: &[AbiValue], block: u64) -> RawLog {
        let (topics, data) = encode_log_parts(schema, values);
        RawLog {
            address: Address::repeat_byte(9),
            topics,
            data,
            block_number: block,
            transaction_hash: B256::repeat_byte(block as u8),
            log_index: None,
        }
    }

    #[test]
    fn test_registry_sizes() {
        assert_eq!(EventRegistry::content().len(), 4);
        assert_eq!(EventRegistry::fork_registry().len(), 2);
        assert_eq!(EventRegistry::all().len(), 7);
    }

    #[test]
    fn test_both_fork_versions_decode() {
        let registry = EventRegistry::fork_registry();
        let caller = AbiValue::Address(Address::repeat_byte(3));

        let v1 = raw(
            &schemas::fork_registered(),
            &[
                AbiValue::Uint(U256::from(1u64)),
                AbiValue::Uint(U256::from(2u64)),
                caller.clone(),
            ],
            5,
        );
        let v2 = raw(
            &schemas::fork_registered_with_cost(),
            &[
                AbiValue::Uint(U256::from(1u64)),
                AbiValue::Uint(U256::from(3u64)),
                caller,
                AbiValue::Uint(U256::from(1_000u64)),
            ],
            6,
        );

        let events = registry.decode_all([&v1, &v2]);
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|e| e.event_name == EventName::ForkRegistered));
        assert_eq!(events[1].uint_arg("cost"), Some(U256::from(1_000u64)));
        assert_eq!(events[0].arg("cost"), None);
    }

    #[test]
    fn test_unknown_log_is_skipped_not_fatal() {
        let registry = EventRegistry::all();
        let unknown = RawLog {
            address: Address::repeat_byte(9),
            topics: vec![B256::repeat_byte(0xee)],
            data: vec![1, 2, 3],
            block_number: 1,
            transaction_hash: B256::ZERO,
            log_index: None,
        };
        let good = raw(
            &schemas::token_uri_updated(),
            &[AbiValue::Uint(U256::from(4u64)), AbiValue::String("ipfs://x".into())],
            2,
        );

        assert!(registry.decode(&unknown).is_none());
        let events = registry.decode_all([&unknown, &good, &unknown]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_name, EventName::TokenUriUpdated);
    }

    #[test]
    fn test_vote_cast_decodes() {
        let registry = EventRegistry::voting_pool();
        let log = raw(
            &schemas::vote_cast(),
            &[
                AbiValue::Address(Address::repeat_byte(1)),
                AbiValue::Uint(U256::from(7u64)),
                AbiValue::Address(Address::repeat_byte(2)),
                AbiValue::Uint(U256::from(1_000_000_000_000_000_000u128)),
                AbiValue::Uint(U256::from(100u64)),
                AbiValue::Uint(U256::from(2u64)),
            ],
            3,
        );
        let event = registry.decode(&log).unwrap();
        assert_eq!(event.event_name, EventName::VoteCast);
        assert_eq!(event.uint_arg("voterTier"), Some(U256::from(2u64)));
    }
}
