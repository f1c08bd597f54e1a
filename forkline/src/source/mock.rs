//! Mock chain log source for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

use super::traits::*;
use crate::abi::{self, AbiValue};
use crate::contract::signatures;
use crate::types::{LogFilter, RawLog};

/// In-memory chain for unit tests.
///
/// Holds a block height, a log list and canned view-call results keyed by
/// `(contract, calldata)`. Unknown calls revert.
pub struct MockChainSource {
    name: String,
    available: AtomicBool,
    head: AtomicU64,
    logs: RwLock<Vec<RawLog>>,
    calls: RwLock<HashMap<(Address, Vec<u8>), Vec<u8>>>,
    log_queries: RwLock<Vec<LogFilter>>,
    call_count: AtomicU32,
    latency: Option<Duration>,
}

impl MockChainSource {
    /// Create an empty chain at height 0.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: AtomicBool::new(true),
            head: AtomicU64::new(0),
            logs: RwLock::new(Vec::new()),
            calls: RwLock::new(HashMap::new()),
            log_queries: RwLock::new(Vec::new()),
            call_count: AtomicU32::new(0),
            latency: None,
        }
    }

    pub fn with_block_number(self, height: u64) -> Self {
        self.head.store(height, Ordering::SeqCst);
        self
    }

    pub fn with_log(self, log: RawLog) -> Self {
        self.push_log(log);
        self
    }

    pub fn with_logs(self, logs: impl IntoIterator<Item = RawLog>) -> Self {
        for log in logs {
            self.push_log(log);
        }
        self
    }

    /// Answer `data` sent to `to` with `result`.
    pub fn with_call_result(self, to: Address, data: Vec<u8>, result: Vec<u8>) -> Self {
        write_lock(&self.calls).insert((to, data), result);
        self
    }

    pub fn with_total_supply(self, contract: Address, total: u64) -> Self {
        let data = abi::encode_call(signatures::TOTAL_SUPPLY, &[]);
        let result = abi::encode(&[AbiValue::Uint(U256::from(total))]);
        self.with_call_result(contract, data, result)
    }

    pub fn with_token_uri(self, contract: Address, token_id: u64, uri: &str) -> Self {
        let data = abi::encode_call(signatures::TOKEN_URI, &[uint(token_id)]);
        let result = abi::encode(&[AbiValue::String(uri.to_string())]);
        self.with_call_result(contract, data, result)
    }

    pub fn with_parent(self, registry: Address, token_id: u64, parent: u64) -> Self {
        let data = abi::encode_call(signatures::PARENT_OF, &[uint(token_id)]);
        let result = abi::encode(&[uint(parent)]);
        self.with_call_result(registry, data, result)
    }

    pub fn with_token_stats(
        self,
        pool: Address,
        token_id: u64,
        votes: u64,
        total_value: u64,
    ) -> Self {
        let data = abi::encode_call(signatures::GET_TOKEN_STATS, &[uint(token_id)]);
        let result = abi::encode(&[uint(votes), uint(total_value)]);
        self.with_call_result(pool, data, result)
    }

    /// Set availability. An unavailable source fails every request.
    pub fn with_available(self, available: bool) -> Self {
        self.set_available(available);
        self
    }

    /// Delay every request, for timeout and overlap tests.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn set_block_number(&self, height: u64) {
        self.head.store(height, Ordering::SeqCst);
    }

    pub fn push_log(&self, log: RawLog) {
        write_lock(&self.logs).push(log);
    }

    /// Every `get_logs` filter received, in order.
    pub fn log_queries(&self) -> Vec<LogFilter> {
        self.log_queries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of `call` requests received.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn reset_counts(&self) {
        self.call_count.store(0, Ordering::SeqCst);
        write_lock(&self.log_queries).clear();
    }

    async fn enter(&self) -> Result<(), ChainError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(ChainError::Unavailable("Mock source disabled".to_string()));
        }
        Ok(())
    }
}

impl Default for MockChainSource {
    fn default() -> Self {
        Self::new("mock-chain")
    }
}

fn uint(value: u64) -> AbiValue {
    AbiValue::Uint(U256::from(value))
}

fn write_lock<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl ChainLogSource for MockChainSource {
    fn id(&self) -> &str {
        &self.name
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        self.enter().await?;
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ChainError> {
        write_lock(&self.log_queries).push(*filter);
        self.enter().await?;

        let logs = self.logs.read().unwrap_or_else(|e| e.into_inner());
        Ok(logs
            .iter()
            .filter(|log| {
                log.address == filter.address
                    && log.block_number >= filter.from_block
                    && log.block_number <= filter.to_block
            })
            .cloned()
            .collect())
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;

        self.calls
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(to, data))
            .cloned()
            .ok_or_else(|| ChainError::Rpc {
                code: 3,
                message: "execution reverted".to_string(),
            })
    }
}

/// Raw logs as the collection contracts would emit them.
pub mod fixtures {
    use alloy_primitives::{Address, B256, U256};

    use crate::abi::AbiValue;
    use crate::events::{encode_log_parts, schemas, EventSchema};
    use crate::types::RawLog;

    fn build(contract: Address, schema: &EventSchema, values: &[AbiValue], block: u64) -> RawLog {
        let (topics, data) = encode_log_parts(schema, values);
        let mut seed = block.to_be_bytes().to_vec();
        seed.extend_from_slice(&schema.topic0()[..8]);
        RawLog {
            address: contract,
            topics,
            data,
            block_number: block,
            transaction_hash: B256::left_padding_from(&seed),
            log_index: None,
        }
    }

    fn uint(value: u64) -> AbiValue {
        AbiValue::Uint(U256::from(value))
    }

    pub fn fork_registered(
        registry: Address,
        parent: u64,
        child: u64,
        caller: Address,
        block: u64,
    ) -> RawLog {
        build(
            registry,
            &schemas::fork_registered(),
            &[uint(parent), uint(child), AbiValue::Address(caller)],
            block,
        )
    }

    pub fn fork_registered_with_cost(
        registry: Address,
        parent: u64,
        child: u64,
        caller: Address,
        cost: u64,
        block: u64,
    ) -> RawLog {
        build(
            registry,
            &schemas::fork_registered_with_cost(),
            &[uint(parent), uint(child), AbiValue::Address(caller), uint(cost)],
            block,
        )
    }

    pub fn genesis_created(
        contract: Address,
        token_id: u64,
        author: Address,
        uri: &str,
        block: u64,
    ) -> RawLog {
        build(
            contract,
            &schemas::genesis_created(),
            &[uint(token_id), AbiValue::Address(author), AbiValue::String(uri.to_string())],
            block,
        )
    }

    pub fn token_uri_updated(contract: Address, token_id: u64, uri: &str, block: u64) -> RawLog {
        build(
            contract,
            &schemas::token_uri_updated(),
            &[uint(token_id), AbiValue::String(uri.to_string())],
            block,
        )
    }

    pub fn content_hash_set(contract: Address, token_id: u64, hash: B256, block: u64) -> RawLog {
        build(
            contract,
            &schemas::content_hash_set(),
            &[uint(token_id), AbiValue::Bytes32(hash)],
            block,
        )
    }

    pub fn transfer(
        contract: Address,
        from: Address,
        to: Address,
        token_id: u64,
        block: u64,
    ) -> RawLog {
        build(
            contract,
            &schemas::transfer(),
            &[AbiValue::Address(from), AbiValue::Address(to), uint(token_id)],
            block,
        )
    }

    pub fn vote_cast(
        pool: Address,
        voter: Address,
        token_id: u64,
        token: Address,
        amount: u64,
        votes: u64,
        block: u64,
    ) -> RawLog {
        build(
            pool,
            &schemas::vote_cast(),
            &[
                AbiValue::Address(voter),
                uint(token_id),
                AbiValue::Address(token),
                uint(amount),
                uint(votes),
                uint(1),
            ],
            block,
        )
    }

    /// A log no known schema accepts (e.g. `Approval` or `OwnershipTransferred`).
    pub fn unrelated(contract: Address, block: u64) -> RawLog {
        RawLog {
            address: contract,
            topics: vec![B256::repeat_byte(0x5a), B256::ZERO],
            data: Vec::new(),
            block_number: block,
            transaction_hash: B256::left_padding_from(&block.to_be_bytes()),
            log_index: None,
        }
    }
}
