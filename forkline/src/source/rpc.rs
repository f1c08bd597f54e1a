//! Ethereum JSON-RPC chain log source.
//!
//! Works with any node exposing `eth_blockNumber`, `eth_getLogs` and
//! `eth_call` over HTTP (geth, anvil, hosted RPC gateways, Hedera relay).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use alloy_primitives::{Address, B256};
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::traits::*;
use crate::types::{LogFilter, RawLog};

/// JSON-RPC over HTTP.
pub struct JsonRpcSource {
    client: Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcSource {
    /// Create a source for `url` with a per-request transport timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        debug!(method, id, "JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ChainError::Transport(format!("HTTP {}: {}", status, text)));
        }

        let envelope: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(e.to_string()))?;

        if let Some(error) = envelope.error {
            return Err(ChainError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        envelope
            .result
            .ok_or_else(|| ChainError::InvalidResponse(format!("{} returned no result", method)))
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

/// Log as returned by `eth_getLogs`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireLog {
    address: Address,
    topics: Vec<B256>,
    data: String,
    block_number: Option<String>,
    transaction_hash: Option<B256>,
    log_index: Option<String>,
    #[serde(default)]
    removed: bool,
}

impl WireLog {
    /// `None` for pending or reorged-out logs.
    fn into_raw(self) -> Result<Option<RawLog>, ChainError> {
        if self.removed {
            return Ok(None);
        }
        let (Some(block), Some(tx)) = (self.block_number, self.transaction_hash) else {
            return Ok(None);
        };
        Ok(Some(RawLog {
            address: self.address,
            topics: self.topics,
            data: parse_hex_bytes(&self.data)?,
            block_number: parse_quantity(&block)?,
            transaction_hash: tx,
            log_index: self.log_index.as_deref().map(parse_quantity).transpose()?,
        }))
    }
}

/// Parse a `0x`-prefixed hex quantity.
pub fn parse_quantity(s: &str) -> Result<u64, ChainError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    if digits.is_empty() {
        return Err(ChainError::InvalidResponse(format!("empty quantity {:?}", s)));
    }
    u64::from_str_radix(digits, 16)
        .map_err(|e| ChainError::InvalidResponse(format!("bad quantity {:?}: {}", s, e)))
}

/// Parse `0x`-prefixed hex data.
pub fn parse_hex_bytes(s: &str) -> Result<Vec<u8>, ChainError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|e| ChainError::InvalidResponse(format!("bad hex data: {}", e)))
}

fn hex_data(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

#[async_trait]
impl ChainLogSource for JsonRpcSource {
    fn id(&self) -> &str {
        &self.url
    }

    async fn block_number(&self) -> Result<u64, ChainError> {
        let quantity: String = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity(&quantity)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, ChainError> {
        let params = json!([{
            "address": hex_data(filter.address.as_slice()),
            "fromBlock": format!("{:#x}", filter.from_block),
            "toBlock": format!("{:#x}", filter.to_block),
        }]);

        let wire: Vec<WireLog> = self.request("eth_getLogs", params).await?;
        let mut logs = Vec::with_capacity(wire.len());
        for log in wire {
            if let Some(raw) = log.into_raw()? {
                logs.push(raw);
            }
        }
        Ok(logs)
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>, ChainError> {
        let params = json!([
            { "to": hex_data(to.as_slice()), "data": hex_data(&data) },
            "latest"
        ]);
        let result: String = self.request("eth_call", params).await?;
        parse_hex_bytes(&result)
    }
}
