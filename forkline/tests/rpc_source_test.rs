//! JSON-RPC source against a mocked node.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use forkline::abi::{self, AbiValue};
use forkline::contract::ContractReader;
use forkline::events::EventRegistry;
use forkline::source::fixtures;
use forkline::{ChainError, ChainLogSource, EventName, JsonRpcSource, LogFilter};
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REGISTRY: Address = Address::new([0x22; 20]);

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": result }))
}

fn hex_str(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

async fn source(server: &MockServer) -> JsonRpcSource {
    JsonRpcSource::new(server.uri(), Duration::from_secs(2)).unwrap()
}

#[tokio::test]
async fn block_number_parses_hex_quantity() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": "eth_blockNumber" })))
        .respond_with(ok(json!("0x1b4")))
        .mount(&server)
        .await;

    assert_eq!(source(&server).await.block_number().await.unwrap(), 436);
}

#[tokio::test]
async fn get_logs_sends_hex_range_and_drops_pending() {
    let server = MockServer::start().await;
    let log = fixtures::fork_registered(REGISTRY, 1, 2, Address::ZERO, 300);
    let topics: Vec<String> = log.topics.iter().map(|t| hex_str(t.as_slice())).collect();

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "eth_getLogs",
            "params": [{ "fromBlock": "0x64", "toBlock": "0x12c" }]
        })))
        .respond_with(ok(json!([
            {
                "address": hex_str(REGISTRY.as_slice()),
                "topics": topics.clone(),
                "data": hex_str(&log.data),
                "blockNumber": "0x12c",
                "transactionHash": hex_str(log.transaction_hash.as_slice()),
                "logIndex": "0x3"
            },
            {
                "address": hex_str(REGISTRY.as_slice()),
                "topics": topics,
                "data": "0x",
                "blockNumber": null,
                "transactionHash": null,
                "logIndex": null
            }
        ])))
        .mount(&server)
        .await;

    let logs = source(&server)
        .await
        .get_logs(&LogFilter { address: REGISTRY, from_block: 100, to_block: 300 })
        .await
        .unwrap();

    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].block_number, 300);
    assert_eq!(logs[0].log_index, Some(3));

    let event = EventRegistry::fork_registry().decode(&logs[0]).unwrap();
    assert_eq!(event.event_name, EventName::ForkRegistered);
}

#[tokio::test]
async fn eth_call_round_trips_through_contract_reader() {
    let server = MockServer::start().await;
    let uri = abi::encode(&[AbiValue::String("ipfs://bafy/meta.json".into())]);
    let calldata = abi::encode_call(
        "tokenURI(uint256)",
        &[AbiValue::Uint(alloy_primitives::U256::from(5u64))],
    );

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "eth_call",
            "params": [{ "data": hex_str(&calldata) }, "latest"]
        })))
        .respond_with(ok(json!(hex_str(&uri))))
        .mount(&server)
        .await;

    let reader = ContractReader::new(Arc::new(source(&server).await));
    assert_eq!(
        reader.token_uri(Address::new([0x11; 20]), 5).await.unwrap(),
        "ipfs://bafy/meta.json"
    );
}

#[tokio::test]
async fn rpc_error_object_surfaces_code() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": { "code": -32005, "message": "query returned more than 10000 results" }
        })))
        .mount(&server)
        .await;

    let err = source(&server)
        .await
        .get_logs(&LogFilter { address: REGISTRY, from_block: 0, to_block: 1 })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ChainError::Rpc { code: -32005, message: "query returned more than 10000 results".into() }
    );
}

#[tokio::test]
async fn http_failure_is_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = source(&server).await.block_number().await.unwrap_err();
    assert!(matches!(err, ChainError::Transport(ref m) if m.contains("503")));
}

#[tokio::test]
async fn malformed_payload_is_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>nope</html>"))
        .mount(&server)
        .await;

    let err = source(&server).await.block_number().await.unwrap_err();
    assert!(matches!(err, ChainError::InvalidResponse(_)));
}
