//! Gateway resolver against mocked IPFS gateways.

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::Address;
use forkline::{
    CatalogLoader, ForklineConfig, GatewayResolver, LineageBuilder, MetadataError,
    MetadataResolver, MockChainSource,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn resolver(gateways: &[&MockServer]) -> GatewayResolver {
    GatewayResolver::new(
        gateways.iter().map(|s| format!("{}/ipfs/", s.uri())).collect(),
        Duration::from_secs(2),
    )
    .unwrap()
}

const CONTENT: Address = Address::new([0x11; 20]);

/// First gateway never answers in time, second serves both documents.
async fn stalled_and_healthy_gateways() -> (MockServer, MockServer) {
    let stalled = MockServer::start().await;
    let healthy = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(30)))
        .mount(&stalled)
        .await;
    Mock::given(method("GET"))
        .and(path("/ipfs/one"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Genesis" })))
        .mount(&healthy)
        .await;
    Mock::given(method("GET"))
        .and(path("/ipfs/two"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "name": "Fork", "parentTokenId": 1 })),
        )
        .mount(&healthy)
        .await;

    (stalled, healthy)
}

fn two_item_setup(
    gateways: &[&MockServer],
) -> (Arc<MockChainSource>, Arc<GatewayResolver>, ForklineConfig) {
    let mut config = ForklineConfig::default();
    config.contracts.content = CONTENT;
    config.contracts.registry = None;
    config.metadata.timeout_secs = 1;
    config.metadata.gateways = gateways.iter().map(|s| format!("{}/ipfs/", s.uri())).collect();

    let chain = MockChainSource::default()
        .with_total_supply(CONTENT, 2)
        .with_token_uri(CONTENT, 1, "ipfs://one")
        .with_token_uri(CONTENT, 2, "ipfs://two");
    let resolver =
        GatewayResolver::new(config.metadata.gateways.clone(), config.metadata_timeout()).unwrap();

    (Arc::new(chain), Arc::new(resolver), config)
}

#[tokio::test]
async fn stalled_gateway_times_out_per_attempt() {
    let (stalled, _healthy) = stalled_and_healthy_gateways().await;
    let resolver = GatewayResolver::new(
        vec![format!("{}/ipfs/", stalled.uri())],
        Duration::from_millis(200),
    )
    .unwrap();

    let err = resolver.resolve("ipfs://one").await.unwrap_err();
    assert!(matches!(err, MetadataError::Timeout { after_ms: 200, .. }));
}

#[tokio::test]
async fn lineage_fallback_moves_past_stalled_gateway() {
    let (stalled, healthy) = stalled_and_healthy_gateways().await;
    let (chain, resolver, config) = two_item_setup(&[&stalled, &healthy]);

    let forest = LineageBuilder::new(chain, resolver, &config).build_forest().await.unwrap();

    assert_eq!(forest.children_of(1), [2]);
    assert!(forest.skipped().is_empty());
}

#[tokio::test]
async fn catalog_moves_past_stalled_gateway() {
    let (stalled, healthy) = stalled_and_healthy_gateways().await;
    let (chain, resolver, config) = two_item_setup(&[&stalled, &healthy]);

    let items = CatalogLoader::new(chain, resolver, &config).load_items(false).await.unwrap();

    let names: Vec<&str> = items.iter().map(|i| i.metadata.name.as_str()).collect();
    assert_eq!(names, ["Fork", "Genesis"]);
    assert_eq!(items[0].metadata.parent_token_id, Some(1));
}

#[tokio::test]
async fn falls_through_to_next_gateway() {
    let down = MockServer::start().await;
    let up = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(504))
        .expect(1)
        .mount(&down)
        .await;
    Mock::given(method("GET"))
        .and(path("/ipfs/bafycid/meta.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "Remix",
            "parentTokenId": "3",
            "moderation": { "hidden": false }
        })))
        .expect(1)
        .mount(&up)
        .await;

    let meta = resolver(&[&down, &up]).resolve("ipfs://bafycid/meta.json").await.unwrap();
    assert_eq!(meta.name, "Remix");
    assert_eq!(meta.parent_token_id, Some(3));
}

#[tokio::test]
async fn first_healthy_gateway_wins() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "First" })))
        .mount(&first)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Second" })))
        .expect(0)
        .mount(&second)
        .await;

    let meta = resolver(&[&first, &second]).resolve("ipfs://cid").await.unwrap();
    assert_eq!(meta.name, "First");
}

#[tokio::test]
async fn all_gateways_failing_reports_last_error() {
    let a = MockServer::start().await;
    let b = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(500)).mount(&a).await;
    Mock::given(method("GET")).respond_with(ResponseTemplate::new(404)).mount(&b).await;

    let err = resolver(&[&a, &b]).resolve("ipfs://cid").await.unwrap_err();
    assert!(matches!(err, MetadataError::Http { status: 404, .. }));
}

#[tokio::test]
async fn invalid_document_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "description": "no name" })),
        )
        .mount(&server)
        .await;

    let err = resolver(&[&server]).resolve("ipfs://cid").await.unwrap_err();
    assert!(matches!(err, MetadataError::Parse(_)));
}

#[tokio::test]
async fn http_uri_fetched_directly() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tokens/1.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "Direct" })))
        .mount(&server)
        .await;

    let meta = GatewayResolver::with_defaults(Duration::from_secs(2))
        .unwrap()
        .resolve(&format!("{}/tokens/1.json", server.uri()))
        .await
        .unwrap();
    assert_eq!(meta.name, "Direct");
}
