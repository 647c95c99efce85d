//! Probe execution tests against a mock JSON-RPC server

use rpcwatch::monitor::types::{Endpoint, ProbeMethod};
use rpcwatch::monitor::Prober;
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn endpoint(server: &MockServer) -> Endpoint {
    Endpoint::new(server.uri(), "mock")
}

#[tokio::test]
async fn chain_get_block_extracts_hex_height() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({"method": "chain_getBlock"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"block": {"header": {"number": "0x64"}}},
        })))
        .mount(&server)
        .await;

    let prober = Prober::new().unwrap();
    let result = prober
        .probe(
            &endpoint(&server),
            Duration::from_secs(5),
            ProbeMethod::ChainGetBlock,
        )
        .await;

    assert!(result.is_success());
    assert_eq!(result.block_height, Some(100));
    assert!(!result.timeout);
    assert!(result.error.is_none());
    assert!(result.raw.is_some());
    assert!(result.response_time >= 0.0);
}

#[tokio::test]
async fn eth_block_number_extracts_hex_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "eth_blockNumber"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": "0x10",
        })))
        .mount(&server)
        .await;

    let prober = Prober::new().unwrap();
    let result = prober
        .probe(
            &endpoint(&server),
            Duration::from_secs(5),
            ProbeMethod::EthBlockNumber,
        )
        .await;

    assert!(result.is_success());
    assert_eq!(result.block_height, Some(16));
}

#[tokio::test]
async fn system_sync_state_reads_decimal_current_block() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "system_syncState"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": {"startingBlock": 1, "currentBlock": 12345, "highestBlock": 12346},
        })))
        .mount(&server)
        .await;

    let prober = Prober::new().unwrap();
    let result = prober
        .probe(
            &endpoint(&server),
            Duration::from_secs(5),
            ProbeMethod::SystemSyncState,
        )
        .await;

    assert!(result.is_success());
    assert_eq!(result.block_height, Some(12345));
}

#[tokio::test]
async fn finalized_head_follows_second_call() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "chain_getFinalizedHead"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": "0xabcdef",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(
            json!({"method": "chain_getBlock", "params": ["0xabcdef"]}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "result": {"block": {"header": {"number": "0x64"}}},
        })))
        .mount(&server)
        .await;

    let prober = Prober::new().unwrap();
    let result = prober
        .probe(
            &endpoint(&server),
            Duration::from_secs(5),
            ProbeMethod::ChainGetFinalizedHead,
        )
        .await;

    assert!(result.is_success());
    assert_eq!(result.block_height, Some(100));
    assert_eq!(result.method, ProbeMethod::ChainGetFinalizedHead);

    let raw = result.raw.expect("two-step raw payload");
    assert_eq!(raw["finalizedHash"], "0xabcdef");
    assert_eq!(raw["blockDetails"]["block"]["header"]["number"], "0x64");
}

#[tokio::test]
async fn finalized_head_second_call_error_is_prefixed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "chain_getFinalizedHead"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": "0xabcdef",
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({"method": "chain_getBlock"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "error": {"code": -32000, "message": "Block not found"},
        })))
        .mount(&server)
        .await;

    let prober = Prober::new().unwrap();
    let result = prober
        .probe(
            &endpoint(&server),
            Duration::from_secs(5),
            ProbeMethod::ChainGetFinalizedHead,
        )
        .await;

    assert!(!result.is_success());
    assert_eq!(
        result.error.as_deref(),
        Some("Second call error: Block not found")
    );
}

#[tokio::test]
async fn http_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let prober = Prober::new().unwrap();
    let result = prober
        .probe(
            &endpoint(&server),
            Duration::from_secs(5),
            ProbeMethod::ChainGetBlock,
        )
        .await;

    assert!(!result.is_success());
    assert!(!result.timeout);
    assert_eq!(result.error.as_deref(), Some("HTTP error 500"));
    assert_eq!(result.block_height, None);
}

#[tokio::test]
async fn rpc_error_message_is_preserved_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "Method not found"},
        })))
        .mount(&server)
        .await;

    let prober = Prober::new().unwrap();
    let result = prober
        .probe(
            &endpoint(&server),
            Duration::from_secs(5),
            ProbeMethod::ChainGetBlock,
        )
        .await;

    assert!(!result.is_success());
    assert_eq!(result.error.as_deref(), Some("Method not found"));
}

#[tokio::test]
async fn slow_endpoint_times_out_with_configured_response_time() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "result": {"block": {"header": {"number": "0x64"}}},
                }))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let prober = Prober::new().unwrap();
    let started = Instant::now();
    let result = prober
        .probe(
            &endpoint(&server),
            Duration::from_millis(100),
            ProbeMethod::ChainGetBlock,
        )
        .await;

    // the in-flight request is cancelled at the deadline, not awaited
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(result.timeout);
    assert!(!result.is_success());
    assert_eq!(result.response_time, 100.0);
    assert_eq!(result.error.as_deref(), Some("Request timed out after 100ms"));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_probe_failure() {
    // nothing listens on this port
    let unreachable = Endpoint::new("http://127.0.0.1:1", "dead");

    let prober = Prober::new().unwrap();
    let result = prober
        .probe(&unreachable, Duration::from_secs(2), ProbeMethod::ChainGetBlock)
        .await;

    assert!(!result.is_success());
    assert!(result.error.is_some());
    assert_eq!(result.block_height, None);
}

#[tokio::test]
async fn malformed_body_is_a_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let prober = Prober::new().unwrap();
    let result = prober
        .probe(
            &endpoint(&server),
            Duration::from_secs(5),
            ProbeMethod::ChainGetBlock,
        )
        .await;

    assert!(!result.is_success());
    assert!(result.error.unwrap().starts_with("invalid JSON response"));
}
