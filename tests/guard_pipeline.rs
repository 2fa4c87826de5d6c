//! End-to-end pipeline tests against a mock JSON-RPC backend.

mod common;

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::net::TcpListener;

use guardian_relay::blockchain::RpcClient;
use guardian_relay::config::GuardianConfig;
use guardian_relay::guard::{Guard, GuardError};
use guardian_relay::http::HttpServer;
use guardian_relay::policy::Policy;
use guardian_relay::ratelimit::{CounterStore, RateLimiter};

const TOKEN: [u8; 20] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xaa,
];
const INTERNAL_KEY: &str = "test-internal-key";

fn test_config(rpc_addr: SocketAddr) -> GuardianConfig {
    let mut config = GuardianConfig::default();
    config.rpc.url = format!("http://{rpc_addr}");
    config.rpc.chain_id = 56;
    config.rpc.broadcast_timeout_secs = 5;
    config.rpc.receipt_timeout_secs = 5;
    config.rate_limit.enabled = false;
    config.policy.token_allowlist =
        vec!["0x00000000000000000000000000000000000000aa".to_string()];
    config.auth.internal_api_key = INTERNAL_KEY.to_string();
    config
}

fn build_guard(config: &GuardianConfig) -> (Arc<Guard>, Arc<RpcClient>) {
    let policy = Policy::from_config(&config.policy, config.rpc.chain_id).unwrap();
    let limiter = RateLimiter::new(&config.rate_limit, None);
    let rpc = Arc::new(RpcClient::new(&config.rpc).unwrap());
    let guard = Arc::new(Guard::new(policy, limiter, rpc.clone()));
    (guard, rpc)
}

async fn spawn_relay(config: &GuardianConfig) -> SocketAddr {
    let (guard, rpc) = build_guard(config);
    spawn_with(config, guard, rpc).await
}

async fn spawn_with(config: &GuardianConfig, guard: Arc<Guard>, rpc: Arc<RpcClient>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config, guard, rpc).unwrap();
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });
    addr
}

#[tokio::test]
async fn submit_then_receipt_roundtrip() {
    let rpc = common::start_mock_rpc().await;
    let relay = spawn_relay(&test_config(rpc.addr)).await;
    let client = reqwest::Client::new();

    // A well-formed transfer to the allowlisted token, under quota,
    // results in exactly one broadcast and a returned hash.
    let raw = common::legacy_transfer_tx(&TOKEN, 1_000);
    let response = client
        .post(format!("http://{relay}/tx/sendRaw"))
        .header("x-guardian-key", INTERNAL_KEY)
        .json(&serde_json::json!({ "rawTx": raw }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["tx_hash"], common::MOCK_TX_HASH);
    assert_eq!(rpc.broadcasts.load(Ordering::SeqCst), 1);

    // A not-yet-mined hash is a success response, not an error.
    let response = client
        .post(format!("http://{relay}/tx/receipt"))
        .header("x-guardian-key", INTERNAL_KEY)
        .json(&serde_json::json!({ "tx_hash": common::MOCK_TX_HASH }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["found"], false);
}

#[tokio::test]
async fn missing_internal_key_is_rejected_before_processing() {
    let rpc = common::start_mock_rpc().await;
    let relay = spawn_relay(&test_config(rpc.addr)).await;
    let client = reqwest::Client::new();

    let raw = common::legacy_transfer_tx(&TOKEN, 1);
    let response = client
        .post(format!("http://{relay}/tx/sendRaw"))
        .json(&serde_json::json!({ "rawTx": raw.as_str() }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    let response = client
        .post(format!("http://{relay}/tx/sendRaw"))
        .header("x-guardian-key", "wrong")
        .json(&serde_json::json!({ "rawTx": raw.as_str() }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);

    assert_eq!(rpc.broadcasts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn policy_violation_short_circuits_the_broadcast() {
    let rpc = common::start_mock_rpc().await;
    let relay = spawn_relay(&test_config(rpc.addr)).await;
    let client = reqwest::Client::new();

    // Same shape, different destination: not on the allowlist.
    let mut other = TOKEN;
    other[19] = 0xbb;
    let raw = common::legacy_transfer_tx(&other, 1);
    let response = client
        .post(format!("http://{relay}/tx/sendRaw"))
        .header("x-guardian-key", INTERNAL_KEY)
        .json(&serde_json::json!({ "rawTx": raw }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    assert_eq!(rpc.broadcasts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_input_is_a_client_error() {
    let rpc = common::start_mock_rpc().await;
    let relay = spawn_relay(&test_config(rpc.addr)).await;
    let client = reqwest::Client::new();

    for bad in ["0x1234", "nothex", "0xabc"] {
        let response = client
            .post(format!("http://{relay}/tx/sendRaw"))
            .header("x-guardian-key", INTERNAL_KEY)
            .json(&serde_json::json!({ "rawTx": bad }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "rawTx = {bad}");
    }

    let response = client
        .post(format!("http://{relay}/tx/receipt"))
        .header("x-guardian-key", INTERNAL_KEY)
        .json(&serde_json::json!({ "tx_hash": "0x1234" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);

    assert_eq!(rpc.broadcasts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn over_quota_submission_carries_a_retry_after_hint() {
    let rpc = common::start_mock_rpc().await;
    let mut config = test_config(rpc.addr);
    config.rate_limit.enabled = true;
    config.rate_limit.ip_per_minute = 0;

    let policy = Policy::from_config(&config.policy, config.rpc.chain_id).unwrap();
    let store: Arc<dyn CounterStore> = Arc::new(common::MemoryCounterStore::default());
    let limiter = RateLimiter::new(&config.rate_limit, Some(store));
    let rpc_client = Arc::new(RpcClient::new(&config.rpc).unwrap());
    let guard = Arc::new(Guard::new(policy, limiter, rpc_client.clone()));
    let relay = spawn_with(&config, guard, rpc_client).await;
    let client = reqwest::Client::new();

    let raw = common::legacy_transfer_tx(&TOKEN, 1);
    let response = client
        .post(format!("http://{relay}/tx/sendRaw"))
        .header("x-guardian-key", INTERNAL_KEY)
        .json(&serde_json::json!({ "rawTx": raw }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);

    let retry_after: u64 = response
        .headers()
        .get("retry-after")
        .expect("Retry-After header")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["detail"], "rate_limited");
    assert_eq!(body["retry_after"], retry_after);
    assert_eq!(rpc.broadcasts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn chain_info_endpoints_report_token_state() {
    let rpc = common::start_mock_rpc().await;
    let mut config = test_config(rpc.addr);
    config.chain_info.token_address =
        Some("0x00000000000000000000000000000000000000aa".to_string());
    let relay = spawn_relay(&config).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{relay}/chain/token-meta"))
        .header("x-guardian-key", INTERNAL_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["decimals"], 18);
    assert_eq!(body["totalSupply"], "1000000");
    assert_eq!(body["owner"], "0x4444444444444444444444444444444444444444");

    let response = client
        .get(format!("http://{relay}/chain/balance"))
        .query(&[("addr", "0x2222222222222222222222222222222222222222")])
        .header("x-guardian-key", INTERNAL_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["decimals"], 18);
    assert_eq!(body["balance"], "0.5");
}

#[tokio::test]
async fn chain_info_without_a_token_is_unavailable() {
    let rpc = common::start_mock_rpc().await;
    let relay = spawn_relay(&test_config(rpc.addr)).await;
    let client = reqwest::Client::new();

    for path in ["/chain/token-meta", "/chain/balance?addr=0x2222222222222222222222222222222222222222"] {
        let response = client
            .get(format!("http://{relay}{path}"))
            .header("x-guardian-key", INTERNAL_KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 503, "path = {path}");
    }
}

#[tokio::test]
async fn balance_with_malformed_address_is_a_client_error() {
    let rpc = common::start_mock_rpc().await;
    let mut config = test_config(rpc.addr);
    config.chain_info.token_address =
        Some("0x00000000000000000000000000000000000000aa".to_string());
    let relay = spawn_relay(&config).await;

    let response = reqwest::Client::new()
        .get(format!("http://{relay}/chain/balance"))
        .query(&[("addr", "bogus")])
        .header("x-guardian-key", INTERNAL_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn unparseable_chain_info_token_is_a_startup_error() {
    let rpc = common::start_mock_rpc().await;
    let mut config = test_config(rpc.addr);
    config.chain_info.token_address = Some("bogus".to_string());
    let (guard, rpc_client) = build_guard(&config);
    assert!(HttpServer::new(&config, guard, rpc_client).is_err());
}

#[tokio::test]
async fn enabled_limiter_without_store_fails_closed_with_zero_rpc_calls() {
    let rpc = common::start_mock_rpc().await;
    let mut config = test_config(rpc.addr);
    config.rate_limit.enabled = true;
    // No counter store is wired in: every submission must be refused
    // as a configuration error before reaching the gateway.
    let (guard, _) = build_guard(&config);

    let raw = common::legacy_transfer_tx(&TOKEN, 1);
    let err = guard
        .submit(&raw, "10.0.0.1", Some(INTERNAL_KEY))
        .await
        .unwrap_err();
    assert!(matches!(err, GuardError::Config(_)), "got {err:?}");
    assert_eq!(rpc.broadcasts.load(Ordering::SeqCst), 0);
}
