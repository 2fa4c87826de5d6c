//! Shared utilities for integration testing.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use guardian_relay::ratelimit::{CounterStore, CounterStoreError};

/// The transaction hash the mock node reports for every broadcast.
#[allow(dead_code)]
pub const MOCK_TX_HASH: &str =
    "0x1111111111111111111111111111111111111111111111111111111111111111";

/// A minimal JSON-RPC node: acknowledges broadcasts with a fixed hash
/// and reports every receipt as not yet mined.
pub struct MockRpc {
    pub addr: SocketAddr,
    /// Number of eth_sendRawTransaction calls observed.
    pub broadcasts: Arc<AtomicUsize>,
}

pub async fn start_mock_rpc() -> MockRpc {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let broadcasts = Arc::new(AtomicUsize::new(0));
    let counter = broadcasts.clone();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let counter = counter.clone();
                    tokio::spawn(handle_connection(socket, counter));
                }
                Err(_) => break,
            }
        }
    });

    MockRpc { addr, broadcasts }
}

async fn handle_connection(mut socket: TcpStream, broadcasts: Arc<AtomicUsize>) {
    let Some(body) = read_request_body(&mut socket).await else {
        return;
    };
    let request: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return,
    };

    let id = request["id"].clone();
    let result = match request["method"].as_str().unwrap_or_default() {
        "eth_sendRawTransaction" => {
            broadcasts.fetch_add(1, Ordering::SeqCst);
            serde_json::json!(MOCK_TX_HASH)
        }
        // Not yet mined.
        "eth_getTransactionReceipt" => serde_json::Value::Null,
        "eth_call" => {
            let call = &request["params"][0];
            let data = call["input"]
                .as_str()
                .or_else(|| call["data"].as_str())
                .unwrap_or_default();
            eth_call_result(data)
        }
        _ => serde_json::Value::Null,
    };

    let payload = serde_json::json!({ "jsonrpc": "2.0", "id": id, "result": result }).to_string();
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        payload.len(),
        payload
    );
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

/// Canned ERC-20 view-call answers keyed by selector: 18 decimals, one
/// million tokens of supply, a fixed owner, and a half-token balance.
fn eth_call_result(data: &str) -> serde_json::Value {
    let word = |v: u128| format!("0x{v:064x}");
    match data.get(..10).unwrap_or_default() {
        // decimals()
        "0x313ce567" => serde_json::json!(word(18)),
        // totalSupply()
        "0x18160ddd" => serde_json::json!(word(1_000_000 * 10u128.pow(18))),
        // owner()
        "0x8da5cb5b" => serde_json::json!(format!("0x{}{}", "00".repeat(12), "44".repeat(20))),
        // balanceOf(address)
        "0x70a08231" => serde_json::json!(word(500_000_000_000_000_000)),
        _ => serde_json::Value::Null,
    }
}

/// Process-local counter store for exercising limiter behavior through
/// the HTTP surface without a live backend.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<String, u64>>,
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, _ttl: Duration) -> Result<u64, CounterStoreError> {
        let mut counters = self.counters.lock().unwrap();
        let count = counters.entry(key.to_string()).or_insert(0);
        *count += 1;
        Ok(*count)
    }
}

async fn read_request_body(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];
    loop {
        if let Some(body_start) = find_body_start(&buf) {
            let content_length = parse_content_length(&buf[..body_start])?;
            while buf.len() < body_start + content_length {
                let n = socket.read(&mut tmp).await.ok()?;
                if n == 0 {
                    return None;
                }
                buf.extend_from_slice(&tmp[..n]);
            }
            return Some(buf[body_start..body_start + content_length].to_vec());
        }
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    }
}

fn find_body_start(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn parse_content_length(head: &[u8]) -> Option<usize> {
    let head = String::from_utf8_lossy(head);
    head.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        if name.eq_ignore_ascii_case("content-length") {
            value.trim().parse().ok()
        } else {
            None
        }
    })
}

// --- legacy envelope fixtures ---

fn enc_bytes(b: &[u8]) -> Vec<u8> {
    if b.len() == 1 && b[0] <= 0x7f {
        return b.to_vec();
    }
    if b.len() <= 55 {
        let mut out = vec![0x80 + b.len() as u8];
        out.extend_from_slice(b);
        return out;
    }
    assert!(b.len() <= 0xff);
    let mut out = vec![0xb8, b.len() as u8];
    out.extend_from_slice(b);
    out
}

fn enc_list(items: &[Vec<u8>]) -> Vec<u8> {
    let payload: Vec<u8> = items.iter().flatten().copied().collect();
    let mut out = if payload.len() <= 55 {
        vec![0xc0 + payload.len() as u8]
    } else {
        assert!(payload.len() <= 0xff);
        vec![0xf8, payload.len() as u8]
    };
    out.extend_from_slice(&payload);
    out
}

fn enc_uint(v: u64) -> Vec<u8> {
    if v == 0 {
        return enc_bytes(&[]);
    }
    let be = v.to_be_bytes();
    let first = be.iter().position(|&b| b != 0).unwrap();
    enc_bytes(&be[first..])
}

/// Build a signed-looking legacy envelope carrying an ERC-20 transfer
/// of `amount` to a fixed recipient, destined for `token`, with a chain
/// 56 recovery value.
#[allow(dead_code)]
pub fn legacy_transfer_tx(token: &[u8; 20], amount: u64) -> String {
    let mut data = Vec::with_capacity(68);
    data.extend_from_slice(&[0xa9, 0x05, 0x9c, 0xbb]);
    data.extend_from_slice(&[0u8; 32]);
    let mut amount_word = [0u8; 32];
    amount_word[24..].copy_from_slice(&amount.to_be_bytes());
    data.extend_from_slice(&amount_word);

    let raw = enc_list(&[
        enc_uint(1),
        enc_uint(5_000_000_000),
        enc_uint(60_000),
        enc_bytes(token),
        enc_uint(0),
        enc_bytes(&data),
        enc_uint(147), // v for chain id 56
        enc_bytes(&[0x11; 32]),
        enc_bytes(&[0x22; 32]),
    ]);
    format!("0x{}", alloy::primitives::hex::encode(raw))
}
