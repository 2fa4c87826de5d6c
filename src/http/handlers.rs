//! Request handlers for the relay's HTTP surface.
//!
//! # Responsibilities
//! - Parse request bodies (tolerating the two rawTx field spellings)
//! - Run the guard pipeline and map [`GuardError`] to status codes
//! - Serve the read-only chain-info endpoints

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::blockchain::token;
use crate::guard::GuardError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::receipt::ReceiptSummary;
use crate::security::GUARDIAN_KEY_HEADER;

#[derive(Debug, Deserialize)]
pub struct SendRawBody {
    #[serde(rename = "rawTx")]
    raw_tx: Option<String>,
    #[serde(rename = "raw_tx")]
    raw_tx_snake: Option<String>,
    note: Option<String>,
}

impl SendRawBody {
    /// Either field spelling is accepted for compatibility with older
    /// internal callers.
    fn pick_raw(&self) -> String {
        self.raw_tx
            .as_deref()
            .or(self.raw_tx_snake.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
pub struct ReceiptBody {
    tx_hash: String,
}

#[derive(Serialize)]
struct FoundReceipt<'a> {
    ok: bool,
    found: bool,
    #[serde(flatten)]
    summary: &'a ReceiptSummary,
    tx_hash: &'a str,
}

pub async fn send_raw(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(body): Json<SendRawBody>,
) -> Response {
    let source_ip = client_ip(&headers, addr);
    let credential = headers
        .get(GUARDIAN_KEY_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Some(note) = &body.note {
        tracing::debug!(note = %note, "submission note");
    }

    let raw = body.pick_raw();
    match state.guard.submit(&raw, &source_ip, credential).await {
        Ok(hash) => {
            metrics::record_request("sendRaw", "accepted");
            (StatusCode::OK, Json(json!({ "ok": true, "tx_hash": hash }))).into_response()
        }
        Err(e) => error_response("sendRaw", e),
    }
}

pub async fn receipt(State(state): State<AppState>, Json(body): Json<ReceiptBody>) -> Response {
    let tx_hash = body.tx_hash.trim();
    match state.guard.receipt(tx_hash).await {
        Ok(None) => {
            metrics::record_request("receipt", "not_found");
            (
                StatusCode::OK,
                Json(json!({ "ok": true, "found": false, "tx_hash": tx_hash })),
            )
                .into_response()
        }
        Ok(Some(summary)) => {
            metrics::record_request("receipt", "found");
            (
                StatusCode::OK,
                Json(FoundReceipt {
                    ok: true,
                    found: true,
                    summary: &summary,
                    tx_hash,
                }),
            )
                .into_response()
        }
        Err(e) => error_response("receipt", e),
    }
}

#[derive(Debug, Deserialize)]
pub struct BalanceParams {
    addr: String,
}

pub async fn token_meta(State(state): State<AppState>) -> Response {
    let Some(token_addr) = state.token_address else {
        return chain_info_disabled();
    };

    let meta = async {
        let decimals = fetch_decimals(&state, token_addr).await?;
        let total = state
            .rpc
            .call(token_addr, token::selector_calldata(token::SELECTOR_TOTAL_SUPPLY))
            .await?;
        let owner = state
            .rpc
            .call(token_addr, token::selector_calldata(token::SELECTOR_OWNER))
            .await?;
        Ok::<_, GuardError>(json!({
            "token": token_addr,
            "decimals": decimals,
            "totalSupply": token::word_to_u256(&total)
                .map(|v| token::format_units(v, decimals)),
            "owner": token::word_to_address(&owner),
        }))
    }
    .await;

    match meta {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response("token_meta", e),
    }
}

pub async fn balance(
    State(state): State<AppState>,
    Query(params): Query<BalanceParams>,
) -> Response {
    let Some(token_addr) = state.token_address else {
        return chain_info_disabled();
    };
    let holder: alloy::primitives::Address = match params.addr.trim().parse() {
        Ok(a) => a,
        Err(_) => {
            return error_response(
                "balance",
                GuardError::Input("addr must be a 0x-prefixed address".to_string()),
            );
        }
    };

    let result = async {
        let decimals = fetch_decimals(&state, token_addr).await?;
        let raw = state
            .rpc
            .call(token_addr, token::balance_of_calldata(holder))
            .await?;
        Ok::<_, GuardError>(json!({
            "addr": holder,
            "token": token_addr,
            "balance": token::word_to_u256(&raw).map(|v| token::format_units(v, decimals)),
            "decimals": decimals,
        }))
    }
    .await;

    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(e) => error_response("balance", e),
    }
}

async fn fetch_decimals(
    state: &AppState,
    token_addr: alloy::primitives::Address,
) -> Result<u8, GuardError> {
    let word = state
        .rpc
        .call(token_addr, token::selector_calldata(token::SELECTOR_DECIMALS))
        .await?;
    token::word_to_u256(&word)
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| GuardError::Upstream("token returned a malformed decimals word".to_string()))
}

fn chain_info_disabled() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "detail": "chain info not configured" })),
    )
        .into_response()
}

/// Prefer the forwarded header when the relay sits behind a proxy.
fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| addr.ip().to_string())
}

fn error_response(route: &'static str, err: GuardError) -> Response {
    let (status, outcome) = match &err {
        GuardError::Input(_) => (StatusCode::BAD_REQUEST, "input"),
        GuardError::Policy(_) => (StatusCode::FORBIDDEN, "policy"),
        GuardError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
        GuardError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config"),
        GuardError::Upstream(_) => (StatusCode::BAD_GATEWAY, "upstream"),
    };
    metrics::record_request(route, outcome);
    tracing::debug!(route, outcome, error = %err, "request rejected");

    if let GuardError::RateLimited { retry_after_secs } = err {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [(header::RETRY_AFTER, retry_after_secs.to_string())],
            Json(json!({ "detail": "rate_limited", "retry_after": retry_after_secs })),
        )
            .into_response();
    }

    (status, Json(json!({ "detail": err.to_string() }))).into_response()
}
