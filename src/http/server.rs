//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with all handlers
//! - Wire up middleware (auth, timeout, body limit, request ID, trace)
//! - Serve with graceful shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::blockchain::RpcClient;
use crate::config::validation::ValidationError;
use crate::config::GuardianConfig;
use crate::guard::Guard;
use crate::http::handlers;
use crate::security::auth::{self, AuthState};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub guard: Arc<Guard>,
    pub rpc: Arc<RpcClient>,
    /// Token queried by the chain-info endpoints, when configured.
    pub token_address: Option<Address>,
}

/// HTTP server for the guarded relay.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration. Fails if
    /// the chain-info token address does not parse.
    pub fn new(
        config: &GuardianConfig,
        guard: Arc<Guard>,
        rpc: Arc<RpcClient>,
    ) -> Result<Self, ValidationError> {
        let state = AppState {
            guard,
            rpc,
            token_address: config.chain_info.token()?,
        };
        let auth_state = AuthState {
            internal_api_key: Arc::new(config.auth.internal_api_key.clone()),
        };

        let router = Router::new()
            .route("/tx/sendRaw", post(handlers::send_raw))
            .route("/tx/receipt", post(handlers::receipt))
            .route("/chain/token-meta", get(handlers::token_meta))
            .route("/chain/balance", get(handlers::balance))
            .layer(middleware::from_fn_with_state(
                auth_state,
                auth::require_internal_key,
            ))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_size))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http());

        Ok(Self { router })
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
