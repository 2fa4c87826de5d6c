//! Guarded transaction relay.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────┐
//!                    │               GUARDED RELAY                  │
//!                    │                                              │
//!   Internal caller  │  ┌──────┐   ┌──────────┐   ┌──────────┐     │
//!   ────────────────▶│  │ auth │──▶│  rate    │──▶│ envelope │     │
//!     POST /tx/*     │  │      │   │ limiter  │   │ decoder  │     │
//!                    │  └──────┘   └──────────┘   └────┬─────┘     │
//!                    │                                  │           │
//!                    │                                  ▼           │
//!                    │  ┌──────────┐   ┌──────────┐   ┌────────┐   │     Blockchain
//!   Response         │  │ receipt  │◀──│   rpc    │◀──│ policy │   │     node
//!   ◀────────────────│  │ parser   │   │ gateway  │──▶│        │───┼───▶ (JSON-RPC)
//!                    │  └──────────┘   └──────────┘   └────────┘   │
//!                    │                                              │
//!                    │  config · tracing · metrics   (cross-cutting)│
//!                    └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use guardian_relay::blockchain::RpcClient;
use guardian_relay::config::load_config;
use guardian_relay::guard::Guard;
use guardian_relay::http::HttpServer;
use guardian_relay::observability::metrics;
use guardian_relay::policy::Policy;
use guardian_relay::ratelimit::{CounterStore, RateLimiter, RedisCounterStore};

#[derive(Parser)]
#[command(name = "guardian-relay", about = "Policy-guarded blockchain transaction relay")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "guardian.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guardian_relay=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("guardian-relay v0.1.0 starting");

    let config = load_config(&cli.config)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        chain_id = config.rpc.chain_id,
        rate_limit_enabled = config.rate_limit.enabled,
        allowlist_len = config.policy.token_allowlist.len(),
        "Configuration loaded"
    );

    let policy = Policy::from_config(&config.policy, config.rpc.chain_id)?;

    let store = if config.rate_limit.enabled {
        let store = RedisCounterStore::connect(&config.rate_limit.redis_url)?;
        Some(Arc::new(store) as Arc<dyn CounterStore>)
    } else {
        None
    };
    let limiter = RateLimiter::new(&config.rate_limit, store);

    let rpc = Arc::new(RpcClient::new(&config.rpc)?);
    let guard = Arc::new(Guard::new(policy, limiter, rpc.clone()));

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(&config, guard, rpc)?;
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
