//! # waflow-server
//!
//! Multi-tenant management layer in front of an external WhatsApp
//! automation provider.
//!
//! This binary provides:
//! - **REST API** (axum) for instance lifecycle, messaging, webhooks,
//!   billing and tenant profile management
//! - **Tenant store** (SQLite) holding each tenant's plan, settings and
//!   owned instance set
//! - **Provider gateway** translating every operation into a single HTTP
//!   call against the backend
//! - **Live event stream** (websocket) pushing instance and message
//!   events to connected sessions
//! - **Per-caller rate limiting** to protect against abuse

mod api;
mod auth;
mod billing;
mod config;
mod error;
mod messaging;
mod orchestrator;
mod rate_limit;
mod relay;
mod tenants;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use waflow_gateway::{GatewayConfig, ProviderClient};
use waflow_store::Database;

use crate::api::AppState;
use crate::billing::Billing;
use crate::config::ServerConfig;
use crate::messaging::Messaging;
use crate::orchestrator::Orchestrator;
use crate::rate_limit::RateLimiter;
use crate::relay::EventRelay;
use crate::tenants::Tenants;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,waflow_server=debug")),
        )
        .init();

    info!("Starting waflow server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(
        provider = %config.provider_url,
        shared_credential = config.provider_shared_api_key.is_some(),
        database = %config.database_path.display(),
        "Loaded configuration"
    );

    // -----------------------------------------------------------------------
    // 3. Initialize subsystems
    // -----------------------------------------------------------------------
    let db = Arc::new(tokio::sync::Mutex::new(Database::open_at(
        &config.database_path,
    )?));

    let provider = Arc::new(ProviderClient::new(GatewayConfig {
        base_url: config.provider_url.clone(),
        shared_api_key: config.provider_shared_api_key.clone(),
    })?);

    let relay = EventRelay::new();
    let rate_limiter = RateLimiter::default();

    let app_state = AppState {
        orchestrator: Arc::new(Orchestrator::new(
            db.clone(),
            provider.clone(),
            relay.clone(),
        )),
        messaging: Arc::new(Messaging::new(db.clone(), provider, relay.clone())),
        billing: Arc::new(Billing::new(db.clone())),
        tenants: Arc::new(Tenants::new(db)),
        relay: relay.clone(),
        rate_limiter: rate_limiter.clone(),
        config: Arc::new(config.clone()),
    };

    // -----------------------------------------------------------------------
    // 4. Spawn background tasks
    // -----------------------------------------------------------------------

    // Periodic rate limiter cleanup (every 5 minutes, evict buckets idle >10 min)
    let rl = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rl.purge_stale(600.0).await;
        }
    });

    // Periodic relay and lock-map cleanup: drop channels with no live
    // sessions and per-tenant locks with no operation in flight
    let orch = app_state.orchestrator.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(600));
        loop {
            interval.tick().await;
            relay.purge_idle().await;
            orch.purge_idle_locks().await;
        }
    });

    // -----------------------------------------------------------------------
    // 5. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = api::serve(app_state, config.http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
