//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// Filesystem path of the tenant database.
    /// Env: `DATABASE_PATH`
    /// Default: `./waflow.db`
    pub database_path: PathBuf,

    /// Base endpoint of the external messaging provider.
    /// Env: `PROVIDER_URL`
    /// Default: `http://localhost:8081`
    pub provider_url: String,

    /// Shared demo provider credential used for tenants that have not
    /// configured one of their own.  Deliberately explicit: leave unset in
    /// multi-tenant production so tenants are never mixed onto one key.
    /// Env: `PROVIDER_SHARED_API_KEY`
    /// Default: unset.
    pub provider_shared_api_key: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], 8080).into(),
            database_path: PathBuf::from("./waflow.db"),
            provider_url: "http://localhost:8081".to_string(),
            provider_shared_api_key: None,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(
                    value = %addr,
                    "Invalid HTTP_ADDR, using default"
                );
            }
        }

        if let Ok(path) = std::env::var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Ok(url) = std::env::var("PROVIDER_URL") {
            config.provider_url = url;
        }

        if let Ok(key) = std::env::var("PROVIDER_SHARED_API_KEY") {
            if !key.is_empty() {
                config.provider_shared_api_key = Some(key);
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}
