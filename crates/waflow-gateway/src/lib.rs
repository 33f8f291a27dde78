//! # waflow-gateway
//!
//! Stateless adapter in front of the external messaging provider (an
//! Evolution-API-compatible HTTP backend).
//!
//! Every operation is a single outbound call with a fixed 30-second timeout
//! and no retry.  Network failures, timeouts and non-2xx responses are all
//! normalized into [`ProviderError`], preferring the provider's embedded
//! error message over the transport-level text.  Composition (for example
//! combining the two profile sub-updates) is the orchestrator's job, never
//! the gateway's.

pub mod client;
pub mod provider;

mod error;

pub use client::{GatewayConfig, ProviderClient};
pub use error::{ProviderError, ProviderResult};
pub use provider::{Provider, WebhookConfig};
