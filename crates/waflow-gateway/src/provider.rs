//! The provider seam.
//!
//! The orchestrator and the message façade talk to the external backend
//! exclusively through this trait, so tests can substitute an in-memory
//! implementation.  Every method takes the per-tenant credential explicitly:
//! the gateway holds no tenant state.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use waflow_shared::types::{Integration, MediaKind};

use crate::error::ProviderResult;

/// Webhook configuration for one instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    pub enabled: bool,
    pub events: Vec<String>,
}

impl WebhookConfig {
    /// The disabled configuration used to clear an instance's webhook.
    pub fn disabled() -> Self {
        Self {
            url: String::new(),
            enabled: false,
            events: Vec::new(),
        }
    }
}

/// One-call-per-operation contract against the external messaging provider.
///
/// `api_key` is the tenant's own credential when one is configured; `None`
/// falls back to the gateway's shared credential (or fails if there is
/// none).  No method retries or composes calls.
#[async_trait]
pub trait Provider: Send + Sync {
    // -- Instance lifecycle --

    async fn create_instance(
        &self,
        api_key: Option<&str>,
        name: &str,
        integration: Integration,
    ) -> ProviderResult;

    /// Live connection state for one instance.
    async fn connection_state(&self, api_key: Option<&str>, name: &str) -> ProviderResult;

    /// Pairing payload (QR code) for linking a phone; returned opaque.
    async fn pairing_code(&self, api_key: Option<&str>, name: &str) -> ProviderResult;

    async fn delete_instance(&self, api_key: Option<&str>, name: &str) -> ProviderResult;

    // -- Messaging --

    async fn send_text(
        &self,
        api_key: Option<&str>,
        name: &str,
        number: &str,
        text: &str,
    ) -> ProviderResult;

    async fn send_media(
        &self,
        api_key: Option<&str>,
        name: &str,
        number: &str,
        media_url: &str,
        kind: MediaKind,
        caption: Option<&str>,
    ) -> ProviderResult;

    async fn send_template(
        &self,
        api_key: Option<&str>,
        name: &str,
        template: &serde_json::Value,
    ) -> ProviderResult;

    // -- Webhooks --

    async fn set_webhook(
        &self,
        api_key: Option<&str>,
        name: &str,
        config: &WebhookConfig,
    ) -> ProviderResult;

    async fn get_webhook(&self, api_key: Option<&str>, name: &str) -> ProviderResult;

    // -- Chats and groups --

    async fn find_chats(
        &self,
        api_key: Option<&str>,
        name: &str,
        page: u32,
        limit: u32,
    ) -> ProviderResult;

    async fn find_messages(
        &self,
        api_key: Option<&str>,
        name: &str,
        jid: &str,
        page: u32,
        limit: u32,
    ) -> ProviderResult;

    async fn create_group(
        &self,
        api_key: Option<&str>,
        name: &str,
        subject: &str,
        participants: &[String],
    ) -> ProviderResult;

    async fn find_groups(&self, api_key: Option<&str>, name: &str) -> ProviderResult;

    // -- Profile --

    async fn update_profile_name(
        &self,
        api_key: Option<&str>,
        name: &str,
        profile_name: &str,
    ) -> ProviderResult;

    async fn update_profile_picture(
        &self,
        api_key: Option<&str>,
        name: &str,
        picture_url: &str,
    ) -> ProviderResult;
}
