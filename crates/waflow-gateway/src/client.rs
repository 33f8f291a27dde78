//! HTTP implementation of the [`Provider`] trait on reqwest.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

use waflow_shared::types::{Integration, MediaKind};

use crate::error::{ProviderError, ProviderResult};
use crate::provider::{Provider, WebhookConfig};

/// Fixed timeout shared by every outbound call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Gateway construction parameters.
///
/// `shared_api_key` is an explicit opt-in: when set, tenants without a
/// credential of their own fall back to it.  This is meant for
/// single-tenant and demo deployments; a multi-tenant production setup
/// should leave it `None` so that tenants are never silently mixed onto
/// one provider credential.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base endpoint of the messaging provider, e.g. `https://evo.example.com`.
    pub base_url: String,
    /// Optional shared demo credential (see above).
    pub shared_api_key: Option<String>,
}

/// Stateless reqwest-backed gateway.  Holds only the base endpoint, the
/// optional shared credential, and a connection pool.
pub struct ProviderClient {
    base_url: Url,
    shared_api_key: Option<String>,
    http: reqwest::Client,
}

impl ProviderClient {
    pub fn new(config: GatewayConfig) -> Result<Self, ProviderError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| ProviderError::Url(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        Ok(Self {
            base_url,
            shared_api_key: config.shared_api_key,
            http,
        })
    }

    /// Tenant credential, else the shared one, else a hard failure before
    /// any request goes out.
    fn credential<'a>(&'a self, api_key: Option<&'a str>) -> Result<&'a str, ProviderError> {
        api_key
            .or(self.shared_api_key.as_deref())
            .ok_or(ProviderError::Unconfigured)
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ProviderError::Url("base URL cannot be a base".into()))?;
            path.pop_if_empty();
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    /// Issue one call and normalize the outcome into the uniform shape.
    async fn call(
        &self,
        method: Method,
        segments: &[&str],
        api_key: Option<&str>,
        query: &[(&str, String)],
        body: Option<Value>,
        fallback: &str,
    ) -> ProviderResult {
        let key = self.credential(api_key)?;
        let url = self.endpoint(segments)?;

        debug!(method = %method, url = %url, "provider request");

        let mut req = self
            .http
            .request(method, url)
            .header("apikey", key)
            .bearer_auth(key);
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "provider request failed to complete");
                return Err(ProviderError::Transport(e.to_string()));
            }
        };

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;
        let payload: Value = serde_json::from_str(&text).unwrap_or(Value::Null);

        if status.is_success() {
            debug!(status = %status, "provider response");
            return Ok(payload);
        }

        let message = embedded_message(&payload).unwrap_or_else(|| fallback.to_string());
        warn!(status = %status, message = %message, "provider returned failure");
        Err(ProviderError::Api(message))
    }
}

/// Pull the provider's own error message out of a failure body, if present.
///
/// The backend reports errors as `{"message": ...}` (a string or an array
/// of strings) or occasionally `{"error": "..."}`.
fn embedded_message(payload: &Value) -> Option<String> {
    match payload.get("message") {
        Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
        Some(Value::Array(parts)) => {
            let joined: Vec<&str> = parts.iter().filter_map(|p| p.as_str()).collect();
            if !joined.is_empty() {
                return Some(joined.join("; "));
            }
        }
        _ => {}
    }
    match payload.get("error") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[async_trait]
impl Provider for ProviderClient {
    async fn create_instance(
        &self,
        api_key: Option<&str>,
        name: &str,
        integration: Integration,
    ) -> ProviderResult {
        let body = json!({
            "instanceName": name,
            "integration": integration,
            "token": format!("{name}_token_{}", chrono::Utc::now().timestamp_millis()),
        });
        self.call(
            Method::POST,
            &["instance", "create"],
            api_key,
            &[],
            Some(body),
            "Failed to create instance",
        )
        .await
    }

    async fn connection_state(&self, api_key: Option<&str>, name: &str) -> ProviderResult {
        self.call(
            Method::GET,
            &["instance", "connectionState", name],
            api_key,
            &[],
            None,
            "Failed to get instance",
        )
        .await
    }

    async fn pairing_code(&self, api_key: Option<&str>, name: &str) -> ProviderResult {
        self.call(
            Method::GET,
            &["instance", "connect", name],
            api_key,
            &[],
            None,
            "Failed to get QR code",
        )
        .await
    }

    async fn delete_instance(&self, api_key: Option<&str>, name: &str) -> ProviderResult {
        self.call(
            Method::DELETE,
            &["instance", "delete", name],
            api_key,
            &[],
            None,
            "Failed to delete instance",
        )
        .await
    }

    async fn send_text(
        &self,
        api_key: Option<&str>,
        name: &str,
        number: &str,
        text: &str,
    ) -> ProviderResult {
        let body = json!({
            "number": number,
            "textMessage": { "text": text },
        });
        self.call(
            Method::POST,
            &["message", "sendText", name],
            api_key,
            &[],
            Some(body),
            "Failed to send message",
        )
        .await
    }

    async fn send_media(
        &self,
        api_key: Option<&str>,
        name: &str,
        number: &str,
        media_url: &str,
        kind: MediaKind,
        caption: Option<&str>,
    ) -> ProviderResult {
        let mut media = serde_json::Map::new();
        media.insert("media".into(), json!(media_url));
        media.insert("type".into(), json!(kind));
        if let Some(caption) = caption {
            media.insert("caption".into(), json!(caption));
        }
        let body = json!({
            "number": number,
            "mediaMessage": media,
        });
        self.call(
            Method::POST,
            &["message", "sendMedia", name],
            api_key,
            &[],
            Some(body),
            "Failed to send media message",
        )
        .await
    }

    async fn send_template(
        &self,
        api_key: Option<&str>,
        name: &str,
        template: &Value,
    ) -> ProviderResult {
        self.call(
            Method::POST,
            &["message", "sendTemplate", name],
            api_key,
            &[],
            Some(template.clone()),
            "Failed to send template message",
        )
        .await
    }

    async fn set_webhook(
        &self,
        api_key: Option<&str>,
        name: &str,
        config: &WebhookConfig,
    ) -> ProviderResult {
        let body = json!({
            "url": config.url,
            "enabled": config.enabled,
            "events": config.events,
            "webhook_by_events": true,
        });
        self.call(
            Method::POST,
            &["webhook", "set", name],
            api_key,
            &[],
            Some(body),
            "Failed to set webhook",
        )
        .await
    }

    async fn get_webhook(&self, api_key: Option<&str>, name: &str) -> ProviderResult {
        self.call(
            Method::GET,
            &["webhook", "find", name],
            api_key,
            &[],
            None,
            "Failed to get webhook",
        )
        .await
    }

    async fn find_chats(
        &self,
        api_key: Option<&str>,
        name: &str,
        page: u32,
        limit: u32,
    ) -> ProviderResult {
        self.call(
            Method::GET,
            &["chat", "findChats", name],
            api_key,
            &[("page", page.to_string()), ("limit", limit.to_string())],
            None,
            "Failed to get chats",
        )
        .await
    }

    async fn find_messages(
        &self,
        api_key: Option<&str>,
        name: &str,
        jid: &str,
        page: u32,
        limit: u32,
    ) -> ProviderResult {
        self.call(
            Method::GET,
            &["chat", "findMessages", name],
            api_key,
            &[
                ("jid", jid.to_string()),
                ("page", page.to_string()),
                ("limit", limit.to_string()),
            ],
            None,
            "Failed to get messages",
        )
        .await
    }

    async fn create_group(
        &self,
        api_key: Option<&str>,
        name: &str,
        subject: &str,
        participants: &[String],
    ) -> ProviderResult {
        let body = json!({
            "subject": subject,
            "participants": participants,
        });
        self.call(
            Method::POST,
            &["group", "create", name],
            api_key,
            &[],
            Some(body),
            "Failed to create group",
        )
        .await
    }

    async fn find_groups(&self, api_key: Option<&str>, name: &str) -> ProviderResult {
        self.call(
            Method::GET,
            &["group", "findGroups", name],
            api_key,
            &[],
            None,
            "Failed to get groups",
        )
        .await
    }

    async fn update_profile_name(
        &self,
        api_key: Option<&str>,
        name: &str,
        profile_name: &str,
    ) -> ProviderResult {
        self.call(
            Method::PUT,
            &["chat", "updateProfileName", name],
            api_key,
            &[],
            Some(json!({ "name": profile_name })),
            "Failed to update profile",
        )
        .await
    }

    async fn update_profile_picture(
        &self,
        api_key: Option<&str>,
        name: &str,
        picture_url: &str,
    ) -> ProviderResult {
        self.call(
            Method::PUT,
            &["chat", "updateProfilePicture", name],
            api_key,
            &[],
            Some(json!({ "url": picture_url })),
            "Failed to update profile picture",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(shared: Option<&str>) -> ProviderClient {
        ProviderClient::new(GatewayConfig {
            base_url: "https://evo.example.com".into(),
            shared_api_key: shared.map(String::from),
        })
        .unwrap()
    }

    #[test]
    fn credential_prefers_tenant_key() {
        let c = client(Some("shared-key"));
        assert_eq!(c.credential(Some("tenant-key")).unwrap(), "tenant-key");
        assert_eq!(c.credential(None).unwrap(), "shared-key");
    }

    #[test]
    fn missing_credential_fails_before_any_request() {
        let c = client(None);
        assert!(matches!(
            c.credential(None),
            Err(ProviderError::Unconfigured)
        ));
    }

    #[test]
    fn endpoint_joins_segments() {
        let c = client(Some("k"));
        let url = c
            .endpoint(&["instance", "connectionState", "bot1"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://evo.example.com/instance/connectionState/bot1"
        );
    }

    #[test]
    fn endpoint_escapes_hostile_segments() {
        let c = client(Some("k"));
        let url = c.endpoint(&["instance", "delete", "a/../b"]).unwrap();
        // The name lands as one encoded segment, not extra path components.
        assert!(url.path().ends_with("/instance/delete/a%2F..%2Fb"));
    }

    #[test]
    fn embedded_message_prefers_string_message() {
        let payload = json!({ "message": "Instance already exists", "error": "other" });
        assert_eq!(
            embedded_message(&payload).as_deref(),
            Some("Instance already exists")
        );
    }

    #[test]
    fn embedded_message_joins_array() {
        let payload = json!({ "message": ["bad name", "too short"] });
        assert_eq!(
            embedded_message(&payload).as_deref(),
            Some("bad name; too short")
        );
    }

    #[test]
    fn embedded_message_falls_back_to_error_field() {
        let payload = json!({ "error": "boom" });
        assert_eq!(embedded_message(&payload).as_deref(), Some("boom"));
        assert_eq!(embedded_message(&json!({})), None);
        assert_eq!(embedded_message(&Value::Null), None);
    }

    #[test]
    fn invalid_base_url_rejected() {
        let result = ProviderClient::new(GatewayConfig {
            base_url: "not a url".into(),
            shared_api_key: None,
        });
        assert!(matches!(result, Err(ProviderError::Url(_))));
    }
}
