//! Messaging, chat, group and webhook operations on owned instances.
//!
//! Each operation validates its payload, checks ownership through the
//! tenant store, then forwards a single call to the provider and returns
//! the provider's payload untouched.  Nothing here is metered or counted:
//! plan message caps are advisory figures surfaced by billing, not
//! enforced on the send path.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use waflow_gateway::{Provider, WebhookConfig};
use waflow_shared::events::{MessageKind, RelayEvent};
use waflow_shared::types::MediaKind;
use waflow_shared::{validate, CoreError};

use crate::orchestrator::{authorize, provider_err, SharedDb};
use crate::relay::EventRelay;

const DEFAULT_CHAT_PAGE: u32 = 1;
const DEFAULT_CHAT_LIMIT: u32 = 20;
const DEFAULT_MESSAGE_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    #[serde(rename = "instanceName")]
    pub instance_name: String,
    pub number: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMediaRequest {
    #[serde(rename = "instanceName")]
    pub instance_name: String,
    pub number: String,
    #[serde(rename = "mediaUrl")]
    pub media_url: String,
    /// `image`, `video`, `audio` or `document`; anything else is rejected
    /// before any ownership check.
    #[serde(rename = "mediaType")]
    pub media_type: String,
    pub caption: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendTemplateRequest {
    #[serde(rename = "instanceName")]
    pub instance_name: String,
    pub template: Value,
}

#[derive(Debug, Deserialize)]
pub struct CreateGroupRequest {
    pub subject: String,
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub url: String,
    #[serde(default)]
    pub events: Vec<String>,
    /// Defaults to enabled; a disabled webhook is set via delete.
    pub enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

pub struct Messaging {
    db: SharedDb,
    provider: Arc<dyn Provider>,
    relay: EventRelay,
}

impl Messaging {
    pub fn new(db: SharedDb, provider: Arc<dyn Provider>, relay: EventRelay) -> Self {
        Self {
            db,
            provider,
            relay,
        }
    }

    pub async fn send_text(&self, user_id: Uuid, req: SendTextRequest) -> Result<Value, CoreError> {
        validate::phone_number(&req.number)?;
        validate::message_text(&req.text)?;

        let user = authorize(&self.db, user_id, &req.instance_name).await?;
        let data = self
            .provider
            .send_text(
                user.provider_api_key.as_deref(),
                &req.instance_name,
                &req.number,
                &req.text,
            )
            .await
            .map_err(provider_err)?;

        self.notify_sent(user_id, &req.instance_name, &data, MessageKind::Text)
            .await;
        Ok(data)
    }

    pub async fn send_media(
        &self,
        user_id: Uuid,
        req: SendMediaRequest,
    ) -> Result<Value, CoreError> {
        let kind = MediaKind::parse(&req.media_type).ok_or_else(|| {
            CoreError::validation(
                "Media type must be one of: image, video, audio, document",
            )
        })?;
        validate::phone_number(&req.number)?;
        validate::http_url(&req.media_url, "media")?;
        if let Some(caption) = &req.caption {
            validate::caption(caption)?;
        }

        let user = authorize(&self.db, user_id, &req.instance_name).await?;
        let data = self
            .provider
            .send_media(
                user.provider_api_key.as_deref(),
                &req.instance_name,
                &req.number,
                &req.media_url,
                kind,
                req.caption.as_deref(),
            )
            .await
            .map_err(provider_err)?;

        self.notify_sent(user_id, &req.instance_name, &data, MessageKind::Media)
            .await;
        Ok(data)
    }

    pub async fn send_template(
        &self,
        user_id: Uuid,
        req: SendTemplateRequest,
    ) -> Result<Value, CoreError> {
        validate::template(&req.template)?;

        let user = authorize(&self.db, user_id, &req.instance_name).await?;
        let data = self
            .provider
            .send_template(
                user.provider_api_key.as_deref(),
                &req.instance_name,
                &req.template,
            )
            .await
            .map_err(provider_err)?;

        self.notify_sent(user_id, &req.instance_name, &data, MessageKind::Template)
            .await;
        Ok(data)
    }

    pub async fn chats(
        &self,
        user_id: Uuid,
        instance: &str,
        query: PageQuery,
    ) -> Result<Value, CoreError> {
        let user = authorize(&self.db, user_id, instance).await?;
        self.provider
            .find_chats(
                user.provider_api_key.as_deref(),
                instance,
                query.page.unwrap_or(DEFAULT_CHAT_PAGE),
                query.limit.unwrap_or(DEFAULT_CHAT_LIMIT),
            )
            .await
            .map_err(provider_err)
    }

    pub async fn messages(
        &self,
        user_id: Uuid,
        instance: &str,
        jid: &str,
        query: PageQuery,
    ) -> Result<Value, CoreError> {
        let user = authorize(&self.db, user_id, instance).await?;
        self.provider
            .find_messages(
                user.provider_api_key.as_deref(),
                instance,
                jid,
                query.page.unwrap_or(DEFAULT_CHAT_PAGE),
                query.limit.unwrap_or(DEFAULT_MESSAGE_LIMIT),
            )
            .await
            .map_err(provider_err)
    }

    pub async fn groups(&self, user_id: Uuid, instance: &str) -> Result<Value, CoreError> {
        let user = authorize(&self.db, user_id, instance).await?;
        self.provider
            .find_groups(user.provider_api_key.as_deref(), instance)
            .await
            .map_err(provider_err)
    }

    pub async fn create_group(
        &self,
        user_id: Uuid,
        instance: &str,
        req: CreateGroupRequest,
    ) -> Result<Value, CoreError> {
        validate::group(&req.subject, &req.participants)?;

        let user = authorize(&self.db, user_id, instance).await?;
        let data = self
            .provider
            .create_group(
                user.provider_api_key.as_deref(),
                instance,
                &req.subject,
                &req.participants,
            )
            .await
            .map_err(provider_err)?;

        let group_id = string_field(&data, "groupId");
        self.relay
            .publish(
                user_id,
                RelayEvent::GroupCreated {
                    instance_name: instance.to_string(),
                    group_id,
                    status: "created",
                },
            )
            .await;
        Ok(data)
    }

    pub async fn set_webhook(
        &self,
        user_id: Uuid,
        instance: &str,
        req: WebhookRequest,
    ) -> Result<Value, CoreError> {
        validate::http_url(&req.url, "webhook")?;
        validate::webhook_events(&req.events)?;

        let user = authorize(&self.db, user_id, instance).await?;
        let config = WebhookConfig {
            url: req.url,
            enabled: req.enabled.unwrap_or(true),
            events: req.events,
        };
        self.provider
            .set_webhook(user.provider_api_key.as_deref(), instance, &config)
            .await
            .map_err(provider_err)
    }

    pub async fn get_webhook(&self, user_id: Uuid, instance: &str) -> Result<Value, CoreError> {
        let user = authorize(&self.db, user_id, instance).await?;
        self.provider
            .get_webhook(user.provider_api_key.as_deref(), instance)
            .await
            .map_err(provider_err)
    }

    /// Clearing a webhook is setting the disabled configuration.
    pub async fn delete_webhook(&self, user_id: Uuid, instance: &str) -> Result<Value, CoreError> {
        let user = authorize(&self.db, user_id, instance).await?;
        self.provider
            .set_webhook(
                user.provider_api_key.as_deref(),
                instance,
                &WebhookConfig::disabled(),
            )
            .await
            .map_err(provider_err)
    }

    async fn notify_sent(&self, user_id: Uuid, instance: &str, data: &Value, kind: MessageKind) {
        let message_id = string_field(data, "messageId");
        debug!(instance, ?kind, "message accepted by provider");
        self.relay
            .publish(
                user_id,
                RelayEvent::message_sent(instance.to_string(), message_id, kind),
            )
            .await;
    }
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    data.get(key).and_then(Value::as_str).map(String::from)
}
