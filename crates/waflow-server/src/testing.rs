//! In-memory provider and fixtures shared by the server test modules.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use uuid::Uuid;

use waflow_gateway::{Provider, ProviderError, ProviderResult, WebhookConfig};
use waflow_shared::types::{Integration, MediaKind};
use waflow_shared::{Plan, PlanStatus};
use waflow_store::{Database, UserRecord};

use crate::orchestrator::{Orchestrator, SharedDb};
use crate::relay::EventRelay;

/// Scriptable stand-in for the external backend.  Records every call and
/// fails on demand, per method or per instance name.
#[derive(Default)]
pub struct MockProvider {
    calls: Mutex<HashMap<&'static str, usize>>,
    failing_methods: Mutex<HashSet<&'static str>>,
    failing_states: Mutex<HashSet<String>>,
    create_failures: AtomicUsize,
}

impl MockProvider {
    /// Calls recorded for one trait method.
    pub fn count(&self, method: &str) -> usize {
        *self.calls.lock().unwrap().get(method).unwrap_or(&0)
    }

    /// Make the next `n` create calls fail, then succeed again.
    pub fn fail_next_creates(&self, n: usize) {
        self.create_failures.store(n, Ordering::SeqCst);
    }

    /// Toggle failure for one trait method by name.
    pub fn fail_method(&self, method: &'static str, fail: bool) {
        let mut failing = self.failing_methods.lock().unwrap();
        if fail {
            failing.insert(method);
        } else {
            failing.remove(method);
        }
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_method("delete_instance", fail);
    }

    pub fn fail_picture_updates(&self, fail: bool) {
        self.fail_method("update_profile_picture", fail);
    }

    /// Make connection-state fetches for one instance fail.
    pub fn fail_state_for(&self, name: &str) {
        self.failing_states.lock().unwrap().insert(name.to_string());
    }

    fn record(&self, method: &'static str) -> Result<(), ProviderError> {
        *self.calls.lock().unwrap().entry(method).or_insert(0) += 1;
        if self.failing_methods.lock().unwrap().contains(method) {
            return Err(ProviderError::Api(format!("{method} failed")));
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn create_instance(
        &self,
        _api_key: Option<&str>,
        name: &str,
        integration: Integration,
    ) -> ProviderResult {
        self.record("create_instance")?;
        if self
            .create_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ProviderError::Api("Instance creation failed".into()));
        }
        Ok(json!({
            "instance": { "instanceName": name, "integration": integration.as_str() },
            "hash": { "apikey": format!("{name}_key") },
        }))
    }

    async fn connection_state(&self, _api_key: Option<&str>, name: &str) -> ProviderResult {
        self.record("connection_state")?;
        if self.failing_states.lock().unwrap().contains(name) {
            return Err(ProviderError::Api("Instance not found".into()));
        }
        Ok(json!({ "state": "open" }))
    }

    async fn pairing_code(&self, _api_key: Option<&str>, _name: &str) -> ProviderResult {
        self.record("pairing_code")?;
        Ok(json!({ "qrcode": { "base64": "data:image/png;base64,AAA=" } }))
    }

    async fn delete_instance(&self, _api_key: Option<&str>, _name: &str) -> ProviderResult {
        self.record("delete_instance")?;
        Ok(json!({ "status": "SUCCESS" }))
    }

    async fn send_text(
        &self,
        _api_key: Option<&str>,
        _name: &str,
        number: &str,
        _text: &str,
    ) -> ProviderResult {
        self.record("send_text")?;
        Ok(json!({ "messageId": format!("msg-{number}"), "status": "PENDING" }))
    }

    async fn send_media(
        &self,
        _api_key: Option<&str>,
        _name: &str,
        _number: &str,
        _media_url: &str,
        kind: MediaKind,
        _caption: Option<&str>,
    ) -> ProviderResult {
        self.record("send_media")?;
        Ok(json!({ "messageId": "msg-media", "mediatype": kind.as_str() }))
    }

    async fn send_template(
        &self,
        _api_key: Option<&str>,
        _name: &str,
        _template: &Value,
    ) -> ProviderResult {
        self.record("send_template")?;
        Ok(json!({ "messageId": "msg-template" }))
    }

    async fn set_webhook(
        &self,
        _api_key: Option<&str>,
        _name: &str,
        config: &WebhookConfig,
    ) -> ProviderResult {
        self.record("set_webhook")?;
        Ok(json!({ "webhook": { "url": config.url, "enabled": config.enabled } }))
    }

    async fn get_webhook(&self, _api_key: Option<&str>, _name: &str) -> ProviderResult {
        self.record("get_webhook")?;
        Ok(json!({ "url": "https://hooks.example.com/wh", "enabled": true }))
    }

    async fn find_chats(
        &self,
        _api_key: Option<&str>,
        _name: &str,
        page: u32,
        limit: u32,
    ) -> ProviderResult {
        self.record("find_chats")?;
        Ok(json!({ "chats": [], "page": page, "limit": limit }))
    }

    async fn find_messages(
        &self,
        _api_key: Option<&str>,
        _name: &str,
        jid: &str,
        _page: u32,
        _limit: u32,
    ) -> ProviderResult {
        self.record("find_messages")?;
        Ok(json!({ "messages": [], "jid": jid }))
    }

    async fn create_group(
        &self,
        _api_key: Option<&str>,
        _name: &str,
        subject: &str,
        participants: &[String],
    ) -> ProviderResult {
        self.record("create_group")?;
        Ok(json!({
            "groupId": "grp-1",
            "subject": subject,
            "size": participants.len(),
        }))
    }

    async fn find_groups(&self, _api_key: Option<&str>, _name: &str) -> ProviderResult {
        self.record("find_groups")?;
        Ok(json!({ "groups": [] }))
    }

    async fn update_profile_name(
        &self,
        _api_key: Option<&str>,
        _name: &str,
        profile_name: &str,
    ) -> ProviderResult {
        self.record("update_profile_name")?;
        Ok(json!({ "name": profile_name }))
    }

    async fn update_profile_picture(
        &self,
        _api_key: Option<&str>,
        _name: &str,
        picture_url: &str,
    ) -> ProviderResult {
        self.record("update_profile_picture")?;
        Ok(json!({ "picture": picture_url }))
    }
}

/// Orchestrator over an in-memory database and the given provider.
pub fn setup(provider: Arc<MockProvider>) -> (Orchestrator, SharedDb, EventRelay) {
    let db: SharedDb = Arc::new(tokio::sync::Mutex::new(
        Database::open_in_memory().expect("in-memory db"),
    ));
    let relay = EventRelay::new();
    let orch = Orchestrator::new(db.clone(), provider, relay.clone());
    (orch, db, relay)
}

/// Insert a tenant on the given plan and return its id.
pub async fn seed_user(db: &SharedDb, plan: Plan) -> Uuid {
    let user = UserRecord::new(Uuid::new_v4(), "tenant@example.com".into(), "user".into());
    let id = user.id;
    let guard = db.lock().await;
    guard.create_user(&user).expect("create user");
    if plan != Plan::Free {
        guard
            .update_subscription(id, plan, PlanStatus::Active, user.current_period_end)
            .expect("set plan");
    }
    id
}
