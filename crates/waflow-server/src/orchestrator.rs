//! Instance lifecycle coordination.
//!
//! The orchestrator is the single place where ownership checks, quota
//! checks, provider calls and tenant-store mutations meet.  The order is
//! fixed for every operation: load tenant (missing record fails first),
//! ownership/quota check, provider call, persist, then a best-effort relay
//! event.  Provider failures leave the tenant record untouched and are
//! surfaced verbatim; nothing is retried.
//!
//! Create and delete for one tenant are serialized behind a per-tenant
//! async lock held across the whole lookup-check-call-persist sequence, so
//! two concurrent creates cannot slip past the quota check together.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use waflow_gateway::{Provider, ProviderError};
use waflow_shared::events::{RelayEvent, UpdateOutcome};
use waflow_shared::types::{Instance, Integration};
use waflow_shared::{quota, validate, CoreError};
use waflow_store::{AppendOutcome, Database, StoreError, UserRecord};

use crate::relay::EventRelay;

/// The tenant database, shared across handlers.
pub type SharedDb = Arc<Mutex<Database>>;

pub(crate) fn store_err(err: StoreError) -> CoreError {
    match err {
        StoreError::NotFound => CoreError::UserNotFound,
        other => CoreError::Storage(other.to_string()),
    }
}

pub(crate) fn provider_err(err: ProviderError) -> CoreError {
    CoreError::Provider(err.to_string())
}

/// Load the tenant record and verify it owns `instance`.
///
/// The missing-record case is checked first and reported as not-found; an
/// unowned name is access-denied whether or not it exists anywhere, so a
/// caller cannot probe for other tenants' names.
pub(crate) async fn authorize(
    db: &SharedDb,
    user_id: Uuid,
    instance: &str,
) -> Result<UserRecord, CoreError> {
    let user = {
        let db = db.lock().await;
        db.get_user(user_id).map_err(store_err)?
    };
    if !user.owns(instance) {
        return Err(CoreError::AccessDenied);
    }
    Ok(user)
}

// ---------------------------------------------------------------------------
// Request / response shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    #[serde(rename = "instanceName")]
    pub instance_name: String,
    /// Defaults to WHATSAPP-BAILEYS when omitted.
    pub integration: Option<Integration>,
}

#[derive(Debug, Serialize)]
pub struct CreatedInstance {
    #[serde(rename = "instanceName")]
    pub instance_name: String,
    pub integration: Integration,
    pub status: &'static str,
    pub details: Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateInstanceRequest {
    #[serde(rename = "profileName")]
    pub profile_name: Option<String>,
    #[serde(rename = "profilePictureUrl")]
    pub profile_picture_url: Option<String>,
}

/// Outcome of one sub-update of a multi-field instance update.
#[derive(Debug, Serialize)]
pub struct FieldUpdate {
    #[serde(rename = "type")]
    pub field: &'static str,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Per-field results of an update.  Sub-updates are independent provider
/// calls; one failing never rolls the other back, so partial failure is
/// explicit here instead of hidden behind one flag.
#[derive(Debug, Serialize)]
pub struct UpdateReport {
    pub results: Vec<FieldUpdate>,
}

impl UpdateReport {
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    pub fn failed(&self) -> Vec<&FieldUpdate> {
        self.results.iter().filter(|r| !r.success).collect()
    }
}

// ---------------------------------------------------------------------------
// Per-tenant serialization
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct UserLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        let mut locks = self.inner.lock().await;
        locks.entry(user_id).or_default().clone()
    }

    /// Evict entries no operation currently holds.  An in-flight operation
    /// keeps a clone of its entry, so only idle ones are dropped.
    async fn purge_idle(&self) {
        let mut locks = self.inner.lock().await;
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct Orchestrator {
    db: SharedDb,
    provider: Arc<dyn Provider>,
    relay: EventRelay,
    locks: UserLocks,
}

impl Orchestrator {
    pub fn new(db: SharedDb, provider: Arc<dyn Provider>, relay: EventRelay) -> Self {
        Self {
            db,
            provider,
            relay,
            locks: UserLocks::default(),
        }
    }

    async fn load_user(&self, user_id: Uuid) -> Result<UserRecord, CoreError> {
        let db = self.db.lock().await;
        db.get_user(user_id).map_err(store_err)
    }

    /// Drop per-tenant lock entries with no operation in flight.
    pub async fn purge_idle_locks(&self) {
        self.locks.purge_idle().await;
    }

    #[cfg(test)]
    async fn lock_count(&self) -> usize {
        self.locks.inner.lock().await.len()
    }

    /// Create an instance: validate, quota-check, provider call, persist,
    /// notify.  On provider failure the tenant record is untouched.
    pub async fn create_instance(
        &self,
        user_id: Uuid,
        req: CreateInstanceRequest,
    ) -> Result<CreatedInstance, CoreError> {
        validate::instance_name(&req.instance_name)?;
        let integration = req.integration.unwrap_or_default();

        let lock = self.locks.acquire(user_id).await;
        let _guard = lock.lock().await;

        let user = self.load_user(user_id).await?;
        quota::check_instance_quota(user.plan, user.instances.len())?;

        let details = self
            .provider
            .create_instance(
                user.provider_api_key.as_deref(),
                &req.instance_name,
                integration,
            )
            .await
            .map_err(provider_err)?;

        let outcome = {
            let db = self.db.lock().await;
            db.append_instance(user_id, &req.instance_name, user.plan.max_instances())
                .map_err(store_err)?
        };
        // Possible only when another process raced us past the per-tenant
        // lock; the store re-checked the limit at write time.
        if let AppendOutcome::AtLimit(max) = outcome {
            return Err(CoreError::QuotaExceeded(format!(
                "Instance limit reached for {} plan. Maximum: {max}",
                user.plan
            )));
        }

        info!(user = %user_id, instance = %req.instance_name, "instance created");
        self.relay
            .publish(
                user_id,
                RelayEvent::created(req.instance_name.clone(), details.clone()),
            )
            .await;

        Ok(CreatedInstance {
            instance_name: req.instance_name,
            integration,
            status: "created",
            details,
        })
    }

    /// Live state of every owned instance.  Instances that fail to fetch
    /// are omitted rather than failing the whole listing.
    pub async fn list_instances(&self, user_id: Uuid) -> Result<Vec<Instance>, CoreError> {
        let user = self.load_user(user_id).await?;
        let key = user.provider_api_key.as_deref();

        let mut instances = Vec::with_capacity(user.instances.len());
        for name in &user.instances {
            match self.provider.connection_state(key, name).await {
                Ok(state) => instances.push(Instance {
                    name: name.clone(),
                    state,
                }),
                Err(e) => {
                    debug!(instance = %name, error = %e, "omitting instance that failed to fetch");
                }
            }
        }
        Ok(instances)
    }

    /// Live state of one owned instance.
    pub async fn get_instance(&self, user_id: Uuid, name: &str) -> Result<Instance, CoreError> {
        let user = authorize(&self.db, user_id, name).await?;
        let state = self
            .provider
            .connection_state(user.provider_api_key.as_deref(), name)
            .await
            .map_err(provider_err)?;
        Ok(Instance {
            name: name.to_string(),
            state,
        })
    }

    /// Pairing payload for linking a phone; passed through unchanged.
    pub async fn pairing_code(&self, user_id: Uuid, name: &str) -> Result<Value, CoreError> {
        let user = authorize(&self.db, user_id, name).await?;
        self.provider
            .pairing_code(user.provider_api_key.as_deref(), name)
            .await
            .map_err(provider_err)
    }

    /// Apply the requested profile sub-updates, each as its own provider
    /// call.  The instance set is never touched by an update.
    pub async fn update_instance(
        &self,
        user_id: Uuid,
        name: &str,
        req: UpdateInstanceRequest,
    ) -> Result<UpdateReport, CoreError> {
        if let Some(profile_name) = &req.profile_name {
            validate::profile_name(profile_name)?;
        }
        if let Some(url) = &req.profile_picture_url {
            validate::http_url(url, "profile picture")?;
        }

        let user = authorize(&self.db, user_id, name).await?;
        let key = user.provider_api_key.as_deref();

        let mut results = Vec::new();

        if let Some(profile_name) = &req.profile_name {
            let result = self.provider.update_profile_name(key, name, profile_name).await;
            results.push(field_update("profileName", result));
        }

        if let Some(url) = &req.profile_picture_url {
            let result = self.provider.update_profile_picture(key, name, url).await;
            results.push(field_update("profilePicture", result));
        }

        let report = UpdateReport { results };
        if report.all_succeeded() && !report.results.is_empty() {
            self.relay
                .publish(
                    user_id,
                    RelayEvent::InstanceUpdated {
                        instance_name: name.to_string(),
                        updates: report
                            .results
                            .iter()
                            .map(|r| UpdateOutcome {
                                field: r.field,
                                success: true,
                            })
                            .collect(),
                    },
                )
                .await;
        }
        Ok(report)
    }

    /// Delete an owned instance at the provider, then drop it from the
    /// tenant's set.  Ownership is checked before existence: an unowned
    /// name is access-denied, never not-found.
    pub async fn delete_instance(&self, user_id: Uuid, name: &str) -> Result<(), CoreError> {
        let lock = self.locks.acquire(user_id).await;
        let _guard = lock.lock().await;

        let user = authorize(&self.db, user_id, name).await?;

        self.provider
            .delete_instance(user.provider_api_key.as_deref(), name)
            .await
            .map_err(provider_err)?;

        {
            let db = self.db.lock().await;
            db.remove_instance(user_id, name).map_err(store_err)?;
        }

        info!(user = %user_id, instance = %name, "instance deleted");
        self.relay
            .publish(user_id, RelayEvent::deleted(name.to_string()))
            .await;
        Ok(())
    }
}

fn field_update(field: &'static str, result: Result<Value, ProviderError>) -> FieldUpdate {
    match result {
        Ok(data) => FieldUpdate {
            field,
            success: true,
            error: None,
            data: Some(data),
        },
        Err(e) => FieldUpdate {
            field,
            success: false,
            error: Some(e.to_string()),
            data: None,
        },
    }
}
