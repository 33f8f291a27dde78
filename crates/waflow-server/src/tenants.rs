//! Tenant provisioning, profile settings and account stats.
//!
//! Registration is idempotent on the resolved identity: the first request
//! for an id creates the free-plan record, later ones return the existing
//! record unchanged.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use waflow_shared::{validate, CoreError};
use waflow_store::{StoreError, UserRecord};

use crate::auth::AuthIdentity;
use crate::orchestrator::{store_err, SharedDb};

#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    /// The tenant's own provider credential.  An empty string clears it,
    /// falling back to the gateway's shared credential.
    #[serde(rename = "providerApiKey")]
    pub provider_api_key: Option<String>,
}

pub struct Tenants {
    db: SharedDb,
}

impl Tenants {
    pub fn new(db: SharedDb) -> Self {
        Self { db }
    }

    /// Ensure a record exists for this identity.  Returns the record and
    /// whether it was created by this call.
    pub async fn register(&self, identity: &AuthIdentity) -> Result<(UserRecord, bool), CoreError> {
        let db = self.db.lock().await;
        let user = UserRecord::new(
            identity.user_id,
            identity.email.clone(),
            identity.role.clone(),
        );
        match db.create_user(&user) {
            Ok(()) => {
                info!(user = %identity.user_id, "tenant registered");
                Ok((user, true))
            }
            Err(StoreError::AlreadyExists) => {
                let existing = db.get_user(identity.user_id).map_err(store_err)?;
                Ok((existing, false))
            }
            // Same email under a different id is a distinct identity, not
            // a repeat registration.
            Err(StoreError::EmailTaken) => {
                Err(CoreError::validation("Email already registered"))
            }
            Err(other) => Err(store_err(other)),
        }
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<UserRecord, CoreError> {
        if let Some(raw) = &req.provider_api_key {
            let key = raw.trim();
            let db = self.db.lock().await;
            if key.is_empty() {
                db.update_provider_api_key(user_id, None).map_err(store_err)?;
            } else {
                validate::provider_api_key(key)?;
                db.update_provider_api_key(user_id, Some(key))
                    .map_err(store_err)?;
            }
            return db.get_user(user_id).map_err(store_err);
        }

        let db = self.db.lock().await;
        db.get_user(user_id).map_err(store_err)
    }

    /// Account stats: instance usage against the plan's limits.
    pub async fn stats(&self, user_id: Uuid) -> Result<Value, CoreError> {
        let user = {
            let db = self.db.lock().await;
            db.get_user(user_id).map_err(store_err)?
        };
        let details = user.plan.details();
        Ok(json!({
            "totalInstances": user.instances.len(),
            "instances": user.instances,
            "subscription": {
                "plan": user.plan,
                "status": user.plan_status,
                "currentPeriodEnd": user.current_period_end,
            },
            "planLimits": {
                "maxInstances": details.max_instances,
                "maxMessagesPerMonth": details.max_messages_per_month,
                "webhooks": details.webhooks,
                "apiAccess": details.api_access,
            },
            "createdAt": user.created_at,
        }))
    }
}
