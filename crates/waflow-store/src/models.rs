//! Domain model structs persisted in the tenant database.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

use waflow_shared::{Plan, PlanStatus};

/// One tenant record.
///
/// The authentication secret never lives here; identity arrives resolved
/// from the external auth layer.  `instances` is the authoritative ownership
/// set: a name is owned by exactly one tenant by virtue of appearing in
/// exactly one of these rows.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserRecord {
    /// Opaque unique identifier, immutable, assigned at creation.
    pub id: Uuid,
    pub email: String,
    /// `"user"` or `"admin"`, as reported by the auth layer.
    pub role: String,
    pub plan: Plan,
    pub plan_status: PlanStatus,
    /// End of the current billing period; refreshed on plan changes.
    pub current_period_end: DateTime<Utc>,
    /// Per-tenant provider credential, forwarded to the gateway.  Never
    /// serialized outward.
    #[serde(skip_serializing)]
    pub provider_api_key: Option<String>,
    /// Names of the instances this tenant owns.
    pub instances: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Fresh record for a newly registered tenant: free plan, active, empty
    /// instance set, 30-day billing period.
    pub fn new(id: Uuid, email: String, role: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            email,
            role,
            plan: Plan::Free,
            plan_status: PlanStatus::Active,
            current_period_end: now + Duration::days(30),
            provider_api_key: None,
            instances: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether `name` is in this tenant's owned set.
    pub fn owns(&self, name: &str) -> bool {
        self.instances.iter().any(|i| i == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_defaults() {
        let record = UserRecord::new(Uuid::new_v4(), "a@b.c".into(), "user".into());
        assert_eq!(record.plan, Plan::Free);
        assert_eq!(record.plan_status, PlanStatus::Active);
        assert!(record.instances.is_empty());
        assert!(record.current_period_end > record.created_at);
    }

    #[test]
    fn api_key_never_serialized() {
        let mut record = UserRecord::new(Uuid::new_v4(), "a@b.c".into(), "user".into());
        record.provider_api_key = Some("secret-key-123".into());
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("provider_api_key").is_none());
    }
}
