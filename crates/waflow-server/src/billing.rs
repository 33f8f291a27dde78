//! Plan catalog and subscription management.
//!
//! There is no payment processor here: a plan change takes effect
//! immediately, sets the subscription active and opens a fresh 30-day
//! billing period.  The only gate is the downgrade check against the
//! tenant's current instance count.

use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use waflow_shared::{quota, CoreError, Plan, PlanStatus, SubscriptionPlan};
use waflow_store::UserRecord;

use crate::orchestrator::{store_err, SharedDb};

pub const BILLING_PERIOD_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct ChangePlanRequest {
    pub plan: Plan,
}

pub struct Billing {
    db: SharedDb,
}

impl Billing {
    pub fn new(db: SharedDb) -> Self {
        Self { db }
    }

    /// The full plan catalog.
    pub fn plans(&self) -> &'static [SubscriptionPlan] {
        &waflow_shared::plans::CATALOG
    }

    /// Current subscription plus usage figures for one tenant.
    pub async fn subscription(&self, user_id: Uuid) -> Result<Value, CoreError> {
        let user = {
            let db = self.db.lock().await;
            db.get_user(user_id).map_err(store_err)?
        };
        Ok(overview(&user))
    }

    /// Move the tenant to `plan`.  Downgrades are denied while the tenant
    /// owns more instances than the target plan allows.
    pub async fn change_plan(
        &self,
        user_id: Uuid,
        req: ChangePlanRequest,
    ) -> Result<Value, CoreError> {
        let db = self.db.lock().await;
        let user = db.get_user(user_id).map_err(store_err)?;

        quota::check_downgrade(req.plan, user.instances.len())?;

        let period_end = Utc::now() + Duration::days(BILLING_PERIOD_DAYS);
        db.update_subscription(user_id, req.plan, PlanStatus::Active, period_end)
            .map_err(store_err)?;
        info!(user = %user_id, plan = %req.plan, "subscription changed");

        let updated = db.get_user(user_id).map_err(store_err)?;
        Ok(overview(&updated))
    }
}

fn overview(user: &UserRecord) -> Value {
    let details = user.plan.details();
    json!({
        "plan": details,
        "status": user.plan_status,
        "currentPeriodEnd": user.current_period_end,
        "usage": {
            "instances": user.instances.len(),
            "maxInstances": details.max_instances,
            // Message volume is not metered; the cap is advisory.
            "messagesThisMonth": 0,
            "maxMessagesPerMonth": details.max_messages_per_month,
        },
    })
}
