//! The static subscription plan catalog.
//!
//! Plans are compiled in rather than stored; the billing flow only ever
//! moves a tenant between entries of this table.  `max_messages_per_month`
//! is advisory: nothing in the system meters message volume against it.

use serde::{Deserialize, Serialize};

/// Subscription tier a tenant is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Basic,
    Pro,
    Enterprise,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Basic => "basic",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "free" => Some(Plan::Free),
            "basic" => Some(Plan::Basic),
            "pro" => Some(Plan::Pro),
            "enterprise" => Some(Plan::Enterprise),
            _ => None,
        }
    }

    /// Catalog entry for this plan.
    pub fn details(&self) -> &'static SubscriptionPlan {
        &CATALOG[*self as usize]
    }

    /// Maximum number of instances the plan allows.
    pub fn max_instances(&self) -> usize {
        self.details().max_instances
    }
}

impl std::fmt::Display for Plan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the plan catalog.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionPlan {
    pub id: Plan,
    pub name: &'static str,
    /// Monthly price in whole currency units.
    pub price: u32,
    pub currency: &'static str,
    pub interval: &'static str,
    pub features: &'static [&'static str],
    pub max_instances: usize,
    /// Advertised cap only; no counter enforces it.
    pub max_messages_per_month: u32,
    pub webhooks: bool,
    pub api_access: bool,
}

/// All plans, indexed by `Plan as usize`.
pub static CATALOG: [SubscriptionPlan; 4] = [
    SubscriptionPlan {
        id: Plan::Free,
        name: "Free",
        price: 0,
        currency: "USD",
        interval: "month",
        features: &[
            "1 WhatsApp instance",
            "100 messages/month",
            "Basic support",
            "Standard templates",
        ],
        max_instances: 1,
        max_messages_per_month: 100,
        webhooks: false,
        api_access: false,
    },
    SubscriptionPlan {
        id: Plan::Basic,
        name: "Basic",
        price: 29,
        currency: "USD",
        interval: "month",
        features: &[
            "3 WhatsApp instances",
            "1,000 messages/month",
            "Priority support",
            "Custom templates",
            "Basic analytics",
        ],
        max_instances: 3,
        max_messages_per_month: 1_000,
        webhooks: true,
        api_access: true,
    },
    SubscriptionPlan {
        id: Plan::Pro,
        name: "Pro",
        price: 99,
        currency: "USD",
        interval: "month",
        features: &[
            "10 WhatsApp instances",
            "10,000 messages/month",
            "24/7 support",
            "Advanced templates",
            "Advanced analytics",
            "Webhook management",
            "API access",
        ],
        max_instances: 10,
        max_messages_per_month: 10_000,
        webhooks: true,
        api_access: true,
    },
    SubscriptionPlan {
        id: Plan::Enterprise,
        name: "Enterprise",
        price: 299,
        currency: "USD",
        interval: "month",
        features: &[
            "50 WhatsApp instances",
            "100,000 messages/month",
            "Dedicated support",
            "Custom integrations",
            "Advanced analytics",
            "Webhook management",
            "Full API access",
            "Custom branding",
        ],
        max_instances: 50,
        max_messages_per_month: 100_000,
        webhooks: true,
        api_access: true,
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_indexed_by_plan() {
        for plan in [Plan::Free, Plan::Basic, Plan::Pro, Plan::Enterprise] {
            assert_eq!(plan.details().id, plan);
        }
    }

    #[test]
    fn instance_limits() {
        assert_eq!(Plan::Free.max_instances(), 1);
        assert_eq!(Plan::Basic.max_instances(), 3);
        assert_eq!(Plan::Pro.max_instances(), 10);
        assert_eq!(Plan::Enterprise.max_instances(), 50);
    }

    #[test]
    fn parse_round_trip() {
        for plan in [Plan::Free, Plan::Basic, Plan::Pro, Plan::Enterprise] {
            assert_eq!(Plan::parse(plan.as_str()), Some(plan));
        }
        assert_eq!(Plan::parse("platinum"), None);
    }

    #[test]
    fn serde_lowercase() {
        assert_eq!(serde_json::to_string(&Plan::Pro).unwrap(), "\"pro\"");
        let p: Plan = serde_json::from_str("\"enterprise\"").unwrap();
        assert_eq!(p, Plan::Enterprise);
    }
}
