//! Relay event payloads pushed to a tenant's live sessions.
//!
//! Delivery is best-effort and at-most-once: events are fanned out to
//! whoever is subscribed at push time and are never buffered or replayed.

use serde::Serialize;

/// Kind of message that was sent, echoed in `message-sent` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Media,
    Template,
}

/// Per-field outcome of a multi-field instance update.
#[derive(Debug, Clone, Serialize)]
pub struct UpdateOutcome {
    /// `"profileName"` or `"profilePicture"`.
    #[serde(rename = "type")]
    pub field: &'static str,
    pub success: bool,
}

/// A state-change notification for one tenant.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayEvent {
    InstanceCreated {
        #[serde(rename = "instanceName")]
        instance_name: String,
        status: &'static str,
        data: serde_json::Value,
    },
    InstanceDeleted {
        #[serde(rename = "instanceName")]
        instance_name: String,
        status: &'static str,
    },
    InstanceUpdated {
        #[serde(rename = "instanceName")]
        instance_name: String,
        updates: Vec<UpdateOutcome>,
    },
    MessageSent {
        #[serde(rename = "instanceName")]
        instance_name: String,
        #[serde(rename = "messageId")]
        message_id: Option<String>,
        status: &'static str,
        kind: MessageKind,
    },
    GroupCreated {
        #[serde(rename = "instanceName")]
        instance_name: String,
        #[serde(rename = "groupId")]
        group_id: Option<String>,
        status: &'static str,
    },
}

impl RelayEvent {
    pub fn created(instance_name: String, data: serde_json::Value) -> Self {
        RelayEvent::InstanceCreated {
            instance_name,
            status: "created",
            data,
        }
    }

    pub fn deleted(instance_name: String) -> Self {
        RelayEvent::InstanceDeleted {
            instance_name,
            status: "deleted",
        }
    }

    pub fn message_sent(instance_name: String, message_id: Option<String>, kind: MessageKind) -> Self {
        RelayEvent::MessageSent {
            instance_name,
            message_id,
            status: "sent",
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_tagged_with_kebab_case_type() {
        let event = RelayEvent::created("bot1".into(), serde_json::json!({}));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "instance-created");
        assert_eq!(json["instanceName"], "bot1");
        assert_eq!(json["status"], "created");
    }

    #[test]
    fn message_sent_carries_kind() {
        let event = RelayEvent::message_sent("bot1".into(), Some("abc".into()), MessageKind::Media);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "message-sent");
        assert_eq!(json["kind"], "media");
        assert_eq!(json["messageId"], "abc");
    }
}
