use serde::{Deserialize, Serialize};

/// Messaging backend an instance is paired with.  Fixed at creation time;
/// no update path changes it afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Integration {
    #[default]
    #[serde(rename = "WHATSAPP-BAILEYS")]
    WhatsappBaileys,
    #[serde(rename = "WHATSAPP-WEBJS")]
    WhatsappWebjs,
    #[serde(rename = "TELEGRAM")]
    Telegram,
}

impl Integration {
    pub fn as_str(&self) -> &'static str {
        match self {
            Integration::WhatsappBaileys => "WHATSAPP-BAILEYS",
            Integration::WhatsappWebjs => "WHATSAPP-WEBJS",
            Integration::Telegram => "TELEGRAM",
        }
    }
}

impl std::fmt::Display for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Billing state of a tenant's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Active,
    Cancelled,
    PastDue,
}

impl PlanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanStatus::Active => "active",
            PlanStatus::Cancelled => "cancelled",
            PlanStatus::PastDue => "past_due",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PlanStatus::Active),
            "cancelled" => Some(PlanStatus::Cancelled),
            "past_due" => Some(PlanStatus::PastDue),
            _ => None,
        }
    }
}

/// A live view of an owned instance, assembled from the provider's
/// connection-state response.  Never persisted; the durable record is just
/// the name inside the owner's instance set.
#[derive(Debug, Clone, Serialize)]
pub struct Instance {
    pub name: String,
    /// Raw connection-state payload from the provider (status, pairing
    /// details, profile fields -- whatever the backend returns).
    #[serde(flatten)]
    pub state: serde_json::Value,
}

/// Media attachment kinds accepted by the send-media operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Audio => "audio",
            MediaKind::Document => "document",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            "document" => Some(MediaKind::Document),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integration_serde_wire_names() {
        let json = serde_json::to_string(&Integration::WhatsappBaileys).unwrap();
        assert_eq!(json, "\"WHATSAPP-BAILEYS\"");
        let back: Integration = serde_json::from_str("\"TELEGRAM\"").unwrap();
        assert_eq!(back, Integration::Telegram);
    }

    #[test]
    fn integration_defaults_to_baileys() {
        assert_eq!(Integration::default(), Integration::WhatsappBaileys);
    }

    #[test]
    fn plan_status_round_trip() {
        for status in [PlanStatus::Active, PlanStatus::Cancelled, PlanStatus::PastDue] {
            assert_eq!(PlanStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PlanStatus::parse("trialing"), None);
    }

    #[test]
    fn media_kind_parse() {
        assert_eq!(MediaKind::parse("image"), Some(MediaKind::Image));
        assert_eq!(MediaKind::parse("gif"), None);
    }
}
