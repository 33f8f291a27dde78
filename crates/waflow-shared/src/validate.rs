//! Input validation, run before any ownership check or provider call.
//!
//! Every helper returns [`CoreError::Validation`] with a human-readable
//! message; none of them has side effects.

use url::Url;

use crate::error::CoreError;

/// Webhook event names the provider understands.
pub const WEBHOOK_EVENTS: &[&str] = &[
    "APPLICATION_STARTUP",
    "QRCODE_UPDATED",
    "CONNECTION_UPDATE",
    "MESSAGES_UPSERT",
    "MESSAGES_UPDATE",
    "MESSAGES_DELETE",
    "SEND_MESSAGE",
    "CONTACTS_SET",
    "CONTACTS_UPSERT",
    "CONTACTS_UPDATE",
    "PRESENCE_UPDATE",
    "CHATS_SET",
    "CHATS_UPSERT",
    "CHATS_UPDATE",
    "CHATS_DELETE",
    "GROUPS_UPSERT",
    "GROUP_UPDATE",
    "GROUP_PARTICIPANTS_UPDATE",
];

pub const MAX_TEXT_LEN: usize = 4096;
pub const MAX_CAPTION_LEN: usize = 1024;

/// Instance names: 3-50 characters from `[A-Za-z0-9_-]`.
pub fn instance_name(name: &str) -> Result<(), CoreError> {
    if name.len() < 3 || name.len() > 50 {
        return Err(CoreError::validation(
            "Instance name must be between 3 and 50 characters",
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(CoreError::validation(
            "Instance name can only contain letters, numbers, underscores, and hyphens",
        ));
    }
    Ok(())
}

/// Phone numbers: optional leading `+`, then 7-15 digits.
pub fn phone_number(number: &str) -> Result<(), CoreError> {
    let digits = number.strip_prefix('+').unwrap_or(number);
    if digits.len() < 7 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(CoreError::validation("Valid phone number is required"));
    }
    Ok(())
}

/// Message text: 1-4096 characters.
pub fn message_text(text: &str) -> Result<(), CoreError> {
    if text.is_empty() || text.chars().count() > MAX_TEXT_LEN {
        return Err(CoreError::validation(format!(
            "Message text must be between 1 and {MAX_TEXT_LEN} characters"
        )));
    }
    Ok(())
}

/// Optional media caption: at most 1024 characters.
pub fn caption(caption: &str) -> Result<(), CoreError> {
    if caption.chars().count() > MAX_CAPTION_LEN {
        return Err(CoreError::validation(format!(
            "Caption must be less than {MAX_CAPTION_LEN} characters"
        )));
    }
    Ok(())
}

/// An absolute http(s) URL (media attachments, webhook targets, profile
/// pictures).
pub fn http_url(value: &str, what: &str) -> Result<(), CoreError> {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Ok(()),
        _ => Err(CoreError::validation(format!("Valid {what} URL is required"))),
    }
}

/// Webhook event subscription list: every entry must be a known event name.
pub fn webhook_events(events: &[String]) -> Result<(), CoreError> {
    for event in events {
        if !WEBHOOK_EVENTS.contains(&event.as_str()) {
            return Err(CoreError::validation(format!(
                "Invalid event type: {event}"
            )));
        }
    }
    Ok(())
}

/// Group descriptors need a non-empty subject and a participant list.
pub fn group(subject: &str, participants: &[String]) -> Result<(), CoreError> {
    if subject.trim().is_empty() {
        return Err(CoreError::validation("Group subject is required"));
    }
    if participants.is_empty() {
        return Err(CoreError::validation("Participants must be a non-empty array"));
    }
    for p in participants {
        phone_number(p)?;
    }
    Ok(())
}

/// Template payloads are opaque but must at least be JSON objects.
pub fn template(data: &serde_json::Value) -> Result<(), CoreError> {
    if !data.is_object() {
        return Err(CoreError::validation("Template data is required"));
    }
    Ok(())
}

/// Instance profile display names: 1-100 characters.
pub fn profile_name(name: &str) -> Result<(), CoreError> {
    let len = name.chars().count();
    if len == 0 || len > 100 {
        return Err(CoreError::validation(
            "Profile name must be between 1 and 100 characters",
        ));
    }
    Ok(())
}

/// Tenant provider API keys: at least 10 characters.
pub fn provider_api_key(key: &str) -> Result<(), CoreError> {
    if key.len() < 10 {
        return Err(CoreError::validation(
            "Provider API key must be at least 10 characters",
        ));
    }
    Ok(())
}
