use thiserror::Error;

/// The failure taxonomy every core operation reports in.
///
/// Validation and access failures are resolved locally and never reach the
/// provider gateway.  Provider failures carry the backend's message verbatim
/// when one was available and are never retried or reclassified.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input, rejected before any side effect.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Identity resolved but no tenant record exists.
    #[error("User not found")]
    UserNotFound,

    /// Operation targets an instance name outside the caller's owned set.
    /// Deliberately covers both "not yours" and "does not exist" so that
    /// probing cannot distinguish the two.
    #[error("Access denied to this instance")]
    AccessDenied,

    /// Plan limit reached or a downgrade blocked; the message names the
    /// plan and the numeric limit.
    #[error("{0}")]
    QuotaExceeded(String),

    /// The external messaging provider failed or was unreachable.
    #[error("{0}")]
    Provider(String),

    /// Tenant store failure (surfaced as an internal error outward).
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        CoreError::Validation(msg.into())
    }
}
