use thiserror::Error;

/// Failures produced by the provider gateway.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider answered with a failure status; the message is the
    /// provider's own when it sent one, otherwise a per-operation fallback.
    #[error("{0}")]
    Api(String),

    /// The request never completed: connect failure, timeout, or a body
    /// that could not be read.
    #[error("Provider request failed: {0}")]
    Transport(String),

    /// Neither the tenant nor the gateway has a provider credential.
    #[error("No provider API key configured")]
    Unconfigured,

    /// The configured base URL or a path segment was not a valid URL.
    #[error("Invalid provider URL: {0}")]
    Url(String),
}

impl ProviderError {
    /// The message a caller should surface, matching the uniform failure
    /// shape: provider message when available, else the transport text.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Result alias for all gateway operations.  Success payloads are passed
/// through as raw JSON; the gateway never reshapes them.
pub type ProviderResult = Result<serde_json::Value, ProviderError>;
