//! Error types shared by the core and every provider crate.

use std::time::Duration;

/// Errors from a provider call (transport, HTTP status, or stream payload).
///
/// A provider error always ends the current conversation loop; nothing in
/// this crate retries. [`ProviderError::is_retryable`] is informational for
/// callers that want to resubmit on their own.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Network-level error (connection reset, DNS failure, etc.).
    #[error("network error: {0}")]
    Network(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Rate limited by the provider.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit {
        /// Suggested retry delay, if the provider gave one.
        retry_after: Option<Duration>,
    },
    /// Request timed out.
    #[error("timeout after {0:?}")]
    Timeout(Duration),
    /// Provider service is temporarily unavailable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Authentication/authorization failure.
    #[error("authentication failed: {0}")]
    Authentication(String),
    /// Malformed request, or missing configuration for building one.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    /// Requested model or deployment does not exist.
    #[error("model not found: {0}")]
    ModelNotFound(String),
    /// The response stream broke or carried an error payload.
    #[error("stream error: {0}")]
    Stream(String),
    /// Any other provider error.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
    /// Whether this error is likely transient.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::RateLimit { .. } | Self::Timeout(_) | Self::ServiceUnavailable(_)
        )
    }
}

/// Errors from registering or dispatching actions.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    /// No action with this name is registered.
    #[error("action not found: {0}")]
    NotFound(String),
    /// An action with this name is already registered.
    #[error("duplicate action name: {0}")]
    Duplicate(String),
    /// The action handler itself failed.
    #[error("action failed: {0}")]
    Failed(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ActionError {
    /// Build an [`ActionError::Failed`] from a plain message.
    pub fn failed(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Failed(message.into())
    }
}

/// Errors converting a provider-native message back into a [`Message`](crate::Message).
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    /// The native message carries a role with no [`Role`](crate::Role) counterpart.
    #[error("unexpected role while converting to message: {0}")]
    UnknownRole(String),
    /// Stored tool-call arguments are not a JSON object.
    #[error("arguments of call '{id}' are not a JSON object: {reason}")]
    InvalidArguments {
        /// Correlation id of the offending call.
        id: String,
        /// What went wrong while parsing.
        reason: String,
    },
    /// A tool/result message has no correlation id.
    #[error("action result message is missing its correlation id")]
    MissingCorrelationId,
}

/// Why a conversation loop stopped early.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    /// The provider call failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),
    /// Dispatching a requested action failed.
    #[error("action error: {0}")]
    Action(#[from] ActionError),
}
