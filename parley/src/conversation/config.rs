//! Configuration for the conversation loop.

/// Upper bound on provider calls per incoming message.
///
/// [`ConversationConfig::max_iterations`] is clamped to this.
pub const MAX_ITERATIONS: usize = 10;

/// Result text recorded when an action reports nothing.
pub const DEFAULT_ACTION_RESULT: &str = "action completed successfully";

/// Configuration for [`Conversation`](super::Conversation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationConfig {
    /// Maximum provider calls per incoming message. Values above
    /// [`MAX_ITERATIONS`] are clamped; `0` means no provider call is made.
    pub max_iterations: usize,
    /// Text recorded for actions that return `Ok(None)`.
    pub default_result: String,
}

impl ConversationConfig {
    /// The effective iteration cap.
    pub fn iteration_cap(&self) -> usize {
        self.max_iterations.min(MAX_ITERATIONS)
    }

    /// Set the iteration limit.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the text recorded for actions without a result.
    #[must_use]
    pub fn with_default_result(mut self, text: impl Into<String>) -> Self {
        self.default_result = text.into();
        self
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            default_result: DEFAULT_ACTION_RESULT.to_string(),
        }
    }
}
