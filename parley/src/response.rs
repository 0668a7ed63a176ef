//! Normalised output of one provider call.

use serde::{Deserialize, Serialize};

use crate::message::{ActionCall, Message};

/// Why generation stopped for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model finished its answer.
    Completed,
    /// The model stopped to have actions run.
    ToolCall,
    /// Anything else, including no reason at all.
    #[default]
    Unspecified,
}

impl FinishReason {
    /// Map a raw provider finish indicator.
    ///
    /// Unrecognised values map to [`FinishReason::Unspecified`].
    pub fn from_raw(raw: &str) -> Self {
        match raw {
            "stop" => Self::Completed,
            "tool_calls" | "tool_call" | "function_call" => Self::ToolCall,
            _ => Self::Unspecified,
        }
    }
}

/// Text, action calls, and finish signal assembled from one request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Assembled text; `None` when no text was produced.
    pub message: Option<String>,
    /// Action calls in stream-index order.
    pub actions: Vec<ActionCall>,
    /// Normalised finish signal.
    pub finish_reason: FinishReason,
}

impl GenerationResponse {
    /// A text-only response that completes the turn.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            message: (!text.is_empty()).then_some(text),
            actions: Vec::new(),
            finish_reason: FinishReason::Completed,
        }
    }

    /// A response that asks for actions to run.
    pub fn calls(actions: Vec<ActionCall>) -> Self {
        Self {
            message: None,
            actions,
            finish_reason: FinishReason::ToolCall,
        }
    }

    /// Override the finish signal.
    #[must_use]
    pub fn with_finish_reason(mut self, finish_reason: FinishReason) -> Self {
        self.finish_reason = finish_reason;
        self
    }

    /// The assistant turn this response appends to a history.
    pub fn to_message(&self) -> Message {
        Message::assistant(self.message.clone(), self.actions.clone())
    }
}
