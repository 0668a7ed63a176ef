//! Conversation entries: chat turns and action-result turns.

use serde::{Deserialize, Serialize};

/// Parsed parameters of an action call: a JSON object.
pub type Params = serde_json::Map<String, serde_json::Value>;

/// The role of a chat participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A human user.
    User,
    /// The model.
    Assistant,
    /// System instructions.
    System,
}

/// A request from the model to run a named action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCall {
    /// Correlation id, unique within the turn that carries it.
    pub id: String,
    /// Name of the action to run.
    pub name: String,
    /// Parsed parameters.
    #[serde(default)]
    pub params: Params,
}

impl ActionCall {
    /// Create a call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, params: Params) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            params,
        }
    }
}

/// A chat turn: text from a participant plus any action calls it makes.
///
/// Empty text is stored as `None`; see [`ChatMessage::new`]. Deserialising
/// applies the same rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawChatMessage")]
pub struct ChatMessage {
    /// Who wrote the turn.
    pub role: Role,
    /// Text content, `None` when the turn produced no text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Action calls, in the order the model emitted them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionCall>,
}

impl ChatMessage {
    /// Create a chat turn, normalising `Some("")` to `None`.
    pub fn new(role: Role, content: Option<String>, actions: Vec<ActionCall>) -> Self {
        Self {
            role,
            content: content.filter(|text| !text.is_empty()),
            actions,
        }
    }
}

#[derive(Deserialize)]
struct RawChatMessage {
    role: Role,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    actions: Vec<ActionCall>,
}

impl From<RawChatMessage> for ChatMessage {
    fn from(raw: RawChatMessage) -> Self {
        Self::new(raw.role, raw.content, raw.actions)
    }
}

/// The result of running one action, correlated to the call that asked for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Correlation id of the originating [`ActionCall`].
    pub id: String,
    /// Result text fed back to the model.
    pub result: String,
}

/// One entry in the conversation history.
///
/// The model does not check that every [`ActionResult`] answers an earlier
/// call; [`Conversation`](crate::Conversation) keeps that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// A chat turn.
    Chat(ChatMessage),
    /// An action-result turn.
    ActionResult(ActionResult),
}

impl Message {
    /// A chat turn with the given role, text, and calls.
    pub fn chat(role: Role, content: Option<String>, actions: Vec<ActionCall>) -> Self {
        Self::Chat(ChatMessage::new(role, content, actions))
    }

    /// A user turn.
    pub fn user(text: impl Into<String>) -> Self {
        Self::chat(Role::User, Some(text.into()), Vec::new())
    }

    /// A system turn.
    pub fn system(text: impl Into<String>) -> Self {
        Self::chat(Role::System, Some(text.into()), Vec::new())
    }

    /// An assistant turn with optional text and any action calls.
    pub fn assistant(content: Option<String>, actions: Vec<ActionCall>) -> Self {
        Self::chat(Role::Assistant, content, actions)
    }

    /// An action-result turn.
    pub fn action_result(id: impl Into<String>, result: impl Into<String>) -> Self {
        Self::ActionResult(ActionResult {
            id: id.into(),
            result: result.into(),
        })
    }

    /// The chat turn, if this is one.
    pub fn as_chat(&self) -> Option<&ChatMessage> {
        match self {
            Self::Chat(chat) => Some(chat),
            Self::ActionResult(_) => None,
        }
    }

    /// The action result, if this is one.
    pub fn as_action_result(&self) -> Option<&ActionResult> {
        match self {
            Self::ActionResult(result) => Some(result),
            Self::Chat(_) => None,
        }
    }

    /// Text of a chat turn.
    pub fn text(&self) -> Option<&str> {
        self.as_chat().and_then(|chat| chat.content.as_deref())
    }
}
