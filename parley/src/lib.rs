//! # parley - streaming tool-calling conversations
//!
//! `parley` sits between an application and a streaming text-generation
//! provider with function calling. It keeps the conversation history, sends
//! it to the provider, rebuilds complete tool calls out of token-level
//! deltas, dispatches them against a registry of local actions, feeds the
//! results back, and repeats until the model signals completion.
//!
//! ## Pieces
//!
//! | Piece | Type | What it does |
//! |-------|------|--------------|
//! | Message model | [`Message`] | Chat turns and action-result turns |
//! | Action registry | [`ActionRegistry`], [`Action`] | Named callable units plus scoped extension |
//! | Provider boundary | [`Provider`] | Sends history, returns a [`GenerationResponse`] |
//! | Delta accumulator | [`DeltaAccumulator`] | Turns [`StreamEvent`]s into one response |
//! | Orchestrator | [`Conversation`] | Bounded request/dispatch/append loop |
//!
//! Concrete providers live in their own crates (for example
//! `parley-provider-openai`) and only depend on the types exported here.
//!
//! ## Example
//!
//! ```ignore
//! use parley::{Action, Conversation, Message};
//!
//! let mut provider = MyProvider::new();
//! provider.actions_mut().register(Action::from_fn(
//!     "add",
//!     "Add two integers",
//!     |params, _ctx| {
//!         let a = params.get("a").and_then(|v| v.as_i64()).unwrap_or(0);
//!         let b = params.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
//!         Ok(Some((a + b).to_string()))
//!     },
//! ))?;
//!
//! let mut conversation = Conversation::new(provider);
//! let outcome = conversation.on_messaged(Message::user("What's 2+2?")).await;
//! ```

#![deny(missing_docs)]

pub mod action;
pub mod conversation;
pub mod error;
pub mod message;
pub mod provider;
pub mod response;
pub mod sink;
pub mod stream;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use action::{
    Action, ActionContext, ActionDefinition, ActionFuture, ActionHandler, ActionRegistry,
    ScopedActions, dispatch,
};
pub use conversation::{Conversation, ConversationConfig, Outcome};
pub use error::{ActionError, ConversionError, LoopError, ProviderError};
pub use message::{ActionCall, ActionResult, ChatMessage, Message, Params, Role};
pub use provider::Provider;
pub use response::{FinishReason, GenerationResponse};
pub use sink::{LiveSink, SinkFrame, SseSink};
pub use stream::{DeltaAccumulator, StreamEvent};
