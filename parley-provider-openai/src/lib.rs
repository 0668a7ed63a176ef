//! OpenAI and Azure OpenAI chat-completions provider for `parley`.
//!
//! [`OpenAi`] implements [`parley::Provider`]: it sends the history and the
//! registered actions as a streaming chat-completions request, parses the
//! server-sent events into [`parley::StreamEvent`]s and assembles them with
//! [`parley::DeltaAccumulator`].
//!
//! ```no_run
//! use parley::{Action, Conversation, Message, Provider};
//! use parley_provider_openai::OpenAi;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let mut client = OpenAi::from_env()?;
//! client.actions_mut().register(Action::from_fn("now", "Current UNIX time", |_params, _ctx| {
//!     Ok(Some("1760400000".to_string()))
//! }))?;
//!
//! let mut conversation = Conversation::new(client);
//! let outcome = conversation.on_messaged(Message::user("What time is it?")).await;
//! println!("{outcome:?}");
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

mod client;
mod error;
mod mapping;
mod streaming;
mod types;

pub use client::OpenAi;
pub use types::{ChatCompletionMessage, FunctionCall, ToolCall};
