//! The bounded request, dispatch, append loop.
//!
//! A [`Conversation`] owns the history (in the provider's native form), the
//! provider, and an optional live sink. Each call to
//! [`on_messaged`](Conversation::on_messaged) appends the incoming message
//! and then alternates between asking the provider for a reply and running
//! the actions that reply asks for, until the model signals completion, a
//! step fails, or the iteration cap is reached.

mod config;

pub use config::{ConversationConfig, DEFAULT_ACTION_RESULT, MAX_ITERATIONS};

use std::fmt;

use crate::action::{Action, ActionContext, ActionRegistry, ScopedActions, dispatch};
use crate::error::{ActionError, ConversionError, LoopError};
use crate::message::{ActionCall, Message};
use crate::provider::Provider;
use crate::response::FinishReason;
use crate::sink::LiveSink;

/// How an [`on_messaged`](Conversation::on_messaged) call ended.
///
/// The history is the source of truth in every case; turns appended before
/// a failure stay in it.
#[derive(Debug)]
pub enum Outcome {
    /// The model signalled completion.
    Completed {
        /// Provider calls made.
        iterations: usize,
    },
    /// The iteration cap was reached without a completion signal.
    Exhausted {
        /// Provider calls made.
        iterations: usize,
    },
    /// A provider call or an action dispatch failed and the loop stopped.
    Failed {
        /// Provider calls made, including the one in progress.
        iterations: usize,
        /// What went wrong.
        error: LoopError,
    },
}

impl Outcome {
    /// Whether the model signalled completion.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Provider calls made.
    pub fn iterations(&self) -> usize {
        match self {
            Self::Completed { iterations }
            | Self::Exhausted { iterations }
            | Self::Failed { iterations, .. } => *iterations,
        }
    }

    /// The failure, if the loop stopped on one.
    pub fn error(&self) -> Option<&LoopError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// One conversation with one provider.
///
/// `on_messaged` takes `&mut self`: a conversation runs one loop at a time.
pub struct Conversation<P: Provider> {
    provider: P,
    history: Vec<P::Native>,
    sink: Option<Box<dyn LiveSink>>,
    config: ConversationConfig,
}

impl<P: Provider> Conversation<P> {
    /// Start an empty conversation.
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            history: Vec::new(),
            sink: None,
            config: ConversationConfig::default(),
        }
    }

    /// Start from existing messages.
    pub fn with_history(provider: P, messages: impl IntoIterator<Item = Message>) -> Self {
        let mut conversation = Self::new(provider);
        for message in messages {
            conversation.push_message(message);
        }
        conversation
    }

    /// Replace the loop configuration.
    #[must_use]
    pub fn with_config(mut self, config: ConversationConfig) -> Self {
        self.config = config;
        self
    }

    /// Attach a live sink.
    #[must_use]
    pub fn with_sink(mut self, sink: impl LiveSink + 'static) -> Self {
        self.set_sink(sink);
        self
    }

    /// Attach a live sink, replacing any existing one.
    pub fn set_sink(&mut self, sink: impl LiveSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Detach the live sink, returning it.
    pub fn clear_sink(&mut self) -> Option<Box<dyn LiveSink>> {
        self.sink.take()
    }

    /// The loop configuration.
    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    /// The provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Mutable access to the provider, e.g. to register actions.
    pub fn provider_mut(&mut self) -> &mut P {
        &mut self.provider
    }

    /// The history in the provider's native form.
    pub fn native_history(&self) -> &[P::Native] {
        &self.history
    }

    /// Number of turns in the history.
    pub fn len(&self) -> usize {
        self.history.len()
    }

    /// Whether the history is empty.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Append a turn to the history.
    pub fn push_message(&mut self, message: Message) {
        let native = self.provider.from_message(&message);
        self.history.push(native);
    }

    /// The full history in the unified form.
    pub fn messages(&self) -> Result<Vec<Message>, ConversionError> {
        self.history
            .iter()
            .map(|native| self.provider.to_message(native))
            .collect()
    }

    /// Register `actions` until the returned guard drops.
    ///
    /// The guard derefs to the conversation, so `on_messaged` can be called
    /// through it with the extra actions available.
    pub fn scoped_actions(
        &mut self,
        actions: Vec<Action>,
    ) -> Result<ScopedActions<'_, Self>, ActionError> {
        ScopedActions::new(self, actions)
    }

    /// Append `incoming` and run the loop until completion, failure, or the cap.
    pub async fn on_messaged(&mut self, incoming: Message) -> Outcome {
        self.push_message(incoming);
        let cap = self.config.iteration_cap();

        for iteration in 1..=cap {
            tracing::debug!(iteration, history = self.history.len(), "requesting generation");

            let sink: Option<&mut dyn LiveSink> = match self.sink.as_mut() {
                Some(sink) => Some(sink.as_mut()),
                None => None,
            };
            let response = match self.provider.prompt(&self.history, sink).await {
                Ok(response) => response,
                Err(error) => {
                    tracing::error!(iteration, error = %error, "provider call failed; ending loop");
                    return Outcome::Failed {
                        iterations: iteration,
                        error: error.into(),
                    };
                }
            };

            self.push_message(response.to_message());
            tracing::debug!(
                iteration,
                actions = response.actions.len(),
                finish_reason = ?response.finish_reason,
                "assistant turn appended"
            );

            for ActionCall { id, name, params } in response.actions {
                let result = match dispatch(self, &name, params).await {
                    Ok(result) => result.unwrap_or_else(|| self.config.default_result.clone()),
                    Err(error) => {
                        tracing::error!(iteration, action = %name, error = %error, "action dispatch failed; ending loop");
                        return Outcome::Failed {
                            iterations: iteration,
                            error: error.into(),
                        };
                    }
                };
                self.push_message(Message::action_result(id, result));
            }

            if response.finish_reason == FinishReason::Completed {
                return Outcome::Completed {
                    iterations: iteration,
                };
            }
        }

        tracing::warn!(cap, "iteration cap reached without completion");
        Outcome::Exhausted { iterations: cap }
    }
}

impl<P: Provider> ActionContext for Conversation<P> {
    fn history(&self) -> Result<Vec<Message>, ConversionError> {
        self.messages()
    }

    fn push_message(&mut self, message: Message) {
        Conversation::push_message(self, message);
    }

    fn actions(&self) -> &ActionRegistry {
        self.provider.actions()
    }

    fn actions_mut(&mut self) -> &mut ActionRegistry {
        self.provider.actions_mut()
    }
}

impl<P: Provider + fmt::Debug> fmt::Debug for Conversation<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Conversation")
            .field("provider", &self.provider)
            .field("turns", &self.history.len())
            .field("sink", &self.sink.is_some())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::response::GenerationResponse;
    use crate::sink::SinkFrame;
    use crate::stream::StreamEvent;
    use crate::test_utils::ScriptedProvider;

    #[tokio::test]
    async fn text_reply_completes_in_one_iteration() {
        let provider = ScriptedProvider::new().respond(GenerationResponse::text("4"));
        let mut conversation = Conversation::new(provider);

        let outcome = conversation.on_messaged(Message::user("What's 2+2?")).await;

        assert!(outcome.is_completed());
        assert_eq!(outcome.iterations(), 1);
        let messages = conversation.messages().unwrap();
        assert_eq!(
            messages,
            vec![Message::user("What's 2+2?"), Message::assistant(Some("4".into()), vec![])]
        );
    }

    #[tokio::test]
    async fn zero_cap_makes_no_provider_call() {
        let provider = ScriptedProvider::new().respond(GenerationResponse::text("never"));
        let mut conversation = Conversation::new(provider)
            .with_config(ConversationConfig::default().with_max_iterations(0));

        let outcome = conversation.on_messaged(Message::user("hi")).await;

        assert!(matches!(outcome, Outcome::Exhausted { iterations: 0 }));
        assert_eq!(conversation.provider().call_count(), 0);
        assert_eq!(conversation.len(), 1);
    }

    #[tokio::test]
    async fn provider_error_fails_loop() {
        let provider = ScriptedProvider::new().fail(ProviderError::Authentication("bad key".into()));
        let mut conversation = Conversation::new(provider);

        let outcome = conversation.on_messaged(Message::user("hi")).await;

        assert!(matches!(
            outcome,
            Outcome::Failed { iterations: 1, error: LoopError::Provider(ProviderError::Authentication(_)) }
        ));
        assert_eq!(conversation.len(), 1);
    }

    #[tokio::test]
    async fn sink_receives_streamed_text() {
        let provider = ScriptedProvider::new().stream(vec![
            StreamEvent::Start,
            StreamEvent::TextDelta("Hel".into()),
            StreamEvent::TextDelta("lo".into()),
            StreamEvent::Finish("stop".into()),
        ]);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<SinkFrame>();
        let mut conversation = Conversation::new(provider).with_sink(tx);

        let outcome = conversation.on_messaged(Message::user("greet")).await;
        assert!(outcome.is_completed());

        drop(conversation.clear_sink());
        let mut frames = Vec::new();
        while let Some(frame) = rx.recv().await {
            frames.push(frame);
        }
        assert_eq!(
            frames,
            vec![
                SinkFrame::Start,
                SinkFrame::MessageChunk { content: "Hel".into() },
                SinkFrame::MessageChunk { content: "lo".into() },
            ]
        );
        assert_eq!(conversation.messages().unwrap()[1].text(), Some("Hello"));
    }

    #[test]
    fn with_history_converts_messages() {
        let provider = ScriptedProvider::new();
        let conversation = Conversation::with_history(
            provider,
            vec![Message::system("be brief"), Message::user("hi")],
        );
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.native_history()[0], Message::system("be brief"));
    }

    #[test]
    fn outcome_accessors() {
        let failed = Outcome::Failed {
            iterations: 2,
            error: LoopError::Action(ActionError::NotFound("x".into())),
        };
        assert_eq!(failed.iterations(), 2);
        assert!(!failed.is_completed());
        assert!(failed.error().is_some());
        assert!(Outcome::Exhausted { iterations: 10 }.error().is_none());
    }
}
