//! A scripted provider for exercising conversations without a backend.
//!
//! Enabled for this crate's own tests and, for downstream crates, through
//! the `test-utils` feature.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::action::{Action, ActionRegistry};
use crate::error::{ConversionError, ProviderError};
use crate::message::Message;
use crate::provider::Provider;
use crate::response::GenerationResponse;
use crate::sink::LiveSink;
use crate::stream::{DeltaAccumulator, StreamEvent};

/// One scripted reply.
#[derive(Debug)]
pub enum Step {
    /// Return this response as-is.
    Respond(GenerationResponse),
    /// Run these events through a [`DeltaAccumulator`], with the sink.
    Stream(Vec<StreamEvent>),
    /// Fail the call.
    Fail(ProviderError),
}

/// Provider that replays a fixed script of replies.
///
/// Uses [`Message`] as its native type. Once the script runs out, the
/// fallback response is returned if set; otherwise the call fails with
/// [`ProviderError::InvalidRequest`].
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    actions: ActionRegistry,
    script: Mutex<VecDeque<Step>>,
    fallback: Option<GenerationResponse>,
    calls: AtomicUsize,
    histories: Mutex<Vec<Vec<Message>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ScriptedProvider {
    /// An empty script with no actions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action.
    ///
    /// # Panics
    ///
    /// On a duplicate action name.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        if let Err(e) = self.actions.register(action) {
            panic!("scripted provider: {e}");
        }
        self
    }

    /// Use `registry` as the advertised actions.
    #[must_use]
    pub fn with_actions(mut self, registry: ActionRegistry) -> Self {
        self.actions = registry;
        self
    }

    /// Append a step.
    #[must_use]
    pub fn then(mut self, step: Step) -> Self {
        self.script
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
        self
    }

    /// Append a fixed response.
    #[must_use]
    pub fn respond(self, response: GenerationResponse) -> Self {
        self.then(Step::Respond(response))
    }

    /// Append a streamed response.
    #[must_use]
    pub fn stream(self, events: Vec<StreamEvent>) -> Self {
        self.then(Step::Stream(events))
    }

    /// Append a failure.
    #[must_use]
    pub fn fail(self, error: ProviderError) -> Self {
        self.then(Step::Fail(error))
    }

    /// Reply with `response` once the script is exhausted.
    #[must_use]
    pub fn fallback(mut self, response: GenerationResponse) -> Self {
        self.fallback = Some(response);
        self
    }

    /// How many times `prompt` was called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The history passed to each `prompt` call, in call order.
    pub fn histories(&self) -> Vec<Vec<Message>> {
        lock(&self.histories).clone()
    }

    /// Steps not yet consumed.
    pub fn remaining(&self) -> usize {
        lock(&self.script).len()
    }
}

impl Provider for ScriptedProvider {
    type Native = Message;

    fn prompt<'a>(
        &'a self,
        history: &'a [Message],
        sink: Option<&'a mut dyn LiveSink>,
    ) -> impl Future<Output = Result<GenerationResponse, ProviderError>> + Send + 'a {
        async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            lock(&self.histories).push(history.to_vec());

            let step = lock(&self.script).pop_front();
            match step {
                Some(Step::Respond(response)) => Ok(response),
                Some(Step::Stream(events)) => {
                    let mut acc = DeltaAccumulator::new(sink);
                    for event in events {
                        acc.push(event);
                    }
                    Ok(acc.finish())
                }
                Some(Step::Fail(error)) => Err(error),
                None => self
                    .fallback
                    .clone()
                    .ok_or_else(|| ProviderError::InvalidRequest("script exhausted".to_string())),
            }
        }
    }

    fn from_message(&self, message: &Message) -> Message {
        message.clone()
    }

    fn to_message(&self, native: &Message) -> Result<Message, ConversionError> {
        Ok(native.clone())
    }

    fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    fn actions_mut(&mut self) -> &mut ActionRegistry {
        &mut self.actions
    }
}
