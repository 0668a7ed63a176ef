//! Streaming events and the accumulator that turns them into one response.
//!
//! Providers deliver a response as many small events: text fragments,
//! tool-call fragments keyed by a stream-local index, and a finish reason.
//! [`DeltaAccumulator`] joins them back together. Argument fragments for a
//! call are concatenated strictly in arrival order; the joined text is only
//! parsed once the stream has ended.

use futures::{Stream, StreamExt};

use crate::error::ProviderError;
use crate::message::{ActionCall, Params};
use crate::response::{FinishReason, GenerationResponse};
use crate::sink::{LiveSink, SinkFrame};

/// Tool-call deltas with an index at or above this are dropped.
pub const MAX_TOOL_CALL_INDEX: usize = 256;

/// One event of a streaming response, normalised across providers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The provider started generating.
    Start,
    /// A fragment of assistant text.
    TextDelta(String),
    /// A fragment of the tool call at `index`.
    ToolCallDelta {
        /// Stream-local position of the call.
        index: usize,
        /// Correlation id fragment.
        id: Option<String>,
        /// Action name fragment.
        name: Option<String>,
        /// Argument text fragment.
        arguments: Option<String>,
    },
    /// The raw finish indicator reported by the provider.
    Finish(String),
}

#[derive(Debug, Default)]
struct PartialCall {
    id: String,
    name: String,
    arguments: String,
}

/// Rebuilds a [`GenerationResponse`] from the events of a single request.
///
/// Partial calls sit in a slot table indexed by the stream-local index.
/// Text fragments go to the optional [`LiveSink`] as soon as they arrive.
/// The accumulator is consumed by [`finish`](Self::finish); build a new one
/// per request.
pub struct DeltaAccumulator<'s> {
    text: String,
    calls: Vec<Option<PartialCall>>,
    finish_reason: Option<String>,
    sink: Option<&'s mut dyn LiveSink>,
}

impl<'s> DeltaAccumulator<'s> {
    /// Create an accumulator forwarding live frames to `sink`, if any.
    pub fn new(sink: Option<&'s mut dyn LiveSink>) -> Self {
        Self {
            text: String::new(),
            calls: Vec::new(),
            finish_reason: None,
            sink,
        }
    }

    /// Feed one event.
    pub fn push(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Start => self.emit(SinkFrame::Start),
            StreamEvent::TextDelta(fragment) => {
                if fragment.is_empty() {
                    return;
                }
                self.text.push_str(&fragment);
                self.emit(SinkFrame::MessageChunk { content: fragment });
            }
            StreamEvent::ToolCallDelta {
                index,
                id,
                name,
                arguments,
            } => self.push_call_delta(index, id, name, arguments),
            StreamEvent::Finish(reason) => self.finish_reason = Some(reason),
        }
    }

    fn push_call_delta(
        &mut self,
        index: usize,
        id: Option<String>,
        name: Option<String>,
        arguments: Option<String>,
    ) {
        if index >= MAX_TOOL_CALL_INDEX {
            tracing::warn!(index, "dropping tool call delta with out-of-range index");
            return;
        }
        if self.calls.len() <= index {
            self.calls.resize_with(index + 1, || None);
        }

        let call = self.calls[index].get_or_insert_with(PartialCall::default);
        // The first non-empty id is kept; later ids never overwrite it.
        if let Some(id) = id
            && call.id.is_empty()
        {
            call.id = id;
        }
        if let Some(name) = name {
            call.name.push_str(&name);
        }
        if let Some(arguments) = arguments {
            call.arguments.push_str(&arguments);
        }
    }

    fn emit(&mut self, frame: SinkFrame) {
        if let Some(sink) = self.sink.as_mut() {
            sink.emit(frame);
        }
    }

    /// Finalise into a response.
    ///
    /// Calls come out in index order. Arguments that do not parse as a JSON
    /// object become empty parameters; one malformed call never fails the
    /// whole response.
    pub fn finish(self) -> GenerationResponse {
        let actions = self
            .calls
            .into_iter()
            .flatten()
            .map(|call| {
                let params = parse_arguments(&call.id, &call.name, &call.arguments);
                ActionCall::new(call.id, call.name, params)
            })
            .collect();

        GenerationResponse {
            message: (!self.text.is_empty()).then_some(self.text),
            actions,
            finish_reason: self
                .finish_reason
                .as_deref()
                .map_or(FinishReason::Unspecified, FinishReason::from_raw),
        }
    }

    /// Drive `events` to completion and finalise.
    ///
    /// The first error in the stream aborts with that error.
    pub async fn collect<S>(mut self, events: S) -> Result<GenerationResponse, ProviderError>
    where
        S: Stream<Item = Result<StreamEvent, ProviderError>>,
    {
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            self.push(event?);
        }
        Ok(self.finish())
    }
}

fn parse_arguments(id: &str, name: &str, raw: &str) -> Params {
    if raw.trim().is_empty() {
        return Params::new();
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(params)) => params,
        Ok(other) => {
            tracing::warn!(id, action = name, got = %other, "tool call arguments are not an object; using empty params");
            Params::new()
        }
        Err(e) => {
            tracing::warn!(id, action = name, error = %e, "malformed tool call arguments; using empty params");
            Params::new()
        }
    }
}
