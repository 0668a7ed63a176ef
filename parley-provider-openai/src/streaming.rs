//! Server-sent-events parsing for streamed chat completions.
//!
//! The body is a sequence of events separated by blank lines:
//!
//! ```text
//! data: {"choices":[{"index":0,"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"index":0,"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"add","arguments":""}}]}}]}
//!
//! data: [DONE]
//! ```
//!
//! Lines are split on raw bytes so a multi-byte character cut across two
//! network chunks is decoded intact.
//!
//! Reference: <https://platform.openai.com/docs/api-reference/chat/streaming>

use bytes::Bytes;
use futures::{Stream, StreamExt};
use parley::{ProviderError, StreamEvent};

use crate::types::ChatCompletionChunk;

/// What one dispatched SSE event produced.
#[derive(Debug)]
enum Dispatch {
    Events(Vec<StreamEvent>),
    Done,
}

/// Line-level SSE state: the `data:` lines of the event being built.
#[derive(Debug, Default)]
struct SseParser {
    data: String,
}

impl SseParser {
    fn feed(&mut self, raw: &[u8]) -> Result<Dispatch, ProviderError> {
        let line = std::str::from_utf8(raw)
            .map_err(|e| ProviderError::Stream(format!("invalid UTF-8 in event stream: {e}")))?;
        self.process_line(line.trim_end_matches(['\n', '\r']))
    }

    fn process_line(&mut self, line: &str) -> Result<Dispatch, ProviderError> {
        if line.is_empty() {
            return self.dispatch();
        }
        if let Some(value) = line.strip_prefix("data:") {
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(value.strip_prefix(' ').unwrap_or(value));
        }
        // `event:`, `id:`, `retry:` and `:` comment lines carry nothing we use.
        Ok(Dispatch::Events(Vec::new()))
    }

    fn dispatch(&mut self) -> Result<Dispatch, ProviderError> {
        let data = std::mem::take(&mut self.data);
        if data.is_empty() {
            return Ok(Dispatch::Events(Vec::new()));
        }
        if data == "[DONE]" {
            return Ok(Dispatch::Done);
        }

        let value: serde_json::Value = serde_json::from_str(&data)
            .map_err(|e| ProviderError::Stream(format!("malformed event payload: {e}")))?;
        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or("unknown streaming error");
            return Err(ProviderError::Stream(message.to_string()));
        }

        let chunk: ChatCompletionChunk = serde_json::from_value(value)
            .map_err(|e| ProviderError::Stream(format!("unexpected chunk shape: {e}")))?;
        tracing::trace!(choices = chunk.choices.len(), "parsed completion chunk");
        Ok(Dispatch::Events(chunk_events(chunk)))
    }
}

/// Events of the first choice; chunks without choices produce none.
fn chunk_events(chunk: ChatCompletionChunk) -> Vec<StreamEvent> {
    let Some(choice) = chunk.choices.into_iter().next() else {
        return Vec::new();
    };

    let mut events = Vec::new();
    if let Some(content) = choice.delta.content
        && !content.is_empty()
    {
        events.push(StreamEvent::TextDelta(content));
    }
    for call in choice.delta.tool_calls.into_iter().flatten() {
        let (name, arguments) = match call.function {
            Some(f) => (f.name, f.arguments),
            None => (None, None),
        };
        events.push(StreamEvent::ToolCallDelta {
            index: call.index,
            id: call.id,
            name,
            arguments,
        });
    }
    if let Some(reason) = choice.finish_reason {
        events.push(StreamEvent::Finish(reason));
    }
    events
}

/// Turn a response body into [`StreamEvent`]s, starting with
/// [`StreamEvent::Start`].
///
/// The stream ends at `[DONE]`, at the end of the body, or after the first
/// error.
pub(crate) fn parse_sse_stream<S>(
    body: S,
) -> impl Stream<Item = Result<StreamEvent, ProviderError>> + Send
where
    S: Stream<Item = Result<Bytes, ProviderError>> + Send,
{
    async_stream::stream! {
        yield Ok(StreamEvent::Start);

        let mut parser = SseParser::default();
        let mut body = std::pin::pin!(body);
        let mut buf: Vec<u8> = Vec::new();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            buf.extend_from_slice(&chunk);

            while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                match parser.feed(&line) {
                    Ok(Dispatch::Events(events)) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Ok(Dispatch::Done) => return,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        // A body may end without the trailing blank line.
        let tail = if buf.is_empty() {
            parser.dispatch()
        } else {
            match parser.feed(&buf) {
                Ok(_) => parser.dispatch(),
                Err(e) => Err(e),
            }
        };
        match tail {
            Ok(Dispatch::Events(events)) => {
                for event in events {
                    yield Ok(event);
                }
            }
            Ok(Dispatch::Done) => {}
            Err(e) => {
                yield Err(e);
            }
        }
    }
}
