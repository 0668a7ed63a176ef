//! Live output: frames forwarded while a provider call is still streaming.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// One framed live-output event.
///
/// Serialises as `{"type":"start_message"}` or
/// `{"type":"message_chunk","content":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkFrame {
    /// Generation started.
    #[serde(rename = "start_message")]
    Start,
    /// A piece of assistant text.
    MessageChunk {
        /// The text fragment, exactly as received.
        content: String,
    },
}

impl SinkFrame {
    /// Render as one server-sent-events frame: `data: <json>\n\n`.
    pub fn to_sse(&self) -> String {
        let payload = match self {
            Self::Start => serde_json::json!({ "type": "start_message" }),
            Self::MessageChunk { content } => {
                serde_json::json!({ "type": "message_chunk", "content": content })
            }
        };
        format!("data: {payload}\n\n")
    }
}

/// Receives live frames in order during generation.
///
/// Implementations must not block; frames arrive from inside the provider
/// call.
pub trait LiveSink: Send {
    /// Take one frame.
    fn emit(&mut self, frame: SinkFrame);
}

impl LiveSink for Vec<SinkFrame> {
    fn emit(&mut self, frame: SinkFrame) {
        self.push(frame);
    }
}

impl LiveSink for mpsc::UnboundedSender<SinkFrame> {
    fn emit(&mut self, frame: SinkFrame) {
        // A dropped receiver only means nobody is watching anymore.
        let _ = mpsc::UnboundedSender::send(self, frame);
    }
}

/// Sink that encodes frames as SSE bytes onto a channel.
///
/// The receiving half fits directly into a streaming HTTP response body.
#[derive(Debug, Clone)]
pub struct SseSink {
    sender: mpsc::UnboundedSender<Bytes>,
}

impl SseSink {
    /// Create a sink and the receiver its encoded frames go to.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Bytes>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl LiveSink for SseSink {
    fn emit(&mut self, frame: SinkFrame) {
        let _ = self.sender.send(Bytes::from(frame.to_sse()));
    }
}
