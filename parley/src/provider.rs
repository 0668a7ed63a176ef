//! The boundary between the conversation loop and a concrete model backend.
//!
//! [`Provider`] uses RPITIT and is not object-safe. `Conversation<P>` is
//! generic over it; the native message type stays an associated type so the
//! history can be kept in the backend's own shape.

use std::future::Future;

use crate::action::ActionRegistry;
use crate::error::{ConversionError, ProviderError};
use crate::message::Message;
use crate::response::GenerationResponse;
use crate::sink::LiveSink;

/// A streaming text-generation backend with tool calling.
///
/// A provider owns the action registry it advertises to the model, so the
/// tools sent with a request always match the actions that can be
/// dispatched from its response.
pub trait Provider: Send + Sync {
    /// The backend's own message representation.
    type Native: Send + Sync;

    /// Send `history` plus the registered action definitions and assemble
    /// the streamed reply.
    ///
    /// Text fragments are forwarded to `sink` while the reply streams.
    fn prompt<'a>(
        &'a self,
        history: &'a [Self::Native],
        sink: Option<&'a mut dyn LiveSink>,
    ) -> impl Future<Output = Result<GenerationResponse, ProviderError>> + Send + 'a;

    /// Convert a unified message to the native form. Never fails.
    fn from_message(&self, message: &Message) -> Self::Native;

    /// Convert a native message back to the unified form.
    fn to_message(&self, native: &Self::Native) -> Result<Message, ConversionError>;

    /// The registry advertised to the model.
    fn actions(&self) -> &ActionRegistry;

    /// Mutable access to the registry.
    fn actions_mut(&mut self) -> &mut ActionRegistry;
}
