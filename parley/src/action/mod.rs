//! Actions: named units of work the model can ask to run.
//!
//! An [`Action`] pairs a name, a description and an optional parameter
//! schema with an [`ActionHandler`]. Handlers receive the parsed parameters
//! and mutable access to the running conversation through
//! [`ActionContext`], so an action can read the history, append turns, or
//! extend the registry for the duration of its own work (see
//! [`ScopedActions`]).

mod registry;
mod scoped;
mod validate;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ConversionError};
use crate::message::{Message, Params};

pub use registry::ActionRegistry;
pub use scoped::ScopedActions;

/// Boxed future returned by [`ActionHandler::call`].
///
/// `Ok(None)` means the action ran but had nothing to report.
pub type ActionFuture<'a> = BoxFuture<'a, Result<Option<String>, ActionError>>;

/// The callable behind an [`Action`].
///
/// Dyn-compatible; the registry stores handlers as `Arc<dyn ActionHandler>`.
pub trait ActionHandler: Send + Sync {
    /// Run with parsed parameters and the conversation as context.
    fn call<'a>(&'a self, params: Params, ctx: &'a mut dyn ActionContext) -> ActionFuture<'a>;
}

/// What an action can see and change while it runs.
pub trait ActionContext: Send {
    /// The conversation so far, in the unified message form.
    fn history(&self) -> Result<Vec<Message>, ConversionError>;

    /// Append a turn to the conversation.
    fn push_message(&mut self, message: Message);

    /// The registry the current dispatch resolves against.
    fn actions(&self) -> &ActionRegistry;

    /// Mutable access to the registry.
    fn actions_mut(&mut self) -> &mut ActionRegistry;
}

struct SyncFn<F>(F);

impl<F> ActionHandler for SyncFn<F>
where
    F: Fn(Params, &mut dyn ActionContext) -> Result<Option<String>, ActionError> + Send + Sync,
{
    fn call<'a>(&'a self, params: Params, ctx: &'a mut dyn ActionContext) -> ActionFuture<'a> {
        Box::pin(future::ready((self.0)(params, ctx)))
    }
}

struct AsyncFn<F>(F);

impl<F, Fut> ActionHandler for AsyncFn<F>
where
    F: Fn(Params) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Option<String>, ActionError>> + Send + 'static,
{
    fn call<'a>(&'a self, params: Params, _ctx: &'a mut dyn ActionContext) -> ActionFuture<'a> {
        Box::pin((self.0)(params))
    }
}

/// A registered unit of work.
pub struct Action {
    name: String,
    description: String,
    schema: Option<serde_json::Value>,
    handler: Arc<dyn ActionHandler>,
}

impl Action {
    /// Create an action from any handler.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: impl ActionHandler + 'static,
    ) -> Self {
        Self::from_shared(name, description, Arc::new(handler))
    }

    /// Create an action around an already shared handler.
    pub fn from_shared(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: Arc<dyn ActionHandler>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema: None,
            handler,
        }
    }

    /// Create an action from a synchronous closure.
    pub fn from_fn<F>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(Params, &mut dyn ActionContext) -> Result<Option<String>, ActionError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(name, description, SyncFn(f))
    }

    /// Create an action from an async closure that needs no context.
    pub fn from_async_fn<F, Fut>(name: impl Into<String>, description: impl Into<String>, f: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<String>, ActionError>> + Send + 'static,
    {
        Self::new(name, description, AsyncFn(f))
    }

    /// Attach a parameter schema, forwarded to the provider verbatim.
    ///
    /// Calls are also checked against it before the handler runs.
    #[must_use]
    pub fn with_schema(mut self, schema: serde_json::Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// The action's unique name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human-readable description shown to the model.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The parameter schema, if one was attached.
    pub fn schema(&self) -> Option<&serde_json::Value> {
        self.schema.as_ref()
    }

    /// The provider-facing description of this action.
    pub fn definition(&self) -> ActionDefinition {
        ActionDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.schema.clone(),
        }
    }

    /// Run the handler.
    ///
    /// When a schema is attached and the parameters fail it, the handler is
    /// skipped and the failure comes back as the result text so the model
    /// can correct itself.
    pub fn invoke<'a>(&'a self, params: Params, ctx: &'a mut dyn ActionContext) -> ActionFuture<'a> {
        if let Some(schema) = &self.schema
            && let Err(reason) = validate::validate_params(&params, schema)
        {
            tracing::warn!(action = %self.name, %reason, "action parameters rejected by schema");
            let feedback = format!("Invalid parameters for action '{}': {reason}", self.name);
            return Box::pin(future::ready(Ok(Some(feedback))));
        }
        self.handler.call(params, ctx)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

/// What a provider adapter forwards to the model for one action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Action name.
    pub name: String,
    /// Action description.
    pub description: String,
    /// Parameter schema, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
}

/// Resolve `name` in the context's registry and run it with `ctx`.
///
/// Unknown names fail with [`ActionError::NotFound`].
pub async fn dispatch(
    ctx: &mut dyn ActionContext,
    name: &str,
    params: Params,
) -> Result<Option<String>, ActionError> {
    // Cloning the Arc ends the registry borrow so the handler can take `ctx`.
    let action = ctx.actions().resolve(name)?;
    tracing::debug!(action = name, "dispatching action");
    action.invoke(params, ctx).await
}
