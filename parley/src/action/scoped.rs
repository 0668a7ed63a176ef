//! Temporary registry extension bound to a guard's lifetime.

use std::ops::{Deref, DerefMut};

use super::{Action, ActionContext};
use crate::error::ActionError;

/// Guard that keeps a batch of actions registered while it lives.
///
/// Dropping the guard unregisters exactly the names it added, on every exit
/// path including `?` and unwinding. The guard derefs to the context, so
/// dispatch and conversation calls go through it while the batch is active.
///
/// ```ignore
/// let mut scope = ScopedActions::new(ctx, vec![lookup_action()])?;
/// let found = dispatch(&mut *scope, "lookup", params).await?;
/// // `lookup` is gone again once `scope` drops
/// ```
pub struct ScopedActions<'a, C: ActionContext + ?Sized> {
    ctx: &'a mut C,
    names: Vec<String>,
}

impl<'a, C: ActionContext + ?Sized> ScopedActions<'a, C> {
    /// Register `actions` on `ctx`'s registry for the guard's lifetime.
    ///
    /// The batch is registered atomically; on a duplicate name nothing is
    /// added and no guard is returned.
    pub fn new(ctx: &'a mut C, actions: Vec<Action>) -> Result<Self, ActionError> {
        let names: Vec<String> = actions.iter().map(|a| a.name().to_string()).collect();
        ctx.actions_mut().register_many(actions)?;
        tracing::debug!(actions = ?names, "scoped actions registered");
        Ok(Self { ctx, names })
    }

    /// Names this guard will remove.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Unregister the batch now.
    pub fn release(self) {}
}

impl<C: ActionContext + ?Sized> Deref for ScopedActions<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        self.ctx
    }
}

impl<C: ActionContext + ?Sized> DerefMut for ScopedActions<'_, C> {
    fn deref_mut(&mut self) -> &mut C {
        self.ctx
    }
}

impl<C: ActionContext + ?Sized> Drop for ScopedActions<'_, C> {
    fn drop(&mut self) {
        let removed = self.ctx.actions_mut().unregister_many(&self.names);
        tracing::debug!(removed, "scoped actions released");
    }
}
