//! Ordered, name-unique store of actions.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::{Action, ActionDefinition};
use crate::error::ActionError;

/// Registry of actions, in insertion order.
///
/// Insertion order is the order definitions are sent to the provider.
/// Actions are held behind `Arc`, so a dispatch can keep running an action
/// after the registry has been changed.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<Arc<Action>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action. Fails with [`ActionError::Duplicate`] if the name is taken.
    pub fn register(&mut self, action: Action) -> Result<(), ActionError> {
        if self.contains(action.name()) {
            return Err(ActionError::Duplicate(action.name().to_string()));
        }
        tracing::debug!(action = action.name(), "registered action");
        self.actions.push(Arc::new(action));
        Ok(())
    }

    /// Add a batch of actions, all or nothing.
    ///
    /// The batch is rejected without changes if any name is already
    /// registered or appears twice within it.
    pub fn register_many(&mut self, actions: impl IntoIterator<Item = Action>) -> Result<(), ActionError> {
        let actions: Vec<Action> = actions.into_iter().collect();
        let mut seen = HashSet::with_capacity(actions.len());
        for action in &actions {
            if self.contains(action.name()) || !seen.insert(action.name()) {
                return Err(ActionError::Duplicate(action.name().to_string()));
            }
        }
        self.actions.extend(actions.into_iter().map(Arc::new));
        Ok(())
    }

    /// Remove the action named exactly `name`, returning it if present.
    pub fn unregister(&mut self, name: &str) -> Option<Arc<Action>> {
        let pos = self.actions.iter().position(|a| a.name() == name)?;
        Some(self.actions.remove(pos))
    }

    /// Remove every action whose name is in `names`. Returns how many were removed.
    pub fn unregister_many<S: AsRef<str>>(&mut self, names: &[S]) -> usize {
        let before = self.actions.len();
        self.actions
            .retain(|a| !names.iter().any(|n| n.as_ref() == a.name()));
        before - self.actions.len()
    }

    /// Look up an action by name.
    pub fn get(&self, name: &str) -> Option<Arc<Action>> {
        self.actions.iter().find(|a| a.name() == name).cloned()
    }

    /// Look up an action by name, failing with [`ActionError::NotFound`].
    pub fn resolve(&self, name: &str) -> Result<Arc<Action>, ActionError> {
        self.get(name)
            .ok_or_else(|| ActionError::NotFound(name.to_string()))
    }

    /// Whether an action with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a.name() == name)
    }

    /// Registered names, in order.
    pub fn names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name()).collect()
    }

    /// Definitions of all actions, in order.
    pub fn definitions(&self) -> Vec<ActionDefinition> {
        self.actions.iter().map(|a| a.definition()).collect()
    }

    /// Number of registered actions.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FromIterator<Action> for ActionRegistry {
    /// Later actions with a name already seen are dropped.
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        let mut registry = Self::new();
        for action in iter {
            if let Err(e) = registry.register(action) {
                tracing::warn!(error = %e, "skipping action");
            }
        }
        registry
    }
}
