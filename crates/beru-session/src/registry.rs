//! Generator and terminal-action registries.
//!
//! Both registries are built once at start-up, then shared immutably with
//! the engine. Dialogs name entries by [`GeneratorId`] / [`ActionId`].

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use beru_core::{ActionId, GeneratorId, Message, MessengerError, Prompt, StoreError, UserId};
use thiserror::Error;

use crate::directory::DirectoryError;

/// Generator error.
///
/// Any error makes the engine send the error prompt instead.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Messenger error: {0}")]
    Messenger(#[from] MessengerError),
}

/// Rewrites a prompt right before it is sent.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Fill in `prompt` for the user who sent `trigger`.
    ///
    /// # Errors
    /// Returns error if the data needed to build the prompt is unavailable.
    async fn generate(&self, trigger: &Message, prompt: &mut Prompt) -> Result<(), GeneratorError>;
}

/// Terminal action error.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Expected a response at position {0}")]
    MissingResponse(usize),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Nothing stored at {0}")]
    MissingKey(String),
    #[error("User {0} is not allowed to do that")]
    Forbidden(UserId),
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Messenger error: {0}")]
    Messenger(#[from] MessengerError),
}

/// Side-effecting operation run once a dialog is fully answered.
#[async_trait]
pub trait TerminalAction: Send + Sync {
    /// Consume the ordered responses of a completed dialog.
    ///
    /// A slot may hold typed text or a button payload; both arrive as the
    /// message text.
    ///
    /// # Errors
    /// Returns error if the action could not be carried out. Replying to
    /// the user about it is the action's job.
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError>;
}

/// Immutable map from [`GeneratorId`] to generator.
#[derive(Default, Clone)]
pub struct GeneratorRegistry {
    generators: HashMap<GeneratorId, Arc<dyn Generator>>,
}

impl GeneratorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a generator, replacing any previous one with the same id.
    #[must_use]
    pub fn with(mut self, id: GeneratorId, generator: impl Generator + 'static) -> Self {
        self.generators.insert(id, Arc::new(generator));
        self
    }

    /// Look up a generator.
    #[must_use]
    pub fn get(&self, id: GeneratorId) -> Option<&Arc<dyn Generator>> {
        self.generators.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.generators.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

/// Immutable map from [`ActionId`] to terminal action.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<ActionId, Arc<dyn TerminalAction>>,
}

impl ActionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an action, replacing any previous one with the same id.
    #[must_use]
    pub fn with(mut self, id: ActionId, action: impl TerminalAction + 'static) -> Self {
        self.actions.insert(id, Arc::new(action));
        self
    }

    /// Look up an action.
    #[must_use]
    pub fn get(&self, id: ActionId) -> Option<&Arc<dyn TerminalAction>> {
        self.actions.get(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Response at `index`, or `MissingResponse`.
///
/// # Errors
/// Returns `MissingResponse` if the dialog produced fewer answers.
pub fn response_at(responses: &[Message], index: usize) -> Result<&Message, ActionError> {
    responses.get(index).ok_or(ActionError::MissingResponse(index))
}
