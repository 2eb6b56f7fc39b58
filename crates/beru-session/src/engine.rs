//! Dialog session engine.
//!
//! A user has at most one dialog in flight. [`DialogEngine::begin`] replaces
//! whatever was there and sends the first prompt; every later text message
//! goes through [`DialogEngine::step`], which records it as the answer to
//! the outstanding prompt and either sends the next prompt or runs the
//! dialog's terminal action.
//!
//! While a dialog is stored it is waiting for the answer to
//! `prompts[cursor]`, and `responses.len() == cursor`. TTL expiry silently
//! returns the user to having no dialog.

use std::sync::Arc;

use beru_core::{
    ActionId, BotConfig, ChatId, Dialog, KeyValueStore, Message, Messenger, Prompt, UserId,
};
use thiserror::Error;

use crate::{
    buttons::ButtonRouter,
    directory::{Directory, DirectoryError},
    locks::SessionLocks,
    registry::{ActionRegistry, GeneratorRegistry},
    session::{SessionError, SessionStore},
};

/// Engine error. Never surfaced to callers, only logged.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("User {user} lacks admin management access for chat {chat}")]
    PermissionDenied { user: UserId, chat: ChatId },
    #[error("Terminal action not registered: {0}")]
    UnregisteredAction(ActionId),
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
}

/// Drives dialogs: begin, step, and completion.
pub struct DialogEngine<S, M>
where
    S: KeyValueStore,
    M: Messenger,
{
    sessions: SessionStore<S>,
    directory: Directory<S>,
    messenger: Arc<M>,
    generators: Arc<GeneratorRegistry>,
    actions: Arc<ActionRegistry>,
    buttons: Arc<ButtonRouter>,
    locks: SessionLocks,
    error_response: String,
}

impl<S, M> DialogEngine<S, M>
where
    S: KeyValueStore,
    M: Messenger,
{
    /// Create a new engine.
    #[must_use]
    pub fn new(
        store: Arc<S>,
        messenger: Arc<M>,
        generators: Arc<GeneratorRegistry>,
        actions: Arc<ActionRegistry>,
        buttons: Arc<ButtonRouter>,
        config: &BotConfig,
    ) -> Self {
        Self {
            sessions: SessionStore::new(Arc::clone(&store), config.session_ttl()),
            directory: Directory::new(store),
            messenger,
            generators,
            actions,
            buttons,
            locks: SessionLocks::new(),
            error_response: config.error_response.clone(),
        }
    }

    /// The session store adapter.
    #[must_use]
    pub const fn sessions(&self) -> &SessionStore<S> {
        &self.sessions
    }

    /// Registered terminal actions.
    #[must_use]
    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Whether `user` has a dialog in flight.
    pub async fn has_session(&self, user: UserId) -> bool {
        self.sessions.is_active(user).await
    }

    /// Start `dialog` for the sender of `trigger`, discarding any other.
    ///
    /// Owner-only dialogs are refused, with a reply to the user, unless the
    /// sender owns their active chat. Nothing is stored on refusal.
    pub async fn begin(&self, trigger: &Message, dialog: Dialog) {
        let user = trigger.sender.id;
        let _lease = self.locks.lock(user).await;

        match self.try_begin(trigger, dialog).await {
            Ok(()) => {}
            Err(EngineError::PermissionDenied { user, chat }) => {
                tracing::info!(user, chat, "refused owner-only dialog");
            }
            Err(e) => tracing::error!(user, "unable to begin dialog: {e}"),
        }
    }

    async fn try_begin(&self, trigger: &Message, mut dialog: Dialog) -> Result<(), EngineError> {
        let user = trigger.sender.id;
        self.sessions.clear(user).await?;
        self.buttons.clear(user);

        if dialog.owner_only {
            self.check_owner(trigger).await?;
        }

        tracing::debug!(user, dialog = %dialog.id, prompts = dialog.prompts.len(), "beginning dialog");
        // The trigger's text is a command or button label, not an answer.
        let trigger = trigger.with_text("");
        dialog.cursor = 0;
        dialog.responses.clear();
        self.present(&trigger, dialog).await
    }

    async fn check_owner(&self, trigger: &Message) -> Result<(), EngineError> {
        let user = trigger.sender.id;
        let (chat, title) = match self.directory.active_chat(user).await {
            Ok(active) => active,
            Err(e @ DirectoryError::NoActiveChat(_)) => {
                self.reply(
                    trigger,
                    "You need to pick a chat to manage first, try /switchchat or /addchat.",
                )
                .await;
                return Err(e.into());
            }
            Err(e) => {
                self.reply(trigger, &self.error_response).await;
                return Err(e.into());
            }
        };

        match self.directory.has_admin_access(user, chat).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                self.reply(
                    trigger,
                    &format!("You don't have admin management access for {title}."),
                )
                .await;
                Err(EngineError::PermissionDenied { user, chat })
            }
            Err(e) => {
                self.reply(trigger, &self.error_response).await;
                Err(e.into())
            }
        }
    }

    /// Feed `incoming` to the sender's dialog.
    ///
    /// A no-op (logged) when the sender has no live dialog, including when
    /// it expired or its payload is unreadable.
    ///
    /// A message without text is ignored: the outstanding prompt keeps
    /// waiting and nothing is sent, so `responses.len() == cursor` holds
    /// for every stored dialog.
    pub async fn step(&self, incoming: &Message) {
        let user = incoming.sender.id;
        let _lease = self.locks.lock(user).await;

        match self.try_step(incoming).await {
            Ok(()) => {}
            Err(EngineError::Session(SessionError::NoActiveSession(user))) => {
                tracing::debug!(user, "step without an active dialog");
            }
            Err(EngineError::Session(SessionError::Serialization(e))) => {
                tracing::error!(user, "discarding unreadable dialog: {e}");
                if let Err(e) = self.sessions.clear(user).await {
                    tracing::error!(user, "unable to delete unreadable dialog: {e}");
                }
            }
            Err(e) => tracing::error!(user, "unable to step dialog: {e}"),
        }
    }

    async fn try_step(&self, incoming: &Message) -> Result<(), EngineError> {
        let user = incoming.sender.id;
        let mut dialog = self.sessions.require(user).await?;

        if incoming.text.is_empty() {
            tracing::debug!(user, dialog = %dialog.id, "ignoring message without text");
            return Ok(());
        }

        dialog.responses.push(incoming.clone());
        dialog.cursor += 1;
        self.present(incoming, dialog).await
    }

    /// Send the prompt at the cursor and persist, or finish the dialog.
    async fn present(&self, trigger: &Message, dialog: Dialog) -> Result<(), EngineError> {
        let user = trigger.sender.id;
        let Some(prompt) = dialog.current_prompt().cloned() else {
            return self.complete(user, dialog).await;
        };

        let prompt = self.generate(trigger, prompt).await;
        self.reply_with(trigger, &prompt).await;
        match &prompt.keyboard {
            Some(keyboard) => self.buttons.bind(user, keyboard, dialog.terminal_action),
            None => self.buttons.clear(user),
        }

        self.sessions.save(user, &dialog).await?;
        tracing::debug!(user, dialog = %dialog.id, cursor = dialog.cursor, "awaiting answer");
        Ok(())
    }

    /// Run the prompt's generator, if any, on a fresh copy of the prompt.
    async fn generate(&self, trigger: &Message, prompt: Prompt) -> Prompt {
        let Some(id) = prompt.generator else {
            return prompt;
        };
        let Some(generator) = self.generators.get(id) else {
            tracing::error!(generator = %id, "generator not registered");
            return Prompt::error(&self.error_response);
        };

        let mut generated = prompt;
        match generator.generate(trigger, &mut generated).await {
            Ok(()) => generated,
            Err(e) => {
                tracing::error!(generator = %id, user = trigger.sender.id, "generator failed: {e}");
                Prompt::error(&self.error_response)
            }
        }
    }

    /// Delete the dialog, then run its terminal action.
    ///
    /// Deleting first means a failed delete leaves the action un-run rather
    /// than letting a retry run it twice.
    async fn complete(&self, user: UserId, dialog: Dialog) -> Result<(), EngineError> {
        tracing::info!(user, dialog = %dialog.id, responses = dialog.responses.len(), "reached the end of the dialog");
        self.sessions.clear(user).await?;
        self.buttons.clear(user);

        let Some(id) = dialog.terminal_action else {
            return Ok(());
        };
        let Some(action) = self.actions.get(id) else {
            return Err(EngineError::UnregisteredAction(id));
        };
        if let Err(e) = action.invoke(&dialog.responses).await {
            tracing::warn!(user, action = %id, "terminal action failed: {e}");
        }
        Ok(())
    }

    async fn reply(&self, to: &Message, text: &str) {
        if let Err(e) = self.messenger.send(to.reply_target(), text, None).await {
            tracing::error!(user = to.sender.id, "unable to send reply: {e}");
        }
    }

    async fn reply_with(&self, to: &Message, prompt: &Prompt) {
        if let Err(e) = self
            .messenger
            .send(to.reply_target(), &prompt.text, prompt.keyboard.as_ref())
            .await
        {
            tracing::error!(user = to.sender.id, "unable to send prompt: {e}");
        }
    }
}
