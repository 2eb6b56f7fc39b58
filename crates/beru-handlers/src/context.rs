//! Collaborators shared by every generator and action.

use std::{future::Future, sync::Arc};

use beru_core::{BotConfig, ChatId, KeyValueStore, Message, Messenger, Recipient};
use beru_session::{ActionError, Directory, DirectoryError};

/// Reply used when an action needs an active chat and there is none.
pub const NO_ACTIVE_CHAT: &str =
    "You need to pick a chat to manage first, try /switchchat or /addchat.";

/// Store, messenger, directory, and config handed to each handler.
pub struct HandlerContext<S, M> {
    pub store: Arc<S>,
    pub messenger: Arc<M>,
    pub directory: Directory<S>,
    pub config: Arc<BotConfig>,
}

impl<S, M> Clone for HandlerContext<S, M> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            messenger: Arc::clone(&self.messenger),
            directory: self.directory.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<S, M> HandlerContext<S, M>
where
    S: KeyValueStore,
    M: Messenger,
{
    /// Create a context.
    #[must_use]
    pub fn new(store: Arc<S>, messenger: Arc<M>, config: Arc<BotConfig>) -> Self {
        Self {
            directory: Directory::new(Arc::clone(&store)),
            store,
            messenger,
            config,
        }
    }

    /// Send `text` to the sender of `to`, privately. Failures are logged.
    pub async fn reply(&self, to: &Message, text: &str) {
        if let Err(e) = self
            .messenger
            .send(Recipient::User(to.sender.id), text, None)
            .await
        {
            tracing::error!(user = to.sender.id, "unable to send reply: {e}");
        }
    }

    /// The sender's active chat, or `NoActiveChat`.
    ///
    /// # Errors
    /// Returns error if no chat is active or the store fails.
    pub async fn active_chat(&self, msg: &Message) -> Result<(ChatId, String), ActionError> {
        Ok(self.directory.active_chat(msg.sender.id).await?)
    }

    /// Run an action body, telling the user about failures it did not
    /// already explain.
    ///
    /// # Errors
    /// Returns whatever `body` returned.
    pub async fn guard(
        &self,
        responses: &[Message],
        body: impl Future<Output = Result<(), ActionError>> + Send,
    ) -> Result<(), ActionError> {
        let result = body.await;
        if let (Err(e), Some(first)) = (&result, responses.first()) {
            match e {
                ActionError::Directory(DirectoryError::NoActiveChat(_)) => {
                    self.reply(first, NO_ACTIVE_CHAT).await;
                }
                ActionError::Directory(_) | ActionError::Store(_) | ActionError::Messenger(_) => {
                    self.reply(first, &self.config.error_response).await;
                }
                ActionError::MissingResponse(_)
                | ActionError::InvalidInput(_)
                | ActionError::MissingKey(_)
                | ActionError::Forbidden(_) => {}
            }
        }
        result
    }
}
