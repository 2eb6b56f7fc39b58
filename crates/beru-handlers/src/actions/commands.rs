use async_trait::async_trait;
use beru_core::{KeyValueStore, Message, Messenger, keys};
use beru_session::{ActionError, TerminalAction, registry::response_at};

use super::answer;

/// Normalize a custom command name to `/name`.
///
/// Returns `None` for names that could never be typed as one word.
pub fn command_name(raw: &str) -> Option<String> {
    let name = raw.trim();
    let name = name.strip_prefix('/').unwrap_or(name);
    if name.is_empty() || name.chars().any(char::is_whitespace) {
        return None;
    }
    Some(format!("/{}", name.to_lowercase()))
}

action! {
    /// Add or replace a custom command of the active chat.
    AddCommand
}

#[async_trait]
impl<S, M> TerminalAction for AddCommand<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let (chat, title) = self.ctx.active_chat(msg).await?;

                let Some(name) = command_name(&msg.text) else {
                    self.ctx
                        .reply(msg, "Command names are a single word, like /rules.")
                        .await;
                    return Err(ActionError::InvalidInput(msg.text.clone()));
                };
                let reply = answer(responses, 1)?;
                if reply.is_empty() {
                    self.ctx.reply(msg, "The response can't be empty.").await;
                    return Err(ActionError::InvalidInput(String::new()));
                }

                self.ctx
                    .store
                    .hash_set(&keys::chat_commands(chat), &name, reply)
                    .await?;
                tracing::info!(chat, command = %name, "custom command saved");
                self.ctx
                    .reply(msg, &format!("added/updated command {name} for {title}"))
                    .await;
                Ok(())
            })
            .await
    }
}

action! {
    /// Delete a custom command of the active chat.
    RemoveCommand
}

#[async_trait]
impl<S, M> TerminalAction for RemoveCommand<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let (chat, title) = self.ctx.active_chat(msg).await?;
                let key = keys::chat_commands(chat);

                let removed = match command_name(&msg.text) {
                    Some(name) => self.ctx.store.hash_delete(&key, &name).await?.then_some(name),
                    None => None,
                };
                let Some(name) = removed else {
                    self.ctx
                        .reply(msg, &format!("{title} has no command {}", msg.text.trim()))
                        .await;
                    return Err(ActionError::MissingKey(key));
                };
                tracing::info!(chat, command = %name, "custom command removed");
                self.ctx
                    .reply(msg, &format!("removed command {name} from {title}"))
                    .await;
                Ok(())
            })
            .await
    }
}

action! {
    /// List the custom commands of the active chat.
    ViewCommands
}

#[async_trait]
impl<S, M> TerminalAction for ViewCommands<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let (chat, title) = self.ctx.active_chat(msg).await?;

                let mut names = self.ctx.store.hash_keys(&keys::chat_commands(chat)).await?;
                names.sort();
                let text = if names.is_empty() {
                    format!("{title} doesn't have any custom commands yet, try /addcommand.")
                } else {
                    format!("commands for {title}: {}", names.join(", "))
                };
                self.ctx.reply(msg, &text).await;
                Ok(())
            })
            .await
    }
}
