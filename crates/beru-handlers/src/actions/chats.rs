use async_trait::async_trait;
use beru_core::{ChatId, KeyValueStore, Message, Messenger, keys};
use beru_session::{ActionError, TerminalAction, directory::parse_id, registry::response_at};

use crate::context::HandlerContext;

/// The chat id carried by a pressed chat button, if the sender manages it.
async fn picked_chat<S, M>(ctx: &HandlerContext<S, M>, msg: &Message) -> Result<ChatId, ActionError>
where
    S: KeyValueStore,
    M: Messenger,
{
    let chat = parse_id("response", &msg.text).ok();
    let managed = match chat {
        Some(chat) => ctx.directory.user_chats(msg.sender.id).await?.contains(&chat),
        None => false,
    };
    match chat {
        Some(chat) if managed => Ok(chat),
        _ => {
            ctx.reply(msg, "You aren't managing that chat, pick one from the keyboard.")
                .await;
            Err(ActionError::Forbidden(msg.sender.id))
        }
    }
}

action! {
    /// Point the sender's management commands at another chat.
    SwitchChat
}

#[async_trait]
impl<S, M> TerminalAction for SwitchChat<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let chat = picked_chat(&self.ctx, msg).await?;
                self.ctx.directory.set_active_chat(msg.sender.id, chat).await?;
                let title = self.ctx.directory.chat_title(chat).await?;
                self.ctx
                    .reply(msg, &format!("switched to managing chat {title}"))
                    .await;
                Ok(())
            })
            .await
    }
}

action! {
    /// Stop managing a chat for the sender.
    RemoveChat
}

#[async_trait]
impl<S, M> TerminalAction for RemoveChat<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let user = msg.sender.id;
                let chat = picked_chat(&self.ctx, msg).await?;

                self.ctx
                    .store
                    .set_remove(&keys::user_chats(user), &chat.to_string())
                    .await?;
                self.ctx
                    .store
                    .set_remove(&keys::chat_active_admins(chat), &user.to_string())
                    .await?;
                let was_active = matches!(
                    self.ctx.directory.active_chat(user).await,
                    Ok((active, _)) if active == chat
                );
                if was_active {
                    self.ctx.directory.clear_active_chat(user).await?;
                }
                tracing::info!(user, chat, was_active, "chat removed");

                let title = self.ctx.directory.chat_title(chat).await?;
                self.ctx
                    .reply(msg, &format!("beru won't manage {title} for you anymore."))
                    .await;
                Ok(())
            })
            .await
    }
}

action! {
    /// Send the sender a link that adds the bot to a group.
    AddChat
}

#[async_trait]
impl<S, M> TerminalAction for AddChat<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        let msg = response_at(responses, 0)?;
        let link = self.ctx.config.invite_link(msg.sender.id);
        self.ctx
            .reply(msg, &format!("Click this link to invite beru to your chat: {link}"))
            .await;
        Ok(())
    }
}
