//! Chat membership events: the bot joining a group, users joining a group.

use beru_core::{KeyValueStore, Message, Messenger, Recipient, User, keys};
use beru_handlers::HandlerContext;
use bytes::Bytes;

use crate::DispatchError;

/// Whether `user` looks like a bot account by its username.
#[must_use]
pub fn is_bot_username(user: &User) -> bool {
    user.is_bot || user.username.to_lowercase().ends_with("bot")
}

/// Handles join notifications.
pub struct ChatEvents<S, M> {
    ctx: HandlerContext<S, M>,
}

impl<S, M> ChatEvents<S, M>
where
    S: KeyValueStore,
    M: Messenger,
{
    #[must_use]
    pub const fn new(ctx: HandlerContext<S, M>) -> Self {
        Self { ctx }
    }

    /// Whether `user` is this bot.
    pub fn is_self(&self, user: &User) -> bool {
        user.username.eq_ignore_ascii_case(&self.ctx.config.bot_username)
    }

    /// Record a group the bot was just added to, with the sender as owner.
    ///
    /// # Errors
    /// Returns error if a store write fails.
    pub async fn bot_added(&self, msg: &Message) -> Result<(), DispatchError> {
        let chat = msg.chat.id;
        let owner = msg.sender.id;
        let store = &self.ctx.store;

        store.set_add(keys::BOT_CHATS, &chat.to_string()).await?;
        store.set_add(&keys::user_chats(owner), &chat.to_string()).await?;
        self.ctx.directory.remember_user(&msg.sender).await?;
        store
            .set_add(&keys::chat_active_admins(chat), &owner.to_string())
            .await?;
        store
            .set(&keys::chat_owner(chat), Bytes::from(owner.to_string()), None)
            .await?;
        store
            .set(&keys::chat_title(chat), Bytes::from(msg.chat.title.clone()), None)
            .await?;
        store
            .set(&keys::chat_delete_join_notification(chat), Bytes::from_static(b"0"), None)
            .await?;

        match self.ctx.messenger.chat_admins(chat).await {
            Ok(admins) => {
                for admin in admins {
                    self.ctx.directory.remember_user(&admin).await?;
                    store
                        .set_add(&keys::chat_admins(chat), &admin.id.to_string())
                        .await?;
                }
            }
            Err(e) => {
                tracing::error!(chat, "error fetching admins for new chat: {e}");
                self.ctx.reply(msg, &self.ctx.config.error_response).await;
            }
        }

        tracing::info!(chat, title = %msg.chat.title, owner, inviter = %msg.sender.username, "beru joined chat");
        self.ctx.directory.set_active_chat(owner, chat).await?;
        self.ctx
            .reply(msg, &format!("beru joined chat {}", msg.chat.title))
            .await;
        Ok(())
    }

    /// Enforce the bot whitelist, post the welcome message, and tidy up
    /// the join notice.
    ///
    /// # Errors
    /// Returns error if a store operation fails.
    pub async fn users_joined(&self, msg: &Message) -> Result<(), DispatchError> {
        let chat = msg.chat.id;
        let store = &self.ctx.store;
        let whitelist = keys::chat_bot_whitelist(chat);

        let mut people = Vec::new();
        for user in &msg.users_joined {
            if !is_bot_username(user) {
                people.push(user);
                continue;
            }
            if store.set_contains(&whitelist, &user.username).await? {
                continue;
            }
            tracing::info!(chat, bot = %user.username, "banning bot that isn't whitelisted");
            if let Err(e) = self.ctx.messenger.ban(chat, user.id).await {
                tracing::error!(chat, bot = %user.username, "unable to ban bot: {e}");
                continue;
            }
            self.send(
                chat,
                &format!("@{} isn't on the bot whitelist for this chat.", user.username),
            )
            .await;
        }

        if !people.is_empty() {
            self.welcome(chat, &people).await?;
        }

        let delete = store
            .get(&keys::chat_delete_join_notification(chat))
            .await?
            .is_some_and(|raw| raw.as_ref() != b"0");
        if delete {
            if let Err(e) = self.ctx.messenger.delete_message(chat, msg.id).await {
                tracing::warn!(chat, message = msg.id, "unable to delete join notice: {e}");
            }
        }
        Ok(())
    }

    /// Count joins and post the welcome message every `limit` of them.
    async fn welcome(&self, chat: i64, people: &[&User]) -> Result<(), DispatchError> {
        let store = &self.ctx.store;
        let Some(limit) = store.get(&keys::chat_users_joined_limit(chat)).await? else {
            return Ok(());
        };
        let limit: i64 = match String::from_utf8_lossy(&limit).trim().parse() {
            Ok(n) if n > 0 => n,
            _ => {
                tracing::warn!(chat, "ignoring invalid welcome interval");
                return Ok(());
            }
        };

        let mut due = false;
        for _ in people {
            let joined = store.incr(&keys::chat_users_joined_count(chat)).await?;
            due |= joined % limit == 0;
        }
        if !due {
            return Ok(());
        }

        let Some(template) = store.get(&keys::chat_users_joined_message(chat)).await? else {
            return Ok(());
        };
        let names: Vec<String> = people
            .iter()
            .map(|u| {
                if u.username.is_empty() {
                    u.display_name()
                } else {
                    format!("@{}", u.username)
                }
            })
            .collect();
        let text = String::from_utf8_lossy(&template).replace("$username", &names.join(", "));
        self.send(chat, &text).await;
        Ok(())
    }

    async fn send(&self, chat: i64, text: &str) {
        if let Err(e) = self.ctx.messenger.send(Recipient::Chat(chat), text, None).await {
            tracing::error!(chat, "unable to send to chat: {e}");
        }
    }
}
