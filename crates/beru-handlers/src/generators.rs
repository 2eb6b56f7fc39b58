//! Prompt generators: keyboards of chats, admins, and bots to pick from.
//!
//! Every generated button shows a human label and answers with an opaque
//! id, which is what the dialog's terminal action receives.

use std::collections::HashMap;

use async_trait::async_trait;
use beru_core::{Button, GeneratorId, KeyValueStore, KeyboardSpec, Message, Messenger, Prompt, keys};
use beru_session::{Generator, GeneratorError, GeneratorRegistry, directory::parse_id};
use futures::future::try_join_all;

use crate::context::HandlerContext;

pub const NO_CHATS_TEXT: &str =
    "I'm not managing any of your chats yet, use /addchat to invite me to one.";
pub const ONLY_ADMIN_TEXT: &str = "You're the only admin.";
pub const NO_WHITELISTED_BOTS_TEXT: &str = "You don't have any whitelisted bots to remove!";

/// Registry with every generator wired to `ctx`.
#[must_use]
pub fn registry<S, M>(ctx: &HandlerContext<S, M>) -> GeneratorRegistry
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    GeneratorRegistry::new()
        .with(GeneratorId::SwitchChat, ChatPicker { ctx: ctx.clone() })
        .with(GeneratorId::RemoveChat, ChatPicker { ctx: ctx.clone() })
        .with(
            GeneratorId::AddAdmin,
            AdminPicker {
                ctx: ctx.clone(),
                pick: AdminPick::Inactive,
            },
        )
        .with(
            GeneratorId::RemoveAdmin,
            AdminPicker {
                ctx: ctx.clone(),
                pick: AdminPick::Active,
            },
        )
        .with(GeneratorId::RemoveBot, WhitelistedBotPicker { ctx: ctx.clone() })
}

/// Give repeated labels an id suffix so every button stays distinct.
fn distinct_labels(entries: Vec<(String, i64)>) -> Vec<Button> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (label, _) in &entries {
        *seen.entry(label.clone()).or_default() += 1;
    }
    entries
        .into_iter()
        .map(|(label, id)| {
            let label = if label.is_empty() || seen[&label] > 1 {
                format!("{label} ({id})").trim().to_string()
            } else {
                label
            };
            Button::with_payload(label, id.to_string())
        })
        .collect()
}

/// Offers the sender's managed chats.
pub struct ChatPicker<S, M> {
    ctx: HandlerContext<S, M>,
}

#[async_trait]
impl<S, M> Generator for ChatPicker<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn generate(&self, trigger: &Message, prompt: &mut Prompt) -> Result<(), GeneratorError> {
        let directory = &self.ctx.directory;
        let chats = directory.user_chats(trigger.sender.id).await?;
        let titles = try_join_all(chats.iter().map(|chat| directory.chat_title(*chat))).await?;

        if chats.is_empty() {
            prompt.text = NO_CHATS_TEXT.to_string();
            prompt.keyboard = None;
            return Ok(());
        }
        let buttons = distinct_labels(titles.into_iter().zip(chats).collect());
        prompt.keyboard = Some(KeyboardSpec::single_row(buttons));
        Ok(())
    }
}

/// Which admins an [`AdminPicker`] offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminPick {
    /// Platform admins not yet allowed to manage the bot.
    Inactive,
    /// Admins currently allowed to manage the bot.
    Active,
}

/// Offers admins of the sender's active chat, never the sender.
pub struct AdminPicker<S, M> {
    ctx: HandlerContext<S, M>,
    pick: AdminPick,
}

impl<S, M> AdminPicker<S, M>
where
    S: KeyValueStore,
    M: Messenger,
{
    /// Pull the chat's current admins from the platform into the store.
    ///
    /// A platform failure leaves the stored set as it was.
    async fn refresh_admins(&self, chat: i64) -> Result<(), GeneratorError> {
        let admins = match self.ctx.messenger.chat_admins(chat).await {
            Ok(admins) => admins,
            Err(e) => {
                tracing::warn!(chat, "unable to fetch chat admins, using stored set: {e}");
                return Ok(());
            }
        };
        let key = keys::chat_admins(chat);
        for admin in admins {
            self.ctx.directory.remember_user(&admin).await?;
            self.ctx.store.set_add(&key, &admin.id.to_string()).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl<S, M> Generator for AdminPicker<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn generate(&self, trigger: &Message, prompt: &mut Prompt) -> Result<(), GeneratorError> {
        let (chat, _) = self.ctx.directory.active_chat(trigger.sender.id).await?;
        let active_key = keys::chat_active_admins(chat);

        let (key, members) = match self.pick {
            AdminPick::Inactive => {
                self.refresh_admins(chat).await?;
                let all_key = keys::chat_admins(chat);
                let members = self.ctx.store.set_difference(&all_key, &active_key).await?;
                (all_key, members)
            }
            AdminPick::Active => {
                let members = self.ctx.store.set_members(&active_key).await?;
                (active_key, members)
            }
        };

        let mut ids = Vec::with_capacity(members.len());
        for raw in &members {
            let id = parse_id(&key, raw)?;
            if id != trigger.sender.id {
                ids.push(id);
            }
        }

        if ids.is_empty() {
            prompt.text = ONLY_ADMIN_TEXT.to_string();
            prompt.keyboard = None;
            return Ok(());
        }

        let directory = &self.ctx.directory;
        let names = try_join_all(ids.iter().map(|id| directory.user_display_name(*id))).await?;
        let buttons = distinct_labels(names.into_iter().zip(ids).collect());
        prompt.keyboard = Some(KeyboardSpec::single_row(buttons));
        Ok(())
    }
}

/// Offers the whitelisted bots of the sender's active chat in a grid.
pub struct WhitelistedBotPicker<S, M> {
    ctx: HandlerContext<S, M>,
}

#[async_trait]
impl<S, M> Generator for WhitelistedBotPicker<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn generate(&self, trigger: &Message, prompt: &mut Prompt) -> Result<(), GeneratorError> {
        let (chat, _) = self.ctx.directory.active_chat(trigger.sender.id).await?;
        let bots = self
            .ctx
            .store
            .set_members(&keys::chat_bot_whitelist(chat))
            .await?;

        if bots.is_empty() {
            prompt.text = NO_WHITELISTED_BOTS_TEXT.to_string();
            prompt.keyboard = None;
            return Ok(());
        }
        let buttons = bots.into_iter().map(Button::new).collect();
        prompt.keyboard = Some(KeyboardSpec::grid(buttons, self.ctx.config.buttons_per_row));
        Ok(())
    }
}
