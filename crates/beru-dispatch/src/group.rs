//! Commands that answer in a group chat: `/admins` and `/price`.

use std::sync::Arc;

use beru_core::{KeyValueStore, Message, Messenger, PriceFeed, Recipient, keys};
use beru_handlers::HandlerContext;

use crate::{DispatchError, template::ReplyRenderer};

/// Handles the group-only built-in commands.
pub struct GroupCommands<S, M> {
    ctx: HandlerContext<S, M>,
    prices: Option<Arc<dyn PriceFeed>>,
}

impl<S, M> GroupCommands<S, M>
where
    S: KeyValueStore,
    M: Messenger,
{
    #[must_use]
    pub const fn new(ctx: HandlerContext<S, M>) -> Self {
        Self { ctx, prices: None }
    }

    /// Answer `/price` from `feed`.
    pub fn set_price_feed(&mut self, feed: Arc<dyn PriceFeed>) {
        self.prices = Some(feed);
    }

    /// List the platform admins of the group `msg` was sent in.
    ///
    /// # Errors
    /// Returns error if the platform can't list the admins.
    pub async fn admins(&self, msg: &Message) -> Result<(), DispatchError> {
        let chat = msg.chat.id;
        let admins = self.ctx.messenger.chat_admins(chat).await?;
        let names: Vec<String> = admins
            .iter()
            .map(|admin| {
                if admin.username.is_empty() {
                    admin.display_name()
                } else {
                    format!("@{}", admin.username)
                }
            })
            .collect();

        let sender = format!("{} {}", msg.sender.first_name, msg.sender.last_name);
        let sender = match sender.trim() {
            "" => msg.sender.display_name(),
            name => name.to_string(),
        };
        self.send(
            Recipient::Chat(chat),
            &format!(
                "Hey {sender}, the admins for this channel are: {}",
                names.join(", ")
            ),
        )
        .await
    }

    /// Post the quote set up with `/setpricecommand` for this group.
    ///
    /// # Errors
    /// Returns error if no feed is configured, the store fails, the quote
    /// can't be fetched, or the message format doesn't render.
    pub async fn price(&self, msg: &Message, renderer: &ReplyRenderer) -> Result<(), DispatchError> {
        let chat = msg.chat.id;
        let key = keys::chat_price(chat);
        let store = &self.ctx.store;
        let (Some(slug), Some(conversion), Some(format)) = (
            store.hash_get(&key, "slug").await?,
            store.hash_get(&key, "conversion").await?,
            store.hash_get(&key, "msgFormat").await?,
        ) else {
            return self
                .send(
                    Recipient::Chat(chat),
                    "There's no price command for this chat yet, an admin can add one with /setpricecommand.",
                )
                .await;
        };
        let Some(prices) = &self.prices else {
            return Err(DispatchError::PricesUnavailable);
        };

        let quote = prices.quote(&slug, &conversion).await?;
        tracing::debug!(chat, slug = %slug, price = quote.price, "price quoted");
        let text = renderer.render_quote(&format, &quote)?;
        self.send(Recipient::Chat(chat), &text).await
    }

    async fn send(&self, to: Recipient, text: &str) -> Result<(), DispatchError> {
        self.ctx.messenger.send(to, text, None).await?;
        Ok(())
    }
}
