use async_trait::async_trait;
use beru_core::{KeyValueStore, Message, Messenger, keys};
use beru_session::{ActionError, TerminalAction, registry::response_at};
use bytes::Bytes;

use super::answer;

/// Currencies a token price can be converted to.
pub const CONVERSIONS: &[&str] = &[
    "AUD", "BRL", "CAD", "CHF", "CLP", "CNY", "CZK", "DKK", "EUR", "GBP", "HKD", "HUF", "IDR",
    "ILS", "INR", "JPY", "KRW", "MXN", "MYR", "NOK", "NZD", "PHP", "PKR", "PLN", "RUB", "SEK",
    "SGD", "THB", "TRY", "TWD", "ZAR", "BTC", "ETH", "XRP", "LTC", "BCH",
];

/// Bot username without a leading `@`.
fn bot_username(raw: &str) -> &str {
    let name = raw.trim();
    name.strip_prefix('@').unwrap_or(name)
}

action! {
    /// Greet every N joining users with a message.
    SetWelcome
}

#[async_trait]
impl<S, M> TerminalAction for SetWelcome<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let (chat, title) = self.ctx.active_chat(msg).await?;
                let welcome = answer(responses, 0)?;
                let interval = answer(responses, 1)?;

                let every = match interval.parse::<u32>() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        self.ctx
                            .reply(msg, "The number of users has to be a whole number above zero.")
                            .await;
                        return Err(ActionError::InvalidInput(interval.to_string()));
                    }
                };

                let store = &self.ctx.store;
                store
                    .set(
                        &keys::chat_users_joined_message(chat),
                        Bytes::from(welcome.to_string()),
                        None,
                    )
                    .await?;
                store
                    .set(
                        &keys::chat_users_joined_limit(chat),
                        Bytes::from(every.to_string()),
                        None,
                    )
                    .await?;
                store
                    .set(&keys::chat_users_joined_count(chat), Bytes::from_static(b"0"), None)
                    .await?;
                tracing::info!(chat, every, "welcome message set");

                let text = if every == 1 {
                    format!("Every user joining {title} will now be welcomed.")
                } else {
                    format!("Every {every} users joining {title} will now be welcomed.")
                };
                self.ctx.reply(msg, &text).await;
                Ok(())
            })
            .await
    }
}

action! {
    /// Flip whether join notifications in the active chat get deleted.
    ToggleJoinMessage
}

#[async_trait]
impl<S, M> TerminalAction for ToggleJoinMessage<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let (chat, title) = self.ctx.active_chat(msg).await?;
                let key = keys::chat_delete_join_notification(chat);

                let deleting = self
                    .ctx
                    .store
                    .get(&key)
                    .await?
                    .is_some_and(|raw| raw.as_ref() != b"0");
                let now_deleting = !deleting;
                let flag = if now_deleting { "1" } else { "0" };
                self.ctx
                    .store
                    .set(&key, Bytes::from_static(flag.as_bytes()), None)
                    .await?;
                tracing::info!(chat, now_deleting, "join notification deletion toggled");

                let text = if now_deleting {
                    format!("Join notifications in {title} will now be deleted.")
                } else {
                    format!("Join notifications in {title} will now be kept.")
                };
                self.ctx.reply(msg, &text).await;
                Ok(())
            })
            .await
    }
}

action! {
    /// Allow a bot to join the active chat.
    AddWhitelistedBot
}

#[async_trait]
impl<S, M> TerminalAction for AddWhitelistedBot<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let (chat, title) = self.ctx.active_chat(msg).await?;
                let bot = bot_username(&msg.text);
                if bot.is_empty() || bot.contains(char::is_whitespace) {
                    self.ctx
                        .reply(msg, "That doesn't look like a bot username.")
                        .await;
                    return Err(ActionError::InvalidInput(msg.text.clone()));
                }

                self.ctx
                    .store
                    .set_add(&keys::chat_bot_whitelist(chat), bot)
                    .await?;
                tracing::info!(chat, bot, "bot whitelisted");
                self.ctx
                    .reply(msg, &format!("@{bot} is now allowed to join {title}."))
                    .await;
                Ok(())
            })
            .await
    }
}

action! {
    /// Stop allowing a bot to join the active chat.
    RemoveWhitelistedBot
}

#[async_trait]
impl<S, M> TerminalAction for RemoveWhitelistedBot<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let (chat, title) = self.ctx.active_chat(msg).await?;
                let bot = bot_username(&msg.text);
                let key = keys::chat_bot_whitelist(chat);

                if !self.ctx.store.set_remove(&key, bot).await? {
                    self.ctx
                        .reply(msg, &format!("@{bot} isn't whitelisted in {title}."))
                        .await;
                    return Err(ActionError::MissingKey(key));
                }
                tracing::info!(chat, bot, "bot removed from whitelist");
                self.ctx
                    .reply(msg, &format!("@{bot} is no longer allowed to join {title}."))
                    .await;
                Ok(())
            })
            .await
    }
}

action! {
    /// Configure the token price reply of the active chat.
    SetPriceCommand
}

#[async_trait]
impl<S, M> TerminalAction for SetPriceCommand<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    async fn invoke(&self, responses: &[Message]) -> Result<(), ActionError> {
        self.ctx
            .guard(responses, async {
                let msg = response_at(responses, 0)?;
                let (chat, title) = self.ctx.active_chat(msg).await?;
                let slug = answer(responses, 0)?.trim_matches('/').to_lowercase();
                let conversion = answer(responses, 1)?.to_uppercase();
                let format = answer(responses, 2)?;

                if slug.is_empty() || format.is_empty() {
                    self.ctx
                        .reply(msg, "Both the token slug and the message are required.")
                        .await;
                    return Err(ActionError::InvalidInput("empty price setting".into()));
                }
                if !CONVERSIONS.contains(&conversion.as_str()) {
                    self.ctx
                        .reply(
                            msg,
                            &format!(
                                "{conversion} isn't supported, pick one of {}.",
                                CONVERSIONS.join(", ")
                            ),
                        )
                        .await;
                    return Err(ActionError::InvalidInput(conversion));
                }

                let key = keys::chat_price(chat);
                let store = &self.ctx.store;
                store.hash_set(&key, "slug", &slug).await?;
                store.hash_set(&key, "conversion", &conversion).await?;
                store.hash_set(&key, "msgFormat", format).await?;
                tracing::info!(chat, slug = %slug, conversion = %conversion, "price command set");

                self.ctx
                    .reply(msg, &format!("Price command for {title} now tracks {slug} in {conversion}."))
                    .await;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::test_support::{ctx, last_text, owner_of_team, said};

    #[tokio::test]
    async fn test_set_welcome() {
        let ctx = ctx();
        owner_of_team(&ctx).await;

        SetWelcome::new(ctx.clone())
            .invoke(&said(&["Hi $username!", "5"]))
            .await
            .unwrap();

        let limit = ctx
            .store
            .get(&keys::chat_users_joined_limit(-100))
            .await
            .unwrap();
        assert_eq!(limit.as_deref(), Some(&b"5"[..]));
        let message = ctx
            .store
            .get(&keys::chat_users_joined_message(-100))
            .await
            .unwrap();
        assert_eq!(message.as_deref(), Some(&b"Hi $username!"[..]));
        assert_eq!(last_text(&ctx), "Every 5 users joining Team will now be welcomed.");
    }

    #[tokio::test]
    async fn test_set_welcome_rejects_bad_interval() {
        let ctx = ctx();
        owner_of_team(&ctx).await;
        for bad in ["0", "-3", "lots"] {
            let err = SetWelcome::new(ctx.clone())
                .invoke(&said(&["hi", bad]))
                .await
                .unwrap_err();
            assert!(matches!(err, ActionError::InvalidInput(_)));
        }
        assert!(
            ctx.store
                .get(&keys::chat_users_joined_limit(-100))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_toggle_join_message_flips() {
        let ctx = ctx();
        owner_of_team(&ctx).await;
        let toggle = ToggleJoinMessage::new(ctx.clone());
        let key = keys::chat_delete_join_notification(-100);

        toggle.invoke(&said(&["/togglejoinmsg"])).await.unwrap();
        assert_eq!(ctx.store.get(&key).await.unwrap().as_deref(), Some(&b"1"[..]));
        assert_eq!(last_text(&ctx), "Join notifications in Team will now be deleted.");

        toggle.invoke(&said(&["/togglejoinmsg"])).await.unwrap();
        assert_eq!(ctx.store.get(&key).await.unwrap().as_deref(), Some(&b"0"[..]));
    }

    #[tokio::test]
    async fn test_whitelist_add_and_remove() {
        let ctx = ctx();
        owner_of_team(&ctx).await;
        let key = keys::chat_bot_whitelist(-100);

        AddWhitelistedBot::new(ctx.clone())
            .invoke(&said(&["@PriceBot"]))
            .await
            .unwrap();
        assert!(ctx.store.set_contains(&key, "PriceBot").await.unwrap());

        RemoveWhitelistedBot::new(ctx.clone())
            .invoke(&said(&["PriceBot"]))
            .await
            .unwrap();
        assert!(!ctx.store.set_contains(&key, "PriceBot").await.unwrap());

        let err = RemoveWhitelistedBot::new(ctx.clone())
            .invoke(&said(&["PriceBot"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::MissingKey(_)));
        assert_eq!(last_text(&ctx), "@PriceBot isn't whitelisted in Team.");
    }

    #[tokio::test]
    async fn test_set_price_command() {
        let ctx = ctx();
        owner_of_team(&ctx).await;
        let key = keys::chat_price(-100);

        let err = SetPriceCommand::new(ctx.clone())
            .invoke(&said(&["ethereum", "doge", "{{price}}"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ActionError::InvalidInput(_)));
        assert!(ctx.store.hash_keys(&key).await.unwrap().is_empty());

        SetPriceCommand::new(ctx.clone())
            .invoke(&said(&["ethereum", "btc", "{{ticker}} at {{price}}"]))
            .await
            .unwrap();
        assert_eq!(
            ctx.store.hash_get(&key, "conversion").await.unwrap().as_deref(),
            Some("BTC")
        );
        assert_eq!(
            ctx.store.hash_get(&key, "msgFormat").await.unwrap().as_deref(),
            Some("{{ticker}} at {{price}}")
        );
    }
}
