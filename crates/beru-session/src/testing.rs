//! Recording messenger and fixed price feed for tests.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use beru_core::{
    ChatId, KeyboardSpec, Messenger, MessengerError, PriceError, PriceFeed, Quote, Recipient, User,
    UserId,
};

/// A message the bot sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub to: Recipient,
    pub text: String,
    pub keyboard: Option<KeyboardSpec>,
}

/// Messenger that records everything instead of talking to a platform.
#[derive(Debug, Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<SentMessage>>,
    admins: Mutex<HashMap<ChatId, Vec<User>>>,
    bans: Mutex<Vec<(ChatId, UserId)>>,
    deleted: Mutex<Vec<(ChatId, i64)>>,
}

impl RecordingMessenger {
    /// Report `admins` as the platform admins of `chat`.
    pub fn set_chat_admins(&self, chat: ChatId, admins: Vec<User>) {
        self.admins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(chat, admins);
    }

    /// Everything sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Texts sent so far.
    #[must_use]
    pub fn texts(&self) -> Vec<String> {
        self.sent().into_iter().map(|m| m.text).collect()
    }

    /// The most recent message sent.
    #[must_use]
    pub fn last(&self) -> Option<SentMessage> {
        self.sent().pop()
    }

    /// Users banned so far.
    #[must_use]
    pub fn bans(&self) -> Vec<(ChatId, UserId)> {
        self.bans.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Messages deleted so far.
    #[must_use]
    pub fn deleted(&self) -> Vec<(ChatId, i64)> {
        self.deleted.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send(
        &self,
        to: Recipient,
        text: &str,
        keyboard: Option<&KeyboardSpec>,
    ) -> Result<(), MessengerError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentMessage {
                to,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
            });
        Ok(())
    }

    async fn chat_admins(&self, chat: ChatId) -> Result<Vec<User>, MessengerError> {
        self.admins
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&chat)
            .cloned()
            .ok_or(MessengerError::ChatNotFound(chat))
    }

    async fn ban(&self, chat: ChatId, user: UserId) -> Result<(), MessengerError> {
        self.bans
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((chat, user));
        Ok(())
    }

    async fn delete_message(&self, chat: ChatId, message_id: i64) -> Result<(), MessengerError> {
        self.deleted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((chat, message_id));
        Ok(())
    }
}

/// Price feed that answers from quotes set up front.
#[derive(Debug, Default)]
pub struct FixedPriceFeed {
    quotes: Mutex<HashMap<String, Quote>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl FixedPriceFeed {
    /// Answer requests for `quote.slug` with `quote`.
    pub fn set_quote(&self, quote: Quote) {
        self.quotes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(quote.slug.clone(), quote);
    }

    /// `(slug, conversion)` pairs requested so far.
    #[must_use]
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl PriceFeed for FixedPriceFeed {
    async fn quote(&self, slug: &str, conversion: &str) -> Result<Quote, PriceError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((slug.to_string(), conversion.to_string()));
        self.quotes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(slug)
            .cloned()
            .ok_or_else(|| PriceError::UnknownToken(slug.to_string()))
    }
}
