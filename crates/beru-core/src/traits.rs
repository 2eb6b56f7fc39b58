//! Collaborator traits: key-value store, messaging client, price feed.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::{ChatId, KeyboardSpec, Recipient, User, UserId};

/// Key-value store error.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Wrong value type at key {0}")]
    WrongType(String),
    #[error("Store error: {0}")]
    Internal(String),
}

/// TTL-capable key-value store with set and hash primitives.
///
/// Missing keys are `Ok(None)` / empty collections, never errors.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get a string value.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, StoreError>;

    /// Set a string value. `ttl` of `None` keeps it until deleted.
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Delete a key of any type. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Increment an integer value, creating it at 0 first.
    async fn incr(&self, key: &str) -> Result<i64, StoreError>;

    /// Members of a set.
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;

    /// Add a member to a set. Returns whether it was newly added.
    async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Remove a member from a set. Returns whether it was present.
    async fn set_remove(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Whether `member` is in the set.
    async fn set_contains(&self, key: &str, member: &str) -> Result<bool, StoreError>;

    /// Members of `key` that are not in `other`.
    async fn set_difference(&self, key: &str, other: &str) -> Result<Vec<String>, StoreError>;

    /// Get a hash field.
    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<String>, StoreError>;

    /// Set a hash field.
    async fn hash_set(&self, key: &str, field: &str, value: &str) -> Result<(), StoreError>;

    /// Delete a hash field. Returns whether it existed.
    async fn hash_delete(&self, key: &str, field: &str) -> Result<bool, StoreError>;

    /// Field names of a hash.
    async fn hash_keys(&self, key: &str) -> Result<Vec<String>, StoreError>;
}

/// Messaging client error.
#[derive(Debug, Error)]
pub enum MessengerError {
    #[error("Send failed: {0}")]
    SendFailed(String),
    #[error("Chat not found: {0}")]
    ChatNotFound(ChatId),
    #[error("Platform error: {0}")]
    Platform(String),
}

/// Outbound side of the messaging platform.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Send text, optionally with a reply keyboard.
    async fn send(
        &self,
        to: Recipient,
        text: &str,
        keyboard: Option<&KeyboardSpec>,
    ) -> Result<(), MessengerError>;

    /// Administrators of a chat as reported by the platform.
    async fn chat_admins(&self, chat: ChatId) -> Result<Vec<User>, MessengerError>;

    /// Remove a user from a chat permanently.
    async fn ban(&self, chat: ChatId, user: UserId) -> Result<(), MessengerError>;

    /// Delete a message from a chat.
    async fn delete_message(&self, chat: ChatId, message_id: i64) -> Result<(), MessengerError>;
}

/// Price feed error.
#[derive(Debug, Error)]
pub enum PriceError {
    #[error("Unknown token: {0}")]
    UnknownToken(String),
    #[error("No {0} quote for token")]
    MissingQuote(String),
    #[error("Price request failed: {0}")]
    Request(String),
}

/// Latest market data for one token.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub name: String,
    pub symbol: String,
    pub slug: String,
    /// Price in USD.
    pub price: f64,
    /// 24h change of the USD price, in percent.
    pub price_pct_change: f64,
    /// Price in the conversion currency.
    pub conversion: f64,
    /// 24h change of the converted price, in percent.
    pub conversion_pct_change: f64,
}

/// Source of token prices for the `/price` command.
#[async_trait]
pub trait PriceFeed: Send + Sync {
    /// Latest quote for the token `slug`, in USD and in `conversion`.
    async fn quote(&self, slug: &str, conversion: &str) -> Result<Quote, PriceError>;
}
