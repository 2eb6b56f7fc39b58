//! Core types for the beru chat management bot.
//!
//! This crate provides the fundamental building blocks:
//! - `Message`, `User`, `Chat` - Platform-neutral inbound data
//! - `Dialog` / `Prompt` - Persisted multi-step prompt sequences
//! - `KeyboardSpec` - Reply keyboards with hidden button payloads
//! - `KeyValueStore`, `Messenger` and `PriceFeed` collaborator traits
//! - Store key layout and bot configuration

pub mod config;
pub mod dialog;
pub mod keyboard;
pub mod keys;
pub mod message;
pub mod traits;

pub use config::BotConfig;
pub use dialog::{ActionId, Dialog, GeneratorId, Prompt};
pub use keyboard::{Button, KeyboardSpec};
pub use message::{Chat, ChatId, ChatKind, Message, Recipient, User, UserId};
pub use traits::{
    KeyValueStore, Messenger, MessengerError, PriceError, PriceFeed, Quote, StoreError,
};
