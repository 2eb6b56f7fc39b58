//! Inbound routing for the beru bot.
//!
//! Provides:
//! - `Dispatcher` - Entry point for every platform update
//! - `builtins` - Built-in command table and help guide
//! - `ChatEvents` - Bot-added and users-joined handling
//! - `GroupCommands` - `/admins` and `/price` in groups
//! - `CoinMarketCapFeed` - HTTP price feed
//! - `ReplyRenderer` - Custom command and price templates

pub mod builtins;
pub mod dispatcher;
pub mod events;
pub mod group;
pub mod price;
pub mod template;

use beru_core::{MessengerError, PriceError, StoreError};
use beru_session::DirectoryError;
use thiserror::Error;

pub use dispatcher::Dispatcher;
pub use events::ChatEvents;
pub use group::GroupCommands;
pub use price::CoinMarketCapFeed;
pub use template::ReplyRenderer;

/// Dispatch error. Logged by the dispatcher, never surfaced to the platform.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),
    #[error("Messenger error: {0}")]
    Messenger(#[from] MessengerError),
    #[error("Price error: {0}")]
    Price(#[from] PriceError),
    #[error("No price feed configured")]
    PricesUnavailable,
    #[error("Template error: {0}")]
    Template(#[from] minijinja::Error),
}
