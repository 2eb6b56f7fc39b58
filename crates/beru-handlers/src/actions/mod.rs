//! Terminal actions run when a dialog completes.
//!
//! Each action reads its positional responses, mutates the store for the
//! sender's active chat, and tells the sender what happened.

/// Declare an action struct holding a [`HandlerContext`].
macro_rules! action {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<S, M> {
            ctx: $crate::context::HandlerContext<S, M>,
        }

        impl<S, M> $name<S, M> {
            #[must_use]
            pub const fn new(ctx: $crate::context::HandlerContext<S, M>) -> Self {
                Self { ctx }
            }
        }
    };
}

mod admins;
mod chats;
mod commands;
mod features;

use beru_core::{ActionId, KeyValueStore, Message, Messenger};
use beru_session::{ActionError, ActionRegistry, registry::response_at};

use crate::context::HandlerContext;

pub use admins::{AddAdmin, RemoveAdmin, ViewAdmins};
pub use chats::{AddChat, RemoveChat, SwitchChat};
pub use commands::{AddCommand, RemoveCommand, ViewCommands};
pub use features::{
    AddWhitelistedBot, CONVERSIONS, RemoveWhitelistedBot, SetPriceCommand, SetWelcome,
    ToggleJoinMessage,
};

/// Registry with every action wired to `ctx`.
#[must_use]
pub fn registry<S, M>(ctx: &HandlerContext<S, M>) -> ActionRegistry
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    ActionRegistry::new()
        .with(ActionId::AddAdmin, AddAdmin::new(ctx.clone()))
        .with(ActionId::RemoveAdmin, RemoveAdmin::new(ctx.clone()))
        .with(ActionId::ViewAdmins, ViewAdmins::new(ctx.clone()))
        .with(ActionId::AddCommand, AddCommand::new(ctx.clone()))
        .with(ActionId::RemoveCommand, RemoveCommand::new(ctx.clone()))
        .with(ActionId::ViewCommands, ViewCommands::new(ctx.clone()))
        .with(ActionId::SwitchChat, SwitchChat::new(ctx.clone()))
        .with(ActionId::RemoveChat, RemoveChat::new(ctx.clone()))
        .with(ActionId::AddChat, AddChat::new(ctx.clone()))
        .with(ActionId::SetWelcome, SetWelcome::new(ctx.clone()))
        .with(ActionId::ToggleJoinMessage, ToggleJoinMessage::new(ctx.clone()))
        .with(ActionId::AddWhitelistedBot, AddWhitelistedBot::new(ctx.clone()))
        .with(ActionId::RemoveWhitelistedBot, RemoveWhitelistedBot::new(ctx.clone()))
        .with(ActionId::SetPriceCommand, SetPriceCommand::new(ctx.clone()))
}

/// Trimmed text of the response at `index`.
fn answer(responses: &[Message], index: usize) -> Result<&str, ActionError> {
    Ok(response_at(responses, index)?.text.trim())
}
