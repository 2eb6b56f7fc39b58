//! Prompt generators and terminal actions for the beru bot.
//!
//! Provides:
//! - `HandlerContext` - Collaborators every handler works against
//! - `generators` - Keyboards of chats, admins, and bots to choose from
//! - `actions` - Store mutations run when a dialog completes

pub mod actions;
pub mod context;
pub mod generators;

use beru_core::{KeyValueStore, Messenger};
use beru_session::{ActionRegistry, GeneratorRegistry};

pub use context::{HandlerContext, NO_ACTIVE_CHAT};

/// Both registries, fully populated for `ctx`.
#[must_use]
pub fn registries<S, M>(ctx: &HandlerContext<S, M>) -> (GeneratorRegistry, ActionRegistry)
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    (generators::registry(ctx), actions::registry(ctx))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use beru_core::{ActionId, BotConfig, GeneratorId};
    use beru_session::{storage::MemoryStore, testing::RecordingMessenger};

    use super::*;

    #[test]
    fn test_every_identifier_is_registered() {
        let ctx = HandlerContext::new(
            Arc::new(MemoryStore::new()),
            Arc::new(RecordingMessenger::default()),
            Arc::new(BotConfig::default()),
        );
        let (generators, actions) = registries(&ctx);

        for id in [
            GeneratorId::SwitchChat,
            GeneratorId::RemoveChat,
            GeneratorId::AddAdmin,
            GeneratorId::RemoveAdmin,
            GeneratorId::RemoveBot,
        ] {
            assert!(generators.get(id).is_some(), "{id} missing");
        }
        assert_eq!(actions.len(), 14);
        assert!(actions.get(ActionId::SetPriceCommand).is_some());
    }
}
