//! Dialog session engine and session storage for the beru bot.
//!
//! Provides:
//! - `DialogEngine` - Begin/step state machine over persisted dialogs
//! - `SessionStore` - TTL-bounded per-user dialog persistence
//! - `GeneratorRegistry` / `ActionRegistry` - Identifier-keyed handlers
//! - `Directory` - Chat, owner, and user lookups
//! - Store implementations (memory)

pub mod buttons;
pub mod codec;
pub mod directory;
pub mod engine;
pub mod locks;
pub mod registry;
pub mod session;
pub mod storage;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use buttons::{ButtonBinding, ButtonRouter};
pub use directory::{Directory, DirectoryError};
pub use engine::{DialogEngine, EngineError};
pub use registry::{
    ActionError, ActionRegistry, Generator, GeneratorError, GeneratorRegistry, TerminalAction,
};
pub use session::{SessionError, SessionStore};
