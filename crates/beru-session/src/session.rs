//! Session store adapter: one TTL-bounded dialog per user.

use std::{sync::Arc, time::Duration};

use beru_core::{Dialog, KeyValueStore, StoreError, UserId, keys};
use thiserror::Error;

use crate::codec::{self, CodecError};

/// Session error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No active dialog for user {0}")]
    NoActiveSession(UserId),
    #[error("Session store error: {0}")]
    Store(#[from] StoreError),
    #[error("Session payload error: {0}")]
    Serialization(#[from] CodecError),
}

/// Reads and writes the persisted dialog of each user.
///
/// Every save refreshes the TTL, so a dialog survives as long as the user
/// keeps answering within the window.
pub struct SessionStore<S> {
    store: Arc<S>,
    ttl: Duration,
}

impl<S> SessionStore<S>
where
    S: KeyValueStore,
{
    /// Create a new adapter over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Rolling lifetime applied on every save.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Load the user's dialog, if one is stored and unexpired.
    ///
    /// # Errors
    /// Returns error if the store fails or the payload is corrupt.
    pub async fn load(&self, user: UserId) -> Result<Option<Dialog>, SessionError> {
        let Some(data) = self.store.get(&keys::active_path(user)).await? else {
            return Ok(None);
        };
        Ok(Some(codec::decode_dialog(&data)?))
    }

    /// Load the user's dialog, failing if there is none.
    ///
    /// # Errors
    /// Returns `NoActiveSession` when nothing is stored.
    pub async fn require(&self, user: UserId) -> Result<Dialog, SessionError> {
        self.load(user)
            .await?
            .ok_or(SessionError::NoActiveSession(user))
    }

    /// Persist the user's dialog with a fresh TTL.
    ///
    /// # Errors
    /// Returns error if encoding or the store write fails.
    pub async fn save(&self, user: UserId, dialog: &Dialog) -> Result<(), SessionError> {
        let data = codec::encode_dialog(dialog)?;
        self.store
            .set(&keys::active_path(user), data, Some(self.ttl))
            .await?;
        Ok(())
    }

    /// Remove the user's dialog. Returns whether one was stored.
    ///
    /// # Errors
    /// Returns error if the store delete fails.
    pub async fn clear(&self, user: UserId) -> Result<bool, SessionError> {
        Ok(self.store.delete(&keys::active_path(user)).await?)
    }

    /// Whether the user has a stored dialog.
    ///
    /// Corrupt payloads count as no dialog.
    pub async fn is_active(&self, user: UserId) -> bool {
        matches!(self.load(user).await, Ok(Some(_)))
    }
}
