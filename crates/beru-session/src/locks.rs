//! Per-user exclusive leases over the read-modify-write of a dialog.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use beru_core::UserId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Serializes dialog mutations per user.
///
/// Messages from different users never contend. Two messages from the same
/// user are applied one after the other, so neither overwrites the other's
/// update of the stored dialog.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the user's lease, waiting for any holder to finish.
    pub async fn lock(&self, user: UserId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            // Entries nobody holds or waits on can go.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(user).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of users with a held or awaited lease.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|lock| Arc::strong_count(lock) > 1)
            .count()
    }

    /// Whether no lease is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
