//! Store-backed lookups of chats, owners, and users.

use std::sync::Arc;

use beru_core::{ChatId, KeyValueStore, StoreError, User, UserId, keys};
use bytes::Bytes;
use thiserror::Error;

use crate::codec::{self, CodecError};

/// Directory error.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("No active chat set for user {0}")]
    NoActiveChat(UserId),
    #[error("Value at {key} is not a valid id: {value}")]
    InvalidId { key: String, value: String },
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Parse a stored integer id, naming the key on failure.
///
/// # Errors
/// Returns `InvalidId` if `raw` is not an integer.
pub fn parse_id(key: &str, raw: &str) -> Result<i64, DirectoryError> {
    raw.trim().parse().map_err(|_| DirectoryError::InvalidId {
        key: key.to_string(),
        value: raw.to_string(),
    })
}

/// Chat and user lookups over the key-value store.
pub struct Directory<S> {
    store: Arc<S>,
}

impl<S> Clone for Directory<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> Directory<S>
where
    S: KeyValueStore,
{
    /// Create a directory over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    async fn get_id(&self, key: &str) -> Result<Option<i64>, DirectoryError> {
        match self.store.get(key).await? {
            None => Ok(None),
            Some(raw) => parse_id(key, &String::from_utf8_lossy(&raw)).map(Some),
        }
    }

    /// The chat the user is managing and its title.
    ///
    /// # Errors
    /// Returns `NoActiveChat` when the user has not picked a chat.
    pub async fn active_chat(&self, user: UserId) -> Result<(ChatId, String), DirectoryError> {
        let chat = self
            .get_id(&keys::active_chat(user))
            .await?
            .ok_or(DirectoryError::NoActiveChat(user))?;
        let title = self.chat_title(chat).await?;
        Ok((chat, title))
    }

    /// Point the user's management commands at `chat`.
    ///
    /// # Errors
    /// Returns error if the store write fails.
    pub async fn set_active_chat(&self, user: UserId, chat: ChatId) -> Result<(), DirectoryError> {
        self.store
            .set(&keys::active_chat(user), Bytes::from(chat.to_string()), None)
            .await?;
        tracing::info!(user, chat, "active chat set");
        Ok(())
    }

    /// Forget the user's active chat.
    ///
    /// # Errors
    /// Returns error if the store delete fails.
    pub async fn clear_active_chat(&self, user: UserId) -> Result<(), DirectoryError> {
        self.store.delete(&keys::active_chat(user)).await?;
        Ok(())
    }

    /// Whether the user may manage admins of `chat`.
    ///
    /// Only the chat owner may; a chat without a recorded owner grants
    /// nobody access.
    ///
    /// # Errors
    /// Returns error if the store read fails or the owner id is corrupt.
    pub async fn has_admin_access(&self, user: UserId, chat: ChatId) -> Result<bool, DirectoryError> {
        Ok(self.get_id(&keys::chat_owner(chat)).await? == Some(user))
    }

    /// Title of a chat, empty when unknown.
    ///
    /// # Errors
    /// Returns error if the store read fails.
    pub async fn chat_title(&self, chat: ChatId) -> Result<String, DirectoryError> {
        match self.store.get(&keys::chat_title(chat)).await? {
            Some(raw) => Ok(String::from_utf8_lossy(&raw).into_owned()),
            None => {
                tracing::warn!(chat, "no title recorded for chat");
                Ok(String::new())
            }
        }
    }

    /// Chats the user owns or administers.
    ///
    /// # Errors
    /// Returns error if the store read fails or a member is not an id.
    pub async fn user_chats(&self, user: UserId) -> Result<Vec<ChatId>, DirectoryError> {
        let key = keys::user_chats(user);
        self.store
            .set_members(&key)
            .await?
            .iter()
            .map(|raw| parse_id(&key, raw))
            .collect()
    }

    /// Store the full user record for later display.
    ///
    /// # Errors
    /// Returns error if encoding or the store write fails.
    pub async fn remember_user(&self, user: &User) -> Result<(), DirectoryError> {
        let data = codec::encode_user(user)?;
        self.store.set(&keys::user_info(user.id), data, None).await?;
        Ok(())
    }

    /// Display name of a remembered user, or the numeric id if unknown.
    ///
    /// # Errors
    /// Returns error if the store read fails or the record is corrupt.
    pub async fn user_display_name(&self, user: UserId) -> Result<String, DirectoryError> {
        match self.store.get(&keys::user_info(user)).await? {
            Some(raw) => Ok(codec::decode_user(&raw)?.display_name()),
            None => Ok(user.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn directory() -> (Arc<MemoryStore>, Directory<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Arc::clone(&store), Directory::new(store))
    }

    #[tokio::test]
    async fn test_active_chat_roundtrip() {
        let (store, dir) = directory();
        assert!(matches!(
            dir.active_chat(1).await,
            Err(DirectoryError::NoActiveChat(1))
        ));

        store
            .set(&keys::chat_title(-100), Bytes::from_static(b"Team"), None)
            .await
            .unwrap();
        dir.set_active_chat(1, -100).await.unwrap();
        assert_eq!(dir.active_chat(1).await.unwrap(), (-100, "Team".to_string()));

        dir.clear_active_chat(1).await.unwrap();
        assert!(dir.active_chat(1).await.is_err());
    }

    #[tokio::test]
    async fn test_admin_access_is_owner_only() {
        let (store, dir) = directory();
        assert!(!dir.has_admin_access(1, -100).await.unwrap());

        store
            .set(&keys::chat_owner(-100), Bytes::from_static(b"1"), None)
            .await
            .unwrap();
        assert!(dir.has_admin_access(1, -100).await.unwrap());
        assert!(!dir.has_admin_access(2, -100).await.unwrap());
    }

    #[tokio::test]
    async fn test_user_chats_rejects_garbage() {
        let (store, dir) = directory();
        store.set_add(&keys::user_chats(1), "-100").await.unwrap();
        assert_eq!(dir.user_chats(1).await.unwrap(), vec![-100]);

        store.set_add(&keys::user_chats(1), "abc").await.unwrap();
        assert!(matches!(
            dir.user_chats(1).await,
            Err(DirectoryError::InvalidId { .. })
        ));
    }

    #[tokio::test]
    async fn test_display_name() {
        let (_, dir) = directory();
        assert_eq!(dir.user_display_name(9).await.unwrap(), "9");

        let mut user = User::new(9, "");
        user.first_name = "Carol".into();
        dir.remember_user(&user).await.unwrap();
        assert_eq!(dir.user_display_name(9).await.unwrap(), "Carol");
    }
}
