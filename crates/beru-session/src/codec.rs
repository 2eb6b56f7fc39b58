//! Byte codec for values persisted in the key-value store.
//!
//! Dialogs only ever hold generator and action identifiers, never
//! callables, so a plain JSON encoding round-trips them completely.

use beru_core::{Dialog, User};
use bytes::Bytes;
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;

/// Codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Failed to encode value: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("Failed to decode value: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Encode any serializable value.
///
/// # Errors
/// Returns error if the value cannot be serialized.
pub fn encode<T: Serialize>(value: &T) -> Result<Bytes, CodecError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(CodecError::Encode)
}

/// Decode a value previously produced by [`encode`].
///
/// # Errors
/// Returns error if the payload is corrupt or of another type.
pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(data).map_err(CodecError::Decode)
}

/// Encode a dialog for the session store.
///
/// # Errors
/// Returns error if serialization fails.
pub fn encode_dialog(dialog: &Dialog) -> Result<Bytes, CodecError> {
    encode(dialog)
}

/// Decode a dialog loaded from the session store.
///
/// # Errors
/// Returns error if the payload is corrupt.
pub fn decode_dialog(data: &[u8]) -> Result<Dialog, CodecError> {
    decode(data)
}

/// Encode a user record for `user:{id}:info`.
///
/// # Errors
/// Returns error if serialization fails.
pub fn encode_user(user: &User) -> Result<Bytes, CodecError> {
    encode(user)
}

/// Decode a user record.
///
/// # Errors
/// Returns error if the payload is corrupt.
pub fn decode_user(data: &[u8]) -> Result<User, CodecError> {
    decode(data)
}
