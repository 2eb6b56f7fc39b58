//! Store key layout.
//!
//! Keys follow `type:instance:attribute`.

use crate::{ChatId, UserId};

/// Set of every chat the bot has joined.
pub const BOT_CHATS: &str = "beru:chats";

/// Serialized in-flight dialog, expiring with the session TTL.
#[must_use]
pub fn active_path(user: UserId) -> String {
    format!("user:{user}:activePath")
}

/// Chat the user's management commands apply to.
#[must_use]
pub fn active_chat(user: UserId) -> String {
    format!("user:{user}:activeChat")
}

/// Set of chats the user owns or administers.
#[must_use]
pub fn user_chats(user: UserId) -> String {
    format!("user:{user}:chats")
}

/// Serialized user record.
#[must_use]
pub fn user_info(user: UserId) -> String {
    format!("user:{user}:info")
}

/// User id of the chat owner (whoever invited the bot).
#[must_use]
pub fn chat_owner(chat: ChatId) -> String {
    format!("chat:{chat}:owner")
}

#[must_use]
pub fn chat_title(chat: ChatId) -> String {
    format!("chat:{chat}:title")
}

/// Set of every platform admin of the chat.
#[must_use]
pub fn chat_admins(chat: ChatId) -> String {
    format!("chat:{chat}:admins")
}

/// Set of admins allowed to manage the bot for the chat.
#[must_use]
pub fn chat_active_admins(chat: ChatId) -> String {
    format!("chat:{chat}:activeAdmins")
}

/// Hash of custom command name to reply template.
#[must_use]
pub fn chat_commands(chat: ChatId) -> String {
    format!("chat:{chat}:commands")
}

#[must_use]
pub fn chat_bot_whitelist(chat: ChatId) -> String {
    format!("chat:{chat}:botWhitelist")
}

#[must_use]
pub fn chat_users_joined_count(chat: ChatId) -> String {
    format!("chat:{chat}:usersJoinedCount")
}

#[must_use]
pub fn chat_users_joined_limit(chat: ChatId) -> String {
    format!("chat:{chat}:usersJoinedLimit")
}

#[must_use]
pub fn chat_users_joined_message(chat: ChatId) -> String {
    format!("chat:{chat}:usersJoinedMessage")
}

#[must_use]
pub fn chat_delete_join_notification(chat: ChatId) -> String {
    format!("chat:{chat}:deleteJoinNotification")
}

/// Hash with `slug`, `conversion`, and `msgFormat` for the price command.
#[must_use]
pub fn chat_price(chat: ChatId) -> String {
    format!("chat:{chat}:price")
}
