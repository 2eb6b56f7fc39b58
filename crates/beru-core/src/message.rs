//! Platform-neutral message, user, and chat types.

use serde::{Deserialize, Serialize};

/// Platform user identifier.
pub type UserId = i64;

/// Platform chat identifier.
pub type ChatId = i64;

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub is_bot: bool,
}

impl User {
    /// Create a user with only an id and username.
    #[must_use]
    pub fn new(id: UserId, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            first_name: String::new(),
            last_name: String::new(),
            is_bot: false,
        }
    }

    /// Name shown on buttons and in replies.
    ///
    /// Prefers the username, falling back to "first last".
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.username.is_empty() {
            format!("{} {}", self.first_name, self.last_name)
                .trim()
                .to_string()
        } else {
            self.username.clone()
        }
    }
}

/// Chat kind as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

/// A platform chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    #[serde(default)]
    pub title: String,
    pub kind: ChatKind,
}

impl Chat {
    /// The private chat between the bot and `user`.
    #[must_use]
    pub fn private_with(user: &User) -> Self {
        Self {
            id: user.id,
            title: String::new(),
            kind: ChatKind::Private,
        }
    }

    /// A group chat.
    #[must_use]
    pub fn group(id: ChatId, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            kind: ChatKind::Group,
        }
    }
}

/// An inbound message.
///
/// Dialog responses are recorded as whole messages so terminal actions
/// can see the sender and chat alongside the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Platform message id, used for deletion.
    #[serde(default)]
    pub id: i64,
    pub sender: User,
    pub chat: Chat,
    #[serde(default)]
    pub text: String,
    /// Users announced by a join notification.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub users_joined: Vec<User>,
}

impl Message {
    /// A text message from `sender` in `chat`.
    #[must_use]
    pub fn text(sender: User, chat: Chat, text: impl Into<String>) -> Self {
        Self {
            id: 0,
            sender,
            chat,
            text: text.into(),
            users_joined: Vec::new(),
        }
    }

    /// A text message in the sender's private chat with the bot.
    #[must_use]
    pub fn private(sender: User, text: impl Into<String>) -> Self {
        let chat = Chat::private_with(&sender);
        Self::text(sender, chat, text)
    }

    /// Whether this message was sent in a private chat with the bot.
    #[must_use]
    pub fn is_private(&self) -> bool {
        self.chat.kind == ChatKind::Private
    }

    /// Where replies to this message go: the sender in private chats,
    /// otherwise the group.
    #[must_use]
    pub fn reply_target(&self) -> Recipient {
        if self.is_private() {
            Recipient::User(self.sender.id)
        } else {
            Recipient::Chat(self.chat.id)
        }
    }

    /// Copy of this message with its text replaced.
    #[must_use]
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..self.clone()
        }
    }
}

/// Destination for outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    User(UserId),
    Chat(ChatId),
}
