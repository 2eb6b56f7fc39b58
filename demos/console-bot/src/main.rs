//! Drive the beru bot from a terminal.
//!
//! Run with: cargo run -p console-bot
//!
//! Set `BERU_PRICE_API_KEY` to a CoinMarketCap key to enable `/price`.
//!
//! Every line typed is a message from the current user in the current
//! chat. Lines starting with `!` change the scene:
//!
//! - `!user <id> <username>` - speak as another user
//! - `!group <id> <title>` - speak in a group chat
//! - `!private` - speak in the private chat with the bot
//! - `!invite` - the current user adds the bot to the current group
//! - `!join <id>:<username> ...` - users join the current group

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex, PoisonError},
};

use anyhow::{Context, bail};
use async_trait::async_trait;
use beru_core::{
    BotConfig, Chat, ChatId, KeyboardSpec, Message, Messenger, MessengerError, Recipient, User,
    UserId,
};
use beru_dispatch::{CoinMarketCapFeed, Dispatcher};
use beru_session::storage::MemoryStore;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{StreamExt, wrappers::LinesStream};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Messenger that prints to stdout and treats everyone seen in a group as
/// one of its admins.
#[derive(Default)]
struct ConsoleMessenger {
    members: Mutex<HashMap<ChatId, BTreeMap<UserId, User>>>,
}

impl ConsoleMessenger {
    fn saw(&self, chat: &Chat, user: &User) {
        self.members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(chat.id)
            .or_default()
            .insert(user.id, user.clone());
    }
}

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send(
        &self,
        to: Recipient,
        text: &str,
        keyboard: Option<&KeyboardSpec>,
    ) -> Result<(), MessengerError> {
        let target = match to {
            Recipient::User(id) => format!("user {id}"),
            Recipient::Chat(id) => format!("chat {id}"),
        };
        println!("[beru -> {target}] {text}");
        for row in keyboard.map(|k| k.rows.as_slice()).unwrap_or_default() {
            let labels: Vec<String> = row.iter().map(|b| format!("[{}]", b.label)).collect();
            println!("    {}", labels.join(" "));
        }
        Ok(())
    }

    async fn chat_admins(&self, chat: ChatId) -> Result<Vec<User>, MessengerError> {
        self.members
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&chat)
            .map(|m| m.values().cloned().collect())
            .ok_or(MessengerError::ChatNotFound(chat))
    }

    async fn ban(&self, chat: ChatId, user: UserId) -> Result<(), MessengerError> {
        println!("[beru bans user {user} from chat {chat}]");
        Ok(())
    }

    async fn delete_message(&self, chat: ChatId, message_id: i64) -> Result<(), MessengerError> {
        println!("[beru deletes message {message_id} in chat {chat}]");
        Ok(())
    }
}

/// Who is talking, and where.
struct Scene {
    user: User,
    chat: Option<Chat>,
    next_id: i64,
}

impl Scene {
    fn chat(&self) -> Chat {
        self.chat
            .clone()
            .unwrap_or_else(|| Chat::private_with(&self.user))
    }

    fn message(&mut self, text: &str) -> Message {
        self.next_id += 1;
        Message {
            id: self.next_id,
            ..Message::text(self.user.clone(), self.chat(), text)
        }
    }
}

fn parse_user(id: &str, username: &str) -> anyhow::Result<User> {
    let id = id.parse().with_context(|| format!("invalid user id {id}"))?;
    Ok(User::new(id, username))
}

/// Apply a `!` directive, returning a message to dispatch if it produced one.
fn direct(
    scene: &mut Scene,
    bot: &User,
    directive: &str,
) -> anyhow::Result<Option<Message>> {
    let mut words = directive.split_whitespace();
    match words.next() {
        Some("user") => {
            let (Some(id), Some(name)) = (words.next(), words.next()) else {
                bail!("usage: !user <id> <username>");
            };
            scene.user = parse_user(id, name)?;
            Ok(None)
        }
        Some("group") => {
            let Some(id) = words.next() else {
                bail!("usage: !group <id> <title>");
            };
            let id = id.parse().with_context(|| format!("invalid chat id {id}"))?;
            let title = words.collect::<Vec<_>>().join(" ");
            scene.chat = Some(Chat::group(id, title));
            Ok(None)
        }
        Some("private") => {
            scene.chat = None;
            Ok(None)
        }
        Some("invite") => {
            if scene.chat.is_none() {
                bail!("pick a group with !group first");
            }
            let mut msg = scene.message("");
            msg.users_joined = vec![bot.clone()];
            Ok(Some(msg))
        }
        Some("join") => {
            let mut joined = Vec::new();
            for pair in words {
                let Some((id, name)) = pair.split_once(':') else {
                    bail!("usage: !join <id>:<username> ...");
                };
                joined.push(parse_user(id, name)?);
            }
            let mut msg = scene.message("");
            msg.users_joined = joined;
            Ok(Some(msg))
        }
        _ => bail!("unknown directive !{directive}"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = BotConfig::from_env();
    let bot = User {
        is_bot: true,
        ..User::new(0, config.bot_username.clone())
    };
    let messenger = Arc::new(ConsoleMessenger::default());
    let prices = (!config.price_api_key.is_empty()).then(|| CoinMarketCapFeed::from_config(&config));
    let mut dispatcher =
        Dispatcher::new(Arc::new(MemoryStore::new()), Arc::clone(&messenger), config);
    match prices {
        Some(feed) => dispatcher = dispatcher.with_price_feed(Arc::new(feed)),
        None => tracing::warn!("BERU_PRICE_API_KEY is not set, /price is disabled"),
    }

    let mut scene = Scene {
        user: User::new(1, "alice"),
        chat: None,
        next_id: 0,
    };
    tracing::info!(user = %scene.user.username, "reading messages from stdin");

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    while let Some(line) = lines.next().await {
        let line = line.context("reading stdin")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let msg = match line.strip_prefix('!') {
            Some(directive) => match direct(&mut scene, &bot, directive) {
                Ok(Some(msg)) => msg,
                Ok(None) => continue,
                Err(e) => {
                    eprintln!("{e}");
                    continue;
                }
            },
            None => scene.message(line),
        };

        if !msg.is_private() {
            messenger.saw(&msg.chat, &msg.sender);
        }
        dispatcher.handle(&msg).await;
    }

    Ok(())
}
