//! End-to-end conversations through the dispatcher.

use std::{sync::Arc, time::Duration};

use beru_core::{BotConfig, Chat, KeyValueStore, Message, Quote, Recipient, User, keys};
use beru_dispatch::{Dispatcher, dispatcher::NOT_INVITED_TEXT};
use beru_session::{
    storage::MemoryStore,
    testing::{FixedPriceFeed, RecordingMessenger, SentMessage},
};

struct Bot {
    store: Arc<MemoryStore>,
    messenger: Arc<RecordingMessenger>,
    prices: Arc<FixedPriceFeed>,
    dispatcher: Dispatcher<MemoryStore, RecordingMessenger>,
}

impl Bot {
    fn new() -> Self {
        let bot = Self::without_prices();
        let prices = Arc::clone(&bot.prices);
        Self {
            dispatcher: bot.dispatcher.with_price_feed(prices),
            ..bot
        }
    }

    fn without_prices() -> Self {
        let store = Arc::new(MemoryStore::new());
        let messenger = Arc::new(RecordingMessenger::default());
        let dispatcher = Dispatcher::new(
            Arc::clone(&store),
            Arc::clone(&messenger),
            BotConfig::default(),
        );
        Self {
            store,
            messenger,
            prices: Arc::new(FixedPriceFeed::default()),
            dispatcher,
        }
    }

    async fn say(&self, from: &User, text: &str) {
        self.dispatcher
            .handle(&Message::private(from.clone(), text))
            .await;
    }

    async fn say_in(&self, chat: &Chat, from: &User, text: &str) {
        self.dispatcher
            .handle(&Message::text(from.clone(), chat.clone(), text))
            .await;
    }

    async fn join(&self, chat: &Chat, by: &User, joined: Vec<User>) {
        let msg = Message {
            id: 42,
            users_joined: joined,
            ..Message::text(by.clone(), chat.clone(), "")
        };
        self.dispatcher.handle(&msg).await;
    }

    /// `owner` invites the bot to `chat`.
    async fn invite(&self, chat: &Chat, owner: &User) {
        self.messenger.set_chat_admins(chat.id, vec![owner.clone()]);
        self.join(chat, owner, vec![User::new(999, "beru_dev_bot")])
            .await;
    }

    fn last_text(&self) -> String {
        self.messenger.last().map(|m| m.text).unwrap_or_default()
    }

    fn last(&self) -> SentMessage {
        self.messenger.last().expect("nothing was sent")
    }

    async fn has_session(&self, user: &User) -> bool {
        self.dispatcher.engine().has_session(user.id).await
    }
}

fn alice() -> User {
    User::new(1, "alice")
}

fn bob() -> User {
    User::new(2, "bob")
}

fn team() -> Chat {
    Chat::group(-100, "Team")
}

fn friends() -> Chat {
    Chat::group(-200, "Friends")
}

#[tokio::test]
async fn test_add_command_dialog_then_use_it() {
    let bot = Bot::new();
    bot.invite(&team(), &alice()).await;
    assert_eq!(bot.last_text(), "beru joined chat Team");

    bot.say(&alice(), "/addcommand").await;
    assert_eq!(bot.last_text(), "What's the name of the command?");
    bot.say(&alice(), "foo").await;
    assert!(bot.last_text().starts_with("What would you like the response to be?"));
    bot.say(&alice(), "bar").await;

    assert_eq!(bot.last_text(), "added/updated command /foo for Team");
    assert!(!bot.has_session(&alice()).await);
    assert_eq!(
        bot.store
            .hash_get(&keys::chat_commands(-100), "/foo")
            .await
            .unwrap()
            .as_deref(),
        Some("bar")
    );

    bot.say_in(&team(), &bob(), "/foo").await;
    assert_eq!(
        bot.last(),
        SentMessage {
            to: Recipient::Chat(-100),
            text: "bar".to_string(),
            keyboard: None,
        }
    );
}

#[tokio::test]
async fn test_non_owner_cannot_start_admin_dialog() {
    let bot = Bot::new();
    bot.invite(&team(), &alice()).await;
    bot.store
        .set_add(&keys::user_chats(2), "-100")
        .await
        .unwrap();
    bot.say(&bob(), "/switchchat").await;
    bot.say(&bob(), "Team").await;
    assert_eq!(bot.last_text(), "switched to managing chat Team");

    bot.say(&bob(), "/addadmin").await;

    assert_eq!(
        bot.last_text(),
        "You don't have admin management access for Team."
    );
    assert!(!bot.has_session(&bob()).await);
    let sent = bot.messenger.sent().len();
    bot.say(&bob(), "alice").await;
    assert_eq!(bot.messenger.sent().len(), sent);
}

#[tokio::test]
async fn test_owner_adds_admin_by_pressing_a_button() {
    let bot = Bot::new();
    bot.messenger
        .set_chat_admins(-100, vec![alice(), bob()]);
    bot.join(&team(), &alice(), vec![User::new(999, "beru_dev_bot")])
        .await;

    bot.say(&alice(), "/addadmin").await;
    let prompt = bot.last();
    assert_eq!(prompt.text, "Who would you like to add as an admin?");
    let labels: Vec<String> = prompt
        .keyboard
        .expect("admin keyboard")
        .buttons()
        .map(|b| b.label.clone())
        .collect();
    assert_eq!(labels, vec!["bob".to_string()]);

    bot.say(&alice(), "bob").await;
    assert_eq!(bot.last_text(), "bob can now manage Team.");
    assert!(
        bot.store
            .set_contains(&keys::chat_active_admins(-100), "2")
            .await
            .unwrap()
    );
}

#[tokio::test]
async fn test_text_without_dialog_is_ignored() {
    let bot = Bot::new();
    bot.say(&alice(), "hello there").await;
    assert!(bot.messenger.sent().is_empty());
}

#[tokio::test]
async fn test_new_command_discards_dialog_in_progress() {
    let bot = Bot::new();
    bot.invite(&team(), &alice()).await;

    bot.say(&alice(), "/addcommand").await;
    bot.say(&alice(), "foo").await;
    bot.say(&alice(), "/removecommand").await;
    bot.say(&alice(), "foo").await;

    assert_eq!(bot.last_text(), "Team has no command foo");
    assert!(
        bot.store
            .hash_keys(&keys::chat_commands(-100))
            .await
            .unwrap()
            .is_empty()
    );
}

#[tokio::test]
async fn test_switch_chat_button_sends_chat_id() {
    let bot = Bot::new();
    bot.invite(&team(), &alice()).await;
    bot.invite(&friends(), &alice()).await;
    assert_eq!(bot.dispatcher.engine().sessions().ttl(), Duration::from_secs(60));

    bot.say(&alice(), "/switchchat").await;
    assert!(bot.last().keyboard.is_some());
    bot.say(&alice(), "Team").await;

    assert_eq!(bot.last_text(), "switched to managing chat Team");
    assert_eq!(
        bot.store
            .get(&keys::active_chat(1))
            .await
            .unwrap()
            .as_deref(),
        Some(&b"-100"[..])
    );
}

#[tokio::test(start_paused = true)]
async fn test_button_pressed_after_expiry_still_runs_its_action() {
    let bot = Bot::new();
    bot.invite(&team(), &alice()).await;
    bot.invite(&friends(), &alice()).await;

    bot.say(&alice(), "/switchchat").await;
    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(!bot.has_session(&alice()).await);

    bot.say(&alice(), "Team").await;
    assert_eq!(bot.last_text(), "switched to managing chat Team");
}

#[tokio::test(start_paused = true)]
async fn test_expired_dialog_drops_answers() {
    let bot = Bot::new();
    bot.invite(&team(), &alice()).await;

    bot.say(&alice(), "/addcommand").await;
    bot.say(&alice(), "foo").await;
    tokio::time::advance(Duration::from_secs(61)).await;
    let sent = bot.messenger.sent().len();
    bot.say(&alice(), "bar").await;

    assert_eq!(bot.messenger.sent().len(), sent);
    assert!(
        bot.store
            .hash_get(&keys::chat_commands(-100), "/foo")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_custom_command_template() {
    let bot = Bot::new();
    bot.invite(&team(), &alice()).await;
    bot.store
        .hash_set(
            &keys::chat_commands(-100),
            "/hi",
            "Hello {{ sender.username }}, this is {{ chat.title }}",
        )
        .await
        .unwrap();
    bot.store
        .hash_set(&keys::chat_commands(-100), "/broken", "{{ sender. }}")
        .await
        .unwrap();

    bot.say_in(&team(), &bob(), "/hi").await;
    assert_eq!(bot.last_text(), "Hello bob, this is Team");

    bot.say_in(&team(), &bob(), "/broken").await;
    assert_eq!(bot.last_text(), BotConfig::default().error_response);

    // Private chats use the sender's active chat.
    bot.say(&alice(), "/hi").await;
    assert_eq!(
        bot.last(),
        SentMessage {
            to: Recipient::User(1),
            text: "Hello alice, this is ".to_string(),
            keyboard: None,
        }
    );
}

#[tokio::test]
async fn test_start_and_help() {
    let bot = Bot::new();

    bot.say(&alice(), "/start").await;
    let texts = bot.messenger.texts();
    assert_eq!(texts[0], NOT_INVITED_TEXT);
    assert!(texts[1].contains("https://telegram.me/beru_dev_bot?startgroup=1"));

    bot.invite(&team(), &alice()).await;
    bot.say(&alice(), "/start").await;
    assert!(bot.last().keyboard.is_some());

    bot.say(&alice(), "/help").await;
    assert!(bot.last_text().starts_with("Nice you meet you"));

    let sent = bot.messenger.sent().len();
    bot.say_in(&team(), &alice(), "/help").await;
    assert_eq!(bot.messenger.sent().len(), sent);
}

#[tokio::test]
async fn test_joining_users_bots_and_welcome() {
    let bot = Bot::new();
    bot.invite(&team(), &alice()).await;
    bot.say(&alice(), "/setwelcome").await;
    bot.say(&alice(), "Welcome $username!").await;
    bot.say(&alice(), "2").await;
    bot.say(&alice(), "/addwhitelistedbot").await;
    bot.say(&alice(), "@pricebot").await;
    bot.say(&alice(), "/togglejoinmsg").await;

    let carol = User::new(3, "carol");
    bot.join(&team(), &carol, vec![carol.clone()]).await;
    let sent = bot.messenger.sent().len();

    let dave = User::new(4, "dave");
    bot.join(&team(), &dave, vec![dave.clone()]).await;
    assert_eq!(
        bot.last(),
        SentMessage {
            to: Recipient::Chat(-100),
            text: "Welcome @dave!".to_string(),
            keyboard: None,
        }
    );
    assert_eq!(bot.messenger.sent().len(), sent + 1);

    bot.join(
        &team(),
        &carol,
        vec![User::new(5, "spambot"), User::new(6, "pricebot")],
    )
    .await;
    assert_eq!(bot.messenger.bans(), vec![(-100, 5)]);
    assert_eq!(bot.messenger.deleted().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_stale_keyboard_stops_answering() {
    let bot = Bot::new();
    bot.invite(&team(), &alice()).await;
    bot.invite(&friends(), &alice()).await;

    bot.say(&alice(), "/switchchat").await;
    tokio::time::advance(Duration::from_secs(301)).await;
    let sent = bot.messenger.sent().len();
    bot.say(&alice(), "Team").await;

    assert_eq!(bot.messenger.sent().len(), sent);
    assert_eq!(
        bot.store
            .get(&keys::active_chat(1))
            .await
            .unwrap()
            .as_deref(),
        Some(&b"-200"[..])
    );
}

#[tokio::test]
async fn test_admins_lists_platform_admins_in_group() {
    let bot = Bot::new();
    let mut carol = User::new(3, "carol");
    carol.first_name = "Carol".into();
    carol.last_name = "Reyes".into();
    bot.messenger
        .set_chat_admins(-100, vec![alice(), bob()]);

    bot.say_in(&team(), &carol, "/admins").await;
    assert_eq!(
        bot.last(),
        SentMessage {
            to: Recipient::Chat(-100),
            text: "Hey Carol Reyes, the admins for this channel are: @alice, @bob".to_string(),
            keyboard: None,
        }
    );

    let sent = bot.messenger.sent().len();
    bot.say(&carol, "/admins").await;
    assert_eq!(bot.messenger.sent().len(), sent);

    bot.say_in(&friends(), &carol, "/admins").await;
    assert_eq!(
        bot.last(),
        SentMessage {
            to: Recipient::User(3),
            text: BotConfig::default().error_response,
            keyboard: None,
        }
    );
}

#[tokio::test]
async fn test_price_command_after_setup() {
    let bot = Bot::new();
    bot.invite(&team(), &alice()).await;
    bot.prices.set_quote(Quote {
        name: "Ethereum".into(),
        symbol: "ETH".into(),
        slug: "ethereum".into(),
        price: 3012.5,
        price_pct_change: 1.04,
        conversion: 0.052,
        conversion_pct_change: -0.46,
    });

    bot.say_in(&team(), &bob(), "/price").await;
    assert!(bot.last_text().contains("/setpricecommand"));
    assert!(bot.prices.requests().is_empty());

    bot.say(&alice(), "/setpricecommand").await;
    bot.say(&alice(), "ethereum").await;
    bot.say(&alice(), "btc").await;
    bot.say(&alice(), "{{ticker}} is ${{price}} ({{price_pct_change}}), {{conversion}} BTC").await;

    bot.say_in(&team(), &bob(), "/price").await;
    assert_eq!(
        bot.last(),
        SentMessage {
            to: Recipient::Chat(-100),
            text: "ETH is $3012.50000 (+1.0%), 0.05200000 BTC".to_string(),
            keyboard: None,
        }
    );
    assert_eq!(
        bot.prices.requests(),
        vec![("ethereum".to_string(), "BTC".to_string())]
    );
}

#[tokio::test]
async fn test_price_without_feed_or_quote_is_an_error() {
    let bot = Bot::without_prices();
    bot.invite(&team(), &alice()).await;
    let key = keys::chat_price(-100);
    for (field, value) in [("slug", "nowhere"), ("conversion", "BTC"), ("msgFormat", "{{price}}")] {
        bot.store.hash_set(&key, field, value).await.unwrap();
    }

    bot.say_in(&team(), &bob(), "/price").await;
    assert_eq!(bot.last_text(), BotConfig::default().error_response);

    let bot = Bot::new();
    bot.invite(&team(), &alice()).await;
    for (field, value) in [("slug", "nowhere"), ("conversion", "BTC"), ("msgFormat", "{{price}}")] {
        bot.store.hash_set(&key, field, value).await.unwrap();
    }
    bot.say_in(&team(), &bob(), "/price").await;
    assert_eq!(
        bot.last(),
        SentMessage {
            to: Recipient::Chat(-100),
            text: BotConfig::default().error_response,
            keyboard: None,
        }
    );
}
