//! Inbound message routing.
//!
//! Every platform update enters through [`Dispatcher::handle`]. Join
//! notifications go to [`ChatEvents`], `/admins` and `/price` to
//! [`GroupCommands`]; text is checked, in order, against
//! live button bindings, the built-in command table, the sender's dialog,
//! and finally the chat's custom commands.

use std::sync::Arc;

use beru_core::{
    ActionId, BotConfig, ChatId, KeyValueStore, Message, Messenger, PriceFeed, Recipient, keys,
};
use beru_handlers::HandlerContext;
use beru_session::{ButtonBinding, ButtonRouter, DialogEngine, DirectoryError};

use crate::{
    DispatchError,
    builtins::{self, Builtin, HELP_GUIDE},
    events::ChatEvents,
    group::GroupCommands,
    template::ReplyRenderer,
};

/// Reply to `/start` from someone who manages no chats yet.
pub const NOT_INVITED_TEXT: &str = "I need to be invited to a chat before I can be useful";

/// Routes inbound messages to dialogs, commands, and event handlers.
pub struct Dispatcher<S, M>
where
    S: KeyValueStore,
    M: Messenger,
{
    engine: DialogEngine<S, M>,
    ctx: HandlerContext<S, M>,
    buttons: Arc<ButtonRouter>,
    events: ChatEvents<S, M>,
    group: GroupCommands<S, M>,
    renderer: ReplyRenderer,
}

impl<S, M> Dispatcher<S, M>
where
    S: KeyValueStore + 'static,
    M: Messenger + 'static,
{
    /// Wire the engine, registries, and handlers over `store` and
    /// `messenger`.
    #[must_use]
    pub fn new(store: Arc<S>, messenger: Arc<M>, config: BotConfig) -> Self {
        let config = Arc::new(config);
        let ctx = HandlerContext::new(Arc::clone(&store), Arc::clone(&messenger), Arc::clone(&config));
        let (generators, actions) = beru_handlers::registries(&ctx);
        let buttons = Arc::new(ButtonRouter::new(config.button_ttl()));
        let engine = DialogEngine::new(
            store,
            messenger,
            Arc::new(generators),
            Arc::new(actions),
            Arc::clone(&buttons),
            &config,
        );

        tracing::info!(
            ttl_secs = config.session_ttl_secs,
            bot = %config.bot_username,
            "dispatcher ready"
        );
        Self {
            engine,
            events: ChatEvents::new(ctx.clone()),
            group: GroupCommands::new(ctx.clone()),
            ctx,
            buttons,
            renderer: ReplyRenderer::new(),
        }
    }

    /// Answer `/price` with quotes from `feed`. Without one, `/price`
    /// replies with the generic error.
    #[must_use]
    pub fn with_price_feed(mut self, feed: Arc<dyn PriceFeed>) -> Self {
        self.group.set_price_feed(feed);
        self
    }

    /// The dialog engine.
    #[must_use]
    pub const fn engine(&self) -> &DialogEngine<S, M> {
        &self.engine
    }

    /// Handle one inbound message. Failures are logged, never returned.
    pub async fn handle(&self, msg: &Message) {
        if !msg.users_joined.is_empty() {
            self.handle_join(msg).await;
            return;
        }
        if msg.text.trim().is_empty() {
            return;
        }

        if let Some(binding) = self.buttons.take(msg.sender.id, msg.text.trim()) {
            self.handle_button(msg, binding).await;
            return;
        }

        let command = builtins::command_word(&msg.text);
        if let Some(builtin) = command.as_deref().and_then(builtins::lookup) {
            self.run_builtin(msg, builtin).await;
            return;
        }

        if self.engine.has_session(msg.sender.id).await {
            self.engine.step(msg).await;
        }

        if let Some(name) = command {
            if let Err(e) = self.custom_command(msg, &name).await {
                tracing::error!(user = msg.sender.id, command = %name, "custom command failed: {e}");
                self.send(msg.reply_target(), &self.ctx.config.error_response).await;
            }
        }
    }

    async fn handle_join(&self, msg: &Message) {
        let result = if msg.users_joined.iter().any(|u| self.events.is_self(u)) {
            self.events.bot_added(msg).await
        } else {
            self.events.users_joined(msg).await
        };
        if let Err(e) = result {
            tracing::error!(chat = msg.chat.id, "unable to handle join: {e}");
        }
    }

    /// A pressed generated button: its payload stands in for the label.
    async fn handle_button(&self, msg: &Message, binding: ButtonBinding) {
        let pressed = msg.with_text(binding.payload);
        if self.engine.has_session(msg.sender.id).await {
            self.engine.step(&pressed).await;
            return;
        }
        // The dialog expired after the keyboard was sent.
        match binding.action {
            Some(id) => self.invoke(id, &pressed).await,
            None => tracing::debug!(user = msg.sender.id, "button pressed with nothing to run"),
        }
    }

    async fn run_builtin(&self, msg: &Message, builtin: Builtin) {
        tracing::debug!(user = msg.sender.id, text = %msg.text, "built-in command");
        match builtin {
            Builtin::Dialog(dialog) => self.engine.begin(msg, dialog).await,
            Builtin::Action(id) => self.invoke(id, msg).await,
            Builtin::Help => {
                if msg.is_private() {
                    self.send(msg.reply_target(), HELP_GUIDE).await;
                }
            }
            Builtin::Start => {
                if msg.is_private() {
                    self.start(msg).await;
                }
            }
            Builtin::Admins => {
                if msg.is_private() {
                    return;
                }
                if let Err(e) = self.group.admins(msg).await {
                    tracing::error!(chat = msg.chat.id, "error fetching admins: {e}");
                    self.send(Recipient::User(msg.sender.id), &self.ctx.config.error_response)
                        .await;
                }
            }
            Builtin::Price => {
                if msg.is_private() {
                    return;
                }
                if let Err(e) = self.group.price(msg, &self.renderer).await {
                    tracing::error!(chat = msg.chat.id, "unable to post price: {e}");
                    self.send(msg.reply_target(), &self.ctx.config.error_response).await;
                }
            }
        }
    }

    async fn start(&self, msg: &Message) {
        let chats = match self.ctx.directory.user_chats(msg.sender.id).await {
            Ok(chats) => chats,
            Err(e) => {
                tracing::error!(user = msg.sender.id, "unable to look up chats: {e}");
                self.send(msg.reply_target(), &self.ctx.config.error_response).await;
                return;
            }
        };
        if chats.is_empty() {
            self.send(msg.reply_target(), NOT_INVITED_TEXT).await;
            self.invoke(ActionId::AddChat, msg).await;
            return;
        }
        let keyboard = builtins::command_keyboard(self.ctx.config.buttons_per_row);
        if let Err(e) = self
            .ctx
            .messenger
            .send(msg.reply_target(), "Check out these commands!", Some(&keyboard))
            .await
        {
            tracing::error!(user = msg.sender.id, "unable to send command keyboard: {e}");
        }
    }

    async fn invoke(&self, id: ActionId, msg: &Message) {
        let Some(action) = self.engine.actions().get(id) else {
            tracing::error!(action = %id, "terminal action not registered");
            return;
        };
        if let Err(e) = action.invoke(std::slice::from_ref(msg)).await {
            tracing::warn!(user = msg.sender.id, action = %id, "action failed: {e}");
        }
    }

    /// Chat whose custom commands apply to `msg`.
    ///
    /// Private messages use the sender's active chat; `None` if there is
    /// none.
    async fn command_chat(&self, msg: &Message) -> Result<Option<ChatId>, DispatchError> {
        if !msg.is_private() {
            return Ok(Some(msg.chat.id));
        }
        match self.ctx.directory.active_chat(msg.sender.id).await {
            Ok((chat, _)) => Ok(Some(chat)),
            Err(DirectoryError::NoActiveChat(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn custom_command(&self, msg: &Message, name: &str) -> Result<(), DispatchError> {
        let Some(chat) = self.command_chat(msg).await? else {
            return Ok(());
        };
        let Some(template) = self.ctx.store.hash_get(&keys::chat_commands(chat), name).await? else {
            return Ok(());
        };
        let reply = self.renderer.render(&template, msg)?;
        self.send(msg.reply_target(), &reply).await;
        Ok(())
    }

    async fn send(&self, to: Recipient, text: &str) {
        if let Err(e) = self.ctx.messenger.send(to, text, None).await {
            tracing::error!(?to, "unable to send: {e}");
        }
    }
}
