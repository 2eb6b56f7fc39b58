//! Built-in command table.

use beru_core::{ActionId, Button, Dialog, GeneratorId, KeyboardSpec, Prompt};

/// What a built-in command does when invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    /// Start a dialog.
    Dialog(Dialog),
    /// Run an action on the triggering message alone.
    Action(ActionId),
    /// Send the command guide.
    Help,
    /// Greet a user in a private chat.
    Start,
    /// List a group's platform admins, in that group.
    Admins,
    /// Post a group's token price, in that group.
    Price,
}

/// Commands a user can pick from the start keyboard, in guide order.
pub const MANAGEMENT_COMMANDS: &[&str] = &[
    "/addadmin",
    "/removeadmin",
    "/viewadmins",
    "/switchchat",
    "/addchat",
    "/removechat",
    "/addcommand",
    "/removecommand",
    "/viewcommands",
    "/setwelcome",
    "/togglejoinmsg",
    "/addwhitelistedbot",
    "/removewhitelistedbot",
    "/setpricecommand",
];

pub const HELP_GUIDE: &str = "Nice you meet you, my name is Beru!

I can help you create and manage Telegram chats.

You can control me by sending these commands:

*Chat Owner Only*
/addadmin - allows another user to change the chat rules
/removeadmin - removes a users ability to change chat rules
/viewadmins - displays list of users with admin privileges

*Beru Level Functionality*
/switchchat - changes which chat beru is managing when a user is an owner/admin of multiple chats
/addchat - shortcut to invite link to add beru to your chat
/removechat - choose between currently managed chats to remove

*Custom Chat Commands*
/addcommand - adds a custom command and response
/removecommand - removes a custom command
/viewcommands - prints a list of custom commands

*Chat Features*
/setwelcome - greets every # users with a welcome message on chat join
/togglejoinmsg - toggles deletion of the notification posted when users join (supergroups only)
/addwhitelistedbot - adds a bot (by username) to be allowed to join a chat
/removewhitelistedbot - removes a bots ability to join a chat
/setpricecommand - sets up a /price command for your token

*Group Commands*
/admins - lists the admins of the chat
/price - shows the token price set up with /setpricecommand";

const PRICE_SLUG_PROMPT: &str = "What is the slug of your token in the URL on CoinMarketCap?
(example: https://coinmarketcap.com/currencies/ethereum/)";

const PRICE_CONVERSION_PROMPT: &str = "What non-USD currency would you like to convert your token to? (pick one)
(fiat options are: AUD, BRL, CAD, CHF, CLP, CNY, CZK, DKK, EUR, GBP, HKD, HUF, IDR, ILS, INR, JPY, KRW, MXN, MYR, NOK, NZD, PHP, PKR, PLN, RUB, SEK, SGD, THB, TRY, TWD, ZAR)
(crypto options are: BTC, ETH, XRP, LTC, BCH)";

const PRICE_FORMAT_PROMPT: &str = "What message would you like to display as a response to the command?
(example: {{ticker}} is trading at ${{price}} USD and {{conversion}} BTC)
(possible variables are {{ticker}}, {{name}}, {{slug}}, {{price}}, {{price_pct_change}}, {{conversion}}, {{conversion_pct_change}})";

/// Command word of `text`: the first token, lowercased, without a
/// trailing `@botname`.
#[must_use]
pub fn command_word(text: &str) -> Option<String> {
    let first = text.split_whitespace().next()?;
    if !first.starts_with('/') || first.len() == 1 {
        return None;
    }
    let word = first.split('@').next().unwrap_or(first);
    Some(word.to_lowercase())
}

/// Look up a built-in command by its command word.
#[must_use]
pub fn lookup(word: &str) -> Option<Builtin> {
    let builtin = match word {
        "/addadmin" => Builtin::Dialog(
            Dialog::new(vec![Prompt::generated(
                "Who would you like to add as an admin?",
                GeneratorId::AddAdmin,
            )])
            .with_action(ActionId::AddAdmin)
            .owner_only(),
        ),
        "/removeadmin" => Builtin::Dialog(
            Dialog::new(vec![Prompt::generated(
                "Who would you like to remove as an admin?",
                GeneratorId::RemoveAdmin,
            )])
            .with_action(ActionId::RemoveAdmin)
            .owner_only(),
        ),
        "/viewadmins" => Builtin::Action(ActionId::ViewAdmins),
        "/switchchat" => Builtin::Dialog(
            Dialog::new(vec![Prompt::generated(
                "What chat would you like to manage?",
                GeneratorId::SwitchChat,
            )])
            .with_action(ActionId::SwitchChat),
        ),
        "/addchat" => Builtin::Action(ActionId::AddChat),
        "/removechat" => Builtin::Dialog(
            Dialog::new(vec![Prompt::generated(
                "What chat would you like beru to stop managing?",
                GeneratorId::RemoveChat,
            )])
            .with_action(ActionId::RemoveChat),
        ),
        "/addcommand" => Builtin::Dialog(
            Dialog::new(vec![
                Prompt::text("What's the name of the command?"),
                Prompt::text(
                    "What would you like the response to be? (Markdown formatting is supported)",
                ),
            ])
            .with_action(ActionId::AddCommand),
        ),
        "/removecommand" => Builtin::Dialog(
            Dialog::new(vec![Prompt::text("What command would you like to remove?")])
                .with_action(ActionId::RemoveCommand),
        ),
        "/viewcommands" => Builtin::Action(ActionId::ViewCommands),
        "/setwelcome" => Builtin::Dialog(
            Dialog::new(vec![
                Prompt::text(
                    "What is the message you would like to welcome your users with?
(you can use $username to be replaced with the new members username)",
                ),
                Prompt::text("How many users do you want to join between each welcome message?"),
            ])
            .with_action(ActionId::SetWelcome),
        ),
        "/togglejoinmsg" => Builtin::Action(ActionId::ToggleJoinMessage),
        "/addwhitelistedbot" => Builtin::Dialog(
            Dialog::new(vec![Prompt::text(
                "What is the username of the bot you would like to whitelist?",
            )])
            .with_action(ActionId::AddWhitelistedBot),
        ),
        "/removewhitelistedbot" => Builtin::Dialog(
            Dialog::new(vec![Prompt::generated(
                "Which bot would you like to remove from the whitelist?",
                GeneratorId::RemoveBot,
            )])
            .with_action(ActionId::RemoveWhitelistedBot),
        ),
        "/setpricecommand" => Builtin::Dialog(
            Dialog::new(vec![
                Prompt::text(PRICE_SLUG_PROMPT),
                Prompt::text(PRICE_CONVERSION_PROMPT),
                Prompt::text(PRICE_FORMAT_PROMPT),
            ])
            .with_action(ActionId::SetPriceCommand),
        ),
        "/help" => Builtin::Help,
        "/start" => Builtin::Start,
        "/admins" => Builtin::Admins,
        "/price" => Builtin::Price,
        _ => return None,
    };
    Some(builtin)
}

/// Keyboard offering every management command.
#[must_use]
pub fn command_keyboard(per_row: usize) -> KeyboardSpec {
    KeyboardSpec::grid(
        MANAGEMENT_COMMANDS.iter().copied().map(Button::new).collect(),
        per_row,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_word() {
        assert_eq!(command_word("/AddCommand now").as_deref(), Some("/addcommand"));
        assert_eq!(command_word("/help@beru_dev_bot").as_deref(), Some("/help"));
        assert_eq!(command_word("hello /help"), None);
        assert_eq!(command_word("/"), None);
        assert_eq!(command_word(""), None);
    }

    #[test]
    fn test_every_management_command_is_known() {
        for name in MANAGEMENT_COMMANDS {
            assert!(lookup(name).is_some(), "{name} has no entry");
        }
        assert_eq!(lookup("/foo"), None);
        assert_eq!(lookup("/admins"), Some(Builtin::Admins));
        assert_eq!(lookup("/price"), Some(Builtin::Price));
    }

    #[test]
    fn test_admin_dialogs_are_owner_only() {
        for name in ["/addadmin", "/removeadmin"] {
            let Some(Builtin::Dialog(dialog)) = lookup(name) else {
                panic!("{name} should start a dialog");
            };
            assert!(dialog.owner_only);
        }
        let Some(Builtin::Dialog(dialog)) = lookup("/addcommand") else {
            panic!("/addcommand should start a dialog");
        };
        assert!(!dialog.owner_only);
        assert_eq!(dialog.prompts.len(), 2);
        assert_eq!(dialog.terminal_action, Some(ActionId::AddCommand));
    }

    #[test]
    fn test_command_keyboard_layout() {
        let keyboard = command_keyboard(3);
        assert_eq!(keyboard.buttons().count(), MANAGEMENT_COMMANDS.len());
        assert_eq!(keyboard.rows.len(), 5);
    }
}
