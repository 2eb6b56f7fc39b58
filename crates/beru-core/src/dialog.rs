//! Dialog and prompt data model.
//!
//! A [`Dialog`] is a fixed chain of [`Prompt`]s. The engine sends one prompt
//! per user message and records each answer, then hands the answers to the
//! dialog's terminal action. Everything here is plain data so the whole
//! dialog can be persisted between messages; generators and actions are
//! referenced by identifier and resolved through registries at run time.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{KeyboardSpec, Message};

/// Identifier of a prompt generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorId {
    SwitchChat,
    RemoveChat,
    AddAdmin,
    RemoveAdmin,
    RemoveBot,
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SwitchChat => "switch_chat",
            Self::RemoveChat => "remove_chat",
            Self::AddAdmin => "add_admin",
            Self::RemoveAdmin => "remove_admin",
            Self::RemoveBot => "remove_bot",
        };
        f.write_str(name)
    }
}

/// Identifier of a terminal action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionId {
    AddAdmin,
    RemoveAdmin,
    ViewAdmins,
    AddCommand,
    RemoveCommand,
    ViewCommands,
    SwitchChat,
    RemoveChat,
    AddChat,
    SetWelcome,
    ToggleJoinMessage,
    AddWhitelistedBot,
    RemoveWhitelistedBot,
    SetPriceCommand,
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::AddAdmin => "add_admin",
            Self::RemoveAdmin => "remove_admin",
            Self::ViewAdmins => "view_admins",
            Self::AddCommand => "add_command",
            Self::RemoveCommand => "remove_command",
            Self::ViewCommands => "view_commands",
            Self::SwitchChat => "switch_chat",
            Self::RemoveChat => "remove_chat",
            Self::AddChat => "add_chat",
            Self::SetWelcome => "set_welcome",
            Self::ToggleJoinMessage => "toggle_join_message",
            Self::AddWhitelistedBot => "add_whitelisted_bot",
            Self::RemoveWhitelistedBot => "remove_whitelisted_bot",
            Self::SetPriceCommand => "set_price_command",
        };
        f.write_str(name)
    }
}

/// One question within a dialog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    /// Static text. May be empty when a generator supplies it.
    #[serde(default)]
    pub text: String,
    /// Optional reply keyboard.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyboard: Option<KeyboardSpec>,
    /// Generator run immediately before the prompt is sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<GeneratorId>,
}

impl Prompt {
    /// A static text prompt.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            generator: None,
        }
    }

    /// A prompt whose keyboard (and possibly text) is generated.
    #[must_use]
    pub fn generated(text: impl Into<String>, generator: GeneratorId) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
            generator: Some(generator),
        }
    }

    /// The prompt sent in place of one whose generator failed.
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self::text(text)
    }
}

/// A multi-step prompt sequence and its progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    /// Identifier used to correlate log lines.
    pub id: Uuid,
    pub prompts: Vec<Prompt>,
    /// Index of the next prompt to send.
    pub cursor: usize,
    /// Answers received so far, one per sent prompt.
    #[serde(default)]
    pub responses: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminal_action: Option<ActionId>,
    /// Only the owner of the user's active chat may begin this dialog.
    #[serde(default)]
    pub owner_only: bool,
}

impl Dialog {
    /// A fresh dialog over `prompts`.
    #[must_use]
    pub fn new(prompts: Vec<Prompt>) -> Self {
        Self {
            id: Uuid::new_v4(),
            prompts,
            cursor: 0,
            responses: Vec::new(),
            terminal_action: None,
            owner_only: false,
        }
    }

    /// Set the terminal action.
    #[must_use]
    pub const fn with_action(mut self, action: ActionId) -> Self {
        self.terminal_action = Some(action);
        self
    }

    /// Restrict the dialog to chat owners.
    #[must_use]
    pub const fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    /// Whether every prompt has been sent.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.prompts.len()
    }

    /// The next prompt to send, if any.
    #[must_use]
    pub fn current_prompt(&self) -> Option<&Prompt> {
        self.prompts.get(self.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_dialog_starts_at_zero() {
        let dialog = Dialog::new(vec![Prompt::text("name?")]).with_action(ActionId::AddCommand);
        assert_eq!(dialog.cursor, 0);
        assert!(dialog.responses.is_empty());
        assert!(!dialog.is_exhausted());
        assert_eq!(dialog.current_prompt().map(|p| p.text.as_str()), Some("name?"));
    }

    #[test]
    fn test_empty_dialog_is_exhausted() {
        assert!(Dialog::new(Vec::new()).is_exhausted());
    }

    #[test]
    fn test_identifiers_serialize_as_tags() {
        let json = serde_json::to_string(&GeneratorId::RemoveBot).unwrap();
        assert_eq!(json, "\"remove_bot\"");
        assert_eq!(ActionId::SetPriceCommand.to_string(), "set_price_command");
    }
}
