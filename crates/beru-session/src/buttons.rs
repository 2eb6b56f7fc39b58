//! One-shot bindings from generated keyboard buttons to hidden payloads.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
    time::Duration,
};

use beru_core::{ActionId, KeyboardSpec, UserId};
use tokio::time::Instant;

/// What a pressed button stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonBinding {
    /// Text to substitute for the button label.
    pub payload: String,
    /// Action to run if the press arrives after the dialog is gone.
    pub action: Option<ActionId>,
}

#[derive(Debug)]
struct Keyboard {
    buttons: HashMap<String, ButtonBinding>,
    expires_at: Instant,
}

/// Per-user table of live generated buttons.
///
/// Binding a keyboard replaces whatever the user had before, and pressing
/// any button clears the whole table for that user: the keyboards are
/// one-time, so the other buttons disappear with it. A keyboard nobody
/// pressed stops answering `ttl` after it was bound.
#[derive(Debug)]
pub struct ButtonRouter {
    ttl: Duration,
    bindings: RwLock<HashMap<UserId, Keyboard>>,
}

impl ButtonRouter {
    /// Create an empty router whose bindings live for `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            bindings: RwLock::default(),
        }
    }

    /// Bind every button of `keyboard` for `user`.
    ///
    /// Buttons without a payload answer with their own label.
    pub fn bind(&self, user: UserId, keyboard: &KeyboardSpec, action: Option<ActionId>) {
        let buttons: HashMap<String, ButtonBinding> = keyboard
            .buttons()
            .map(|button| {
                let payload = button
                    .payload
                    .clone()
                    .unwrap_or_else(|| button.label.clone());
                (button.label.clone(), ButtonBinding { payload, action })
            })
            .collect();

        let now = Instant::now();
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        bindings.retain(|_, keyboard| keyboard.expires_at > now);
        if buttons.is_empty() {
            bindings.remove(&user);
        } else {
            tracing::debug!(user, buttons = buttons.len(), "bound generated buttons");
            bindings.insert(
                user,
                Keyboard {
                    buttons,
                    expires_at: now + self.ttl,
                },
            );
        }
    }

    /// Consume the binding for a pressed `label`, if there is a live one.
    pub fn take(&self, user: UserId, label: &str) -> Option<ButtonBinding> {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        let keyboard = bindings.get(&user)?;
        if keyboard.expires_at <= Instant::now() {
            tracing::debug!(user, "dropping expired buttons");
            bindings.remove(&user);
            return None;
        }
        let binding = keyboard.buttons.get(label).cloned()?;
        bindings.remove(&user);
        Some(binding)
    }

    /// Drop every binding of `user`.
    pub fn clear(&self, user: UserId) {
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&user);
    }

    /// Whether `user` has any live bindings.
    #[must_use]
    pub fn has_bindings(&self, user: UserId) -> bool {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&user)
            .is_some_and(|keyboard| keyboard.expires_at > Instant::now())
    }

    /// Number of users holding a keyboard, expired or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no user holds a keyboard.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use beru_core::Button;

    use super::*;

    fn router() -> ButtonRouter {
        ButtonRouter::new(Duration::from_secs(300))
    }

    #[test]
    fn test_take_is_one_shot_and_scoped_per_user() {
        let router = router();
        let kb = KeyboardSpec::single_row(vec![
            Button::with_payload("Team", "-100"),
            Button::new("plainbot"),
        ]);
        router.bind(1, &kb, Some(ActionId::SwitchChat));

        assert!(router.take(2, "Team").is_none());
        assert!(router.take(1, "Other").is_none());
        assert_eq!(
            router.take(1, "Team"),
            Some(ButtonBinding {
                payload: "-100".into(),
                action: Some(ActionId::SwitchChat),
            })
        );
        assert!(router.take(1, "plainbot").is_none());
        assert!(!router.has_bindings(1));
    }

    #[test]
    fn test_label_without_payload_answers_with_label() {
        let router = router();
        router.bind(1, &KeyboardSpec::grid(vec![Button::new("abot")], 3), None);
        assert_eq!(router.take(1, "abot").map(|b| b.payload).as_deref(), Some("abot"));
    }

    #[test]
    fn test_rebind_replaces() {
        let router = router();
        router.bind(1, &KeyboardSpec::single_row(vec![Button::new("a")]), None);
        router.bind(1, &KeyboardSpec::single_row(vec![Button::new("b")]), None);
        assert!(router.take(1, "a").is_none());
        assert!(router.take(1, "b").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unpressed_keyboard_expires() {
        let router = router();
        let kb = KeyboardSpec::single_row(vec![Button::with_payload("Team", "-100")]);
        router.bind(1, &kb, Some(ActionId::SwitchChat));
        router.bind(2, &kb, Some(ActionId::SwitchChat));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(router.has_bindings(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(!router.has_bindings(1));
        assert!(router.take(1, "Team").is_none());
        assert_eq!(router.len(), 1);

        // Binding anything sweeps keyboards that expired.
        router.bind(3, &kb, None);
        assert_eq!(router.len(), 1);
        assert!(router.take(2, "Team").is_none());
    }
}
