//! Reply keyboard descriptions.

use serde::{Deserialize, Serialize};

/// A reply keyboard button.
///
/// Pressing the button sends `label` as text. When `payload` is set the
/// dispatcher substitutes it for the label before the text reaches the
/// dialog engine, so a button can show a chat title but answer with the
/// chat id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
}

impl Button {
    /// A plain button that answers with its own label.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: None,
        }
    }

    /// A button that answers with a hidden payload.
    #[must_use]
    pub fn with_payload(label: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            payload: Some(payload.into()),
        }
    }
}

/// Reply keyboard layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardSpec {
    pub rows: Vec<Vec<Button>>,
    /// Ask the client to shrink the keyboard to fit its buttons.
    #[serde(default)]
    pub resize: bool,
    /// Hide the keyboard after one press.
    #[serde(default)]
    pub one_time: bool,
}

impl KeyboardSpec {
    /// All buttons on a single row.
    #[must_use]
    pub fn single_row(buttons: Vec<Button>) -> Self {
        Self {
            rows: vec![buttons],
            resize: true,
            one_time: true,
        }
    }

    /// Buttons laid out row-major, `per_row` to a row, with a partial last row.
    #[must_use]
    pub fn grid(buttons: Vec<Button>, per_row: usize) -> Self {
        let per_row = per_row.max(1);
        let mut rows = Vec::with_capacity(buttons.len().div_ceil(per_row));
        let mut iter = buttons.into_iter().peekable();
        while iter.peek().is_some() {
            rows.push(iter.by_ref().take(per_row).collect());
        }
        Self {
            rows,
            resize: true,
            one_time: true,
        }
    }

    /// Iterate over every button.
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }

    /// Whether the keyboard has no buttons at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(kb: &KeyboardSpec) -> Vec<Vec<&str>> {
        kb.rows
            .iter()
            .map(|r| r.iter().map(|b| b.label.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_grid_partial_last_row() {
        let buttons = ["a", "b", "c", "d"].into_iter().map(Button::new).collect();
        let kb = KeyboardSpec::grid(buttons, 3);
        assert_eq!(labels(&kb), vec![vec!["a", "b", "c"], vec!["d"]]);
        assert!(kb.one_time);
    }

    #[test]
    fn test_grid_empty() {
        let kb = KeyboardSpec::grid(Vec::new(), 3);
        assert!(kb.rows.is_empty());
        assert!(kb.is_empty());
    }

    #[test]
    fn test_grid_zero_width_is_one_per_row() {
        let buttons = ["a", "b"].into_iter().map(Button::new).collect();
        let kb = KeyboardSpec::grid(buttons, 0);
        assert_eq!(kb.rows.len(), 2);
    }
}
