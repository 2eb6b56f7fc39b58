//! Bot configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Reply sent whenever a request cannot be fulfilled.
pub const DEFAULT_ERROR_RESPONSE: &str =
    "Something went wrong and I wasn't able to fulfill that request";

/// CoinMarketCap API root used when none is configured.
pub const DEFAULT_PRICE_API_URL: &str = "https://pro-api.coinmarketcap.com";

/// Runtime configuration shared by the engine and handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    /// Rolling lifetime of a persisted dialog, in seconds.
    pub session_ttl_secs: u64,
    /// How long a generated keyboard stays pressable, in seconds.
    pub button_ttl_secs: u64,
    /// Width of generated keyboard grids.
    pub buttons_per_row: usize,
    /// Bot username, used to build invite links.
    pub bot_username: String,
    /// Generic failure reply.
    pub error_response: String,
    /// Root URL of the price API.
    pub price_api_url: String,
    /// Price API key. Empty disables `/price`.
    #[serde(skip_serializing)]
    pub price_api_key: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            session_ttl_secs: 60,
            button_ttl_secs: 300,
            buttons_per_row: 3,
            bot_username: "beru_dev_bot".to_string(),
            error_response: DEFAULT_ERROR_RESPONSE.to_string(),
            price_api_url: DEFAULT_PRICE_API_URL.to_string(),
            price_api_key: String::new(),
        }
    }
}

impl BotConfig {
    /// Defaults overlaid with `BERU_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    ///
    /// Unparseable numbers are logged and ignored.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup("BERU_SESSION_TTL_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.session_ttl_secs = secs,
                _ => tracing::warn!(value = %raw, "ignoring invalid BERU_SESSION_TTL_SECS"),
            }
        }
        if let Some(raw) = lookup("BERU_BUTTON_TTL_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.button_ttl_secs = secs,
                _ => tracing::warn!(value = %raw, "ignoring invalid BERU_BUTTON_TTL_SECS"),
            }
        }
        if let Some(raw) = lookup("BERU_BUTTONS_PER_ROW") {
            match raw.parse::<usize>() {
                Ok(n) if n > 0 => config.buttons_per_row = n,
                _ => tracing::warn!(value = %raw, "ignoring invalid BERU_BUTTONS_PER_ROW"),
            }
        }
        if let Some(name) = lookup("BERU_BOT_USERNAME") {
            if !name.is_empty() {
                config.bot_username = name;
            }
        }
        if let Some(url) = lookup("BERU_PRICE_API_URL") {
            if !url.is_empty() {
                config.price_api_url = url.trim_end_matches('/').to_string();
            }
        }
        if let Some(key) = lookup("BERU_PRICE_API_KEY") {
            config.price_api_key = key;
        }

        config
    }

    /// Session TTL as a duration.
    #[must_use]
    pub const fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_secs)
    }

    /// Lifetime of generated keyboard bindings.
    #[must_use]
    pub const fn button_ttl(&self) -> Duration {
        Duration::from_secs(self.button_ttl_secs)
    }

    /// Link that adds the bot to a group with the inviter as start payload.
    #[must_use]
    pub fn invite_link(&self, inviter: i64) -> String {
        format!("https://telegram.me/{}?startgroup={inviter}", self.bot_username)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = BotConfig::default();
        assert_eq!(config.session_ttl(), Duration::from_secs(60));
        assert_eq!(config.buttons_per_row, 3);
        assert_eq!(config.button_ttl(), Duration::from_secs(300));
        assert!(config.price_api_key.is_empty());
    }

    #[test]
    fn test_lookup_overrides_and_ignores_garbage() {
        let env: HashMap<&str, &str> = [
            ("BERU_SESSION_TTL_SECS", "120"),
            ("BERU_BUTTONS_PER_ROW", "zero"),
            ("BERU_BOT_USERNAME", "test_bot"),
            ("BERU_BUTTON_TTL_SECS", "-1"),
            ("BERU_PRICE_API_URL", "http://localhost:9000/"),
            ("BERU_PRICE_API_KEY", "secret"),
        ]
        .into_iter()
        .collect();
        let config = BotConfig::from_lookup(|k| env.get(k).map(ToString::to_string));
        assert_eq!(config.session_ttl_secs, 120);
        assert_eq!(config.buttons_per_row, 3);
        assert_eq!(config.button_ttl_secs, 300);
        assert_eq!(config.price_api_url, "http://localhost:9000");
        assert_eq!(config.price_api_key, "secret");
        assert_eq!(
            config.invite_link(5),
            "https://telegram.me/test_bot?startgroup=5"
        );
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: BotConfig = serde_json::from_str(r#"{"buttons_per_row": 2}"#).unwrap();
        assert_eq!(config.buttons_per_row, 2);
        assert_eq!(config.session_ttl_secs, 60);
    }
}
