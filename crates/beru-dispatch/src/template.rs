//! Custom command and price message rendering.

use beru_core::{Message, Quote};
use minijinja::Environment;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SenderContext<'a> {
    id: i64,
    username: &'a str,
    first_name: &'a str,
    last_name: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatContext<'a> {
    id: i64,
    title: &'a str,
}

/// Values a reply template can refer to.
#[derive(Debug, Serialize)]
struct TemplateContext<'a> {
    sender: SenderContext<'a>,
    chat: ChatContext<'a>,
    text: &'a str,
}

impl<'a> TemplateContext<'a> {
    fn of(msg: &'a Message) -> Self {
        Self {
            sender: SenderContext {
                id: msg.sender.id,
                username: &msg.sender.username,
                first_name: &msg.sender.first_name,
                last_name: &msg.sender.last_name,
            },
            chat: ChatContext {
                id: msg.chat.id,
                title: &msg.chat.title,
            },
            text: &msg.text,
        }
    }
}

/// Values a `/price` message format can refer to.
#[derive(Debug, Serialize)]
struct QuoteContext<'a> {
    ticker: &'a str,
    name: &'a str,
    slug: &'a str,
    price: String,
    price_pct_change: String,
    conversion: String,
    conversion_pct_change: String,
}

impl<'a> QuoteContext<'a> {
    fn of(quote: &'a Quote) -> Self {
        Self {
            ticker: &quote.symbol,
            name: &quote.name,
            slug: &quote.slug,
            price: format!("{:.5}", quote.price),
            price_pct_change: format!("{:+.1}%", quote.price_pct_change),
            conversion: format!("{:.8}", quote.conversion),
            conversion_pct_change: format!("{:+.1}%", quote.conversion_pct_change),
        }
    }
}

/// Renders stored reply templates against the triggering message.
pub struct ReplyRenderer {
    env: Environment<'static>,
}

impl Default for ReplyRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyRenderer {
    #[must_use]
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);
        Self { env }
    }

    /// Render `template` with `sender`, `chat`, and `text` in scope.
    ///
    /// # Errors
    /// Returns error if the template does not parse or refers to unknown
    /// values.
    pub fn render(&self, template: &str, msg: &Message) -> Result<String, minijinja::Error> {
        self.env.render_str(template, TemplateContext::of(msg))
    }

    /// Render a `/price` message format with the quote's fields in scope.
    ///
    /// # Errors
    /// Same as [`ReplyRenderer::render`].
    pub fn render_quote(&self, template: &str, quote: &Quote) -> Result<String, minijinja::Error> {
        self.env.render_str(template, QuoteContext::of(quote))
    }
}

#[cfg(test)]
mod tests {
    use beru_core::{Chat, User};

    use super::*;

    fn message() -> Message {
        let mut sender = User::new(7, "dana");
        sender.first_name = "Dana".into();
        Message::text(sender, Chat::group(-100, "Team"), "/rules please")
    }

    #[test]
    fn test_renders_message_fields() {
        let out = tokio_test::assert_ok!(ReplyRenderer::new().render(
            "Hi {{ sender.first_name }} (@{{ sender.username }}), welcome to {{ chat.title }}",
            &message(),
        ));
        assert_eq!(out, "Hi Dana (@dana), welcome to Team");
    }

    #[test]
    fn test_plain_text_passes_through() {
        let out = ReplyRenderer::new()
            .render("Be nice. No spam.", &message())
            .unwrap();
        assert_eq!(out, "Be nice. No spam.");
    }

    #[test]
    fn test_broken_templates_fail() {
        let renderer = ReplyRenderer::new();
        assert!(renderer.render("{{ sender.", &message()).is_err());
        assert!(renderer.render("{{ nothing.here }}", &message()).is_err());
    }

    #[test]
    fn test_renders_quote_fields() {
        let quote = Quote {
            name: "Ethereum".into(),
            symbol: "ETH".into(),
            slug: "ethereum".into(),
            price: 3012.5,
            price_pct_change: 2.34,
            conversion: 0.052,
            conversion_pct_change: -0.5,
        };
        let out = ReplyRenderer::new()
            .render_quote(
                "{{ticker}} is trading at ${{price}} USD ({{price_pct_change}}) and {{conversion}} BTC",
                &quote,
            )
            .unwrap();
        assert_eq!(
            out,
            "ETH is trading at $3012.50000 USD (+2.3%) and 0.05200000 BTC"
        );
    }
}
