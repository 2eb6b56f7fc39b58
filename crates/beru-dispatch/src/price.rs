//! Token quotes from the CoinMarketCap API.

use std::collections::HashMap;

use async_trait::async_trait;
use beru_core::{BotConfig, PriceError, PriceFeed, Quote};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

const QUOTES_PATH: &str = "/v1/cryptocurrency/quotes/latest";
const API_KEY_HEADER: &str = "X-CMC_PRO_API_KEY";

#[derive(Debug, Deserialize)]
struct QuotesResponse {
    #[serde(default)]
    data: HashMap<String, Listing>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    name: String,
    symbol: String,
    slug: String,
    #[serde(default)]
    quote: HashMap<String, MarketQuote>,
}

#[derive(Debug, Deserialize)]
struct MarketQuote {
    price: f64,
    #[serde(default)]
    percent_change_24h: f64,
}

/// [`PriceFeed`] backed by the CoinMarketCap quotes endpoint.
#[derive(Debug, Clone)]
pub struct CoinMarketCapFeed {
    client: Client,
    base_url: String,
    api_key: String,
}

impl CoinMarketCapFeed {
    #[must_use]
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Feed using the configured API root and key.
    #[must_use]
    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.price_api_url.clone(), config.price_api_key.clone())
    }

    /// One listing, quoted in `convert`.
    async fn listing(&self, slug: &str, convert: &str) -> Result<Listing, PriceError> {
        let url = format!("{}{QUOTES_PATH}", self.base_url);
        tracing::debug!(slug, convert, "fetching quote");

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .query(&[("slug", slug), ("convert", convert)])
            .send()
            .await
            .map_err(|e| PriceError::Request(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST {
            // The API rejects unknown slugs outright.
            return Err(PriceError::UnknownToken(slug.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PriceError::Request(format!("{status}: {body}")));
        }

        let body: QuotesResponse = response
            .json()
            .await
            .map_err(|e| PriceError::Request(e.to_string()))?;
        body.data
            .into_values()
            .find(|listing| listing.slug == slug)
            .ok_or_else(|| PriceError::UnknownToken(slug.to_string()))
    }
}

fn market(listing: &Listing, currency: &str) -> Result<(f64, f64), PriceError> {
    listing
        .quote
        .get(currency)
        .map(|q| (q.price, q.percent_change_24h))
        .ok_or_else(|| PriceError::MissingQuote(currency.to_string()))
}

#[async_trait]
impl PriceFeed for CoinMarketCapFeed {
    async fn quote(&self, slug: &str, conversion: &str) -> Result<Quote, PriceError> {
        let (usd, converted) = if conversion.eq_ignore_ascii_case("USD") {
            let usd = self.listing(slug, "USD").await?;
            let converted = market(&usd, "USD")?;
            (usd, converted)
        } else {
            // Basic API plans allow one conversion per request.
            let (usd, other) =
                futures::try_join!(self.listing(slug, "USD"), self.listing(slug, conversion))?;
            let converted = market(&other, conversion)?;
            (usd, converted)
        };
        let (price, price_pct_change) = market(&usd, "USD")?;

        Ok(Quote {
            name: usd.name,
            symbol: usd.symbol,
            slug: usd.slug,
            price,
            price_pct_change,
            conversion: converted.0,
            conversion_pct_change: converted.1,
        })
    }
}
