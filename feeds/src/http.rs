//! HTTP-backed reference implementation of [`MarketFeed`].
//!
//! Talks to a JSON quote/news gateway. Envelope DTOs are private; the
//! public surface only ever hands out the normalized [`Quote`] and
//! [`NewsItem`] shapes.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use market::news::{NewsImpact, NewsItem};
use session::clock::SessionKey;

use crate::errors::FeedError;
use crate::types::Quote;
use crate::MarketFeed;

#[derive(Clone)]
pub struct HttpMarketFeed {
    http: Client,
    base_url: String,
}

impl HttpMarketFeed {
    pub fn new(base_url: String) -> Result<Self, FeedError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(5))
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self { http, base_url })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, FeedError> {
        let url = format!("{}/{}", self.base_url, path);
        let resp = self.http.get(&url).send().await?.error_for_status()?;
        Ok(resp.json().await?)
    }
}

#[async_trait]
impl MarketFeed for HttpMarketFeed {
    #[instrument(skip(self), fields(symbol = %symbol), level = "debug")]
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FeedError> {
        let envelope: QuoteEnvelope = self.get_json(&format!("quotes/{symbol}")).await?;
        let quote = envelope.quote.into_quote();

        debug!(last = quote.last, change_pct = quote.change_pct, "quote fetched");

        Ok(quote)
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_sector_performance(&self) -> Result<HashMap<String, Quote>, FeedError> {
        let envelope: SectorsEnvelope = self.get_json("sectors").await?;
        Ok(index_by_symbol(envelope.sectors))
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_top_constituents(&self) -> Result<HashMap<String, Quote>, FeedError> {
        let envelope: ConstituentsEnvelope = self.get_json("constituents").await?;
        Ok(index_by_symbol(envelope.constituents))
    }

    #[instrument(skip(self), fields(session = %session), level = "debug")]
    async fn fetch_filtered_news(&self, session: SessionKey) -> Result<Vec<NewsItem>, FeedError> {
        let envelope: NewsEnvelope = self.get_json(&format!("news?session={session}")).await?;

        envelope
            .items
            .into_iter()
            .map(NewsDto::into_item)
            .collect::<Result<Vec<_>, _>>()
    }
}

fn index_by_symbol(quotes: Vec<QuoteDto>) -> HashMap<String, Quote> {
    quotes
        .into_iter()
        .map(|dto| {
            let q = dto.into_quote();
            (q.symbol.clone(), q)
        })
        .collect()
}

#[derive(Deserialize)]
struct QuoteEnvelope {
    quote: QuoteDto,
}

#[derive(Deserialize)]
struct SectorsEnvelope {
    sectors: Vec<QuoteDto>,
}

#[derive(Deserialize)]
struct ConstituentsEnvelope {
    constituents: Vec<QuoteDto>,
}

#[derive(Deserialize)]
struct NewsEnvelope {
    items: Vec<NewsDto>,
}

#[derive(Deserialize)]
struct QuoteDto {
    symbol: String,
    last: f64,
    change: f64,
    change_percent: f64,
}

impl QuoteDto {
    fn into_quote(self) -> Quote {
        Quote {
            symbol: self.symbol,
            last: self.last,
            change_abs: self.change,
            change_pct: self.change_percent,
        }
    }
}

#[derive(Deserialize)]
struct NewsDto {
    headline: String,
    source: String,
    impact: String,
    published_ms: u64,
    #[serde(default)]
    categories: Vec<String>,
}

impl NewsDto {
    fn into_item(self) -> Result<NewsItem, FeedError> {
        let impact = match self.impact.as_str() {
            "high" => NewsImpact::High,
            "medium" => NewsImpact::Medium,
            "low" => NewsImpact::Low,
            other => {
                return Err(FeedError::InvalidResponse(format!(
                    "unknown news impact tag: {other}"
                )));
            }
        };

        Ok(NewsItem {
            headline: self.headline,
            source: self.source,
            impact,
            published_ms: self.published_ms,
            categories: self.categories,
        })
    }
}
