use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use feeds::{FeedError, MarketFeed, Quote};
use market::news::NewsItem;
use session::clock::SessionKey;

/// In-memory feed double with per-source failure switches and an
/// optional artificial latency, used to exercise partial-failure and
/// single-flight behavior.
#[derive(Default)]
pub struct MockFeed {
    pub quotes: HashMap<String, Quote>,
    pub sectors: HashMap<String, Quote>,
    pub constituents: HashMap<String, Quote>,
    pub news: Vec<NewsItem>,

    pub fail_quotes: AtomicBool,
    pub fail_sectors: AtomicBool,
    pub fail_constituents: AtomicBool,
    pub fail_news: AtomicBool,

    pub fetch_delay: Option<Duration>,

    /// Completed aggregation fan-outs (sector fetch runs once per cycle).
    pub cycles: AtomicUsize,
}

impl MockFeed {
    pub fn with_quote(mut self, symbol: &str, last: f64, change_abs: f64, change_pct: f64) -> Self {
        self.quotes
            .insert(symbol.to_string(), quote(symbol, last, change_abs, change_pct));
        self
    }

    pub fn with_sector(mut self, symbol: &str, change_pct: f64) -> Self {
        self.sectors
            .insert(symbol.to_string(), quote(symbol, 100.0, change_pct, change_pct));
        self
    }

    pub fn with_constituent(mut self, symbol: &str, change_pct: f64) -> Self {
        self.constituents
            .insert(symbol.to_string(), quote(symbol, 100.0, change_pct, change_pct));
        self
    }

    pub fn with_news(mut self, item: NewsItem) -> Self {
        self.news.push(item);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = Some(delay);
        self
    }

    pub fn fail_everything(&self) {
        self.fail_quotes.store(true, Ordering::SeqCst);
        self.fail_sectors.store(true, Ordering::SeqCst);
        self.fail_constituents.store(true, Ordering::SeqCst);
        self.fail_news.store(true, Ordering::SeqCst);
    }

    async fn pause(&self) {
        if let Some(delay) = self.fetch_delay {
            tokio::time::sleep(delay).await;
        }
    }
}

pub fn quote(symbol: &str, last: f64, change_abs: f64, change_pct: f64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        last,
        change_abs,
        change_pct,
    }
}

#[async_trait]
impl MarketFeed for MockFeed {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FeedError> {
        self.pause().await;
        if self.fail_quotes.load(Ordering::SeqCst) {
            return Err(FeedError::Timeout);
        }
        self.quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| FeedError::NoData(symbol.to_string()))
    }

    async fn fetch_sector_performance(&self) -> Result<HashMap<String, Quote>, FeedError> {
        self.pause().await;
        self.cycles.fetch_add(1, Ordering::SeqCst);
        if self.fail_sectors.load(Ordering::SeqCst) {
            return Err(FeedError::Timeout);
        }
        Ok(self.sectors.clone())
    }

    async fn fetch_top_constituents(&self) -> Result<HashMap<String, Quote>, FeedError> {
        self.pause().await;
        if self.fail_constituents.load(Ordering::SeqCst) {
            return Err(FeedError::Timeout);
        }
        Ok(self.constituents.clone())
    }

    async fn fetch_filtered_news(&self, _session: SessionKey) -> Result<Vec<NewsItem>, FeedError> {
        self.pause().await;
        if self.fail_news.load(Ordering::SeqCst) {
            return Err(FeedError::Timeout);
        }
        Ok(self.news.clone())
    }
}
