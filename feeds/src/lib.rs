//! External collaborator contracts.
//!
//! Every expensive data source the engine composes — quotes, sector
//! performance, index constituents, session-filtered news — sits behind
//! [`MarketFeed`]. Implementations are expected to return within a
//! bounded time or fail with a typed [`FeedError`]; the aggregation
//! layer adds its own per-source timeout on top and treats any failure
//! as that source being unavailable for the cycle.

pub mod errors;
pub mod http;
pub mod types;

use std::collections::HashMap;

use async_trait::async_trait;

use market::news::NewsItem;
use session::clock::SessionKey;

pub use errors::FeedError;
pub use http::HttpMarketFeed;
pub use types::Quote;

#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Latest quote for one symbol.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, FeedError>;

    /// Day-over-day performance per sector ETF.
    async fn fetch_sector_performance(&self) -> Result<HashMap<String, Quote>, FeedError>;

    /// Performance of the index's largest constituents.
    async fn fetch_top_constituents(&self) -> Result<HashMap<String, Quote>, FeedError>;

    /// Headlines pre-filtered upstream for the given session's focus.
    async fn fetch_filtered_news(&self, session: SessionKey) -> Result<Vec<NewsItem>, FeedError>;
}
