use serde::{Deserialize, Serialize};

/// Editorial impact tag assigned upstream by the news provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NewsImpact {
    High,
    Medium,
    Low,
}

/// One tagged headline from the session-filtered news feed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewsItem {
    pub headline: String,
    pub source: String,
    pub impact: NewsImpact,
    pub published_ms: u64,
    pub categories: Vec<String>,
}

/// Recency windows and fixed impact scores for news drivers.
///
/// News scoring is independent of the numeric threshold table: a
/// qualifying headline always contributes the fixed impact for its tag.
#[derive(Clone, Copy, Debug)]
pub struct NewsPolicy {
    pub high_window_ms: u64,
    pub medium_window_ms: u64,
    pub high_impact: f64,
    pub medium_impact: f64,
}

impl Default for NewsPolicy {
    fn default() -> Self {
        Self {
            high_window_ms: 30 * 60 * 1000,
            medium_window_ms: 10 * 60 * 1000,
            high_impact: 5.0,
            medium_impact: 3.0,
        }
    }
}
