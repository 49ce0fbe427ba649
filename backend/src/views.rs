use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use market::bias::NetBias;
use market::driver::Driver;
use market::news::NewsItem;
use market::observation::Observation;
use session::clock::SessionWindow;

/// The aggregated-view kinds the engine serves. Each kind is a distinct
/// cache key with its own TTL.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKind {
    CommandCenter,
    MarketBrief,
    Dashboard,
    WeatherReport,
    ReportsCalendar,
}

impl ViewKind {
    pub const ALL: [ViewKind; 5] = [
        ViewKind::CommandCenter,
        ViewKind::MarketBrief,
        ViewKind::Dashboard,
        ViewKind::WeatherReport,
        ViewKind::ReportsCalendar,
    ];
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViewKind::CommandCenter => "command-center",
            ViewKind::MarketBrief => "market-brief",
            ViewKind::Dashboard => "dashboard",
            ViewKind::WeatherReport => "weather-report",
            ViewKind::ReportsCalendar => "reports-calendar",
        };
        f.write_str(s)
    }
}

/// One full aggregation cycle's output: the resolved session, ranked
/// drivers, net bias, and the per-source sub-objects kept for display.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregatedView {
    pub kind: ViewKind,
    pub session: SessionWindow,
    /// Full ranked list; callers truncate for presentation.
    pub drivers: Vec<Driver>,
    pub net_bias: NetBias,
    pub quotes: BTreeMap<String, Observation>,
    pub sectors: BTreeMap<String, Observation>,
    pub constituents: BTreeMap<String, Observation>,
    pub news: Vec<NewsItem>,
    /// Sources omitted from this cycle after fetch failure or timeout.
    pub failed_sources: Vec<String>,
    pub computed_at_ms: u64,
    /// Set when the cache served this payload past its TTL because the
    /// refresh behind it failed.
    pub stale: bool,
}

impl AggregatedView {
    pub fn top_drivers(&self, n: usize) -> &[Driver] {
        &self.drivers[..self.drivers.len().min(n)]
    }
}
