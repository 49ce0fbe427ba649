use std::time::Duration;

use crate::views::ViewKind;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Base URL of the quote/news gateway.
    pub feed_base_url: String,

    /// Fixed UTC offset of the reference timezone, in hours.
    /// Session windows and weekend cutovers are defined in this zone.
    pub reference_utc_offset_hours: i32,

    /// Macro symbols fetched individually each cycle. Index legs
    /// (SPX/NDX/RUT) carry no rules of their own; they exist for the
    /// divergence pairs.
    pub watched_symbols: Vec<String>,

    /// Symbols whose moves are scored in basis points rather than
    /// percent (rates).
    pub rate_symbols: Vec<String>,

    // =========================
    // Fetch configuration
    // =========================
    /// Per-source timeout. A source that misses it is dropped from the
    /// cycle; it never blocks the join beyond this bound.
    pub source_timeout: Duration,

    /// Cadence of the background command-center refresh loop.
    pub refresh_interval: Duration,

    // =========================
    // Cache TTLs per view kind
    // =========================
    pub command_center_ttl: Duration,
    pub market_brief_ttl: Duration,
    pub dashboard_ttl: Duration,
    pub weather_report_ttl: Duration,
    pub reports_calendar_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let feed_base_url = std::env::var("FEED_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8090".to_string());

        Self {
            feed_base_url,

            // US Eastern reference day.
            reference_utc_offset_hours: -5,

            watched_symbols: vec![
                "SPX".to_string(),
                "NDX".to_string(),
                "RUT".to_string(),
                "VIX".to_string(),
                "US10Y".to_string(),
                "DXY".to_string(),
                "HYG".to_string(),
                "USDJPY".to_string(),
            ],
            rate_symbols: vec!["US10Y".to_string()],

            source_timeout: Duration::from_millis(2_500),
            refresh_interval: Duration::from_secs(15),

            command_center_ttl: Duration::from_secs(30),
            market_brief_ttl: Duration::from_secs(60),
            dashboard_ttl: Duration::from_secs(5 * 60),
            weather_report_ttl: Duration::from_secs(30 * 60),
            reports_calendar_ttl: Duration::from_secs(60 * 60),
        }
    }

    pub fn ttl_for(&self, kind: ViewKind) -> Duration {
        match kind {
            ViewKind::CommandCenter => self.command_center_ttl,
            ViewKind::MarketBrief => self.market_brief_ttl,
            ViewKind::Dashboard => self.dashboard_ttl,
            ViewKind::WeatherReport => self.weather_report_ttl,
            ViewKind::ReportsCalendar => self.reports_calendar_ttl,
        }
    }
}
