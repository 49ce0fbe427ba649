use serde::{Deserialize, Serialize};

/// Normalized snapshot of one external metric.
///
/// Produced fresh per aggregation cycle by the feed adapters; never
/// persisted. `change_bps` is only populated for rate-like instruments
/// whose moves are quoted in basis points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub name: String,
    pub value: f64,
    pub change_abs: f64,
    pub change_pct: f64,
    pub change_bps: Option<f64>,
}

impl Observation {
    pub fn new(name: impl Into<String>, value: f64, change_abs: f64, change_pct: f64) -> Self {
        Self {
            name: name.into(),
            value,
            change_abs,
            change_pct,
            change_bps: None,
        }
    }

    pub fn with_bps(mut self, change_bps: f64) -> Self {
        self.change_bps = Some(change_bps);
        self
    }
}
