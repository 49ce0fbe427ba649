use serde::{Deserialize, Serialize};

/// One price update from the ingestion path.
///
/// `delta` and `volume` are cumulative counters supplied by the caller;
/// the store overwrites rather than accumulates them.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PriceTick {
    pub price: f64,
    pub delta: f64,
    pub volume: f64,
    pub ts_ms: u64,
}

/// A liquidity sweep through a tracked level.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepEvent {
    /// Label of the swept level (e.g. "ib_low", "session_high").
    pub level: String,
    pub price: f64,
    pub ts_ms: u64,
    /// Whether price reclaimed the level after the sweep.
    pub reclaimed: bool,
}

/// Price levels for one session instance.
///
/// All price fields stay `None` until the first tick of the session.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SessionLevels {
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub open: Option<f64>,
    pub close: Option<f64>,
    /// Signed order-flow imbalance, latest cumulative value.
    pub delta: f64,
    pub volume: f64,
    pub sweeps: Vec<SweepEvent>,
}

/// Initial Balance range for one session instance.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct InitialBalanceLevels {
    pub high: Option<f64>,
    pub low: Option<f64>,
    /// Set exactly once, after the IB window elapses.
    pub complete: bool,
}
