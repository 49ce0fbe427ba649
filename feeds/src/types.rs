use serde::{Deserialize, Serialize};

/// Raw provider quote record, before normalization.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub last: f64,
    pub change_abs: f64,
    pub change_pct: f64,
}
