use std::fmt;

use serde::{Deserialize, Serialize};

use crate::observation::Observation;

/// Class of market-moving signal a driver belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DriverKind {
    Correlation,
    Divergence,
    International,
    Sector,
    Mag7,
    News,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DriverKind::Correlation => "correlation",
            DriverKind::Divergence => "divergence",
            DriverKind::International => "international",
            DriverKind::Sector => "sector",
            DriverKind::Mag7 => "mag7",
            DriverKind::News => "news",
        };
        f.write_str(s)
    }
}

/// Directional read of a single driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Bullish => "bullish",
            Direction::Bearish => "bearish",
            Direction::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// One detected market-moving signal.
///
/// `impact` is a non-negative ranking key, not a probability. A driver
/// list is produced once per aggregation cycle, ranked, and never
/// mutated in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Driver {
    pub kind: DriverKind,
    pub name: String,
    pub direction: Direction,
    pub impact: f64,
    pub reason: String,
    /// The normalized metric that produced this driver, where one exists
    /// (news drivers carry none).
    pub observation: Option<Observation>,
}
