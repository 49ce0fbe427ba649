//! Bias Aggregator
//!
//! Reduces a cycle's driver list to a single net directional read.
//!
//! Scores are the per-direction sums of driver impacts; neutral drivers
//! contribute to neither side. A side needs more than 65% of the combined
//! score to claim the tape; anything tighter is reported as mixed.
//! Deterministic for a given input list: no randomness, no clock reads.

use serde::{Deserialize, Serialize};

use crate::driver::{Direction, Driver};

const DIRECTIONAL_PCT: f64 = 65.0;

/// Net directional read across all active drivers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasDirection {
    Bullish,
    Bearish,
    Mixed,
    Neutral,
}

/// The single aggregated bias for one cycle. Derived purely from a
/// driver list; carries no independent state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NetBias {
    pub direction: BiasDirection,
    /// 0-100.
    pub confidence: u8,
    pub bullish_score: f64,
    pub bearish_score: f64,
    pub summary: String,
}

/// Reduce ranked drivers to a net bias.
pub fn aggregate(drivers: &[Driver]) -> NetBias {
    let bullish_score: f64 = drivers
        .iter()
        .filter(|d| d.direction == Direction::Bullish)
        .map(|d| d.impact)
        .sum();
    let bearish_score: f64 = drivers
        .iter()
        .filter(|d| d.direction == Direction::Bearish)
        .map(|d| d.impact)
        .sum();

    let total = bullish_score + bearish_score;
    if total == 0.0 {
        return NetBias {
            direction: BiasDirection::Neutral,
            confidence: 50,
            bullish_score,
            bearish_score,
            summary: "no strong drivers active".to_string(),
        };
    }

    let bullish_pct = bullish_score / total * 100.0;
    let bearish_pct = bearish_score / total * 100.0;

    let bullish_count = drivers
        .iter()
        .filter(|d| d.direction == Direction::Bullish)
        .count();
    let bearish_count = drivers
        .iter()
        .filter(|d| d.direction == Direction::Bearish)
        .count();

    let (direction, confidence, summary) = if bullish_pct > DIRECTIONAL_PCT {
        (
            BiasDirection::Bullish,
            bullish_pct.round() as u8,
            format!("{bullish_count} drivers bullish vs {bearish_count} bearish"),
        )
    } else if bearish_pct > DIRECTIONAL_PCT {
        (
            BiasDirection::Bearish,
            bearish_pct.round() as u8,
            format!("{bearish_count} drivers bearish vs {bullish_count} bullish"),
        )
    } else {
        (
            BiasDirection::Mixed,
            bullish_pct.max(bearish_pct).round() as u8,
            format!("mixed tape: {bullish_count} bullish vs {bearish_count} bearish drivers"),
        )
    };

    NetBias {
        direction,
        confidence,
        bullish_score,
        bearish_score,
        summary,
    }
}
