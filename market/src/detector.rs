//! Driver Detector
//!
//! Converts a cycle's normalized observations into ranked [`Driver`]s.
//!
//! ## Emission rule
//! A metric emits a driver only when `abs(change) >= threshold` for the
//! change basis its rule names. Sub-threshold moves are silently dropped;
//! they are not emitted as neutral noise.
//!
//! ## Direction
//! Direction comes from the metric's configured polarity combined with
//! the sign of the move. Rising fear gauges read bearish for
//! equity-correlated instruments, rising high-yield credit reads bullish,
//! and so on. Nothing is inferred from sign alone at runtime.
//!
//! ## Impact
//! `impact = abs(change) * weight`. This is a ranking key for
//! presentation order only; it carries no probabilistic meaning.
//!
//! ## Divergences
//! Cross-instrument spreads (tech vs broad, small caps vs broad) are
//! computed as the difference of two observations' percent changes and
//! scored by their own pair rules.
//!
//! ## News
//! High-impact headlines inside a short recency window, and medium-impact
//! inside an even shorter one, emit drivers with fixed impacts taken from
//! [`NewsPolicy`] regardless of the numeric thresholds.
//!
//! ## Determinism
//! Output is sorted descending by impact with a stable name tie-break,
//! so re-running over an unchanged observation set yields an identical
//! list. Pure, no I/O.

use crate::driver::{Direction, Driver, DriverKind};
use crate::news::{NewsImpact, NewsItem, NewsPolicy};
use crate::observation::Observation;
use crate::thresholds::{ChangeBasis, MetricRule, Polarity, ThresholdTable};

/// Presentation truncation used by callers; the detector itself always
/// returns the full ranked list.
pub const DEFAULT_TOP_N: usize = 6;

/// Score a cycle's observations against the threshold table.
///
/// Returns the full driver list ranked by descending impact.
pub fn detect(observations: &[Observation], table: &ThresholdTable) -> Vec<Driver> {
    let mut drivers = Vec::new();

    for obs in observations {
        let Some(rule) = table.rule(&obs.name) else {
            continue;
        };
        let Some(change) = basis_change(obs, rule.basis) else {
            continue;
        };
        if change.abs() < rule.threshold {
            continue;
        }

        drivers.push(Driver {
            kind: rule.kind,
            name: rule.label.clone(),
            direction: direction_for(rule, change),
            impact: change.abs() * rule.weight,
            reason: format!("{} moved {:+.2}{}", rule.label, change, rule.basis.unit()),
            observation: Some(obs.clone()),
        });
    }

    drivers.extend(detect_divergences(observations, table));

    rank(drivers)
}

/// Score session-filtered headlines against the recency policy.
pub fn detect_news(items: &[NewsItem], policy: &NewsPolicy, now_ms: u64) -> Vec<Driver> {
    let mut drivers = Vec::new();

    for item in items {
        let age_ms = now_ms.saturating_sub(item.published_ms);
        let impact = match item.impact {
            NewsImpact::High if age_ms <= policy.high_window_ms => policy.high_impact,
            NewsImpact::Medium if age_ms <= policy.medium_window_ms => policy.medium_impact,
            _ => continue,
        };

        drivers.push(Driver {
            kind: DriverKind::News,
            name: item.headline.clone(),
            direction: Direction::Neutral,
            impact,
            reason: format!("{} headline via {}", impact_label(item.impact), item.source),
            observation: None,
        });
    }

    drivers
}

/// Sort descending by impact with a stable name tie-break.
pub fn rank(mut drivers: Vec<Driver>) -> Vec<Driver> {
    drivers.sort_by(|a, b| {
        b.impact
            .total_cmp(&a.impact)
            .then_with(|| a.name.cmp(&b.name))
    });
    drivers
}

fn detect_divergences(observations: &[Observation], table: &ThresholdTable) -> Vec<Driver> {
    let mut drivers = Vec::new();

    for rule in table.divergences() {
        let lead = observations.iter().find(|o| o.name == rule.lead);
        let benchmark = observations.iter().find(|o| o.name == rule.benchmark);
        let (Some(lead), Some(benchmark)) = (lead, benchmark) else {
            continue;
        };

        let spread = lead.change_pct - benchmark.change_pct;
        if spread.abs() < rule.threshold {
            continue;
        }

        let (direction, reason) = if spread >= 0.0 {
            (rule.when_lead_outperforms, rule.outperform_reason.clone())
        } else {
            (rule.when_lead_underperforms, rule.underperform_reason.clone())
        };

        drivers.push(Driver {
            kind: DriverKind::Divergence,
            name: rule.label.clone(),
            direction,
            impact: spread.abs() * rule.weight,
            reason,
            observation: Some(Observation::new(
                rule.label.clone(),
                spread,
                lead.change_pct - benchmark.change_pct,
                spread,
            )),
        });
    }

    drivers
}

fn basis_change(obs: &Observation, basis: ChangeBasis) -> Option<f64> {
    match basis {
        ChangeBasis::Percent => Some(obs.change_pct),
        ChangeBasis::BasisPoints => obs.change_bps,
    }
}

fn direction_for(rule: &MetricRule, change: f64) -> Direction {
    match rule.polarity {
        Polarity::Neutral => Direction::Neutral,
        Polarity::RisesBullish => {
            if change >= 0.0 {
                Direction::Bullish
            } else {
                Direction::Bearish
            }
        }
        Polarity::RisesBearish => {
            if change >= 0.0 {
                Direction::Bearish
            } else {
                Direction::Bullish
            }
        }
    }
}

fn impact_label(impact: NewsImpact) -> &'static str {
    match impact {
        NewsImpact::High => "high-impact",
        NewsImpact::Medium => "medium-impact",
        NewsImpact::Low => "low-impact",
    }
}
