//! Declarative threshold and polarity tables.
//!
//! Every metric the detector can score is described by a [`MetricRule`]:
//! the minimum magnitude that makes a move noteworthy, the weight that
//! turns magnitude into a ranking impact, and the metric's fixed polarity
//! (what a rise means for risk assets). Polarity is configuration, not
//! something inferred from the sign of the move at runtime.
//!
//! Cross-instrument spreads are described by [`DivergenceRule`]s over a
//! pair of metric names; their directional interpretation is likewise a
//! per-pair configuration fact (small-cap outperformance reads bullish,
//! tech outperformance reads neutral narrowness).
//!
//! Tables are validated once at startup; a malformed table must fail
//! fast before the engine serves anything.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::driver::{Direction, DriverKind};

/// What a rise in the metric means for equity-correlated risk assets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    RisesBullish,
    RisesBearish,
    Neutral,
}

/// Which change field of an observation the threshold applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeBasis {
    Percent,
    BasisPoints,
}

impl ChangeBasis {
    pub fn unit(self) -> &'static str {
        match self {
            ChangeBasis::Percent => "%",
            ChangeBasis::BasisPoints => " bps",
        }
    }
}

/// Scoring rule for one metric.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricRule {
    pub kind: DriverKind,
    /// Human label used in driver output.
    pub label: String,
    /// Minimum `abs(change)` (inclusive) for the metric to emit a driver.
    pub threshold: f64,
    /// Impact = `abs(change) * weight`. Sector weights scale with the
    /// sector's index weighting; single names with their estimated
    /// index-point contribution.
    pub weight: f64,
    pub polarity: Polarity,
    pub basis: ChangeBasis,
}

/// Scoring rule for the percent-change spread between two metrics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DivergenceRule {
    /// Name of the emitted driver.
    pub label: String,
    /// Metric whose outperformance is being measured.
    pub lead: String,
    /// Benchmark metric.
    pub benchmark: String,
    /// Minimum `abs(lead.change_pct - benchmark.change_pct)`, inclusive.
    pub threshold: f64,
    pub weight: f64,
    /// Direction when the lead outperforms the benchmark.
    pub when_lead_outperforms: Direction,
    /// Direction when the lead underperforms the benchmark.
    pub when_lead_underperforms: Direction,
    pub outperform_reason: String,
    pub underperform_reason: String,
}

#[derive(Error, Debug)]
pub enum ThresholdError {
    #[error("metric {0} has a non-positive threshold")]
    BadThreshold(String),

    #[error("metric {0} has a non-positive weight")]
    BadWeight(String),

    #[error("divergence {0} references itself as benchmark")]
    SelfDivergence(String),
}

/// Validated lookup table of metric and divergence rules.
#[derive(Clone, Debug, Default)]
pub struct ThresholdTable {
    rules: HashMap<String, MetricRule>,
    divergences: Vec<DivergenceRule>,
}

impl ThresholdTable {
    pub fn new(
        rules: HashMap<String, MetricRule>,
        divergences: Vec<DivergenceRule>,
    ) -> Result<Self, ThresholdError> {
        for (name, rule) in &rules {
            if rule.threshold <= 0.0 || !rule.threshold.is_finite() {
                return Err(ThresholdError::BadThreshold(name.clone()));
            }
            if rule.weight <= 0.0 || !rule.weight.is_finite() {
                return Err(ThresholdError::BadWeight(name.clone()));
            }
        }
        for d in &divergences {
            if d.threshold <= 0.0 || !d.threshold.is_finite() {
                return Err(ThresholdError::BadThreshold(d.label.clone()));
            }
            if d.weight <= 0.0 || !d.weight.is_finite() {
                return Err(ThresholdError::BadWeight(d.label.clone()));
            }
            if d.lead == d.benchmark {
                return Err(ThresholdError::SelfDivergence(d.label.clone()));
            }
        }

        Ok(Self { rules, divergences })
    }

    pub fn rule(&self, metric: &str) -> Option<&MetricRule> {
        self.rules.get(metric)
    }

    pub fn divergences(&self) -> &[DivergenceRule] {
        &self.divergences
    }

    /// Built-in table for a US equity-index desk.
    pub fn default_equity_index() -> Self {
        let mut rules = HashMap::new();

        let mut rule = |metric: &str,
                        kind: DriverKind,
                        label: &str,
                        threshold: f64,
                        weight: f64,
                        polarity: Polarity,
                        basis: ChangeBasis| {
            rules.insert(
                metric.to_string(),
                MetricRule {
                    kind,
                    label: label.to_string(),
                    threshold,
                    weight,
                    polarity,
                    basis,
                },
            );
        };

        // Cross-asset correlations.
        rule(
            "VIX",
            DriverKind::Correlation,
            "Volatility (VIX)",
            2.0,
            2.0,
            Polarity::RisesBearish,
            ChangeBasis::Percent,
        );
        rule(
            "US10Y",
            DriverKind::Correlation,
            "10Y Treasury yield",
            2.0,
            1.5,
            Polarity::RisesBearish,
            ChangeBasis::BasisPoints,
        );
        rule(
            "DXY",
            DriverKind::Correlation,
            "US dollar index",
            0.3,
            1.5,
            Polarity::RisesBearish,
            ChangeBasis::Percent,
        );
        rule(
            "HYG",
            DriverKind::Correlation,
            "High-yield credit (HYG)",
            0.3,
            1.5,
            Polarity::RisesBullish,
            ChangeBasis::Percent,
        );

        // International tape.
        rule(
            "USDJPY",
            DriverKind::International,
            "Dollar-yen carry",
            0.4,
            1.2,
            Polarity::RisesBullish,
            ChangeBasis::Percent,
        );
        rule(
            "NKY",
            DriverKind::International,
            "Nikkei 225",
            0.8,
            1.0,
            Polarity::RisesBullish,
            ChangeBasis::Percent,
        );
        rule(
            "DAX",
            DriverKind::International,
            "DAX",
            0.8,
            1.0,
            Polarity::RisesBullish,
            ChangeBasis::Percent,
        );

        // Sector ETFs, weighted by rough index weighting.
        let sectors: &[(&str, &str, f64)] = &[
            ("XLK", "Technology sector (XLK)", 3.0),
            ("XLF", "Financials sector (XLF)", 1.3),
            ("XLV", "Health care sector (XLV)", 1.1),
            ("XLY", "Consumer discretionary (XLY)", 1.0),
            ("XLI", "Industrials sector (XLI)", 0.9),
            ("XLE", "Energy sector (XLE)", 0.4),
        ];
        for (sym, label, weight) in sectors {
            rule(
                sym,
                DriverKind::Sector,
                label,
                0.5,
                *weight,
                Polarity::RisesBullish,
                ChangeBasis::Percent,
            );
        }

        // Mag-7 single names, weighted by estimated index-point pull.
        let mag7: &[(&str, &str, f64)] = &[
            ("NVDA", "NVIDIA", 2.2),
            ("AAPL", "Apple", 2.0),
            ("MSFT", "Microsoft", 2.0),
            ("AMZN", "Amazon", 1.2),
            ("GOOGL", "Alphabet", 1.2),
            ("META", "Meta", 0.8),
            ("TSLA", "Tesla", 0.6),
        ];
        for (sym, label, weight) in mag7 {
            rule(
                sym,
                DriverKind::Mag7,
                label,
                1.0,
                *weight,
                Polarity::RisesBullish,
                ChangeBasis::Percent,
            );
        }

        let divergences = vec![
            // Tech leadership signals narrowness, not direction.
            DivergenceRule {
                label: "Tech vs broad tape".to_string(),
                lead: "NDX".to_string(),
                benchmark: "SPX".to_string(),
                threshold: 0.5,
                weight: 1.0,
                when_lead_outperforms: Direction::Neutral,
                when_lead_underperforms: Direction::Neutral,
                outperform_reason: "tech leading, tape narrowing".to_string(),
                underperform_reason: "tech lagging the broad tape".to_string(),
            },
            DivergenceRule {
                label: "Small caps vs broad tape".to_string(),
                lead: "RUT".to_string(),
                benchmark: "SPX".to_string(),
                threshold: 0.3,
                weight: 1.0,
                when_lead_outperforms: Direction::Bullish,
                when_lead_underperforms: Direction::Bearish,
                outperform_reason: "breadth expanding, small caps leading".to_string(),
                underperform_reason: "breadth contracting, small caps lagging".to_string(),
            },
        ];

        // The built-in table is static; keep it behind the same validation
        // as user-supplied tables.
        match Self::new(rules, divergences) {
            Ok(t) => t,
            Err(e) => unreachable!("built-in threshold table failed validation: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_validates() {
        let table = ThresholdTable::default_equity_index();
        assert!(table.rule("VIX").is_some());
        assert!(table.rule("SPX").is_none()); // the index itself is not a driver
        assert_eq!(table.divergences().len(), 2);
    }

    #[test]
    fn non_positive_threshold_rejected() {
        let mut rules = HashMap::new();
        rules.insert(
            "VIX".to_string(),
            MetricRule {
                kind: DriverKind::Correlation,
                label: "vix".to_string(),
                threshold: 0.0,
                weight: 1.0,
                polarity: Polarity::RisesBearish,
                basis: ChangeBasis::Percent,
            },
        );

        let err = ThresholdTable::new(rules, vec![]).unwrap_err();
        assert!(matches!(err, ThresholdError::BadThreshold(_)));
    }

    #[test]
    fn self_referencing_divergence_rejected() {
        let d = DivergenceRule {
            label: "spx vs spx".to_string(),
            lead: "SPX".to_string(),
            benchmark: "SPX".to_string(),
            threshold: 0.5,
            weight: 1.0,
            when_lead_outperforms: Direction::Neutral,
            when_lead_underperforms: Direction::Neutral,
            outperform_reason: String::new(),
            underperform_reason: String::new(),
        };

        let err = ThresholdTable::new(HashMap::new(), vec![d]).unwrap_err();
        assert!(matches!(err, ThresholdError::SelfDivergence(_)));
    }
}
