use thiserror::Error;

use crate::cache::Recoverable;

/// Top-level failure classes of the aggregation engine.
///
/// A single source failing is not represented here: it is recovered
/// inside the orchestrator (the source is omitted for the cycle) and
/// never surfaces to callers.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Every concurrent fetch in a cycle failed. Retryable; with a stale
    /// cache entry available the caller is served that instead.
    #[error("all market data sources failed ({attempted} attempted)")]
    AllSourcesFailed { attempted: usize },

    /// Threshold table or session schedule malformed. Fatal at startup,
    /// before anything is served.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A defect in the deterministic scoring path. Fatal: the ranking
    /// output cannot be trusted, so it must never be papered over with
    /// stale data.
    #[error("internal scoring error: {0}")]
    InternalScoring(String),
}

impl Recoverable for EngineError {
    fn recoverable(&self) -> bool {
        matches!(self, EngineError::AllSourcesFailed { .. })
    }
}

impl From<session::clock::ScheduleError> for EngineError {
    fn from(e: session::clock::ScheduleError) -> Self {
        EngineError::InvalidConfiguration(e.to_string())
    }
}

impl From<market::thresholds::ThresholdError> for EngineError {
    fn from(e: market::thresholds::ThresholdError) -> Self {
        EngineError::InvalidConfiguration(e.to_string())
    }
}
