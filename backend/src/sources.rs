//! Uniform partial-failure wrapper for collaborator fetches.
//!
//! Every external call in an aggregation cycle goes through [`guarded`]:
//! it bounds the call with its own timeout and maps both failure and
//! timeout into a typed [`SourceFailure`], so the orchestrator can fold
//! outcomes with one "collect successes, log failures" pass instead of
//! per-call-site fallback logic.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use feeds::FeedError;

/// One source's failure for one cycle. Non-fatal: the source is simply
/// omitted from the cycle's observation set.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub error: FeedError,
}

/// Await `fut` under `limit`, mapping errors and timeouts into
/// [`SourceFailure`]. A timed-out fetch is treated identically to a
/// failed one.
pub async fn guarded<T, Fut>(source: &str, limit: Duration, fut: Fut) -> Result<T, SourceFailure>
where
    Fut: Future<Output = Result<T, FeedError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => {
            warn!(source, error = %error, "source fetch failed");
            Err(SourceFailure {
                source: source.to_string(),
                error,
            })
        }
        Err(_) => {
            warn!(source, timeout_ms = limit.as_millis() as u64, "source fetch timed out");
            Err(SourceFailure {
                source: source.to_string(),
                error: FeedError::Timeout,
            })
        }
    }
}
