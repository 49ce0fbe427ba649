//! Aggregation Orchestrator
//!
//! The one place where every external collaborator is fanned out,
//! joined, normalized, scored, and assembled into an [`AggregatedView`].
//!
//! Data flow per cycle:
//! Feeds → guarded fetches (concurrent) → Observations → Driver
//! Detector → Bias Aggregator → AggregatedView
//!
//! Failure policy: a failing or timed-out source is omitted and recorded
//! in `failed_sources`; the cycle only errors when every source failed
//! (`AllSourcesFailed`, retryable) or the deterministic scoring path
//! misbehaves (`InternalScoring`, fatal).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tracing::{info, instrument};

use common::time::now_ms;
use feeds::{MarketFeed, Quote};
use market::bias::aggregate;
use market::detector::{detect, detect_news, rank};
use market::driver::Driver;
use market::news::{NewsItem, NewsPolicy};
use market::observation::Observation;
use market::thresholds::ThresholdTable;
use session::clock::SessionSchedule;

use crate::error::EngineError;
use crate::sources::guarded;
use crate::views::{AggregatedView, ViewKind};

pub struct Aggregator<F> {
    feed: Arc<F>,
    schedule: SessionSchedule,
    thresholds: ThresholdTable,
    news_policy: NewsPolicy,
    watched_symbols: Vec<String>,
    rate_symbols: Vec<String>,
    source_timeout: Duration,
}

impl<F: MarketFeed> Aggregator<F> {
    pub fn new(
        feed: Arc<F>,
        schedule: SessionSchedule,
        thresholds: ThresholdTable,
        news_policy: NewsPolicy,
        watched_symbols: Vec<String>,
        rate_symbols: Vec<String>,
        source_timeout: Duration,
    ) -> Self {
        Self {
            feed,
            schedule,
            thresholds,
            news_policy,
            watched_symbols,
            rate_symbols,
            source_timeout,
        }
    }

    /// Run one full aggregation cycle.
    ///
    /// All fetches launch concurrently and are joined with collect-all
    /// semantics; no arrival order can affect the ranked output.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn compute(&self, kind: ViewKind) -> Result<AggregatedView, EngineError> {
        let now = Utc::now();
        let session = self.schedule.resolve(now);
        let limit = self.source_timeout;

        let quote_futs = self.watched_symbols.iter().map(|sym| async move {
            let outcome = guarded(sym, limit, self.feed.fetch_quote(sym)).await;
            (sym.clone(), outcome)
        });

        let (quote_outcomes, sector_outcome, constituent_outcome, news_outcome) = tokio::join!(
            join_all(quote_futs),
            guarded("sectors", limit, self.feed.fetch_sector_performance()),
            guarded("constituents", limit, self.feed.fetch_top_constituents()),
            guarded("news", limit, self.feed.fetch_filtered_news(session.key)),
        );

        let attempted = self.watched_symbols.len() + 3;
        let mut failed_sources = Vec::new();

        let mut quotes = BTreeMap::new();
        for (symbol, outcome) in quote_outcomes {
            match outcome {
                Ok(quote) => {
                    quotes.insert(symbol, self.normalize(quote));
                }
                Err(failure) => failed_sources.push(failure.source),
            }
        }

        let sectors = self.fold_map(sector_outcome, &mut failed_sources);
        let constituents = self.fold_map(constituent_outcome, &mut failed_sources);

        let news: Vec<NewsItem> = match news_outcome {
            Ok(items) => items,
            Err(failure) => {
                failed_sources.push(failure.source);
                Vec::new()
            }
        };

        if failed_sources.len() >= attempted {
            return Err(EngineError::AllSourcesFailed { attempted });
        }

        let observations: Vec<Observation> = quotes
            .values()
            .chain(sectors.values())
            .chain(constituents.values())
            .cloned()
            .collect();

        let computed_at_ms = now_ms();
        let mut drivers = detect(&observations, &self.thresholds);
        drivers.extend(detect_news(&news, &self.news_policy, computed_at_ms));
        let drivers = rank(drivers);
        verify_scoring(&drivers)?;

        let net_bias = aggregate(&drivers);

        info!(
            kind = %kind,
            session = %session.key,
            drivers = drivers.len(),
            bias = ?net_bias.direction,
            confidence = net_bias.confidence,
            failed = failed_sources.len(),
            "aggregation cycle complete"
        );

        Ok(AggregatedView {
            kind,
            session,
            drivers,
            net_bias,
            quotes,
            sectors,
            constituents,
            news,
            failed_sources,
            computed_at_ms,
            stale: false,
        })
    }

    fn fold_map(
        &self,
        outcome: Result<HashMap<String, Quote>, crate::sources::SourceFailure>,
        failed_sources: &mut Vec<String>,
    ) -> BTreeMap<String, Observation> {
        match outcome {
            Ok(map) => map
                .into_iter()
                .map(|(symbol, quote)| (symbol, self.normalize(quote)))
                .collect(),
            Err(failure) => {
                failed_sources.push(failure.source);
                BTreeMap::new()
            }
        }
    }

    /// Shape a raw provider quote into the common observation form.
    /// Rate instruments additionally carry their move in basis points
    /// (one point = 100 bps).
    fn normalize(&self, quote: Quote) -> Observation {
        let obs = Observation::new(
            quote.symbol.clone(),
            quote.last,
            quote.change_abs,
            quote.change_pct,
        );

        if self.rate_symbols.iter().any(|s| s == &quote.symbol) {
            obs.with_bps(quote.change_abs * 100.0)
        } else {
            obs
        }
    }
}

/// Guard the deterministic scoring output. A non-finite or negative
/// impact means the ranking cannot be trusted.
fn verify_scoring(drivers: &[Driver]) -> Result<(), EngineError> {
    for d in drivers {
        if !d.impact.is_finite() || d.impact < 0.0 {
            return Err(EngineError::InternalScoring(format!(
                "driver '{}' produced invalid impact {}",
                d.name, d.impact
            )));
        }
    }
    Ok(())
}
