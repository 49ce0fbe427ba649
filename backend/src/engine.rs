//! Engine facade.
//!
//! Wires the session schedule, session state store, collaborator feed,
//! threshold table, and single-flight cache into the surface the HTTP
//! layer calls: cached aggregated views on the read path, session-state
//! mutators on the ingestion path, and direct (uncached) session-clock
//! queries.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use feeds::MarketFeed;
use market::news::NewsPolicy;
use market::thresholds::ThresholdTable;
use session::clock::{NextSession, SessionKey, SessionSchedule, SessionWindow};
use session::levels::{InitialBalanceLevels, PriceTick, SessionLevels, SweepEvent};
use session::store::SessionStateStore;

use crate::aggregator::Aggregator;
use crate::cache::ViewCache;
use crate::config::AppConfig;
use crate::error::EngineError;
use crate::views::{AggregatedView, ViewKind};

pub struct Engine<F> {
    aggregator: Aggregator<F>,
    cache: ViewCache<ViewKind, AggregatedView>,
    schedule: SessionSchedule,
    store: SessionStateStore,
    cfg: AppConfig,
}

impl<F: MarketFeed> Engine<F> {
    /// Build an engine over the built-in session schedule and threshold
    /// table.
    pub fn new(cfg: AppConfig, feed: Arc<F>) -> Result<Self, EngineError> {
        let schedule = SessionSchedule::default_futures();
        let thresholds = ThresholdTable::default_equity_index();
        Self::with_tables(cfg, feed, schedule, thresholds)
    }

    /// Build an engine over caller-supplied (already validated) tables.
    pub fn with_tables(
        cfg: AppConfig,
        feed: Arc<F>,
        schedule: SessionSchedule,
        thresholds: ThresholdTable,
    ) -> Result<Self, EngineError> {
        let aggregator = Aggregator::new(
            feed,
            schedule.clone(),
            thresholds,
            NewsPolicy::default(),
            cfg.watched_symbols.clone(),
            cfg.rate_symbols.clone(),
            cfg.source_timeout,
        );

        Ok(Self {
            aggregator,
            cache: ViewCache::new(),
            schedule,
            store: SessionStateStore::new(),
            cfg,
        })
    }

    // =========================
    // Read path
    // =========================

    /// Cached aggregated view for `kind`. `force_refresh` bypasses the
    /// TTL check but still shares any refresh already in flight.
    pub async fn aggregated_view(
        &self,
        kind: ViewKind,
        force_refresh: bool,
    ) -> Result<AggregatedView, EngineError> {
        let ttl = self.cfg.ttl_for(kind);
        let outcome = self
            .cache
            .get_or_refresh(&kind, ttl, force_refresh, || self.aggregator.compute(kind))
            .await?;

        let mut view = outcome.value;
        view.stale = outcome.stale;
        Ok(view)
    }

    /// Force the next read of `kind` to recompute.
    pub fn invalidate(&self, kind: ViewKind) {
        self.cache.invalidate(&kind);
    }

    /// Session window for `now` (or the current instant). Uncached.
    pub fn current_session(&self, now: Option<DateTime<Utc>>) -> SessionWindow {
        self.schedule.resolve(now.unwrap_or_else(Utc::now))
    }

    /// Upcoming session after `now` (or the current instant). Uncached.
    pub fn next_session(&self, now: Option<DateTime<Utc>>) -> NextSession {
        self.schedule.resolve_next(now.unwrap_or_else(Utc::now))
    }

    pub fn session_levels(&self, key: SessionKey) -> SessionLevels {
        self.store.levels(key)
    }

    pub fn initial_balance(&self, key: SessionKey) -> InitialBalanceLevels {
        self.store.initial_balance(key)
    }

    // =========================
    // Ingestion path
    // =========================

    /// Record a price tick against a session. The IB range only moves
    /// while the clock says that session's IB window is open right now.
    pub fn record_price_tick(&self, key: SessionKey, tick: PriceTick) {
        let window = self.schedule.resolve(Utc::now());
        let ib_open = window.key == key && window.is_initial_balance;
        self.store.record_tick(key, &tick, ib_open);
    }

    pub fn record_sweep(&self, key: SessionKey, sweep: SweepEvent) {
        self.store.record_sweep(key, sweep);
    }

    pub fn complete_initial_balance(&self, key: SessionKey) {
        self.store.mark_initial_balance_complete(key);
    }

    pub fn reset_session(&self, key: SessionKey) {
        self.store.reset_session(key);
    }
}
