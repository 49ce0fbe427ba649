//! Session State Store
//!
//! Process-lifetime mutable store of per-session price levels and Initial
//! Balance ranges, fed by an out-of-band ingestion path (price/sweep
//! ticks) while the read side serves aggregation queries concurrently.
//!
//! Guarantees:
//! - Each session key's state sits behind its own mutex, so a reader
//!   never observes a torn update (`high` moved but `delta` not yet).
//! - Reads return cloned snapshots; no lock is held across use.
//! - No wall-clock awareness: callers drive `reset_session` at the true
//!   start of each session instance, and pass whether the IB window is
//!   open when recording ticks.

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::clock::SessionKey;
use crate::levels::{InitialBalanceLevels, PriceTick, SessionLevels, SweepEvent};

#[derive(Default)]
struct SessionSlot {
    levels: SessionLevels,
    ib: InitialBalanceLevels,
}

/// Mutex-per-key store of session levels and IB state.
pub struct SessionStateStore {
    slots: Vec<Mutex<SessionSlot>>,
}

impl Default for SessionStateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStateStore {
    /// Create an empty slot for every tracked session key.
    pub fn new() -> Self {
        let slots = SessionKey::ALL
            .iter()
            .map(|_| Mutex::new(SessionSlot::default()))
            .collect();
        Self { slots }
    }

    fn slot(&self, key: SessionKey) -> &Mutex<SessionSlot> {
        &self.slots[key.index()]
    }

    /// Apply one price tick to a session.
    ///
    /// First tick seeds open/high/low; later ticks extend the range via
    /// max/min. `close` always tracks the latest price. `ib_open` gates
    /// Initial Balance range updates and must reflect the session clock
    /// at ingestion time; once the IB is marked complete its range is
    /// frozen regardless of the flag.
    pub fn record_tick(&self, key: SessionKey, tick: &PriceTick, ib_open: bool) {
        let mut slot = self.slot(key).lock();

        let levels = &mut slot.levels;
        levels.high = Some(levels.high.map_or(tick.price, |h| h.max(tick.price)));
        levels.low = Some(levels.low.map_or(tick.price, |l| l.min(tick.price)));
        if levels.open.is_none() {
            levels.open = Some(tick.price);
        }
        levels.close = Some(tick.price);
        levels.delta = tick.delta;
        levels.volume = tick.volume;

        if ib_open && !slot.ib.complete {
            let ib = &mut slot.ib;
            ib.high = Some(ib.high.map_or(tick.price, |h| h.max(tick.price)));
            ib.low = Some(ib.low.map_or(tick.price, |l| l.min(tick.price)));
        }
    }

    /// Append a sweep to the session's sweep log. Unbounded within a
    /// trading day; cleared by `reset_session`.
    pub fn record_sweep(&self, key: SessionKey, sweep: SweepEvent) {
        let mut slot = self.slot(key).lock();

        debug!(
            session = %key,
            level = %sweep.level,
            price = sweep.price,
            reclaimed = sweep.reclaimed,
            "sweep recorded"
        );

        slot.levels.sweeps.push(sweep);
    }

    /// Freeze the Initial Balance range. Idempotent; never alters the
    /// recorded high/low.
    pub fn mark_initial_balance_complete(&self, key: SessionKey) {
        let mut slot = self.slot(key).lock();

        if !slot.ib.complete {
            slot.ib.complete = true;
            info!(
                session = %key,
                ib_high = ?slot.ib.high,
                ib_low = ?slot.ib.low,
                "initial balance complete"
            );
        }
    }

    /// Clear all state for a session key back to empty. Invoked by the
    /// ingestion path at the true start of each session instance.
    pub fn reset_session(&self, key: SessionKey) {
        let mut slot = self.slot(key).lock();

        let sweeps = slot.levels.sweeps.len();
        *slot = SessionSlot::default();

        info!(session = %key, dropped_sweeps = sweeps, "session state reset");
    }

    /// Snapshot of the session's current levels.
    pub fn levels(&self, key: SessionKey) -> SessionLevels {
        self.slot(key).lock().levels.clone()
    }

    /// Snapshot of the session's Initial Balance state.
    pub fn initial_balance(&self, key: SessionKey) -> InitialBalanceLevels {
        self.slot(key).lock().ib
    }
}
