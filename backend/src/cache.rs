//! Time-boxed memoization with single-flight refresh.
//!
//! One cache entry per aggregated-view key is shared by all callers.
//! The contract is stricter than naive TTL memoization:
//!
//! - **Single-flight**: at most one in-flight recomputation per key.
//!   Callers arriving during an active refresh wait on the key's gate
//!   and receive the value that refresh produced, instead of triggering
//!   duplicate fetch storms.
//! - **Stale fallback**: when a refresh fails with a recoverable error
//!   and an expired entry is still held, that entry is served marked
//!   stale. Availability beats strict freshness. Non-recoverable errors
//!   always propagate.
//!
//! Bookkeeping locks are sync and never held across I/O; only the
//! per-key async gate spans the refresh future, which is exactly the
//! single-flight contract.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

/// Errors that may be recovered by serving a stale cache entry.
pub trait Recoverable {
    fn recoverable(&self) -> bool;
}

/// A cache read result; `stale` marks a payload served past its TTL
/// because the refresh behind it failed.
#[derive(Clone, Debug)]
pub struct CacheOutcome<V> {
    pub value: V,
    pub stale: bool,
}

struct Stored<V> {
    value: V,
    computed_at: Instant,
    ttl: Duration,
    generation: u64,
}

impl<V> Stored<V> {
    fn fresh(&self) -> bool {
        self.computed_at.elapsed() < self.ttl
    }
}

struct Slot<V> {
    /// Single-flight gate: the one refresh in progress holds this.
    gate: tokio::sync::Mutex<()>,
    stored: Mutex<Option<Stored<V>>>,
    generations: AtomicU64,
}

impl<V> Default for Slot<V> {
    fn default() -> Self {
        Self {
            gate: tokio::sync::Mutex::new(()),
            stored: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }
}

/// Generic TTL cache keyed by view kind (or any hashable key).
pub struct ViewCache<K, V> {
    slots: Mutex<HashMap<K, Arc<Slot<V>>>>,
}

impl<K, V> Default for ViewCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ViewCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Drop the stored entry for a key so the next read recomputes.
    pub fn invalidate(&self, key: &K) {
        if let Some(slot) = self.slots.lock().get(key) {
            *slot.stored.lock() = None;
        }
    }

    /// Return the cached value for `key`, refreshing it via `refresh`
    /// when missing, expired, or `force_refresh` is set.
    ///
    /// Concurrent callers against a cold or expired key trigger exactly
    /// one `refresh`; the rest wait and receive its result. A forced
    /// caller that waited out someone else's refresh accepts that fresh
    /// result rather than recomputing again.
    pub async fn get_or_refresh<F, Fut, E>(
        &self,
        key: &K,
        ttl: Duration,
        force_refresh: bool,
        refresh: F,
    ) -> Result<CacheOutcome<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
        E: Recoverable,
    {
        let slot = self.slot(key);

        // Fast path: fresh entry, no gate needed.
        let seen_generation = {
            let stored = slot.stored.lock();
            if !force_refresh
                && let Some(s) = stored.as_ref()
                && s.fresh()
            {
                return Ok(CacheOutcome {
                    value: s.value.clone(),
                    stale: false,
                });
            }
            stored.as_ref().map(|s| s.generation).unwrap_or(0)
        };

        let _flight = slot.gate.lock().await;

        // Re-check after winning the gate: the refresh we queued behind
        // may already have produced what we need.
        {
            let stored = slot.stored.lock();
            if let Some(s) = stored.as_ref()
                && s.fresh()
                && (!force_refresh || s.generation > seen_generation)
            {
                return Ok(CacheOutcome {
                    value: s.value.clone(),
                    stale: false,
                });
            }
        }

        match refresh().await {
            Ok(value) => {
                let generation = slot.generations.fetch_add(1, Ordering::Relaxed) + 1;
                *slot.stored.lock() = Some(Stored {
                    value: value.clone(),
                    computed_at: Instant::now(),
                    ttl,
                    generation,
                });

                debug!(generation, ttl_ms = ttl.as_millis() as u64, "cache entry refreshed");

                Ok(CacheOutcome {
                    value,
                    stale: false,
                })
            }
            Err(e) if e.recoverable() => {
                let stored = slot.stored.lock();
                match stored.as_ref() {
                    Some(s) => {
                        debug!("refresh failed; serving stale cache entry");
                        Ok(CacheOutcome {
                            value: s.value.clone(),
                            stale: true,
                        })
                    }
                    None => Err(e),
                }
            }
            Err(e) => Err(e),
        }
    }

    fn slot(&self, key: &K) -> Arc<Slot<V>> {
        let mut slots = self.slots.lock();
        Arc::clone(slots.entry(key.clone()).or_default())
    }
}
