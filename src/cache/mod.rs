//! Time-bounded shared cache of fetched bars and derived indicators
//!
//! Keyed by (instrument, interval). Guarantees single-flight: concurrent
//! callers for one key observe exactly one underlying fetch and share its
//! outcome. Waiters that hit their deadline receive `Timeout` while the
//! in-flight fetch runs to completion and still stores its result.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

use crate::clock::Clock;
use crate::error::FetchError;
use crate::indicators::IndicatorFrame;
use crate::models::{BarSeries, Interval};

/// Cache key: one entry per instrument and bar interval.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub instrument: String,
    pub interval: Interval,
}

impl CacheKey {
    pub fn new(instrument: impl Into<String>, interval: Interval) -> Self {
        Self {
            instrument: instrument.into(),
            interval,
        }
    }
}

/// Immutable cache entry: the fetched series plus its indicator frame,
/// computed once and shared by every strategy that scans the symbol.
#[derive(Debug)]
pub struct SymbolData {
    pub instrument: String,
    pub interval: Interval,
    pub series: BarSeries,
    pub frame: IndicatorFrame,
    pub fetched_at: DateTime<Utc>,
}

type SharedOutcome = Option<Result<Arc<SymbolData>, FetchError>>;

struct ReadyEntry {
    data: Arc<SymbolData>,
    valid_until: DateTime<Utc>,
    last_used: u64,
}

enum Slot {
    Ready(ReadyEntry),
    InFlight(watch::Receiver<SharedOutcome>),
}

struct CacheInner {
    slots: Mutex<HashMap<CacheKey, Slot>>,
    capacity: usize,
    ttl_intraday: chrono::Duration,
    ttl_daily: chrono::Duration,
    use_counter: AtomicU64,
    clock: Arc<dyn Clock>,
}

/// Shared symbol-data cache. Cheap to clone; all clones view the same slots.
#[derive(Clone)]
pub struct SymbolDataCache {
    inner: Arc<CacheInner>,
}

impl SymbolDataCache {
    pub fn new(
        clock: Arc<dyn Clock>,
        capacity: usize,
        ttl_intraday: chrono::Duration,
        ttl_daily: chrono::Duration,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                slots: Mutex::new(HashMap::new()),
                capacity,
                ttl_intraday,
                ttl_daily,
                use_counter: AtomicU64::new(0),
                clock,
            }),
        }
    }

    /// Return a fresh entry, join an in-flight fetch, or run `fetch` as the
    /// single owner for this key. The boolean is `true` when the data came
    /// from the cache (fresh hit or joined fetch) rather than an owned fetch.
    ///
    /// The owned fetch runs on its own task: a waiter abandoning at
    /// `deadline` gets `Timeout` without cancelling the fetch, and a late
    /// result is still stored for the next scan.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &CacheKey,
        deadline: Instant,
        fetch: F,
    ) -> Result<(Arc<SymbolData>, bool), FetchError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<SymbolData, FetchError>> + Send + 'static,
    {
        // The lookup and the in-flight insert happen under one lock hold so
        // exactly one caller can become the fetch owner for a key.
        enum Lookup {
            Fresh(Arc<SymbolData>),
            Join(watch::Receiver<SharedOutcome>),
            Absent,
        }

        let now = self.inner.clock.now();
        let (rx, owner_tx) = {
            let mut slots = self.inner.slots.lock().expect("cache poisoned");
            let lookup = match slots.get_mut(key) {
                Some(Slot::Ready(entry)) if now < entry.valid_until => {
                    entry.last_used = self.inner.use_counter.fetch_add(1, Ordering::Relaxed);
                    Lookup::Fresh(entry.data.clone())
                }
                Some(Slot::InFlight(rx)) => Lookup::Join(rx.clone()),
                // Stale entries are treated as absent and replaced.
                _ => Lookup::Absent,
            };
            match lookup {
                Lookup::Fresh(data) => return Ok((data, true)),
                Lookup::Join(rx) => (rx, None),
                Lookup::Absent => {
                    let (tx, rx) = watch::channel(None);
                    slots.insert(key.clone(), Slot::InFlight(rx.clone()));
                    (rx, Some(tx))
                }
            }
        };

        let hit = owner_tx.is_none();
        if let Some(tx) = owner_tx {
            let inner = self.inner.clone();
            let owner_key = key.clone();
            let fut = fetch();
            tokio::spawn(async move {
                let outcome = match fut.await {
                    Ok(data) => {
                        let data = Arc::new(data);
                        inner.store_ready(&owner_key, data.clone());
                        Ok(data)
                    }
                    Err(e) => {
                        inner.clear_in_flight(&owner_key);
                        Err(e)
                    }
                };
                // Receivers may all be gone (every waiter timed out); the
                // result is already stored either way.
                let _ = tx.send(Some(outcome));
            });
        }

        match tokio::time::timeout_at(deadline, wait_outcome(rx)).await {
            Ok(Ok(data)) => Ok((data, hit)),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                debug!(
                    instrument = %key.instrument,
                    interval = %key.interval,
                    "SymbolDataCache: waiter deadline elapsed, fetch continues in flight"
                );
                Err(FetchError::Timeout)
            }
        }
    }

    /// Drop a ready entry. A concurrent in-flight fetch is unaffected.
    pub fn invalidate(&self, key: &CacheKey) {
        let mut slots = self.inner.slots.lock().expect("cache poisoned");
        if matches!(slots.get(key), Some(Slot::Ready(_))) {
            slots.remove(key);
        }
    }

    /// Remove every stale ready entry. Eviction is otherwise lazy on read;
    /// this sweep only bounds memory between scans.
    pub fn sweep(&self) -> usize {
        let now = self.inner.clock.now();
        let mut slots = self.inner.slots.lock().expect("cache poisoned");
        let before = slots.len();
        slots.retain(|_, slot| match slot {
            Slot::Ready(entry) => now < entry.valid_until,
            Slot::InFlight(_) => true,
        });
        before - slots.len()
    }

    pub fn len(&self) -> usize {
        self.inner.slots.lock().expect("cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheInner {
    fn store_ready(&self, key: &CacheKey, data: Arc<SymbolData>) {
        let now = self.clock.now();
        let ttl = if key.interval.is_intraday() {
            self.ttl_intraday
        } else {
            self.ttl_daily
        };
        let mut slots = self.slots.lock().expect("cache poisoned");
        let last_used = self.use_counter.fetch_add(1, Ordering::Relaxed);
        slots.insert(
            key.clone(),
            Slot::Ready(ReadyEntry {
                data,
                valid_until: now + ttl,
                last_used,
            }),
        );

        if slots.len() > self.capacity {
            // LRU-evict ready entries only; in-flight slots stay pinned.
            let mut victims: Vec<(u64, CacheKey)> = slots
                .iter()
                .filter_map(|(k, slot)| match slot {
                    Slot::Ready(entry) if k != key => Some((entry.last_used, k.clone())),
                    _ => None,
                })
                .collect();
            victims.sort_by_key(|(used, _)| *used);
            for (_, victim) in victims {
                if slots.len() <= self.capacity {
                    break;
                }
                slots.remove(&victim);
            }
        }
    }

    fn clear_in_flight(&self, key: &CacheKey) {
        let mut slots = self.slots.lock().expect("cache poisoned");
        if matches!(slots.get(key), Some(Slot::InFlight(_))) {
            slots.remove(key);
        }
    }
}

async fn wait_outcome(
    mut rx: watch::Receiver<SharedOutcome>,
) -> Result<Arc<SymbolData>, FetchError> {
    loop {
        let current = rx.borrow().clone();
        if let Some(outcome) = current {
            return outcome;
        }
        if rx.changed().await.is_err() {
            return Err(FetchError::Cancelled);
        }
    }
}
