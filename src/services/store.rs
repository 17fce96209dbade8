//! Signal persistence interface and in-memory implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use crate::error::StoreError;
use crate::models::{Side, Signal, SignalStatus};

/// Persistence collaborator for signals. One logical insert per signal; the
/// store owns transactional behavior and the row schema.
#[async_trait]
pub trait SignalStore: Send + Sync {
    /// Persist a new signal, returning the store-assigned id.
    async fn create(&self, signal: Signal) -> Result<i64, StoreError>;

    /// Active (PENDING or APPROVED) signals matching the dedup key, created
    /// at or after `since`.
    async fn find_active(
        &self,
        instrument: &str,
        side: Side,
        strategy_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Signal>, StoreError>;

    /// Transition every overdue PENDING signal to EXPIRED; returns how many
    /// were swept.
    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Compare-and-set status transition. Returns `false` when the current
    /// status no longer matches `from` or the transition is not legal.
    async fn set_status(
        &self,
        id: i64,
        from: SignalStatus,
        to: SignalStatus,
    ) -> Result<bool, StoreError>;
}

/// In-memory store with the same compare-and-set semantics a database-backed
/// implementation provides. Default wiring for the binary and test suites.
pub struct MemorySignalStore {
    signals: Mutex<Vec<Signal>>,
    next_id: AtomicI64,
}

impl MemorySignalStore {
    pub fn new() -> Self {
        Self {
            signals: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
        }
    }

    /// Snapshot of every stored signal, for inspection in tests and stats
    /// endpoints.
    pub fn all(&self) -> Vec<Signal> {
        self.signals.lock().expect("signal store poisoned").clone()
    }
}

impl Default for MemorySignalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalStore for MemorySignalStore {
    async fn create(&self, mut signal: Signal) -> Result<i64, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        signal.id = Some(id);
        self.signals
            .lock()
            .expect("signal store poisoned")
            .push(signal);
        Ok(id)
    }

    async fn find_active(
        &self,
        instrument: &str,
        side: Side,
        strategy_name: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<Signal>, StoreError> {
        let signals = self.signals.lock().expect("signal store poisoned");
        Ok(signals
            .iter()
            .filter(|s| {
                s.status.is_active()
                    && s.instrument == instrument
                    && s.side == side
                    && s.strategy_name == strategy_name
                    && s.created_at >= since
            })
            .cloned()
            .collect())
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let mut signals = self.signals.lock().expect("signal store poisoned");
        let mut swept = 0;
        for signal in signals.iter_mut() {
            if signal.status == SignalStatus::Pending && signal.expires_at <= now {
                signal.status = SignalStatus::Expired;
                swept += 1;
            }
        }
        Ok(swept)
    }

    async fn set_status(
        &self,
        id: i64,
        from: SignalStatus,
        to: SignalStatus,
    ) -> Result<bool, StoreError> {
        let mut signals = self.signals.lock().expect("signal store poisoned");
        let signal = signals
            .iter_mut()
            .find(|s| s.id == Some(id))
            .ok_or(StoreError::NotFound(id))?;
        if signal.status != from || !from.can_transition(to) {
            return Ok(false);
        }
        signal.status = to;
        Ok(true)
    }
}
