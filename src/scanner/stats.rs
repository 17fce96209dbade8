//! Epoch descriptors and their terminal statistics

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::time::Instant;

use crate::models::StrategyCategory;

/// One scheduled invocation of the unified scan.
#[derive(Debug, Clone)]
pub struct ScanEpoch {
    pub epoch_id: u64,
    pub trigger: String,
    pub triggered_at: DateTime<Utc>,
    pub categories: Vec<StrategyCategory>,
    /// Hard deadline; outstanding work is cancelled when it elapses.
    pub deadline: Instant,
}

impl ScanEpoch {
    pub fn new(
        epoch_id: u64,
        trigger: impl Into<String>,
        triggered_at: DateTime<Utc>,
        categories: Vec<StrategyCategory>,
        deadline: Instant,
    ) -> Self {
        Self {
            epoch_id,
            trigger: trigger.into(),
            triggered_at,
            categories,
            deadline,
        }
    }
}

/// Live counters for one epoch, shared across symbol tasks and the pipeline.
/// Written concurrently, read once at terminal state via [`EpochStats::summary`].
#[derive(Debug, Default)]
pub struct EpochStats {
    pub symbols: AtomicU64,
    pub fetched: AtomicU64,
    pub cache_hits: AtomicU64,
    pub candidates: AtomicU64,
    pub persisted: AtomicU64,
    pub notified: AtomicU64,
    pub failed: AtomicU64,
    pub timed_out: AtomicU64,
    pub cancelled: AtomicU64,
    pub unauthorized: AtomicU64,
    pub dedup_suppressed: AtomicU64,
    pub risk_rejected: AtomicU64,
    pub invalid_candidates: AtomicU64,
    pub persist_failed: AtomicU64,
    pub notify_failed: AtomicU64,
    pub duration_ms: AtomicU64,
}

impl EpochStats {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    pub fn summary(&self) -> EpochSummary {
        EpochSummary {
            symbols: self.symbols.load(Ordering::Relaxed),
            fetched: self.fetched.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            candidates: self.candidates.load(Ordering::Relaxed),
            persisted: self.persisted.load(Ordering::Relaxed),
            notified: self.notified.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            unauthorized: self.unauthorized.load(Ordering::Relaxed),
            dedup_suppressed: self.dedup_suppressed.load(Ordering::Relaxed),
            risk_rejected: self.risk_rejected.load(Ordering::Relaxed),
            invalid_candidates: self.invalid_candidates.load(Ordering::Relaxed),
            persist_failed: self.persist_failed.load(Ordering::Relaxed),
            notify_failed: self.notify_failed.load(Ordering::Relaxed),
            duration_ms: self.duration_ms.load(Ordering::Relaxed),
        }
    }
}

/// Immutable snapshot of an epoch's counters, written once when the epoch
/// reaches its terminal state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSummary {
    pub symbols: u64,
    pub fetched: u64,
    pub cache_hits: u64,
    pub candidates: u64,
    pub persisted: u64,
    pub notified: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub cancelled: u64,
    pub unauthorized: u64,
    pub dedup_suppressed: u64,
    pub risk_rejected: u64,
    pub invalid_candidates: u64,
    pub persist_failed: u64,
    pub notify_failed: u64,
    pub duration_ms: u64,
}
