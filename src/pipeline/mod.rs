//! Signal pipeline: validate, dedup, risk-size, persist, notify
//!
//! Candidates flow through in order: validity check, quiet-window dedup
//! against active signals, risk evaluation, persistence, optional
//! auto-approval, then one grouped notification per category per epoch. A
//! signal is always persisted before it is notified.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::models::{Candidate, Signal, SignalStatus, StrategyCategory};
use crate::scanner::stats::EpochStats;
use crate::services::{Notifier, RiskDecision, RiskPolicy, SignalNotice, SignalStore};

pub struct SignalPipeline {
    store: Arc<dyn SignalStore>,
    notifier: Arc<dyn Notifier>,
    risk: Arc<dyn RiskPolicy>,
    clock: Arc<dyn Clock>,
    quiet_window: chrono::Duration,
    signal_timeout: chrono::Duration,
    auto_trade: bool,
    auto_threshold: f64,
}

impl SignalPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn SignalStore>,
        notifier: Arc<dyn Notifier>,
        risk: Arc<dyn RiskPolicy>,
        clock: Arc<dyn Clock>,
        quiet_window: chrono::Duration,
        signal_timeout: chrono::Duration,
        auto_trade: bool,
        auto_threshold: f64,
    ) -> Self {
        Self {
            store,
            notifier,
            risk,
            clock,
            quiet_window,
            signal_timeout,
            auto_trade,
            auto_threshold,
        }
    }

    /// Run every candidate of one epoch through the pipeline. Per-candidate
    /// failures are contained: they increment a counter and never abort the
    /// batch.
    pub async fn process(
        &self,
        epoch_id: u64,
        categories: &[StrategyCategory],
        candidates: Vec<Candidate>,
        stats: &EpochStats,
    ) {
        let mut batches: HashMap<StrategyCategory, Vec<SignalNotice>> = HashMap::new();

        for candidate in candidates {
            if let Some(notice) = self.admit(epoch_id, &candidate, stats).await {
                batches.entry(candidate.category).or_default().push(notice);
            }
        }

        // One notification per category per epoch, in the epoch's category
        // order. Persisted-before-notified holds because batches only carry
        // stored signals.
        for category in categories {
            let Some(batch) = batches.remove(category) else {
                continue;
            };
            if batch.is_empty() {
                continue;
            }
            match self.notifier.notify(epoch_id, *category, &batch).await {
                Ok(()) => EpochStats::add(&stats.notified, batch.len() as u64),
                Err(e) => {
                    EpochStats::incr(&stats.notify_failed);
                    error!(
                        epoch_id,
                        category = %category,
                        error_kind = "notify",
                        "SignalPipeline: notification failed for {}: {}",
                        category,
                        e
                    );
                }
            }
        }
    }

    /// Validate, dedup, risk-size and persist one candidate. Returns the
    /// notice to include in the category batch when the signal was stored.
    async fn admit(
        &self,
        epoch_id: u64,
        candidate: &Candidate,
        stats: &EpochStats,
    ) -> Option<SignalNotice> {
        if !candidate.is_valid() {
            EpochStats::incr(&stats.invalid_candidates);
            error!(
                epoch_id,
                instrument = %candidate.instrument,
                strategy = %candidate.strategy_name,
                error_kind = "validation",
                "SignalPipeline: dropping invalid candidate for {} (entry {:.2}, stop {:.2}, target {:.2})",
                candidate.instrument,
                candidate.entry,
                candidate.stop,
                candidate.target
            );
            return None;
        }

        let now = self.clock.now();
        let since = now - self.quiet_window;
        match self
            .store
            .find_active(
                &candidate.instrument,
                candidate.side,
                &candidate.strategy_name,
                since,
            )
            .await
        {
            Ok(active) if !active.is_empty() => {
                EpochStats::incr(&stats.dedup_suppressed);
                debug!(
                    epoch_id,
                    instrument = %candidate.instrument,
                    strategy = %candidate.strategy_name,
                    "SignalPipeline: suppressing duplicate of active signal for {}",
                    candidate.instrument
                );
                return None;
            }
            Ok(_) => {}
            Err(e) => {
                EpochStats::incr(&stats.persist_failed);
                error!(
                    epoch_id,
                    instrument = %candidate.instrument,
                    strategy = %candidate.strategy_name,
                    error_kind = "persistence",
                    "SignalPipeline: dedup lookup failed for {}: {}",
                    candidate.instrument,
                    e
                );
                return None;
            }
        }

        let (quantity, notes) = match self.risk.evaluate(candidate).await {
            Ok(RiskDecision::Accept { quantity, notes }) => (quantity, notes),
            Ok(RiskDecision::Reject { reason }) => {
                EpochStats::incr(&stats.risk_rejected);
                debug!(
                    epoch_id,
                    instrument = %candidate.instrument,
                    strategy = %candidate.strategy_name,
                    "SignalPipeline: risk rejected {}: {}",
                    candidate.instrument,
                    reason
                );
                return None;
            }
            Err(e) => {
                // A risk-collaborator failure is treated as a rejection.
                EpochStats::incr(&stats.risk_rejected);
                warn!(
                    epoch_id,
                    instrument = %candidate.instrument,
                    strategy = %candidate.strategy_name,
                    error_kind = "risk",
                    "SignalPipeline: risk evaluation failed for {}: {}",
                    candidate.instrument,
                    e
                );
                return None;
            }
        };

        let mut signal = Signal::from_candidate(
            candidate,
            quantity,
            now,
            now + self.signal_timeout,
            notes,
        );
        let id = match self.store.create(signal.clone()).await {
            Ok(id) => id,
            Err(e) => {
                EpochStats::incr(&stats.persist_failed);
                error!(
                    epoch_id,
                    instrument = %candidate.instrument,
                    strategy = %candidate.strategy_name,
                    error_kind = "persistence",
                    "SignalPipeline: failed to persist signal for {}: {}",
                    candidate.instrument,
                    e
                );
                return None;
            }
        };
        signal.id = Some(id);
        EpochStats::incr(&stats.persisted);
        info!(
            epoch_id,
            signal_id = id,
            instrument = %candidate.instrument,
            side = %candidate.side,
            strategy = %candidate.strategy_name,
            confidence = candidate.confidence,
            "SignalPipeline: stored signal {} for {} ({})",
            id,
            candidate.instrument,
            candidate.strategy_name
        );

        if self.auto_trade && candidate.confidence >= self.auto_threshold {
            match self
                .store
                .set_status(id, SignalStatus::Pending, SignalStatus::Approved)
                .await
            {
                Ok(true) => {
                    signal.status = SignalStatus::Approved;
                    info!(
                        epoch_id,
                        signal_id = id,
                        confidence = candidate.confidence,
                        "SignalPipeline: auto-approved signal {} at confidence {:.2}",
                        id,
                        candidate.confidence
                    );
                }
                Ok(false) => {
                    warn!(
                        epoch_id,
                        signal_id = id,
                        "SignalPipeline: auto-approve lost the status race for signal {}",
                        id
                    );
                }
                Err(e) => {
                    error!(
                        epoch_id,
                        signal_id = id,
                        error_kind = "persistence",
                        "SignalPipeline: auto-approve failed for signal {}: {}",
                        id,
                        e
                    );
                }
            }
        }

        Some(SignalNotice::from_signal(&signal))
    }
}
