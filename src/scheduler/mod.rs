//! Cron-driven scheduler that launches scan epochs
//!
//! Each named trigger runs in its own task: sleep to the next fire, run the
//! epoch to completion, then count any fires that elapsed during the run as
//! skipped overlaps (a trigger never runs two epochs at once). A separate
//! sweeper expires overdue PENDING signals and prunes stale cache entries.

use std::collections::HashMap;
use std::mem;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::cache::SymbolDataCache;
use crate::clock::{Clock, MarketCalendar, TriggerSpec};
use crate::config::Config;
use crate::error::ConfigError;
use crate::fetch::{wait_cancelled, Fetcher};
use crate::pipeline::SignalPipeline;
use crate::scanner::{EpochSummary, ScanEpoch, UnifiedScanner};
use crate::services::{BrokerClient, Notifier, RiskPolicy, SignalStore};
use crate::strategies::StrategyRegistry;

/// A parsed trigger: schedule plus the categories its epochs scan.
pub struct TriggerDef {
    pub name: String,
    pub spec: TriggerSpec,
    pub categories: Vec<crate::models::StrategyCategory>,
}

/// Per-trigger execution statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerStats {
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub skipped_overlap: u64,
    pub avg_duration_ms: f64,
    pub last_execution: Option<DateTime<Utc>>,
}

/// Scheduler-wide statistics snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub epochs_run: u64,
    pub signals_expired: u64,
    pub triggers: HashMap<String, TriggerStats>,
    pub last_epoch: Option<EpochSummary>,
}

struct SchedulerInner {
    scanner: Arc<UnifiedScanner>,
    store: Arc<dyn SignalStore>,
    cache: SymbolDataCache,
    clock: Arc<dyn Clock>,
    calendar: MarketCalendar,
    triggers: Vec<Arc<TriggerDef>>,
    epoch_timeout: Duration,
    sweep_interval: Duration,
    epoch_counter: AtomicU64,
    epochs_run: AtomicU64,
    signals_expired: AtomicU64,
    trigger_stats: Mutex<HashMap<String, TriggerStats>>,
    last_epoch: Mutex<Option<EpochSummary>>,
    shutdown_tx: watch::Sender<bool>,
}

/// The scheduler control surface: the only operations surrounding layers
/// (HTTP, CLI) may invoke.
pub struct SchedulerLoop {
    inner: Arc<SchedulerInner>,
    shutdown_grace: Duration,
    handles: Mutex<Vec<JoinHandle<()>>>,
    started: AtomicBool,
}

/// Wire the full engine from configuration and injected collaborators.
/// The returned scheduler owns all engine state; nothing is global.
pub fn build(
    config: &Config,
    broker: Arc<dyn BrokerClient>,
    store: Arc<dyn SignalStore>,
    notifier: Arc<dyn Notifier>,
    risk: Arc<dyn RiskPolicy>,
    clock: Arc<dyn Clock>,
) -> Result<SchedulerLoop, ConfigError> {
    config.validate()?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let calendar = MarketCalendar::nse(config.timezone);

    let mut triggers = Vec::with_capacity(config.triggers.len());
    for trigger in &config.triggers {
        let spec = TriggerSpec::parse(
            &trigger.name,
            &trigger.cron,
            config.timezone,
            trigger.session_only,
        )?;
        triggers.push(Arc::new(TriggerDef {
            name: trigger.name.clone(),
            spec,
            categories: trigger.categories.clone(),
        }));
    }

    let fetcher = Arc::new(Fetcher::new(
        broker,
        clock.clone(),
        config.fetch_timeout_intraday,
        config.fetch_timeout_history,
        config.unauthorized_cooldown,
        shutdown_rx,
    ));
    let cache = SymbolDataCache::new(
        clock.clone(),
        config.cache_capacity,
        config.cache_ttl_intraday,
        config.cache_ttl_daily,
    );
    let pipeline = Arc::new(SignalPipeline::new(
        store.clone(),
        notifier,
        risk,
        clock.clone(),
        config.quiet_window,
        config.signal_timeout,
        config.auto_trade,
        config.auto_threshold,
    ));
    let scanner = Arc::new(UnifiedScanner::new(
        cache.clone(),
        fetcher,
        Arc::new(StrategyRegistry::defaults()),
        pipeline,
        clock.clone(),
        config.watchlists.clone(),
        config.parallelism,
        config.symbol_timeout,
    ));

    Ok(SchedulerLoop {
        inner: Arc::new(SchedulerInner {
            scanner,
            store,
            cache,
            clock,
            calendar,
            triggers,
            epoch_timeout: config.epoch_timeout,
            sweep_interval: config.sweep_interval,
            epoch_counter: AtomicU64::new(0),
            epochs_run: AtomicU64::new(0),
            signals_expired: AtomicU64::new(0),
            trigger_stats: Mutex::new(HashMap::new()),
            last_epoch: Mutex::new(None),
            shutdown_tx,
        }),
        shutdown_grace: config.shutdown_grace,
        handles: Mutex::new(Vec::new()),
        started: AtomicBool::new(false),
    })
}

impl SchedulerLoop {
    /// Spawn one task per trigger plus the expiry sweeper, and log the next
    /// fire time of every trigger.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!("SchedulerLoop: start called twice, ignoring");
            return;
        }

        let mut handles = self.handles.lock().expect("scheduler poisoned");
        for def in &self.inner.triggers {
            let now = self.inner.clock.now();
            match def.spec.next_fire(now, &self.inner.calendar) {
                Some(at) => info!(
                    trigger = %def.name,
                    next_run = %at,
                    "SchedulerLoop: trigger '{}' next run at {}",
                    def.name,
                    at
                ),
                None => warn!(
                    trigger = %def.name,
                    "SchedulerLoop: trigger '{}' has no upcoming fire",
                    def.name
                ),
            }
            handles.push(tokio::spawn(trigger_loop(
                self.inner.clone(),
                def.clone(),
            )));
        }
        handles.push(tokio::spawn(sweeper_loop(self.inner.clone())));
        info!(
            triggers = self.inner.triggers.len(),
            "SchedulerLoop: started with {} triggers",
            self.inner.triggers.len()
        );
    }

    /// Signal cancellation to every in-flight epoch, wait up to `grace`,
    /// then force-abort whatever is left.
    pub async fn stop(&self, grace: Duration) {
        let _ = self.inner.shutdown_tx.send(true);
        let handles = {
            let mut guard = self.handles.lock().expect("scheduler poisoned");
            mem::take(&mut *guard)
        };
        let deadline = Instant::now() + grace;
        for mut handle in handles {
            if tokio::time::timeout_at(deadline, &mut handle).await.is_err() {
                handle.abort();
                warn!("SchedulerLoop: aborted task that outlived the shutdown grace");
            }
        }
        info!("SchedulerLoop: stopped");
    }

    /// Stop with the configured grace period.
    pub async fn stop_default(&self) {
        self.stop(self.shutdown_grace).await;
    }

    /// Launch an epoch for the named trigger immediately. Returns the epoch
    /// id, or `None` for an unknown trigger. Overlap policy applies to
    /// scheduled fires only.
    pub fn trigger_now(&self, name: &str) -> Option<u64> {
        let def = self
            .inner
            .triggers
            .iter()
            .find(|d| d.name == name)?
            .clone();
        let epoch_id = self.inner.next_epoch_id();
        let inner = self.inner.clone();
        tokio::spawn(async move {
            inner
                .run_epoch(epoch_id, &def.name, def.categories.clone())
                .await;
        });
        Some(epoch_id)
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            epochs_run: self.inner.epochs_run.load(Ordering::Relaxed),
            signals_expired: self.inner.signals_expired.load(Ordering::Relaxed),
            triggers: self
                .inner
                .trigger_stats
                .lock()
                .expect("scheduler poisoned")
                .clone(),
            last_epoch: self
                .inner
                .last_epoch
                .lock()
                .expect("scheduler poisoned")
                .clone(),
        }
    }

    /// Upcoming fire time per trigger.
    pub fn next_runs(&self) -> Vec<(String, DateTime<Utc>)> {
        let now = self.inner.clock.now();
        self.inner
            .triggers
            .iter()
            .filter_map(|def| {
                def.spec
                    .next_fire(now, &self.inner.calendar)
                    .map(|at| (def.name.clone(), at))
            })
            .collect()
    }
}

impl SchedulerInner {
    fn next_epoch_id(&self) -> u64 {
        self.epoch_counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    async fn run_epoch(
        &self,
        epoch_id: u64,
        trigger: &str,
        categories: Vec<crate::models::StrategyCategory>,
    ) -> EpochSummary {
        let triggered_at = self.clock.now();
        let deadline = Instant::now() + self.epoch_timeout;
        let epoch = ScanEpoch::new(epoch_id, trigger, triggered_at, categories, deadline);

        let summary = self.scanner.run(&epoch).await;
        self.epochs_run.fetch_add(1, Ordering::Relaxed);

        let success = summary.failed == 0 && summary.timed_out == 0;
        {
            let mut stats = self.trigger_stats.lock().expect("scheduler poisoned");
            let entry = stats.entry(trigger.to_string()).or_default();
            entry.total_runs += 1;
            if success {
                entry.successful_runs += 1;
            } else {
                entry.failed_runs += 1;
            }
            let n = entry.total_runs as f64;
            entry.avg_duration_ms =
                (entry.avg_duration_ms * (n - 1.0) + summary.duration_ms as f64) / n;
            entry.last_execution = Some(self.clock.now());
        }
        *self.last_epoch.lock().expect("scheduler poisoned") = Some(summary.clone());
        summary
    }

    fn record_skipped(&self, trigger: &str, skipped: u64) {
        let mut stats = self.trigger_stats.lock().expect("scheduler poisoned");
        stats.entry(trigger.to_string()).or_default().skipped_overlap += skipped;
    }
}

/// Fires of `spec` in `(fired_at, now]`: scheduled fires that elapsed while
/// an epoch for the same trigger was still running.
pub fn missed_fires(
    spec: &TriggerSpec,
    calendar: &MarketCalendar,
    fired_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> u64 {
    let mut cursor = fired_at;
    let mut missed = 0;
    while let Some(next) = spec.next_fire(cursor, calendar) {
        if next <= now {
            missed += 1;
            cursor = next;
        } else {
            break;
        }
    }
    missed
}

async fn trigger_loop(inner: Arc<SchedulerInner>, def: Arc<TriggerDef>) {
    let mut shutdown = inner.shutdown_tx.subscribe();
    loop {
        let now = inner.clock.now();
        let Some(fire_at) = def.spec.next_fire(now, &inner.calendar) else {
            warn!(
                trigger = %def.name,
                "SchedulerLoop: trigger '{}' schedule exhausted",
                def.name
            );
            return;
        };
        let wait = (fire_at - now).to_std().unwrap_or_default();
        tokio::select! {
            _ = wait_cancelled(&mut shutdown) => return,
            _ = tokio::time::sleep(wait) => {}
        }

        let epoch_id = inner.next_epoch_id();
        inner
            .run_epoch(epoch_id, &def.name, def.categories.clone())
            .await;

        // A run that outlasts its cadence swallows the fires it overlapped;
        // record them instead of queueing a burst of late epochs.
        let skipped = missed_fires(&def.spec, &inner.calendar, fire_at, inner.clock.now());
        if skipped > 0 {
            inner.record_skipped(&def.name, skipped);
            warn!(
                trigger = %def.name,
                skipped,
                "SchedulerLoop: trigger '{}' skipped {} overlapped fire(s)",
                def.name,
                skipped
            );
        }
    }
}

async fn sweeper_loop(inner: Arc<SchedulerInner>) {
    let mut shutdown = inner.shutdown_tx.subscribe();
    loop {
        tokio::select! {
            _ = wait_cancelled(&mut shutdown) => return,
            _ = tokio::time::sleep(inner.sweep_interval) => {}
        }
        match inner.store.expire_overdue(inner.clock.now()).await {
            Ok(0) => {}
            Ok(expired) => {
                inner
                    .signals_expired
                    .fetch_add(expired as u64, Ordering::Relaxed);
                info!(
                    expired,
                    "SchedulerLoop: expired {} overdue pending signal(s)", expired
                );
            }
            Err(e) => warn!(
                error_kind = "persistence",
                "SchedulerLoop: expiry sweep failed: {}", e
            ),
        }
        let pruned = inner.cache.sweep();
        if pruned > 0 {
            info!(pruned, "SchedulerLoop: pruned {} stale cache entries", pruned);
        }
    }
}
