//! Unified scan over every symbol an epoch's categories require
//!
//! One fetch per (instrument, interval) regardless of how many categories
//! want the symbol; indicators computed once; every registered strategy of
//! the epoch's categories runs over the shared snapshot. Symbol tasks fan
//! out under a bounded semaphore and every task is deadline-scoped, so a
//! degraded broker can never stall the scan past its epoch budget.

pub mod stats;

use std::cmp;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheKey, SymbolData, SymbolDataCache};
use crate::clock::Clock;
use crate::error::FetchError;
use crate::fetch::Fetcher;
use crate::indicators::IndicatorFrame;
use crate::models::{Candidate, StrategyCategory};
use crate::pipeline::SignalPipeline;
use crate::strategies::{best_per_category, StrategyRegistry};

pub use stats::{EpochStats, EpochSummary, ScanEpoch};

pub struct UnifiedScanner {
    cache: SymbolDataCache,
    fetcher: Arc<Fetcher>,
    registry: Arc<StrategyRegistry>,
    pipeline: Arc<SignalPipeline>,
    clock: Arc<dyn Clock>,
    watchlists: HashMap<StrategyCategory, Vec<String>>,
    parallelism: usize,
    symbol_timeout: Duration,
}

impl UnifiedScanner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        cache: SymbolDataCache,
        fetcher: Arc<Fetcher>,
        registry: Arc<StrategyRegistry>,
        pipeline: Arc<SignalPipeline>,
        clock: Arc<dyn Clock>,
        watchlists: HashMap<StrategyCategory, Vec<String>>,
        parallelism: usize,
        symbol_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            fetcher,
            registry,
            pipeline,
            clock,
            watchlists,
            parallelism: parallelism.max(1),
            symbol_timeout,
        }
    }

    /// Distinct (instrument, interval) units of work for the epoch, each
    /// tagged with the categories that want it, in the epoch's category
    /// order.
    fn plan(&self, categories: &[StrategyCategory]) -> Vec<(CacheKey, Vec<StrategyCategory>)> {
        let mut order: Vec<CacheKey> = Vec::new();
        let mut wanted: HashMap<CacheKey, Vec<StrategyCategory>> = HashMap::new();
        for &category in categories {
            let interval = category.interval();
            let Some(watchlist) = self.watchlists.get(&category) else {
                continue;
            };
            for instrument in watchlist {
                let key = CacheKey::new(instrument.clone(), interval);
                let entry = wanted.entry(key.clone()).or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                });
                if !entry.contains(&category) {
                    entry.push(category);
                }
            }
        }
        order
            .into_iter()
            .map(|key| {
                let categories = wanted.remove(&key).unwrap_or_default();
                (key, categories)
            })
            .collect()
    }

    /// Run one scan epoch to its terminal state and return the stats
    /// summary. All per-symbol errors are contained here; this function
    /// itself never fails.
    pub async fn run(&self, epoch: &ScanEpoch) -> EpochSummary {
        let started = Instant::now();
        let stats = Arc::new(EpochStats::default());
        let work = self.plan(&epoch.categories);
        EpochStats::add(&stats.symbols, work.len() as u64);

        info!(
            epoch_id = epoch.epoch_id,
            trigger = %epoch.trigger,
            symbols = work.len(),
            categories = ?epoch.categories,
            "UnifiedScanner: starting epoch {} with {} symbols",
            epoch.epoch_id,
            work.len()
        );

        let semaphore = Arc::new(Semaphore::new(self.parallelism));
        let (candidate_tx, mut candidate_rx) = mpsc::unbounded_channel::<Candidate>();

        let mut handles = Vec::with_capacity(work.len());
        for (key, categories) in work {
            let semaphore = semaphore.clone();
            let cache = self.cache.clone();
            let fetcher = self.fetcher.clone();
            let registry = self.registry.clone();
            let clock = self.clock.clone();
            let stats = stats.clone();
            let tx = candidate_tx.clone();
            let symbol_timeout = self.symbol_timeout;
            let epoch_deadline = epoch.deadline;
            let epoch_id = epoch.epoch_id;

            handles.push(tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return;
                };
                let now = Instant::now();
                if now >= epoch_deadline {
                    EpochStats::incr(&stats.timed_out);
                    return;
                }
                let symbol_deadline = cmp::min(now + symbol_timeout, epoch_deadline);

                let fetch = {
                    let fetcher = fetcher.clone();
                    let clock = clock.clone();
                    let stats = stats.clone();
                    let key = key.clone();
                    let from = clock.now() - key.interval.lookback();
                    let to = clock.now();
                    move || async move {
                        EpochStats::incr(&stats.fetched);
                        let series = fetcher
                            .fetch_bars(&key.instrument, key.interval, from, to, symbol_deadline)
                            .await?;
                        let frame = IndicatorFrame::compute(&series);
                        Ok(SymbolData {
                            instrument: key.instrument.clone(),
                            interval: key.interval,
                            series,
                            frame,
                            fetched_at: clock.now(),
                        })
                    }
                };

                match cache.get_or_fetch(&key, symbol_deadline, fetch).await {
                    Ok((data, from_cache)) => {
                        if from_cache {
                            EpochStats::incr(&stats.cache_hits);
                        }
                        let mut symbol_candidates = Vec::new();
                        for category in &categories {
                            for strategy in registry.for_category(*category) {
                                if data.series.len() < strategy.min_history() {
                                    continue;
                                }
                                symbol_candidates
                                    .extend(strategy.evaluate(&data.series, &data.frame));
                            }
                        }
                        for candidate in best_per_category(symbol_candidates) {
                            EpochStats::incr(&stats.candidates);
                            let _ = tx.send(candidate);
                        }
                    }
                    Err(e) => {
                        match &e {
                            FetchError::Timeout => EpochStats::incr(&stats.timed_out),
                            FetchError::Cancelled => EpochStats::incr(&stats.cancelled),
                            FetchError::Unauthorized(_) => {
                                EpochStats::incr(&stats.unauthorized);
                                EpochStats::incr(&stats.failed);
                            }
                            FetchError::NotFound(_) => {
                                // Unfetchable for this epoch; no retries.
                                EpochStats::incr(&stats.failed);
                            }
                            _ => EpochStats::incr(&stats.failed),
                        }
                        error!(
                            epoch_id,
                            instrument = %key.instrument,
                            interval = %key.interval,
                            error_kind = e.kind(),
                            "UnifiedScanner: symbol task failed for {}: {}",
                            key.instrument,
                            e
                        );
                    }
                }
            }));
        }
        drop(candidate_tx);

        // Symbol tasks are deadline-scoped, so the gather normally drains by
        // the epoch deadline on its own; the abort below is the hard stop
        // for anything still running past it.
        let hard_stop = epoch.deadline + Duration::from_millis(50);
        for mut handle in handles {
            match tokio::time::timeout_at(hard_stop, &mut handle).await {
                Ok(_) => {}
                Err(_) => {
                    handle.abort();
                    warn!(
                        epoch_id = epoch.epoch_id,
                        "UnifiedScanner: aborted symbol task past epoch deadline"
                    );
                }
            }
        }

        let mut candidates = Vec::new();
        while let Some(candidate) = candidate_rx.recv().await {
            candidates.push(candidate);
        }
        debug!(
            epoch_id = epoch.epoch_id,
            candidates = candidates.len(),
            "UnifiedScanner: gathered {} candidates",
            candidates.len()
        );

        self.pipeline
            .process(epoch.epoch_id, &epoch.categories, candidates, &stats)
            .await;

        let elapsed = started.elapsed();
        stats
            .duration_ms
            .store(elapsed.as_millis() as u64, std::sync::atomic::Ordering::Relaxed);
        let summary = stats.summary();
        info!(
            epoch_id = epoch.epoch_id,
            trigger = %epoch.trigger,
            duration_ms = summary.duration_ms,
            fetched = summary.fetched,
            cache_hits = summary.cache_hits,
            candidates = summary.candidates,
            persisted = summary.persisted,
            timed_out = summary.timed_out,
            failed = summary.failed,
            "UnifiedScanner: epoch {} finished in {:?}",
            epoch.epoch_id,
            elapsed
        );
        summary
    }
}
