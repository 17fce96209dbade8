//! Broker fetch path: per-call budgets, retries and the credential cooldown
//!
//! Wraps the [`BrokerClient`] collaborator. Every call is bounded by
//! min(caller deadline, per-interval cap); `RateLimited` and `Transient`
//! errors retry with full-jitter exponential backoff inside the caller's
//! deadline; `Unauthorized` trips a process-wide fetch pause so a dead
//! credential cannot burn every scan in the window.

use std::cmp;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::FetchError;
use crate::models::{BarSeries, Interval};
use crate::services::BrokerClient;

const MAX_ATTEMPTS: u32 = 3;
const BACKOFF_BASE: Duration = Duration::from_millis(500);
const BACKOFF_CAP: Duration = Duration::from_secs(8);

/// Pause window entered after an Unauthorized broker response. One
/// observability event per window.
struct FetchGate {
    paused_until: Mutex<Option<DateTime<Utc>>>,
    cooldown: chrono::Duration,
}

impl FetchGate {
    fn is_paused(&self, now: DateTime<Utc>) -> bool {
        let paused = self.paused_until.lock().expect("fetch gate poisoned");
        matches!(*paused, Some(until) if now < until)
    }

    /// Returns `true` when this call opened a new cooldown window.
    fn trip(&self, now: DateTime<Utc>) -> bool {
        let mut paused = self.paused_until.lock().expect("fetch gate poisoned");
        if matches!(*paused, Some(until) if now < until) {
            return false;
        }
        *paused = Some(now + self.cooldown);
        true
    }
}

/// Deadline-aware broker fetch wrapper.
pub struct Fetcher {
    broker: Arc<dyn BrokerClient>,
    clock: Arc<dyn Clock>,
    timeout_intraday: Duration,
    timeout_history: Duration,
    gate: FetchGate,
    shutdown: watch::Receiver<bool>,
}

impl Fetcher {
    pub fn new(
        broker: Arc<dyn BrokerClient>,
        clock: Arc<dyn Clock>,
        timeout_intraday: Duration,
        timeout_history: Duration,
        unauthorized_cooldown: chrono::Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            broker,
            clock,
            timeout_intraday,
            timeout_history,
            gate: FetchGate {
                paused_until: Mutex::new(None),
                cooldown: unauthorized_cooldown,
            },
            shutdown,
        }
    }

    /// Fetch one history window. No lock is held across the broker call.
    pub async fn fetch_bars(
        &self,
        instrument: &str,
        interval: Interval,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        deadline: Instant,
    ) -> Result<BarSeries, FetchError> {
        if self.gate.is_paused(self.clock.now()) {
            return Err(FetchError::Unauthorized(
                "fetches paused during credential cooldown".to_string(),
            ));
        }

        let per_call_cap = if interval.is_intraday() {
            self.timeout_intraday
        } else {
            self.timeout_history
        };

        let mut shutdown = self.shutdown.clone();
        let mut attempt = 1;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Err(FetchError::Timeout);
            }
            let per_call = cmp::min(per_call_cap, deadline - now);

            let call = self.broker.fetch_historical(instrument, interval, from, to);
            let result = tokio::select! {
                _ = wait_cancelled(&mut shutdown) => return Err(FetchError::Cancelled),
                outcome = tokio::time::timeout(per_call, call) => match outcome {
                    Ok(r) => r,
                    Err(_) => Err(FetchError::Timeout),
                },
            };

            match result {
                Ok(series) => return Ok(series),
                Err(err @ FetchError::RateLimited { .. }) | Err(err @ FetchError::Transient(_))
                    if attempt < MAX_ATTEMPTS =>
                {
                    let delay = match &err {
                        FetchError::RateLimited {
                            retry_after: Some(after),
                        } => *after,
                        _ => jittered_backoff(attempt),
                    };
                    if Instant::now() + delay >= deadline {
                        return Err(FetchError::Timeout);
                    }
                    debug!(
                        instrument,
                        interval = %interval,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error_kind = err.kind(),
                        "Fetcher: retrying {} after {:?}",
                        instrument,
                        delay
                    );
                    tokio::select! {
                        _ = wait_cancelled(&mut shutdown) => return Err(FetchError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
                Err(FetchError::Unauthorized(reason)) => {
                    if self.gate.trip(self.clock.now()) {
                        warn!(
                            instrument,
                            cooldown_secs = self.gate.cooldown.num_seconds(),
                            "Fetcher: broker unauthorized, pausing fetches for cooldown: {}",
                            reason
                        );
                    }
                    return Err(FetchError::Unauthorized(reason));
                }
                Err(other) => return Err(other),
            }
        }
    }
}

/// Full-jitter exponential backoff: uniform in [0, min(base * 2^(n-1), cap)].
fn jittered_backoff(attempt: u32) -> Duration {
    let exp = BACKOFF_BASE.saturating_mul(1 << (attempt - 1).min(8));
    let ceiling = cmp::min(exp, BACKOFF_CAP);
    let millis = rand::thread_rng().gen_range(0..=ceiling.as_millis() as u64);
    Duration::from_millis(millis)
}

/// Resolves when the shutdown flag flips; pends forever if shutdown can no
/// longer be signalled.
pub(crate) async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
