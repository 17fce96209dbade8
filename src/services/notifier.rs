//! Human-facing notification interface

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::NotifyError;
use crate::models::{Side, Signal, SignalStatus, StrategyCategory};

/// Compact per-signal payload carried in a notification batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalNotice {
    pub instrument: String,
    pub side: Side,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub confidence: f64,
    pub strategy_name: String,
    pub status: SignalStatus,
}

impl SignalNotice {
    pub fn from_signal(signal: &Signal) -> Self {
        Self {
            instrument: signal.instrument.clone(),
            side: signal.side,
            entry: signal.entry,
            stop: signal.stop,
            target: signal.target,
            confidence: signal.confidence,
            strategy_name: signal.strategy_name.clone(),
            status: signal.status,
        }
    }
}

/// Notification sink. Best-effort: the engine logs failures and moves on,
/// it never retries a batch.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        epoch_id: u64,
        category: StrategyCategory,
        notices: &[SignalNotice],
    ) -> Result<(), NotifyError>;
}

/// Notifier that renders batches into the structured log stream. Default
/// wiring until a chat integration is injected.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(
        &self,
        epoch_id: u64,
        category: StrategyCategory,
        notices: &[SignalNotice],
    ) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(notices)
            .map_err(|e| NotifyError(format!("payload serialization failed: {}", e)))?;
        info!(
            epoch_id,
            category = %category,
            count = notices.len(),
            payload = %payload,
            "Notifier: {} signal(s) for {}",
            notices.len(),
            category
        );
        Ok(())
    }
}
