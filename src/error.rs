//! Typed error taxonomy shared across the scan engine

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the fetch path (broker, cache, per-call budgets).
///
/// `Timeout` and `Cancelled` are always contained at the symbol-task level;
/// the remaining variants classify broker responses.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("deadline elapsed")]
    Timeout,

    #[error("operation cancelled")]
    Cancelled,

    #[error("rate limited by broker")]
    RateLimited { retry_after: Option<Duration> },

    #[error("transient broker error: {0}")]
    Transient(String),

    #[error("broker rejected credentials: {0}")]
    Unauthorized(String),

    #[error("instrument not found: {0}")]
    NotFound(String),

    #[error("permanent broker error: {0}")]
    Permanent(String),
}

impl FetchError {
    /// Short tag used in structured log records.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Cancelled => "cancelled",
            FetchError::RateLimited { .. } => "rate_limited",
            FetchError::Transient(_) => "transient",
            FetchError::Unauthorized(_) => "unauthorized",
            FetchError::NotFound(_) => "not_found",
            FetchError::Permanent(_) => "permanent",
        }
    }

    /// Whether the fetcher may retry this error within the caller's deadline.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::RateLimited { .. } | FetchError::Transient(_))
    }
}

/// Errors from the signal store collaborator.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("signal store unavailable: {0}")]
    Unavailable(String),

    #[error("no signal with id {0}")]
    NotFound(i64),
}

/// Errors from the notifier collaborator. Best-effort: logged, never retried.
#[derive(Debug, Clone, Error)]
#[error("notifier error: {0}")]
pub struct NotifyError(pub String);

/// Errors from the risk collaborator. Treated as a rejection by the pipeline.
#[derive(Debug, Clone, Error)]
#[error("risk evaluation error: {0}")]
pub struct RiskError(pub String);

/// Startup configuration failures. These abort the process before the
/// scheduler starts; nothing else in the taxonomy is fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid cron expression '{expr}' for trigger '{trigger}': {reason}")]
    InvalidCron {
        trigger: String,
        expr: String,
        reason: String,
    },

    #[error("unknown strategy category '{value}' in trigger '{trigger}'")]
    UnknownCategory { trigger: String, value: String },

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),

    #[error("invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}
