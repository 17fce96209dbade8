//! Persisted signals and their lifecycle state machine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::candidate::{Candidate, Side, StrategyCategory};

/// Signal lifecycle.
///
/// Transitions: `PENDING -> APPROVED | REJECTED | EXPIRED`,
/// `APPROVED -> EXECUTED | FAILED`. Everything else is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
    Executed,
    Failed,
}

impl SignalStatus {
    /// Whether `self -> to` is a legal transition.
    pub fn can_transition(self, to: SignalStatus) -> bool {
        matches!(
            (self, to),
            (SignalStatus::Pending, SignalStatus::Approved)
                | (SignalStatus::Pending, SignalStatus::Rejected)
                | (SignalStatus::Pending, SignalStatus::Expired)
                | (SignalStatus::Approved, SignalStatus::Executed)
                | (SignalStatus::Approved, SignalStatus::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SignalStatus::Rejected
                | SignalStatus::Expired
                | SignalStatus::Executed
                | SignalStatus::Failed
        )
    }

    /// Active signals participate in dedup suppression.
    pub fn is_active(self) -> bool {
        matches!(self, SignalStatus::Pending | SignalStatus::Approved)
    }
}

impl fmt::Display for SignalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SignalStatus::Pending => "pending",
            SignalStatus::Approved => "approved",
            SignalStatus::Rejected => "rejected",
            SignalStatus::Expired => "expired",
            SignalStatus::Executed => "executed",
            SignalStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Persisted form of an accepted candidate. Created by the pipeline, mutated
/// only through the store's compare-and-set, never destroyed (terminal
/// statuses are the soft lifecycle end).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Store-assigned identifier; `None` until `SignalStore::create` returns.
    pub id: Option<i64>,
    pub instrument: String,
    pub side: Side,
    pub strategy_name: String,
    pub category: StrategyCategory,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub confidence: f64,
    pub quantity: u32,
    pub status: SignalStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub risk_notes: Option<String>,
}

impl Signal {
    /// Build a PENDING signal from a risk-accepted candidate.
    pub fn from_candidate(
        candidate: &Candidate,
        quantity: u32,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        risk_notes: Option<String>,
    ) -> Self {
        Self {
            id: None,
            instrument: candidate.instrument.clone(),
            side: candidate.side,
            strategy_name: candidate.strategy_name.clone(),
            category: candidate.category,
            entry: candidate.entry,
            stop: candidate.stop,
            target: candidate.target,
            confidence: candidate.confidence,
            quantity,
            status: SignalStatus::Pending,
            created_at,
            expires_at,
            risk_notes,
        }
    }
}
