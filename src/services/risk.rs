//! Risk-policy interface and a flat-sizing implementation

use async_trait::async_trait;

use crate::error::RiskError;
use crate::models::Candidate;

/// Outcome of a risk evaluation.
#[derive(Debug, Clone)]
pub enum RiskDecision {
    Accept {
        quantity: u32,
        notes: Option<String>,
    },
    Reject {
        reason: String,
    },
}

/// Risk collaborator. A rejection (or an evaluation error) drops the
/// candidate before persistence.
#[async_trait]
pub trait RiskPolicy: Send + Sync {
    async fn evaluate(&self, candidate: &Candidate) -> Result<RiskDecision, RiskError>;
}

/// Sizes every position from a fixed capital pool and per-trade risk
/// fraction: quantity = risk amount / per-share risk.
pub struct FixedRiskPolicy {
    capital: f64,
    risk_per_trade: f64,
}

impl FixedRiskPolicy {
    pub fn new(capital: f64, risk_per_trade: f64) -> Self {
        Self {
            capital,
            risk_per_trade,
        }
    }
}

impl Default for FixedRiskPolicy {
    fn default() -> Self {
        Self::new(1_000_000.0, 0.01)
    }
}

#[async_trait]
impl RiskPolicy for FixedRiskPolicy {
    async fn evaluate(&self, candidate: &Candidate) -> Result<RiskDecision, RiskError> {
        let risk_per_share = (candidate.entry - candidate.stop).abs();
        if risk_per_share <= 0.0 {
            return Ok(RiskDecision::Reject {
                reason: "zero per-share risk".to_string(),
            });
        }
        let risk_amount = self.capital * self.risk_per_trade;
        let quantity = (risk_amount / risk_per_share).floor().max(1.0) as u32;
        Ok(RiskDecision::Accept {
            quantity,
            notes: Some(format!(
                "risk {:.0} over {:.2}/share",
                risk_amount, risk_per_share
            )),
        })
    }
}
