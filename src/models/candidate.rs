//! Strategy-emitted trade proposals

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::bar::Interval;

/// Trade direction of a candidate or signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("buy"),
            Side::Sell => f.write_str("sell"),
        }
    }
}

/// Closed set of strategy families. Each category determines the watchlist
/// and bar interval its strategies scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyCategory {
    DayTrading,
    ShortSelling,
    ShortTerm,
    LongTerm,
}

impl StrategyCategory {
    pub const ALL: [StrategyCategory; 4] = [
        StrategyCategory::DayTrading,
        StrategyCategory::ShortSelling,
        StrategyCategory::ShortTerm,
        StrategyCategory::LongTerm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyCategory::DayTrading => "day_trading",
            StrategyCategory::ShortSelling => "short_selling",
            StrategyCategory::ShortTerm => "short_term",
            StrategyCategory::LongTerm => "long_term",
        }
    }

    /// Bar interval the category's strategies evaluate.
    pub fn interval(&self) -> Interval {
        match self {
            StrategyCategory::DayTrading | StrategyCategory::ShortSelling => Interval::M5,
            StrategyCategory::ShortTerm => Interval::H1,
            StrategyCategory::LongTerm => Interval::D1,
        }
    }
}

impl fmt::Display for StrategyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day_trading" => Ok(StrategyCategory::DayTrading),
            "short_selling" => Ok(StrategyCategory::ShortSelling),
            "short_term" => Ok(StrategyCategory::ShortTerm),
            "long_term" => Ok(StrategyCategory::LongTerm),
            other => Err(format!("unknown strategy category '{}'", other)),
        }
    }
}

/// A trade proposal emitted by a strategy, before persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub instrument: String,
    pub side: Side,
    pub entry: f64,
    pub stop: f64,
    pub target: f64,
    pub confidence: f64,
    pub strategy_name: String,
    pub category: StrategyCategory,
    pub produced_at: DateTime<Utc>,
}

impl Candidate {
    /// Price-level and confidence invariants. A candidate failing this check
    /// is dropped by the pipeline and counted as invalid.
    ///
    /// BUY requires `stop < entry < target`; SELL requires
    /// `target < entry < stop`.
    pub fn is_valid(&self) -> bool {
        if !(0.0..=1.0).contains(&self.confidence) {
            return false;
        }
        if self.entry <= 0.0 {
            return false;
        }
        match self.side {
            Side::Buy => self.stop < self.entry && self.entry < self.target,
            Side::Sell => self.target < self.entry && self.entry < self.stop,
        }
    }
}
