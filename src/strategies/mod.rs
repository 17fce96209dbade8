//! Strategy registry and the built-in strategy set
//!
//! A strategy is a pure function from (series, indicators) to candidates. It
//! must be total: on unmet preconditions or insufficient history it returns
//! an empty list, never panics. Strategies hold no state and perform no I/O.

pub mod day_trading;
pub mod long_term;
pub mod short_selling;
pub mod short_term;

use std::collections::HashMap;
use std::sync::Arc;

use crate::indicators::IndicatorFrame;
use crate::models::{BarSeries, Candidate, StrategyCategory};

pub use day_trading::{EmaCrossover, GapUpMomentum, RangeBreakout};
pub use long_term::TrendFollow;
pub use short_selling::{EmaBreakdown, OverboughtRejection};
pub use short_term::{BollingerReversion, MacdMomentum};

/// A pure scan strategy.
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn category(&self) -> StrategyCategory;

    /// Minimum bars required before `evaluate` can emit anything.
    fn min_history(&self) -> usize;

    fn evaluate(&self, series: &BarSeries, frame: &IndicatorFrame) -> Vec<Candidate>;
}

/// Registry of strategies, keyed by category, preserving registration order.
pub struct StrategyRegistry {
    strategies: Vec<Arc<dyn Strategy>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// The built-in strategy set.
    pub fn defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(EmaCrossover));
        registry.register(Arc::new(RangeBreakout));
        registry.register(Arc::new(GapUpMomentum));
        registry.register(Arc::new(OverboughtRejection));
        registry.register(Arc::new(EmaBreakdown));
        registry.register(Arc::new(MacdMomentum));
        registry.register(Arc::new(BollingerReversion));
        registry.register(Arc::new(TrendFollow));
        registry
    }

    pub fn register(&mut self, strategy: Arc<dyn Strategy>) {
        self.strategies.push(strategy);
    }

    /// Strategies of one category, in registration order.
    pub fn for_category(&self, category: StrategyCategory) -> Vec<Arc<dyn Strategy>> {
        self.strategies
            .iter()
            .filter(|s| s.category() == category)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Largest history requirement across the given categories, used to size
    /// fetch windows.
    pub fn max_min_history(&self, categories: &[StrategyCategory]) -> usize {
        self.strategies
            .iter()
            .filter(|s| categories.contains(&s.category()))
            .map(|s| s.min_history())
            .max()
            .unwrap_or(0)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::defaults()
    }
}

/// Per-category tie-break for one symbol's candidates: keep the candidate
/// with the highest confidence; on ties, the earliest registered strategy
/// wins (candidates arrive in registration order, so a strict comparison is
/// enough). Candidates of different categories are all retained.
pub fn best_per_category(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut order: Vec<StrategyCategory> = Vec::new();
    let mut best: HashMap<StrategyCategory, Candidate> = HashMap::new();
    for candidate in candidates {
        let better = match best.get(&candidate.category) {
            Some(current) => candidate.confidence > current.confidence,
            None => true,
        };
        if better {
            if !order.contains(&candidate.category) {
                order.push(candidate.category);
            }
            best.insert(candidate.category, candidate);
        }
    }
    order
        .into_iter()
        .filter_map(|category| best.remove(&category))
        .collect()
}
