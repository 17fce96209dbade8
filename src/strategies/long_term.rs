//! Long-term positional strategies on daily bars

use crate::indicators::{last, IndicatorFrame};
use crate::models::{BarSeries, Candidate, Side, StrategyCategory};
use crate::strategies::Strategy;

/// BUY an established uptrend: close above SMA(50) with a 30-bar return of
/// at least 10%. Stop just under the SMA(50), target 20% above entry.
pub struct TrendFollow;

impl Strategy for TrendFollow {
    fn name(&self) -> &'static str {
        "trend_follow"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::LongTerm
    }

    fn min_history(&self) -> usize {
        51
    }

    fn evaluate(&self, series: &BarSeries, frame: &IndicatorFrame) -> Vec<Candidate> {
        if series.len() < self.min_history() {
            return Vec::new();
        }
        let bars = series.bars();
        let Some(bar) = bars.last() else {
            return Vec::new();
        };
        let Some(sma_50) = last(&frame.sma_50) else {
            return Vec::new();
        };

        let base = bars[bars.len() - 31].close;
        if base <= 0.0 {
            return Vec::new();
        }
        let return_30 = bar.close / base - 1.0;

        if !(bar.close > sma_50 && return_30 >= 0.10) {
            return Vec::new();
        }

        let entry = bar.close;
        let stop = sma_50 * 0.995;
        let target = entry * 1.20;
        if stop >= entry {
            return Vec::new();
        }

        vec![Candidate {
            instrument: series.instrument().to_string(),
            side: Side::Buy,
            entry,
            stop,
            target,
            confidence: 0.6,
            strategy_name: self.name().to_string(),
            category: self.category(),
            produced_at: bar.timestamp,
        }]
    }
}
