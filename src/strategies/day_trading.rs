//! Day-trading strategies on intraday bars

use crate::indicators::{last, prev, IndicatorFrame};
use crate::models::{BarSeries, Candidate, Side, StrategyCategory};
use crate::strategies::Strategy;

/// BUY when EMA(9) crosses above EMA(21) on the last closed bar with volume
/// at least 0.8x its 20-bar average. Stop half an ATR under the last low,
/// target at 2R.
pub struct EmaCrossover;

impl Strategy for EmaCrossover {
    fn name(&self) -> &'static str {
        "ema_crossover"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::DayTrading
    }

    fn min_history(&self) -> usize {
        22
    }

    fn evaluate(&self, series: &BarSeries, frame: &IndicatorFrame) -> Vec<Candidate> {
        if series.len() < self.min_history() {
            return Vec::new();
        }
        let Some(bar) = series.last() else {
            return Vec::new();
        };
        let (Some(fast), Some(slow), Some(prev_fast), Some(prev_slow)) = (
            last(&frame.ema_9),
            last(&frame.ema_21),
            prev(&frame.ema_9),
            prev(&frame.ema_21),
        ) else {
            return Vec::new();
        };
        let (Some(atr), Some(vol_avg)) = (last(&frame.atr_14), last(&frame.volume_sma_20)) else {
            return Vec::new();
        };

        let crossed_up = prev_fast <= prev_slow && fast > slow;
        if !crossed_up || (bar.volume as f64) < 0.8 * vol_avg {
            return Vec::new();
        }

        let entry = bar.close;
        let stop = bar.low - 0.5 * atr;
        let target = entry + 2.0 * (entry - stop);
        if stop >= entry {
            return Vec::new();
        }

        vec![Candidate {
            instrument: series.instrument().to_string(),
            side: Side::Buy,
            entry,
            stop,
            target,
            confidence: 0.7,
            strategy_name: self.name().to_string(),
            category: self.category(),
            produced_at: bar.timestamp,
        }]
    }
}

/// BUY when the last close clears the prior 5-bar high on elevated volume
/// with RSI(14) between 55 and 75. The broken range high becomes the stop
/// reference; reward is 2R.
pub struct RangeBreakout;

impl Strategy for RangeBreakout {
    fn name(&self) -> &'static str {
        "range_breakout"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::DayTrading
    }

    fn min_history(&self) -> usize {
        21
    }

    fn evaluate(&self, series: &BarSeries, frame: &IndicatorFrame) -> Vec<Candidate> {
        if series.len() < self.min_history() {
            return Vec::new();
        }
        let bars = series.bars();
        let Some(bar) = bars.last() else {
            return Vec::new();
        };
        let (Some(rsi), Some(atr), Some(vol_avg)) = (
            last(&frame.rsi_14),
            last(&frame.atr_14),
            last(&frame.volume_sma_20),
        ) else {
            return Vec::new();
        };

        let prior = &bars[bars.len() - 6..bars.len() - 1];
        let range_high = prior.iter().map(|b| b.high).fold(f64::MIN, f64::max);

        let breakout = bar.close > range_high;
        let rsi_ok = (55.0..=75.0).contains(&rsi);
        let volume_ok = (bar.volume as f64) >= 1.5 * vol_avg;
        if !(breakout && rsi_ok && volume_ok) {
            return Vec::new();
        }

        let entry = bar.close;
        let stop = range_high - 0.25 * atr;
        let target = entry + 2.0 * (entry - stop);
        if stop >= entry {
            return Vec::new();
        }

        vec![Candidate {
            instrument: series.instrument().to_string(),
            side: Side::Buy,
            entry,
            stop,
            target,
            confidence: 0.65,
            strategy_name: self.name().to_string(),
            category: self.category(),
            produced_at: bar.timestamp,
        }]
    }
}

/// BUY a gap-up open that keeps its momentum: gap over 1.5%, volume at
/// twice its 20-bar average, a positive open-to-close push and price above
/// EMA(9). Stop sits just below the gap open; target 2% above entry.
/// Confidence scales with the volume surge.
pub struct GapUpMomentum;

impl Strategy for GapUpMomentum {
    fn name(&self) -> &'static str {
        "gap_up_momentum"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::DayTrading
    }

    fn min_history(&self) -> usize {
        21
    }

    fn evaluate(&self, series: &BarSeries, frame: &IndicatorFrame) -> Vec<Candidate> {
        if series.len() < self.min_history() {
            return Vec::new();
        }
        let Some(bar) = series.last() else {
            return Vec::new();
        };
        let (Some(gap), Some(ema_9), Some(vol_avg)) = (
            last(&frame.gap),
            last(&frame.ema_9),
            last(&frame.volume_sma_20),
        ) else {
            return Vec::new();
        };
        if vol_avg <= 0.0 || bar.open <= 0.0 {
            return Vec::new();
        }

        let volume_ratio = bar.volume as f64 / vol_avg;
        let opening_momentum = (bar.close - bar.open) / bar.open;
        let gapped_up = gap > 0.015;
        let holding = opening_momentum > 0.005 && bar.close > ema_9;
        if !(gapped_up && volume_ratio > 2.0 && holding) {
            return Vec::new();
        }

        let entry = bar.close;
        let stop = bar.open * 0.995;
        let target = entry * 1.02;
        if stop >= entry {
            return Vec::new();
        }

        vec![Candidate {
            instrument: series.instrument().to_string(),
            side: Side::Buy,
            entry,
            stop,
            target,
            confidence: (0.5 + volume_ratio * 0.1).min(0.8),
            strategy_name: self.name().to_string(),
            category: self.category(),
            produced_at: bar.timestamp,
        }]
    }
}
