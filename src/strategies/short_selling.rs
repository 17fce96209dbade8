//! Short-selling strategies on intraday bars

use crate::indicators::{last, prev, IndicatorFrame};
use crate::models::{BarSeries, Candidate, Side, StrategyCategory};
use crate::strategies::Strategy;

/// SELL when RSI(14) runs past 75 but price is rejected below the upper
/// Bollinger band on elevated volume. Stop above the prior swing high.
pub struct OverboughtRejection;

impl Strategy for OverboughtRejection {
    fn name(&self) -> &'static str {
        "overbought_rejection"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::ShortSelling
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
        let (Some(rsi), Some(upper), Some(atr), Some(vol_avg)) = (
            last(&frame.rsi_14),
            last(&frame.bollinger.upper),
            last(&frame.atr_14),
            last(&frame.volume_sma_20),
        ) else {
            return Vec::new();
        };

        let overbought = rsi > 75.0;
        let rejected = bar.close < upper;
        let volume_ok = (bar.volume as f64) >= 1.5 * vol_avg;
        if !(overbought && rejected && volume_ok) {
            return Vec::new();
        }

        // Swing high over the last 10 bars anchors the stop.
        let swing_high = bars[bars.len() - 10..]
            .iter()
            .map(|b| b.high)
            .fold(f64::MIN, f64::max);

        let entry = bar.close;
        let stop = swing_high + 0.1 * atr;
        let target = entry - 2.0 * (stop - entry);
        if stop <= entry || target >= entry {
            return Vec::new();
        }

        vec![Candidate {
            instrument: series.instrument().to_string(),
            side: Side::Sell,
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

/// SELL when EMA(9) crosses below EMA(21) on the last closed bar and RSI(14)
/// has not already reached oversold territory. Stop half an ATR above the
/// crossover bar's high.
pub struct EmaBreakdown;

impl Strategy for EmaBreakdown {
    fn name(&self) -> &'static str {
        "ema_breakdown"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::ShortSelling
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
        let (Some(rsi), Some(atr)) = (last(&frame.rsi_14), last(&frame.atr_14)) else {
            return Vec::new();
        };

        let crossed_down = prev_fast >= prev_slow && fast < slow;
        if !crossed_down || rsi <= 30.0 {
            return Vec::new();
        }

        let entry = bar.close;
        let stop = bar.high + 0.5 * atr;
        let target = entry - 2.0 * (stop - entry);
        if stop <= entry || target >= entry {
            return Vec::new();
        }

        vec![Candidate {
            instrument: series.instrument().to_string(),
            side: Side::Sell,
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
