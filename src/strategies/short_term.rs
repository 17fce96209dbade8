//! Short-term (swing) strategies on hourly bars

use crate::indicators::{last, prev, IndicatorFrame};
use crate::models::{BarSeries, Candidate, Side, StrategyCategory};
use crate::strategies::Strategy;

/// BUY when the MACD line crosses above its signal line with a rising
/// histogram and price above SMA(20).
pub struct MacdMomentum;

impl Strategy for MacdMomentum {
    fn name(&self) -> &'static str {
        "macd_momentum"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::ShortTerm
    }

    fn min_history(&self) -> usize {
        36
    }

    fn evaluate(&self, series: &BarSeries, frame: &IndicatorFrame) -> Vec<Candidate> {
        if series.len() < self.min_history() {
            return Vec::new();
        }
        let Some(bar) = series.last() else {
            return Vec::new();
        };
        let (Some(line), Some(signal), Some(prev_line), Some(prev_signal)) = (
            last(&frame.macd.line),
            last(&frame.macd.signal),
            prev(&frame.macd.line),
            prev(&frame.macd.signal),
        ) else {
            return Vec::new();
        };
        let (Some(hist), Some(prev_hist)) =
            (last(&frame.macd.histogram), prev(&frame.macd.histogram))
        else {
            return Vec::new();
        };
        let (Some(sma), Some(atr)) = (last(&frame.sma_20), last(&frame.atr_14)) else {
            return Vec::new();
        };

        let crossed_up = prev_line <= prev_signal && line > signal;
        if !(crossed_up && hist > prev_hist && bar.close > sma) {
            return Vec::new();
        }

        let entry = bar.close;
        let stop = bar.low - atr;
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

/// BUY the first close at or below the lower Bollinger band with RSI(14)
/// under 35, targeting the middle band.
pub struct BollingerReversion;

impl Strategy for BollingerReversion {
    fn name(&self) -> &'static str {
        "bollinger_reversion"
    }

    fn category(&self) -> StrategyCategory {
        StrategyCategory::ShortTerm
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
        let prev_close = bars[bars.len() - 2].close;
        let (Some(lower), Some(middle), Some(prev_lower)) = (
            last(&frame.bollinger.lower),
            last(&frame.bollinger.middle),
            prev(&frame.bollinger.lower),
        ) else {
            return Vec::new();
        };
        let Some(rsi) = last(&frame.rsi_14) else {
            return Vec::new();
        };

        let touched = bar.close <= lower;
        let first_touch = prev_close > prev_lower;
        if !(touched && first_touch && rsi < 35.0) {
            return Vec::new();
        }

        let entry = bar.close;
        let target = middle;
        let stop = entry - (target - entry);
        if stop >= entry || target <= entry {
            return Vec::new();
        }

        vec![Candidate {
            instrument: series.instrument().to_string(),
            side: Side::Buy,
            entry,
            stop,
            target,
            confidence: 0.55,
            strategy_name: self.name().to_string(),
            category: self.category(),
            produced_at: bar.timestamp,
        }]
    }
}
