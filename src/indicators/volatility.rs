//! Volatility indicators: Bollinger bands and ATR

use crate::indicators::Column;
use crate::models::Bar;

/// Bollinger upper/middle/lower columns.
#[derive(Debug, Clone)]
pub struct BollingerColumns {
    pub upper: Column,
    pub middle: Column,
    pub lower: Column,
}

/// Bollinger bands: SMA(period) +/- k standard deviations (population) over
/// the same window.
pub fn bollinger(values: &[f64], period: usize, k: f64) -> BollingerColumns {
    let len = values.len();
    let middle = super::trend::sma(values, period);
    let mut upper: Column = vec![None; len];
    let mut lower: Column = vec![None; len];

    if period > 0 && len >= period {
        // Welford-style running moments keep the band math stable for long
        // price series.
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for &v in &values[..period] {
            sum += v;
            sum_sq += v * v;
        }
        for i in (period - 1)..len {
            if i >= period {
                let leaving = values[i - period];
                sum += values[i] - leaving;
                sum_sq += values[i] * values[i] - leaving * leaving;
            }
            let mean = sum / period as f64;
            let variance = (sum_sq / period as f64 - mean * mean).max(0.0);
            let dev = k * variance.sqrt();
            upper[i] = Some(mean + dev);
            lower[i] = Some(mean - dev);
        }
    }

    BollingerColumns {
        upper,
        middle,
        lower,
    }
}

/// Average true range with Wilder smoothing.
///
/// TR(i) = max(high-low, |high - prev_close|, |low - prev_close|); the first
/// defined index is `period` (TR needs one prior close).
pub fn atr(bars: &[Bar], period: usize) -> Column {
    let mut out: Column = vec![None; bars.len()];
    if period == 0 || bars.len() <= period {
        return out;
    }

    let tr = |i: usize| -> f64 {
        let bar = &bars[i];
        let prev_close = bars[i - 1].close;
        (bar.high - bar.low)
            .max((bar.high - prev_close).abs())
            .max((bar.low - prev_close).abs())
    };

    let mut current: f64 = (1..=period).map(|i| tr(i)).sum::<f64>() / period as f64;
    out[period] = Some(current);
    for i in (period + 1)..bars.len() {
        current = (current * (period as f64 - 1.0) + tr(i)) / period as f64;
        out[i] = Some(current);
    }
    out
}
