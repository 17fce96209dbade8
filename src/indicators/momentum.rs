//! Momentum indicators: RSI and MACD

use crate::indicators::Column;

/// RSI with Wilder smoothing.
///
/// RSI = 100 - 100 / (1 + RS), RS = smoothed gain / smoothed loss. The first
/// defined index is `period` (one diff per bar, `period` diffs to seed).
pub fn rsi(values: &[f64], period: usize) -> Column {
    let mut out: Column = vec![None; values.len()];
    if period == 0 || values.len() <= period {
        return out;
    }

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = values[i] - values[i - 1];
        if change > 0.0 {
            avg_gain += change;
        } else {
            avg_loss += -change;
        }
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in (period + 1)..values.len() {
        let change = values[i] - values[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// MACD line, signal line and histogram.
#[derive(Debug, Clone)]
pub struct MacdColumns {
    pub line: Column,
    pub signal: Column,
    pub histogram: Column,
}

/// MACD(fast, slow, signal): line = EMA(fast) - EMA(slow); signal line is an
/// EMA of the MACD line seeded where the line first becomes defined.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> MacdColumns {
    let len = values.len();
    let ema_fast = super::trend::ema(values, fast);
    let ema_slow = super::trend::ema(values, slow);

    let mut line: Column = vec![None; len];
    for i in 0..len {
        if let (Some(f), Some(s)) = (ema_fast[i], ema_slow[i]) {
            line[i] = Some(f - s);
        }
    }

    let signal_col = ema_of_column(&line, signal);
    let mut histogram: Column = vec![None; len];
    for i in 0..len {
        if let (Some(l), Some(s)) = (line[i], signal_col[i]) {
            histogram[i] = Some(l - s);
        }
    }

    MacdColumns {
        line,
        signal: signal_col,
        histogram,
    }
}

/// EMA over the defined suffix of a column.
fn ema_of_column(col: &Column, period: usize) -> Column {
    let mut out: Column = vec![None; col.len()];
    if period == 0 {
        return out;
    }
    let Some(start) = col.iter().position(|v| v.is_some()) else {
        return out;
    };
    let defined: Vec<f64> = col[start..].iter().map(|v| v.unwrap_or(0.0)).collect();
    let inner = super::trend::ema(&defined, period);
    for (offset, value) in inner.into_iter().enumerate() {
        out[start + offset] = value;
    }
    out
}
