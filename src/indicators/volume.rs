//! Volume statistics and the session gap

use crate::indicators::Column;
use crate::models::Bar;

/// Moving average of traded volume.
pub fn volume_sma(volumes: &[f64], period: usize) -> Column {
    super::trend::sma(volumes, period)
}

/// Opening gap relative to the previous close, as a signed fraction.
pub fn gap(prev_close: f64, open: f64) -> f64 {
    if prev_close == 0.0 {
        return 0.0;
    }
    (open - prev_close) / prev_close
}

/// Per-bar opening gap column; index 0 has no prior close.
pub fn gap_series(bars: &[Bar]) -> Column {
    let mut out: Column = vec![None; bars.len()];
    for i in 1..bars.len() {
        out[i] = Some(gap(bars[i - 1].close, bars[i].open));
    }
    out
}
