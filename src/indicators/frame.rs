//! Shared indicator frame computed once per fetched series

use chrono::{DateTime, Utc};

use crate::indicators::momentum::MacdColumns;
use crate::indicators::volatility::BollingerColumns;
use crate::indicators::{momentum, trend, volatility, volume, Column};
use crate::models::BarSeries;

/// Standard indicator parameter set, evaluated once per
/// (instrument, interval, last-bar-timestamp) and shared by every strategy
/// in the scan. Immutable after construction.
#[derive(Debug, Clone)]
pub struct IndicatorFrame {
    pub len: usize,
    pub last_bar: Option<DateTime<Utc>>,
    pub ema_9: Column,
    pub ema_21: Column,
    pub ema_50: Column,
    pub sma_20: Column,
    pub sma_50: Column,
    pub rsi_14: Column,
    pub macd: MacdColumns,
    pub bollinger: BollingerColumns,
    pub atr_14: Column,
    pub volume_sma_20: Column,
    pub gap: Column,
}

impl IndicatorFrame {
    pub fn compute(series: &BarSeries) -> Self {
        let closes = series.closes();
        let volumes = series.volumes();
        Self {
            len: series.len(),
            last_bar: series.last_timestamp(),
            ema_9: trend::ema(&closes, 9),
            ema_21: trend::ema(&closes, 21),
            ema_50: trend::ema(&closes, 50),
            sma_20: trend::sma(&closes, 20),
            sma_50: trend::sma(&closes, 50),
            rsi_14: momentum::rsi(&closes, 14),
            macd: momentum::macd(&closes, 12, 26, 9),
            bollinger: volatility::bollinger(&closes, 20, 2.0),
            atr_14: volatility::atr(series.bars(), 14),
            volume_sma_20: volume::volume_sma(&volumes, 20),
            gap: volume::gap_series(series.bars()),
        }
    }
}

/// Value of a column at its final index.
pub fn last(col: &Column) -> Option<f64> {
    col.last().copied().flatten()
}

/// Value of a column one bar before the final index.
pub fn prev(col: &Column) -> Option<f64> {
    if col.len() < 2 {
        return None;
    }
    col[col.len() - 2]
}

