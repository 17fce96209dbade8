//! Price history primitives: bars, intervals and validated series

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Bar interval supported by the scan engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "1D")]
    D1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::H1 => "1h",
            Interval::D1 => "1D",
        }
    }

    /// Intraday intervals use the short cache TTL and the short broker cap.
    pub fn is_intraday(&self) -> bool {
        !matches!(self, Interval::D1)
    }

    /// Default history window to request when filling the cache.
    pub fn lookback(&self) -> chrono::Duration {
        match self {
            Interval::M5 => chrono::Duration::days(5),
            Interval::M15 => chrono::Duration::days(10),
            Interval::H1 => chrono::Duration::days(30),
            Interval::D1 => chrono::Duration::days(120),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }
}

/// Violations detected while assembling a [`BarSeries`].
#[derive(Debug, Clone, Error)]
pub enum SeriesError {
    #[error("bar {index} timestamp {ts} is not after its predecessor")]
    NonMonotonic { index: usize, ts: DateTime<Utc> },

    #[error("bar {index} carries a negative price")]
    NegativePrice { index: usize },
}

/// Ordered, finite sequence of bars of one interval for one instrument.
///
/// Construction validates the series invariants: strictly increasing
/// timestamps and non-negative prices. A published series is never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BarSeries {
    instrument: String,
    interval: Interval,
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new(
        instrument: impl Into<String>,
        interval: Interval,
        bars: Vec<Bar>,
    ) -> Result<Self, SeriesError> {
        for (index, bar) in bars.iter().enumerate() {
            if bar.open < 0.0 || bar.high < 0.0 || bar.low < 0.0 || bar.close < 0.0 {
                return Err(SeriesError::NegativePrice { index });
            }
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(SeriesError::NonMonotonic {
                    index,
                    ts: bar.timestamp,
                });
            }
        }
        Ok(Self {
            instrument: instrument.into(),
            interval,
            bars,
        })
    }

    /// An empty series, used by placeholder providers before data arrives.
    pub fn empty(instrument: impl Into<String>, interval: Interval) -> Self {
        Self {
            instrument: instrument.into(),
            interval,
            bars: Vec::new(),
        }
    }

    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Timestamp of the most recent bar, if any.
    pub fn last_timestamp(&self) -> Option<DateTime<Utc>> {
        self.bars.last().map(|b| b.timestamp)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume as f64).collect()
    }
}
