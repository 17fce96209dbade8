//! Pure technical-indicator computations
//!
//! Every function maps a bar series to output columns of the same length.
//! Leading indices with insufficient history hold `None`; strategies must
//! check the sentinel before acting on a value. No function performs I/O or
//! allocates beyond its output columns.

pub mod frame;
pub mod momentum;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use frame::{last, prev, IndicatorFrame};
pub use momentum::{macd, rsi, MacdColumns};
pub use trend::{ema, sma};
pub use volatility::{atr, bollinger, BollingerColumns};
pub use volume::{gap, gap_series, volume_sma};

/// Indicator output aligned with its input series; `None` marks indices
/// where the indicator is undefined.
pub type Column = Vec<Option<f64>>;
