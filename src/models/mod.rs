//! Shared data models spanning the engine layers.

pub mod bar;
pub mod candidate;
pub mod signal;

pub use bar::{Bar, BarSeries, Interval, SeriesError};
pub use candidate::{Candidate, Side, StrategyCategory};
pub use signal::{Signal, SignalStatus};
