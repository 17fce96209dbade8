//! Unit tests for the shared indicator frame

use chrono::{Duration, TimeZone, Utc};
use equitrix::indicators::IndicatorFrame;
use equitrix::models::{Bar, BarSeries, Interval};

fn uptrend_series(count: usize) -> BarSeries {
    let start = Utc.with_ymd_and_hms(2025, 6, 2, 9, 15, 0).unwrap();
    let bars = (0..count)
        .map(|i| {
            let close = 100.0 + i as f64 * 0.5;
            Bar::new(
                start + Duration::minutes(5 * i as i64),
                close - 0.2,
                close + 0.3,
                close - 0.4,
                close,
                1_000 + i as u64,
            )
        })
        .collect();
    BarSeries::new("RELIANCE", Interval::M5, bars).unwrap()
}

#[test]
fn test_frame_columns_align_with_series() {
    let series = uptrend_series(60);
    let frame = IndicatorFrame::compute(&series);
    assert_eq!(frame.len, 60);
    assert_eq!(frame.ema_9.len(), 60);
    assert_eq!(frame.sma_50.len(), 60);
    assert_eq!(frame.rsi_14.len(), 60);
    assert_eq!(frame.macd.histogram.len(), 60);
    assert_eq!(frame.bollinger.upper.len(), 60);
    assert_eq!(frame.atr_14.len(), 60);
    assert_eq!(frame.volume_sma_20.len(), 60);
    assert_eq!(frame.gap.len(), 60);
    assert_eq!(frame.last_bar, series.last_timestamp());
}

#[test]
fn test_frame_is_deterministic() {
    let series = uptrend_series(80);
    let a = IndicatorFrame::compute(&series);
    let b = IndicatorFrame::compute(&series);
    assert_eq!(a.ema_9, b.ema_9);
    assert_eq!(a.rsi_14, b.rsi_14);
    assert_eq!(a.macd.line, b.macd.line);
    assert_eq!(a.bollinger.lower, b.bollinger.lower);
    assert_eq!(a.atr_14, b.atr_14);
}

#[test]
fn test_frame_on_short_series_is_all_undefined() {
    let series = uptrend_series(5);
    let frame = IndicatorFrame::compute(&series);
    assert!(frame.ema_9.iter().all(|v| v.is_none()));
    assert!(frame.rsi_14.iter().all(|v| v.is_none()));
    assert!(frame.atr_14.iter().all(|v| v.is_none()));
}
