//! Unit tests for the built-in strategy rules
//!
//! Frames are constructed directly so each rule is exercised against exact
//! indicator readings; indicator math has its own tests.

use chrono::{Duration, TimeZone, Utc};
use equitrix::indicators::{BollingerColumns, Column, IndicatorFrame, MacdColumns};
use equitrix::models::{Bar, BarSeries, Interval, Side};
use equitrix::strategies::{
    BollingerReversion, EmaBreakdown, EmaCrossover, GapUpMomentum, MacdMomentum,
    OverboughtRejection, RangeBreakout, Strategy, TrendFollow,
};

fn flat_series(count: usize, close: f64, last_close: f64, last_volume: u64) -> BarSeries {
    let start = Utc.with_ymd_and_hms(2025, 6, 2, 9, 15, 0).unwrap();
    let bars = (0..count)
        .map(|i| {
            let c = if i == count - 1 { last_close } else { close };
            Bar::new(
                start + Duration::minutes(5 * i as i64),
                c,
                c + 0.5,
                c - 0.5,
                c,
                if i == count - 1 { last_volume } else { 1_000 },
            )
        })
        .collect();
    BarSeries::new("RELIANCE", Interval::M5, bars).unwrap()
}

fn empty_frame(len: usize) -> IndicatorFrame {
    let col = || vec![None; len];
    IndicatorFrame {
        len,
        last_bar: None,
        ema_9: col(),
        ema_21: col(),
        ema_50: col(),
        sma_20: col(),
        sma_50: col(),
        rsi_14: col(),
        macd: MacdColumns {
            line: col(),
            signal: col(),
            histogram: col(),
        },
        bollinger: BollingerColumns {
            upper: col(),
            middle: col(),
            lower: col(),
        },
        atr_14: col(),
        volume_sma_20: col(),
        gap: col(),
    }
}

fn set_tail(col: &mut Column, prev: f64, last: f64) {
    let n = col.len();
    col[n - 2] = Some(prev);
    col[n - 1] = Some(last);
}

#[test]
fn test_ema_crossover_fires_on_bullish_cross() {
    let series = flat_series(25, 100.0, 100.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.ema_9, 100.0, 101.0);
    set_tail(&mut frame.ema_21, 100.0, 100.5);
    set_tail(&mut frame.atr_14, 2.0, 2.0);
    set_tail(&mut frame.volume_sma_20, 1_000.0, 1_000.0);

    let candidates = EmaCrossover.evaluate(&series, &frame);
    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.side, Side::Buy);
    assert_eq!(c.entry, 100.0);
    assert!((c.stop - 98.5).abs() < 1e-9);
    assert!((c.target - 103.0).abs() < 1e-9);
    assert!(c.is_valid());
}

#[test]
fn test_ema_crossover_requires_cross_not_just_ordering() {
    let series = flat_series(25, 100.0, 100.0, 1_000);
    let mut frame = empty_frame(25);
    // Fast already above slow on the prior bar: no fresh cross.
    set_tail(&mut frame.ema_9, 101.0, 101.0);
    set_tail(&mut frame.ema_21, 100.5, 100.5);
    set_tail(&mut frame.atr_14, 2.0, 2.0);
    set_tail(&mut frame.volume_sma_20, 1_000.0, 1_000.0);
    assert!(EmaCrossover.evaluate(&series, &frame).is_empty());
}

#[test]
fn test_ema_crossover_enforces_volume_floor() {
    let series = flat_series(25, 100.0, 100.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.ema_9, 100.0, 101.0);
    set_tail(&mut frame.ema_21, 100.0, 100.5);
    set_tail(&mut frame.atr_14, 2.0, 2.0);
    // Average volume far above the last bar's volume.
    set_tail(&mut frame.volume_sma_20, 2_000.0, 2_000.0);
    assert!(EmaCrossover.evaluate(&series, &frame).is_empty());
}

#[test]
fn test_ema_crossover_respects_min_history() {
    let series = flat_series(10, 100.0, 100.0, 1_000);
    let frame = empty_frame(10);
    assert!(EmaCrossover.evaluate(&series, &frame).is_empty());
}

#[test]
fn test_range_breakout_fires_above_prior_high() {
    let series = flat_series(25, 100.0, 110.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.rsi_14, 60.0, 60.0);
    set_tail(&mut frame.atr_14, 2.0, 2.0);
    set_tail(&mut frame.volume_sma_20, 600.0, 600.0);

    let candidates = RangeBreakout.evaluate(&series, &frame);
    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.side, Side::Buy);
    assert_eq!(c.entry, 110.0);
    assert!((c.stop - 100.0).abs() < 1e-9);
    assert!(c.is_valid());
}

#[test]
fn test_range_breakout_rejects_overbought_rsi() {
    let series = flat_series(25, 100.0, 110.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.rsi_14, 80.0, 80.0);
    set_tail(&mut frame.atr_14, 2.0, 2.0);
    set_tail(&mut frame.volume_sma_20, 600.0, 600.0);
    assert!(RangeBreakout.evaluate(&series, &frame).is_empty());
}

fn gap_up_series(last_open: f64, last_close: f64, last_volume: u64) -> BarSeries {
    let start = Utc.with_ymd_and_hms(2025, 6, 2, 9, 15, 0).unwrap();
    let mut bars: Vec<Bar> = (0..24)
        .map(|i| {
            let ts = start + Duration::minutes(5 * i as i64);
            Bar::new(ts, 100.0, 100.5, 99.5, 100.0, 1_000)
        })
        .collect();
    bars.push(Bar::new(
        start + Duration::minutes(120),
        last_open,
        last_open.max(last_close) + 0.5,
        last_open.min(last_close) - 0.5,
        last_close,
        last_volume,
    ));
    BarSeries::new("RELIANCE", Interval::M5, bars).unwrap()
}

#[test]
fn test_gap_up_momentum_fires_on_held_gap() {
    let series = gap_up_series(104.0, 110.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.gap, 0.0, 0.04);
    set_tail(&mut frame.ema_9, 100.0, 105.0);
    set_tail(&mut frame.volume_sma_20, 400.0, 400.0);

    let candidates = GapUpMomentum.evaluate(&series, &frame);
    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.side, Side::Buy);
    assert_eq!(c.entry, 110.0);
    assert!((c.stop - 103.48).abs() < 1e-9);
    assert!((c.target - 112.2).abs() < 1e-9);
    // volume_ratio 2.5 scales confidence to 0.75.
    assert!((c.confidence - 0.75).abs() < 1e-9);
    assert!(c.is_valid());
}

#[test]
fn test_gap_up_momentum_needs_volume_surge() {
    let series = gap_up_series(104.0, 110.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.gap, 0.0, 0.04);
    set_tail(&mut frame.ema_9, 100.0, 105.0);
    // Ratio 1.25, below the 2x bar.
    set_tail(&mut frame.volume_sma_20, 800.0, 800.0);
    assert!(GapUpMomentum.evaluate(&series, &frame).is_empty());
}

#[test]
fn test_gap_up_momentum_needs_a_real_gap() {
    let series = gap_up_series(104.0, 110.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.gap, 0.0, 0.005);
    set_tail(&mut frame.ema_9, 100.0, 105.0);
    set_tail(&mut frame.volume_sma_20, 400.0, 400.0);
    assert!(GapUpMomentum.evaluate(&series, &frame).is_empty());
}

#[test]
fn test_gap_up_momentum_rejects_fading_open() {
    // Gapped up but closed below the open: momentum did not hold.
    let series = gap_up_series(110.0, 106.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.gap, 0.0, 0.04);
    set_tail(&mut frame.ema_9, 100.0, 105.0);
    set_tail(&mut frame.volume_sma_20, 400.0, 400.0);
    assert!(GapUpMomentum.evaluate(&series, &frame).is_empty());
}

#[test]
fn test_overbought_rejection_fires() {
    let series = flat_series(25, 100.0, 100.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.rsi_14, 80.0, 80.0);
    set_tail(&mut frame.bollinger.upper, 102.0, 102.0);
    set_tail(&mut frame.atr_14, 2.0, 2.0);
    set_tail(&mut frame.volume_sma_20, 600.0, 600.0);

    let candidates = OverboughtRejection.evaluate(&series, &frame);
    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.side, Side::Sell);
    assert!(c.stop > c.entry && c.target < c.entry);
    assert!(c.is_valid());
}

#[test]
fn test_overbought_rejection_needs_high_rsi() {
    let series = flat_series(25, 100.0, 100.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.rsi_14, 70.0, 70.0);
    set_tail(&mut frame.bollinger.upper, 102.0, 102.0);
    set_tail(&mut frame.atr_14, 2.0, 2.0);
    set_tail(&mut frame.volume_sma_20, 600.0, 600.0);
    assert!(OverboughtRejection.evaluate(&series, &frame).is_empty());
}

#[test]
fn test_ema_breakdown_fires_on_bearish_cross() {
    let series = flat_series(25, 100.0, 100.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.ema_9, 100.0, 99.0);
    set_tail(&mut frame.ema_21, 100.0, 99.5);
    set_tail(&mut frame.rsi_14, 50.0, 50.0);
    set_tail(&mut frame.atr_14, 2.0, 2.0);

    let candidates = EmaBreakdown.evaluate(&series, &frame);
    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.side, Side::Sell);
    assert!((c.stop - 101.5).abs() < 1e-9);
    assert!(c.is_valid());
}

#[test]
fn test_ema_breakdown_skips_oversold() {
    let series = flat_series(25, 100.0, 100.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.ema_9, 100.0, 99.0);
    set_tail(&mut frame.ema_21, 100.0, 99.5);
    set_tail(&mut frame.rsi_14, 20.0, 20.0);
    set_tail(&mut frame.atr_14, 2.0, 2.0);
    assert!(EmaBreakdown.evaluate(&series, &frame).is_empty());
}

#[test]
fn test_macd_momentum_fires_on_signal_cross() {
    let series = flat_series(40, 100.0, 100.0, 1_000);
    let mut frame = empty_frame(40);
    set_tail(&mut frame.macd.line, -0.5, 0.5);
    set_tail(&mut frame.macd.signal, 0.0, 0.0);
    set_tail(&mut frame.macd.histogram, -0.5, 0.5);
    set_tail(&mut frame.sma_20, 95.0, 95.0);
    set_tail(&mut frame.atr_14, 2.0, 2.0);

    let candidates = MacdMomentum.evaluate(&series, &frame);
    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.side, Side::Buy);
    assert!((c.stop - 97.5).abs() < 1e-9);
    assert!(c.is_valid());
}

#[test]
fn test_macd_momentum_requires_rising_histogram() {
    let series = flat_series(40, 100.0, 100.0, 1_000);
    let mut frame = empty_frame(40);
    set_tail(&mut frame.macd.line, -0.5, 0.5);
    set_tail(&mut frame.macd.signal, 0.0, 0.0);
    set_tail(&mut frame.macd.histogram, 0.6, 0.5);
    set_tail(&mut frame.sma_20, 95.0, 95.0);
    set_tail(&mut frame.atr_14, 2.0, 2.0);
    assert!(MacdMomentum.evaluate(&series, &frame).is_empty());
}

#[test]
fn test_bollinger_reversion_fires_on_first_touch() {
    let series = flat_series(25, 100.0, 95.0, 1_000);
    let mut frame = empty_frame(25);
    set_tail(&mut frame.bollinger.lower, 99.0, 96.0);
    set_tail(&mut frame.bollinger.middle, 100.0, 100.0);
    set_tail(&mut frame.rsi_14, 30.0, 30.0);

    let candidates = BollingerReversion.evaluate(&series, &frame);
    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.side, Side::Buy);
    assert_eq!(c.entry, 95.0);
    assert_eq!(c.target, 100.0);
    assert!((c.stop - 90.0).abs() < 1e-9);
    assert!(c.is_valid());
}

#[test]
fn test_bollinger_reversion_ignores_repeated_touch() {
    let series = flat_series(25, 95.0, 95.0, 1_000);
    let mut frame = empty_frame(25);
    // Prior close already at or below the prior band: not a fresh touch.
    set_tail(&mut frame.bollinger.lower, 96.0, 96.0);
    set_tail(&mut frame.bollinger.middle, 100.0, 100.0);
    set_tail(&mut frame.rsi_14, 30.0, 30.0);
    assert!(BollingerReversion.evaluate(&series, &frame).is_empty());
}

#[test]
fn test_trend_follow_fires_in_uptrend() {
    let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let bars: Vec<Bar> = (0..60)
        .map(|i| {
            let close = if i < 30 { 100.0 } else { 100.0 + (i - 29) as f64 };
            Bar::new(
                start + Duration::days(i),
                close,
                close + 1.0,
                close - 1.0,
                close,
                10_000,
            )
        })
        .collect();
    let series = BarSeries::new("RELIANCE", Interval::D1, bars).unwrap();
    let mut frame = empty_frame(60);
    set_tail(&mut frame.sma_50, 120.0, 120.0);

    let candidates = TrendFollow.evaluate(&series, &frame);
    assert_eq!(candidates.len(), 1);
    let c = &candidates[0];
    assert_eq!(c.side, Side::Buy);
    assert_eq!(c.entry, 130.0);
    assert!((c.target - 156.0).abs() < 1e-9);
    assert!(c.is_valid());
}

#[test]
fn test_trend_follow_needs_momentum() {
    let series = flat_series(60, 100.0, 100.0, 1_000);
    let mut frame = empty_frame(60);
    set_tail(&mut frame.sma_50, 90.0, 90.0);
    // Above the SMA but flat: 30-bar return is zero.
    assert!(TrendFollow.evaluate(&series, &frame).is_empty());
}

#[test]
fn test_strategies_are_total_on_undefined_indicators() {
    let series = flat_series(60, 100.0, 100.0, 1_000);
    let frame = empty_frame(60);
    let strategies: Vec<Box<dyn Strategy>> = vec![
        Box::new(EmaCrossover),
        Box::new(RangeBreakout),
        Box::new(GapUpMomentum),
        Box::new(OverboughtRejection),
        Box::new(EmaBreakdown),
        Box::new(MacdMomentum),
        Box::new(BollingerReversion),
        Box::new(TrendFollow),
    ];
    for strategy in strategies {
        assert!(strategy.evaluate(&series, &frame).is_empty());
    }
}
