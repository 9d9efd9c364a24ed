//! Integration tests for chart-geometry detectors.

use std::collections::HashMap;

use chartpulse::prelude::*;

fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar::new(i as i64 * 3_600_000, open, high, low, close, 500.0)
}

/// Flat range with bars replaced at the given indices
fn flat_with(n: usize, base: (f64, f64, f64, f64), overrides: &[(usize, (f64, f64, f64, f64))]) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let (o, h, l, c) = overrides
                .iter()
                .find(|(at, _)| *at == i)
                .map(|(_, v)| *v)
                .unwrap_or(base);
            bar(i, o, h, l, c)
        })
        .collect()
}

/// Bars whose highs and lows follow `high(i)` and `low(i)`
fn shaped(n: usize, high: impl Fn(f64) -> f64, low: impl Fn(f64) -> f64) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let (h, l) = (high(x), low(x));
            let mid = (h + l) / 2.0;
            bar(i, mid, h, l, mid)
        })
        .collect()
}

fn engine_with(detector: BuiltinDetector) -> PatternEngine {
    EngineBuilder::new().add(detector).build().unwrap()
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

const BASE: (f64, f64, f64, f64) = (100.0, 102.0, 98.0, 100.0);

// ============================================================
// DOUBLE TOP / BOTTOM
// ============================================================

fn double_top_bars() -> Vec<Bar> {
    let peak = (108.0, 110.0, 107.0, 109.0);
    flat_with(60, BASE, &[(20, peak), (34, peak)])
}

#[test]
fn test_double_top_detection() {
    let bars = double_top_bars();
    let engine = engine_with(BuiltinDetector::DoubleTop(DoubleTopDetector::with_defaults()));
    let patterns = engine.detect_patterns(&bars, "1h");

    // every centred window in [20, 40) sees both peaks
    assert_eq!(patterns.len(), 20);
    for p in &patterns {
        assert_eq!(p.kind, PatternKind::DoubleTop);
        assert_eq!(p.direction, Direction::Bearish);
        assert_eq!(p.confidence, 0.7);
        assert_eq!((p.start_index, p.end_index), (20, 34));
        assert_eq!(p.timestamp, bars[34].timestamp);
        assert!(approx(p.entry_price, 98.0));
        assert!(approx(p.stop_loss, 110.0 * 1.01));
        assert!(approx(p.target1, 92.0));
        assert!(approx(p.target2, 86.0));
        assert_eq!(p.expected_duration, "10-30 candles");
        assert_eq!(p.probability, 0.68);
        assert_eq!(p.risk_reward_ratio, 2.8);
    }
}

#[test]
fn test_double_top_needs_separation() {
    let peak = (108.0, 110.0, 107.0, 109.0);
    let bars = flat_with(60, BASE, &[(20, peak), (25, peak)]);
    let engine = engine_with(BuiltinDetector::DoubleTop(DoubleTopDetector::with_defaults()));
    assert!(engine.detect_patterns(&bars, "1h").is_empty());
}

#[test]
fn test_double_top_needs_depth() {
    let peak = (109.0, 110.0, 108.5, 109.5);
    let bars = flat_with(60, (108.5, 109.0, 108.0, 108.5), &[(20, peak), (34, peak)]);
    let engine = engine_with(BuiltinDetector::DoubleTop(DoubleTopDetector::with_defaults()));
    // (110 - 108) / 110 is below 2%
    assert!(engine.detect_patterns(&bars, "1h").is_empty());
}

#[test]
fn test_double_top_needs_room_on_both_sides() {
    let bars = double_top_bars();
    let detector = DoubleTopDetector::with_defaults();
    assert!(detector.scan_bounds(40).is_empty());
    assert_eq!(detector.scan_bounds(bars.len()), 20..40);
    assert!(detector.detect(&bars, 19).is_none());
    assert!(detector.detect(&bars, 40).is_none());
    assert!(detector.detect(&bars, 25).is_some());
}

#[test]
fn test_double_bottom_detection() {
    let trough = (91.0, 93.0, 90.0, 92.0);
    let bars = flat_with(60, BASE, &[(20, trough), (34, trough)]);
    let engine = engine_with(BuiltinDetector::DoubleBottom(
        DoubleBottomDetector::with_defaults(),
    ));
    let patterns = engine.detect_patterns(&bars, "1h");

    assert_eq!(patterns.len(), 20);
    let p = &patterns[0];
    assert_eq!(p.kind, PatternKind::DoubleBottom);
    assert_eq!(p.direction, Direction::Bullish);
    assert_eq!((p.start_index, p.end_index), (20, 34));
    assert!(approx(p.entry_price, 102.0));
    assert!(approx(p.stop_loss, 90.0 * 0.99));
    assert!(approx(p.target1, 108.0));
    assert!(approx(p.target2, 114.0));
}

#[test]
fn test_double_top_params() {
    let mut params = HashMap::new();
    params.insert("min_peak_separation", 20.0);
    let detector = DoubleTopDetector::with_params(&params).unwrap();
    assert_eq!(detector.window.get(), 20);

    let engine = engine_with(BuiltinDetector::DoubleTop(detector));
    assert!(engine.detect_patterns(&double_top_bars(), "1h").is_empty());

    params.insert("window", 0.0);
    assert!(DoubleTopDetector::with_params(&params).is_err());
}

// ============================================================
// TRIANGLES
// ============================================================

#[test]
fn test_ascending_triangle_detection() {
    let bars = shaped(45, |_| 110.0, |x| 100.0 + 0.1 * x);
    let engine = engine_with(BuiltinDetector::Triangle(TriangleDetector::with_defaults()));
    let patterns = engine.detect_patterns(&bars, "4h");

    // trigger indices 30..35
    assert_eq!(patterns.len(), 5);
    for p in &patterns {
        let i = p.end_index;
        assert!((30..35).contains(&i));
        assert_eq!(p.kind, PatternKind::AscendingTriangle);
        assert_eq!(p.direction, Direction::Bullish);
        assert_eq!(p.start_index, i - 30);
        assert_eq!(p.confidence, 0.65);
        assert!(approx(p.entry_price, 110.0));
        assert!((p.stop_loss - (100.0 + 0.1 * (i - 30) as f64)).abs() < 1e-9);
        assert!(approx(p.target1, bars[i].close * 1.03));
        assert!(approx(p.target2, bars[i].close * 1.06));
    }
}

#[test]
fn test_descending_triangle_detection() {
    let bars = shaped(45, |x| 120.0 - 0.1 * x, |_| 100.0);
    let engine = engine_with(BuiltinDetector::Triangle(TriangleDetector::with_defaults()));
    let patterns = engine.detect_patterns(&bars, "4h");

    assert_eq!(patterns.len(), 5);
    for p in &patterns {
        let i = p.end_index;
        assert_eq!(p.kind, PatternKind::DescendingTriangle);
        assert_eq!(p.direction, Direction::Bearish);
        assert!(approx(p.entry_price, 100.0));
        assert!((p.stop_loss - (120.0 - 0.1 * (i - 30) as f64)).abs() < 1e-9);
        assert!(approx(p.target1, bars[i].close * 0.97));
    }
}

#[test]
fn test_triangle_needs_trailing_bars() {
    let bars = shaped(40, |_| 110.0, |x| 100.0 + 0.1 * x);
    let engine = engine_with(BuiltinDetector::Triangle(TriangleDetector::with_defaults()));
    assert!(engine.detect_patterns(&bars, "4h").is_empty());
}

// ============================================================
// CHANNELS
// ============================================================

#[test]
fn test_rising_channel_detection() {
    let bars = shaped(40, |x| 102.0 + 0.05 * x, |x| 98.0 + 0.05 * x);
    let engine = engine_with(BuiltinDetector::Channel(ChannelDetector::with_defaults()));
    let patterns = engine.detect_patterns(&bars, "1d");

    // trigger indices 25..35
    assert_eq!(patterns.len(), 10);
    for p in &patterns {
        let i = p.end_index;
        assert_eq!(p.kind, PatternKind::RisingChannel);
        assert_eq!(p.direction, Direction::Bullish);
        assert_eq!(p.start_index, i - 25);
        assert_eq!(p.confidence, 0.6);
        assert!(approx(p.entry_price, bars[i].close));
        assert!((p.stop_loss - (98.0 + 0.05 * (i - 25) as f64)).abs() < 1e-9);
        assert!(approx(p.target1, bars[i].close * 1.02));
        assert_eq!(p.expected_duration, "8-25 candles");
    }
}

#[test]
fn test_falling_channel_detection() {
    let bars = shaped(40, |x| 102.0 - 0.05 * x, |x| 98.0 - 0.05 * x);
    let engine = engine_with(BuiltinDetector::Channel(ChannelDetector::with_defaults()));
    let patterns = engine.detect_patterns(&bars, "1d");

    assert_eq!(patterns.len(), 10);
    for p in &patterns {
        let i = p.end_index;
        assert_eq!(p.kind, PatternKind::FallingChannel);
        assert_eq!(p.direction, Direction::Bearish);
        assert!((p.stop_loss - (102.0 - 0.05 * (i - 25) as f64)).abs() < 1e-9);
        assert!(approx(p.target2, bars[i].close * 0.96));
    }
}

#[test]
fn test_channel_rejects_converging_lines() {
    let bars = shaped(45, |_| 110.0, |x| 100.0 + 0.1 * x);
    let engine = engine_with(BuiltinDetector::Channel(ChannelDetector::with_defaults()));
    assert!(engine.detect_patterns(&bars, "1d").is_empty());
}

#[test]
fn test_triangle_rejects_parallel_lines() {
    let bars = shaped(45, |x| 102.0 + 0.05 * x, |x| 98.0 + 0.05 * x);
    let engine = engine_with(BuiltinDetector::Triangle(TriangleDetector::with_defaults()));
    assert!(engine.detect_patterns(&bars, "1d").is_empty());
}

// ============================================================
// ENGINE GATING
// ============================================================

#[test]
fn test_chart_family_gated_by_length() {
    let bars = shaped(40, |x| 102.0 + 0.05 * x, |x| 98.0 + 0.05 * x);
    let config = EngineConfig {
        chart_min_bars: Period::new(100).unwrap(),
        ..EngineConfig::default()
    };
    let engine = EngineBuilder::new()
        .add(BuiltinDetector::Channel(ChannelDetector::with_defaults()))
        .config(config)
        .build()
        .unwrap();
    assert!(engine.detect_patterns(&bars, "1d").is_empty());
}

#[test]
fn test_chart_min_bars_below_min_bars_rejected() {
    let config = EngineConfig {
        min_bars: Period::new(30).unwrap(),
        ..EngineConfig::default()
    };
    assert!(EngineBuilder::new().config(config).build().is_err());
}

#[test]
fn test_trend_slope_helper() {
    let values: Vec<f64> = (0..25).map(|i| 98.0 + 0.05 * i as f64).collect();
    assert!((trend_slope(&values) - 0.05).abs() < 1e-12);
    assert_eq!(trend_slope(&[5.0]), 0.0);
}
