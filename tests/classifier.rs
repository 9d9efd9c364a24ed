//! Integration tests for classifier fusion through the engine.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use chartpulse::prelude::*;

type Scores = std::result::Result<[f32; 4], ClassifierError>;

/// Bullish bars with half-range bodies; no candlestick pattern fires on them
fn uptrend(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let base = 100.0 + i as f64 * 2.0;
            Bar::new(i as i64 * 60_000, base - 0.5, base + 1.5, base - 1.5, base + 1.0, 100.0)
        })
        .collect()
}

/// Uptrend capped by a shooting star
fn uptrend_then_shooting_star(n: usize) -> Vec<Bar> {
    let mut bars = uptrend(n);
    let prev_close = bars[n - 1].close;
    bars.push(Bar::new(
        n as i64 * 60_000,
        prev_close + 1.0,
        prev_close + 6.0,
        prev_close + 0.4,
        prev_close + 0.5,
        100.0,
    ));
    bars
}

fn counting(scores: [f32; 4], calls: Arc<AtomicUsize>) -> impl PatternClassifier {
    move |_: &FeatureVector| -> Scores {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(scores)
    }
}

fn kinds(patterns: &[Pattern]) -> Vec<PatternKind> {
    patterns.iter().map(|p| p.kind).collect()
}

#[test]
fn test_classifier_not_called_below_window() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = EngineBuilder::new()
        .with_candlestick_defaults()
        .classifier(counting([0.9, 0.0, 0.0, 0.0], calls.clone()))
        .build()
        .unwrap();

    assert!(engine.detect_patterns(&uptrend(49), "1h").is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let patterns = engine.detect_patterns(&uptrend(50), "1h");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(kinds(&patterns), vec![PatternKind::ClassifierBullish]);
}

#[test]
fn test_confident_classifier_adds_one_pattern() {
    let bars = uptrend(60);
    let engine = EngineBuilder::new()
        .with_candlestick_defaults()
        .classifier(|_: &FeatureVector| -> Scores { Ok([0.1, 0.8, 0.05, 0.05]) })
        .build()
        .unwrap();
    assert!(engine.has_classifier());

    let patterns = engine.detect_patterns(&bars, "4h");
    assert_eq!(patterns.len(), 1);

    let p = &patterns[0];
    let last = &bars[59];
    assert_eq!(p.kind, PatternKind::ClassifierBearish);
    assert_eq!(p.direction, Direction::Bearish);
    assert_eq!((p.start_index, p.end_index), (50, 59));
    assert_eq!(p.timestamp, last.timestamp);
    assert!((p.confidence - 0.8).abs() < 1e-6);
    assert_eq!(p.probability, p.confidence);
    assert_eq!(p.entry_price, last.close);
    assert!((p.stop_loss - last.high * 1.02).abs() < 1e-9);
    assert!((p.target1 - last.close * 0.975).abs() < 1e-9);
    assert!((p.target2 - last.close * 0.95).abs() < 1e-9);
    assert_eq!(p.expected_duration, "3-10 candles");
    assert_eq!(p.risk_reward_ratio, 2.5);
}

#[test]
fn test_underconfident_classifier_adds_nothing() {
    let engine = EngineBuilder::new()
        .with_candlestick_defaults()
        .classifier(|_: &FeatureVector| -> Scores { Ok([0.6, 0.2, 0.1, 0.1]) })
        .build()
        .unwrap();
    assert!(engine.detect_patterns(&uptrend(60), "1h").is_empty());
}

#[test]
fn test_min_score_is_configurable() {
    let config = ClassifierConfig {
        min_score: Ratio::new(0.5).unwrap(),
    };
    let engine = EngineBuilder::new()
        .classifier(|_: &FeatureVector| -> Scores { Ok([0.6, 0.2, 0.1, 0.1]) })
        .classifier_config(config)
        .build()
        .unwrap();
    let patterns = engine.detect_patterns(&uptrend(60), "1h");
    assert_eq!(kinds(&patterns), vec![PatternKind::ClassifierBullish]);
}

#[test]
fn test_failing_classifier_keeps_candlesticks() {
    let bars = uptrend_then_shooting_star(55);
    let engine = EngineBuilder::new()
        .with_candlestick_defaults()
        .classifier(|_: &FeatureVector| -> Scores {
            Err(ClassifierError::Unavailable("model not loaded".into()))
        })
        .build()
        .unwrap();

    let found = kinds(&engine.detect_patterns(&bars, "1h"));
    assert!(found.contains(&PatternKind::ShootingStar));
    assert!(found.iter().all(|k| k.family() != PatternFamily::Classifier));
}

#[test]
fn test_panicking_classifier_keeps_candlesticks() {
    let bars = uptrend_then_shooting_star(55);
    let engine = EngineBuilder::new()
        .with_candlestick_defaults()
        .classifier(|_: &FeatureVector| -> Scores { panic!("inference crashed") })
        .build()
        .unwrap();

    let found = kinds(&engine.detect_patterns(&bars, "1h"));
    assert!(found.contains(&PatternKind::ShootingStar));
    assert!(found.iter().all(|k| k.family() != PatternFamily::Classifier));
}

#[test]
fn test_invalid_scores_keep_candlesticks() {
    let bars = uptrend_then_shooting_star(55);
    for scores in [[f32::NAN, 0.0, 0.0, 0.0], [0.9, 0.9, 0.0, 0.0], [-0.5, 0.0, 0.0, 0.95]] {
        let engine = EngineBuilder::new()
            .with_candlestick_defaults()
            .classifier(move |_: &FeatureVector| -> Scores { Ok(scores) })
            .build()
            .unwrap();

        let found = kinds(&engine.detect_patterns(&bars, "1h"));
        assert!(found.contains(&PatternKind::ShootingStar));
        assert!(found.iter().all(|k| k.family() != PatternFamily::Classifier));
    }
}

#[test]
fn test_classifier_sees_normalized_window() {
    let engine = EngineBuilder::new()
        .classifier(|features: &FeatureVector| -> Scores {
            let closes: Vec<f32> = features[..200].chunks(4).map(|bar| bar[3]).collect();
            if closes.iter().all(|c| (0.0..=1.0).contains(c)) && closes[0] == 0.0 && closes[49] == 1.0 {
                Ok([0.0, 0.0, 0.95, 0.05])
            } else {
                Err(ClassifierError::InvalidOutput("unexpected features".into()))
            }
        })
        .build()
        .unwrap();

    let patterns = engine.detect_patterns(&uptrend(80), "1d");
    assert_eq!(kinds(&patterns), vec![PatternKind::ClassifierContinuation]);
    assert_eq!(patterns[0].direction, Direction::Neutral);
}

#[test]
fn test_classifier_output_respects_engine_filters() {
    let engine = EngineBuilder::new()
        .classifier(|_: &FeatureVector| -> Scores { Ok([0.75, 0.1, 0.1, 0.05]) })
        .min_confidence(0.8)
        .build()
        .unwrap();
    assert!(engine.detect_patterns(&uptrend(60), "1h").is_empty());

    let engine = EngineBuilder::new()
        .classifier(|_: &FeatureVector| -> Scores { Ok([0.9, 0.05, 0.05, 0.0]) })
        .only_kinds([PatternKind::Hammer])
        .build()
        .unwrap();
    assert!(engine.detect_patterns(&uptrend(60), "1h").is_empty());
}

#[test]
fn test_classifier_votes_in_signal() {
    let engine = EngineBuilder::new()
        .with_candlestick_defaults()
        .classifier(|_: &FeatureVector| -> Scores { Ok([0.9, 0.05, 0.05, 0.0]) })
        .build()
        .unwrap();
    let analysis = engine.analyze(&uptrend(60), "1h");

    let signal = analysis.signal.expect("bullish classifier output should vote");
    assert_eq!(signal.action, SignalAction::Buy);
    assert_eq!(signal.reasoning, "Detected 1 strong buy patterns: Classifier: Bullish");
}

#[test]
fn test_classifier_shared_across_parallel_scan() {
    let calls = Arc::new(AtomicUsize::new(0));
    let engine = EngineBuilder::new()
        .with_candlestick_defaults()
        .classifier(counting([0.9, 0.0, 0.0, 0.0], calls.clone()))
        .build()
        .unwrap();

    let long = uptrend(60);
    let short = uptrend(20);
    let instruments = vec![("LONG", long.as_slice()), ("SHORT", short.as_slice())];
    let (results, errors) = scan_parallel(&engine, instruments, "1h");

    assert!(errors.is_empty());
    assert_eq!(results.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    let long_result = results.iter().find(|r| r.symbol == "LONG").unwrap();
    assert_eq!(kinds(&long_result.patterns), vec![PatternKind::ClassifierBullish]);
}
