//! Classifier fusion
//!
//! An external classifier scores the last [`CLASSIFIER_WINDOW`] bars into four
//! classes (bullish, bearish, continuation, reversal). The engine turns a
//! confident top score into a single [`PatternMatch`]. Any classifier failure
//! drops only this contribution.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    indicators::{macd, rsi},
    PatternKind, PatternMatch, Ratio, TradeLevels, OHLCV,
};

/// Bars fed to the classifier
pub const CLASSIFIER_WINDOW: usize = 50;
/// Four normalized prices per bar, then RSI and MACD histogram
pub const FEATURE_LEN: usize = CLASSIFIER_WINDOW * 4 + 2;

/// Fixed-length classifier input
pub type FeatureVector = [f32; FEATURE_LEN];

/// Output order of [`PatternClassifier::classify`]
pub const CLASS_KINDS: [PatternKind; 4] = [
    PatternKind::ClassifierBullish,
    PatternKind::ClassifierBearish,
    PatternKind::ClassifierContinuation,
    PatternKind::ClassifierReversal,
];

/// Trailing bars a classifier detection spans
const CLASSIFIER_SPAN: usize = 10;
/// Slack when checking that scores sum to at most one
const SCORE_SUM_TOLERANCE: f32 = 1e-3;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classifier failed: {0}")]
    Failed(String),

    #[error("invalid classifier output: {0}")]
    InvalidOutput(String),
}

/// Four-class scorer over a [`FeatureVector`].
///
/// Scores are `[bullish, bearish, continuation, reversal]`, each non-negative,
/// summing to at most one. A panic inside `classify` is caught by the engine and
/// treated as [`ClassifierError::Failed`].
pub trait PatternClassifier: Send + Sync {
    fn classify(&self, features: &FeatureVector) -> Result<[f32; 4], ClassifierError>;
}

impl<F> PatternClassifier for F
where
    F: Fn(&FeatureVector) -> Result<[f32; 4], ClassifierError> + Send + Sync,
{
    fn classify(&self, features: &FeatureVector) -> Result<[f32; 4], ClassifierError> {
        self(features)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Top score must be strictly above this
    pub min_score: Ratio,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_score: Ratio::new_const(0.7),
        }
    }
}

/// Build the classifier input from the last [`CLASSIFIER_WINDOW`] bars.
///
/// Prices are scaled by the window's close range, or set to 0.5 when that range
/// is zero. RSI(14) is divided by 100 (0.5 if unavailable) and the MACD(12, 26, 9)
/// histogram by 100 (0 if unavailable). Returns `None` for shorter inputs.
pub fn extract_features<T: OHLCV>(bars: &[T]) -> Option<FeatureVector> {
    let window = bars.get(bars.len().checked_sub(CLASSIFIER_WINDOW)?..)?;
    let closes: Vec<f64> = window.iter().map(OHLCV::close).collect();

    let min = closes.iter().copied().fold(f64::INFINITY, f64::min);
    let max = closes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    let mut features = [0.0f32; FEATURE_LEN];
    for (slot, bar) in features.chunks_exact_mut(4).zip(window) {
        let prices = [bar.open(), bar.high(), bar.low(), bar.close()];
        for (out, price) in slot.iter_mut().zip(prices) {
            *out = if range > 0.0 {
                ((price - min) / range) as f32
            } else {
                0.5
            };
        }
    }

    let rsi_last = rsi(&closes, 14).last().copied().unwrap_or(50.0);
    let histogram = macd(&closes, 12, 26, 9)
        .last()
        .map(|p| p.histogram)
        .unwrap_or(0.0);

    features[FEATURE_LEN - 2] = (rsi_last / 100.0) as f32;
    features[FEATURE_LEN - 1] = (histogram / 100.0) as f32;
    Some(features)
}

fn check_scores(scores: [f32; 4]) -> Result<[f32; 4], ClassifierError> {
    if let Some(bad) = scores.iter().find(|s| !s.is_finite() || **s < 0.0) {
        return Err(ClassifierError::InvalidOutput(format!("score {bad}")));
    }
    let sum: f32 = scores.iter().sum();
    if sum > 1.0 + SCORE_SUM_TOLERANCE {
        return Err(ClassifierError::InvalidOutput(format!("scores sum to {sum}")));
    }
    Ok(scores)
}

/// Index and value of the highest score; the first wins ties.
fn top_score(scores: &[f32; 4]) -> (usize, f32) {
    scores
        .iter()
        .copied()
        .enumerate()
        .fold((0, scores[0]), |best, (i, s)| if s > best.1 { (i, s) } else { best })
}

/// Run `classifier` over the tail of `bars` and convert a confident answer to a match.
pub(crate) fn fuse<T: OHLCV>(
    classifier: &dyn PatternClassifier,
    bars: &[T],
    config: &ClassifierConfig,
) -> Option<PatternMatch> {
    let features = extract_features(bars)?;

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| classifier.classify(&features)))
        .unwrap_or_else(|_| Err(ClassifierError::Failed("classifier panicked".into())));

    let scores = match outcome.and_then(check_scores) {
        Ok(scores) => scores,
        Err(error) => {
            warn!(%error, "classifier skipped");
            return None;
        }
    };

    let (index, score) = top_score(&scores);
    let score = f64::from(score);
    if score <= config.min_score.get() {
        return None;
    }

    let kind = CLASS_KINDS[index];
    let last = bars.last()?;
    let close = last.close();
    let levels = if kind.typical_direction().is_bullish() {
        TradeLevels::new(close, last.low() * 0.98, close * 1.025, close * 1.05)
    } else {
        TradeLevels::new(close, last.high() * 1.02, close * 0.975, close * 0.95)
    };

    let n = bars.len();
    Some(PatternMatch::new(kind, score, n - CLASSIFIER_SPAN, n - 1, levels))
}
