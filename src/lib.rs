//! # chartpulse
//!
//! Technical-analysis and pattern-detection engine: indicators, candlestick and
//! chart-geometry pattern detection, optional classifier fusion, and trade signal
//! synthesis over OHLCV bars.
//!
//! ## Quick Start
//!
//! ```rust
//! use chartpulse::prelude::*;
//!
//! let bars: Vec<Bar> = (0..60)
//!     .map(|i| {
//!         let base = 100.0 + (i as f64 * 0.4).sin() * 3.0;
//!         Bar::new(i * 60_000, base, base + 1.0, base - 1.0, base + 0.2, 1_000.0)
//!     })
//!     .collect();
//!
//! // Create engine with every builtin detector
//! let engine = EngineBuilder::new()
//!     .with_all_defaults()
//!     .build()
//!     .unwrap();
//!
//! let patterns = engine.detect_patterns(&bars, "1m");
//! let signal = engine.generate_signal(&patterns, &bars, "1m");
//! # let _ = signal;
//! ```

pub mod classifier;
pub mod detectors;
pub mod indicators;
pub mod params;
pub mod signal;

pub mod prelude {
    pub use crate::{
        // Classifier
        classifier::{ClassifierConfig, ClassifierError, FeatureVector, PatternClassifier},
        // Detectors
        detectors::*,
        // Parameters
        params::{get_factor, get_period, get_ratio, ParamMeta, ParamType, ParameterizedDetector},
        // Parallel
        scan_parallel,
        // Signals
        signal::{Signal, SignalAction, SignalConfig},
        // Types
        validate_bars,
        Analysis,
        Bar,
        BuiltinDetector,
        Direction,
        EngineBuilder,
        EngineConfig,
        KindProfile,
        OHLCVExt,
        Pattern,
        // Errors
        PatternError,
        PatternDetector,
        PatternEngine,
        PatternFamily,
        PatternKind,
        PatternMatch,
        Period,
        Ratio,
        Result,
        ScanError,
        ScanResult,
        TradeLevels,
        OHLCV,
    };
}

use std::ops::Range;

use tracing::debug;

use crate::{
    classifier::{ClassifierConfig, PatternClassifier},
    signal::{Signal, SignalConfig},
};

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, PatternError>;

/// Errors from configuration and input validation
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    #[error("Invalid value: {0}")]
    InvalidValue(&'static str),

    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid OHLCV at index {index}: {reason}")]
    InvalidOHLCV { index: usize, reason: &'static str },
}

// ============================================================
// VALIDATED TYPES
// ============================================================

/// Normalized value in range 0.0..=1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Ratio(f64);

impl Ratio {
    /// Create a new Ratio, validating the value is in [0.0, 1.0]
    pub fn new(value: f64) -> Result<Self> {
        if value.is_nan() || value.is_infinite() {
            return Err(PatternError::InvalidValue(
                "Ratio cannot be NaN or infinite",
            ));
        }
        if !(0.0..=1.0).contains(&value) {
            return Err(PatternError::OutOfRange {
                field: "Ratio",
                value,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(Self(value))
    }

    /// Create a Ratio from a compile-time constant (library internal use)
    #[doc(hidden)]
    pub const fn new_const(value: f64) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }
}

impl serde::Serialize for Ratio {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Ratio {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = f64::deserialize(d)?;
        Ratio::new(value).map_err(serde::de::Error::custom)
    }
}

/// Period (must be > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period(usize);

impl Period {
    /// Create a new Period, validating value is > 0
    pub fn new(value: usize) -> Result<Self> {
        if value == 0 {
            return Err(PatternError::InvalidValue("Period must be > 0"));
        }
        Ok(Self(value))
    }

    #[doc(hidden)]
    pub const fn new_const(value: usize) -> Self {
        Self(value)
    }

    #[inline]
    pub fn get(self) -> usize {
        self.0
    }
}

impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        self.0.serialize(s)
    }
}

impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = usize::deserialize(d)?;
        Period::new(value).map_err(serde::de::Error::custom)
    }
}

// ============================================================
// OHLCV TRAITS
// ============================================================

/// Core OHLCV data trait
pub trait OHLCV {
    /// Bar time, monotonic across a sequence (e.g. epoch millis)
    fn timestamp(&self) -> i64;
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

/// Extension trait with computed properties for OHLCV data
pub trait OHLCVExt: OHLCV {
    #[inline]
    fn body_size(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn total_range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_wick(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_wick(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body smaller than a tenth of the range
    #[inline]
    fn is_doji(&self) -> bool {
        self.body_size() < self.total_range() * 0.1
    }

    /// Midpoint of the real body
    #[inline]
    fn body_midpoint(&self) -> f64 {
        (self.open() + self.close()) / 2.0
    }

    #[inline]
    fn typical_price(&self) -> f64 {
        (self.high() + self.low() + self.close()) / 3.0
    }

    /// Body as ratio of range. Returns None if the range is zero
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.total_range();
        (range > 0.0).then(|| self.body_size() / range)
    }

    /// Validate OHLCV data consistency
    fn validate(&self) -> Result<()> {
        let values = [self.open(), self.high(), self.low(), self.close(), self.volume()];
        if values.iter().any(|v| v.is_nan()) {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "NaN in OHLCV",
            });
        }
        if values.iter().any(|v| v.is_infinite()) {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "Infinite value in OHLCV",
            });
        }
        if self.high() < self.low() {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "high < low",
            });
        }
        if self.open().min(self.close()) < self.low() || self.open().max(self.close()) > self.high()
        {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "open/close outside high-low range",
            });
        }
        if self.volume() < 0.0 {
            return Err(PatternError::InvalidOHLCV {
                index: 0,
                reason: "negative volume",
            });
        }
        Ok(())
    }
}

impl<T: OHLCV> OHLCVExt for T {}

/// Plain OHLCV bar value
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
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

impl OHLCV for Bar {
    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Check every bar, reporting the first inconsistent one with its index
pub fn validate_bars<T: OHLCV>(bars: &[T]) -> Result<()> {
    for (i, bar) in bars.iter().enumerate() {
        bar.validate().map_err(|e| match e {
            PatternError::InvalidOHLCV { reason, .. } => {
                PatternError::InvalidOHLCV { index: i, reason }
            }
            other => other,
        })?;
    }
    Ok(())
}

// ============================================================
// PATTERN KINDS
// ============================================================

/// Direction/bias of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

impl Direction {
    #[inline]
    pub fn is_bullish(self) -> bool {
        matches!(self, Direction::Bullish)
    }

    #[inline]
    pub fn is_bearish(self) -> bool {
        matches!(self, Direction::Bearish)
    }

    #[inline]
    pub fn is_neutral(self) -> bool {
        matches!(self, Direction::Neutral)
    }
}

/// Detector family a pattern kind belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternFamily {
    Candlestick,
    ChartGeometry,
    Classifier,
}

/// Static design constants of a pattern kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindProfile {
    pub expected_duration: &'static str,
    /// Historical win rate. `None` for classifier kinds, which report their score.
    pub probability: Option<f64>,
    pub risk_reward: f64,
}

impl KindProfile {
    const fn new(expected_duration: &'static str, probability: f64, risk_reward: f64) -> Self {
        Self {
            expected_duration,
            probability: Some(probability),
            risk_reward,
        }
    }
}

/// Every pattern the engine can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    // Candlestick
    Doji,
    Hammer,
    ShootingStar,
    BullishEngulfing,
    BearishEngulfing,
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,

    // Chart geometry
    DoubleTop,
    DoubleBottom,
    AscendingTriangle,
    DescendingTriangle,
    RisingChannel,
    FallingChannel,

    // Classifier
    ClassifierBullish,
    ClassifierBearish,
    ClassifierContinuation,
    ClassifierReversal,
}

impl PatternKind {
    /// Human-readable name
    pub fn name(self) -> &'static str {
        match self {
            PatternKind::Doji => "Doji",
            PatternKind::Hammer => "Hammer",
            PatternKind::ShootingStar => "Shooting Star",
            PatternKind::BullishEngulfing => "Bullish Engulfing",
            PatternKind::BearishEngulfing => "Bearish Engulfing",
            PatternKind::MorningStar => "Morning Star",
            PatternKind::EveningStar => "Evening Star",
            PatternKind::ThreeWhiteSoldiers => "Three White Soldiers",
            PatternKind::ThreeBlackCrows => "Three Black Crows",
            PatternKind::DoubleTop => "Double Top",
            PatternKind::DoubleBottom => "Double Bottom",
            PatternKind::AscendingTriangle => "Ascending Triangle",
            PatternKind::DescendingTriangle => "Descending Triangle",
            PatternKind::RisingChannel => "Rising Channel",
            PatternKind::FallingChannel => "Falling Channel",
            PatternKind::ClassifierBullish => "Classifier: Bullish",
            PatternKind::ClassifierBearish => "Classifier: Bearish",
            PatternKind::ClassifierContinuation => "Classifier: Continuation",
            PatternKind::ClassifierReversal => "Classifier: Reversal",
        }
    }

    pub fn family(self) -> PatternFamily {
        match self {
            PatternKind::Doji
            | PatternKind::Hammer
            | PatternKind::ShootingStar
            | PatternKind::BullishEngulfing
            | PatternKind::BearishEngulfing
            | PatternKind::MorningStar
            | PatternKind::EveningStar
            | PatternKind::ThreeWhiteSoldiers
            | PatternKind::ThreeBlackCrows => PatternFamily::Candlestick,
            PatternKind::DoubleTop
            | PatternKind::DoubleBottom
            | PatternKind::AscendingTriangle
            | PatternKind::DescendingTriangle
            | PatternKind::RisingChannel
            | PatternKind::FallingChannel => PatternFamily::ChartGeometry,
            PatternKind::ClassifierBullish
            | PatternKind::ClassifierBearish
            | PatternKind::ClassifierContinuation
            | PatternKind::ClassifierReversal => PatternFamily::Classifier,
        }
    }

    /// Direction every detection of this kind carries
    pub fn typical_direction(self) -> Direction {
        match self {
            PatternKind::Hammer
            | PatternKind::BullishEngulfing
            | PatternKind::MorningStar
            | PatternKind::ThreeWhiteSoldiers
            | PatternKind::DoubleBottom
            | PatternKind::AscendingTriangle
            | PatternKind::RisingChannel
            | PatternKind::ClassifierBullish => Direction::Bullish,
            PatternKind::ShootingStar
            | PatternKind::BearishEngulfing
            | PatternKind::EveningStar
            | PatternKind::ThreeBlackCrows
            | PatternKind::DoubleTop
            | PatternKind::DescendingTriangle
            | PatternKind::FallingChannel
            | PatternKind::ClassifierBearish => Direction::Bearish,
            PatternKind::Doji
            | PatternKind::ClassifierContinuation
            | PatternKind::ClassifierReversal => Direction::Neutral,
        }
    }

    /// Expected duration, win rate and reward-to-risk constants.
    /// These values are part of the output contract; do not tune them.
    pub fn profile(self) -> KindProfile {
        match self {
            PatternKind::Doji => KindProfile::new("1-3 candles", 0.5, 2.0),
            PatternKind::Hammer | PatternKind::ShootingStar => {
                KindProfile::new("2-5 candles", 0.65, 2.5)
            }
            PatternKind::BullishEngulfing | PatternKind::BearishEngulfing => {
                KindProfile::new("3-8 candles", 0.72, 3.0)
            }
            PatternKind::MorningStar | PatternKind::EveningStar => {
                KindProfile::new("5-12 candles", 0.78, 3.5)
            }
            PatternKind::ThreeWhiteSoldiers | PatternKind::ThreeBlackCrows => {
                KindProfile::new("5-15 candles", 0.75, 4.0)
            }
            PatternKind::DoubleTop | PatternKind::DoubleBottom => {
                KindProfile::new("10-30 candles", 0.68, 2.8)
            }
            PatternKind::AscendingTriangle | PatternKind::DescendingTriangle => {
                KindProfile::new("5-20 candles", 0.72, 2.5)
            }
            PatternKind::RisingChannel | PatternKind::FallingChannel => {
                KindProfile::new("8-25 candles", 0.65, 2.2)
            }
            PatternKind::ClassifierBullish
            | PatternKind::ClassifierBearish
            | PatternKind::ClassifierContinuation
            | PatternKind::ClassifierReversal => KindProfile {
                expected_duration: "3-10 candles",
                probability: None,
                risk_reward: 2.5,
            },
        }
    }
}

// ============================================================
// PATTERN MATCH - detector output (Copy, no allocations)
// ============================================================

/// Entry, stop and target prices attached to a detection
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TradeLevels {
    pub entry: f64,
    pub stop_loss: f64,
    pub target1: f64,
    pub target2: f64,
}

impl TradeLevels {
    #[inline]
    pub fn new(entry: f64, stop_loss: f64, target1: f64, target2: f64) -> Self {
        Self {
            entry,
            stop_loss,
            target1,
            target2,
        }
    }
}

/// Result of a single detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternMatch {
    pub kind: PatternKind,
    pub direction: Direction,
    /// Detection strength 0.0..=1.0
    pub confidence: f64,
    /// Win rate 0.0..=1.0
    pub probability: f64,
    pub start_index: usize,
    pub end_index: usize,
    pub levels: TradeLevels,
}

impl PatternMatch {
    /// Build a match whose direction and probability come from the kind's profile.
    /// Score-driven kinds take their confidence as probability.
    pub fn new(
        kind: PatternKind,
        confidence: f64,
        start_index: usize,
        end_index: usize,
        levels: TradeLevels,
    ) -> Self {
        Self {
            kind,
            direction: kind.typical_direction(),
            confidence,
            probability: kind.profile().probability.unwrap_or(confidence),
            start_index,
            end_index,
            levels,
        }
    }
}

/// A detected pattern stamped with its timeframe and trigger time
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Pattern {
    pub kind: PatternKind,
    /// Display name of `kind`
    pub name: String,
    pub timeframe: String,
    /// Timestamp of the bar at `end_index`
    pub timestamp: i64,
    pub confidence: f64,
    pub start_index: usize,
    pub end_index: usize,
    pub direction: Direction,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target1: f64,
    pub target2: f64,
    pub expected_duration: String,
    pub probability: f64,
    pub risk_reward_ratio: f64,
}

impl Pattern {
    pub fn from_match<T: OHLCV>(m: &PatternMatch, bars: &[T], timeframe: &str) -> Self {
        let profile = m.kind.profile();
        Self {
            kind: m.kind,
            name: m.kind.name().to_string(),
            timeframe: timeframe.to_string(),
            timestamp: bars
                .get(m.end_index)
                .map(OHLCV::timestamp)
                .unwrap_or_default(),
            confidence: m.confidence,
            start_index: m.start_index,
            end_index: m.end_index,
            direction: m.direction,
            entry_price: m.levels.entry,
            stop_loss: m.levels.stop_loss,
            target1: m.levels.target1,
            target2: m.levels.target2,
            expected_duration: profile.expected_duration.to_string(),
            probability: m.probability,
            risk_reward_ratio: profile.risk_reward,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

// ============================================================
// PATTERN DETECTOR TRAIT
// ============================================================

/// Pattern detector evaluated at one trigger index at a time
pub trait PatternDetector: Send + Sync {
    /// Short identifier used in errors and logs
    fn name(&self) -> &'static str;

    /// Kinds this detector can emit
    fn kinds(&self) -> &'static [PatternKind];

    /// Number of bars ending at the trigger index the detector inspects
    fn min_bars(&self) -> usize;

    /// Earliest trigger index the engine evaluates
    fn first_index(&self) -> usize {
        self.min_bars()
            .saturating_sub(1)
            .max(detectors::helpers::CANDLESTICK_FIRST_INDEX)
    }

    /// Trigger indices the engine evaluates for an input of `len` bars
    fn scan_bounds(&self, len: usize) -> Range<usize> {
        self.first_index().min(len)..len
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch>;

    fn validate_config(&self) -> Result<()> {
        Ok(())
    }

    fn family(&self) -> PatternFamily {
        self.kinds()
            .first()
            .map(|k| k.family())
            .unwrap_or(PatternFamily::Candlestick)
    }
}

// ============================================================
// BUILTIN DETECTORS - generated via macro
// ============================================================

use detectors::*;

/// Macro to generate BuiltinDetector enum without boilerplate
macro_rules! define_builtin_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All builtin detectors - fast path via enum dispatch
        #[derive(Debug, Clone)]
        pub enum BuiltinDetector {
            $($variant($detector)),*
        }

        impl BuiltinDetector {
            #[inline]
            pub fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, index)),*
                }
            }

            #[inline]
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant(d) => PatternDetector::name(d)),*
                }
            }

            #[inline]
            pub fn kinds(&self) -> &'static [PatternKind] {
                match self {
                    $(Self::$variant(d) => PatternDetector::kinds(d)),*
                }
            }

            #[inline]
            pub fn family(&self) -> PatternFamily {
                match self {
                    $(Self::$variant(d) => PatternDetector::family(d)),*
                }
            }

            #[inline]
            pub fn scan_bounds(&self, len: usize) -> Range<usize> {
                match self {
                    $(Self::$variant(d) => PatternDetector::scan_bounds(d, len)),*
                }
            }

            pub fn validate_config(&self) -> Result<()> {
                match self {
                    $(Self::$variant(d) => PatternDetector::validate_config(d)),*
                }
            }
        }
    };
}

define_builtin_detectors! {
    // Single bar
    Doji(DojiDetector),
    Hammer(HammerDetector),
    ShootingStar(ShootingStarDetector),

    // Two bar
    Engulfing(EngulfingDetector),

    // Three bar
    MorningStar(MorningStarDetector),
    EveningStar(EveningStarDetector),
    ThreeWhiteSoldiers(ThreeWhiteSoldiersDetector),
    ThreeBlackCrows(ThreeBlackCrowsDetector),

    // Chart geometry
    DoubleTop(DoubleTopDetector),
    DoubleBottom(DoubleBottomDetector),
    Triangle(TriangleDetector),
    Channel(ChannelDetector),
}

// ============================================================
// PATTERN ENGINE
// ============================================================

/// Engine configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Inputs shorter than this produce no patterns
    pub min_bars: Period,
    /// Chart-geometry detectors only run from this many bars
    pub chart_min_bars: Period,
    pub min_confidence: Option<f64>,
    pub kind_filter: Option<Vec<PatternKind>>,
    /// Reject malformed bars in [`scan_parallel`]
    pub validate_data: bool,
    pub classifier: ClassifierConfig,
    pub signal: SignalConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_bars: Period::new_const(10),
            chart_min_bars: Period::new_const(20),
            min_confidence: None,
            kind_filter: None,
            validate_data: false,
            classifier: ClassifierConfig::default(),
            signal: SignalConfig::default(),
        }
    }
}

/// Patterns and signal from one [`PatternEngine::analyze`] call
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Analysis {
    pub patterns: Vec<Pattern>,
    pub signal: Option<Signal>,
}

/// Main pattern detection engine. Immutable once built; share it by reference.
pub struct PatternEngine {
    builtin: Vec<BuiltinDetector>,
    classifier: Option<Box<dyn PatternClassifier>>,
    config: EngineConfig,
}

impl PatternEngine {
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn detectors(&self) -> &[BuiltinDetector] {
        &self.builtin
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    // ===========================================
    // LOW-LEVEL: Single index
    // ===========================================

    /// Raw detections of every builtin detector triggered at `index`.
    /// Bypasses the engine's length gates and filters.
    pub fn scan_at<T: OHLCV>(&self, bars: &[T], index: usize) -> Vec<PatternMatch> {
        self.builtin
            .iter()
            .filter(|d| d.scan_bounds(bars.len()).contains(&index))
            .filter_map(|d| d.detect(bars, index))
            .collect()
    }

    // ===========================================
    // HIGH-LEVEL: Detection and synthesis
    // ===========================================

    /// Detect every pattern in `bars`, sorted by descending confidence.
    ///
    /// Returns an empty list for fewer than `config.min_bars` bars. Candlestick,
    /// chart-geometry and classifier families run independently; a failing
    /// classifier only removes its own contribution.
    pub fn detect_patterns<T: OHLCV>(&self, bars: &[T], timeframe: &str) -> Vec<Pattern> {
        if bars.len() < self.config.min_bars.get() {
            return Vec::new();
        }

        let mut matches = self.scan_family(bars, PatternFamily::Candlestick);
        let candlestick_count = matches.len();

        if bars.len() >= self.config.chart_min_bars.get() {
            matches.extend(self.scan_family(bars, PatternFamily::ChartGeometry));
        }
        let chart_count = matches.len() - candlestick_count;

        if let Some(classifier) = self.classifier.as_deref() {
            matches.extend(classifier::fuse(classifier, bars, &self.config.classifier));
        }

        let mut patterns: Vec<Pattern> = matches
            .iter()
            .filter(|m| self.should_include(m))
            .map(|m| Pattern::from_match(m, bars, timeframe))
            .collect();
        patterns.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

        debug!(
            timeframe,
            bars = bars.len(),
            candlestick = candlestick_count,
            chart = chart_count,
            reported = patterns.len(),
            "pattern scan complete"
        );

        patterns
    }

    /// Synthesize at most one trade signal from previously detected patterns.
    pub fn generate_signal<T: OHLCV>(
        &self,
        patterns: &[Pattern],
        bars: &[T],
        timeframe: &str,
    ) -> Option<Signal> {
        signal::synthesize(patterns, bars, timeframe, &self.config.signal)
    }

    /// [`detect_patterns`](Self::detect_patterns) followed by
    /// [`generate_signal`](Self::generate_signal).
    pub fn analyze<T: OHLCV>(&self, bars: &[T], timeframe: &str) -> Analysis {
        let patterns = self.detect_patterns(bars, timeframe);
        let signal = self.generate_signal(&patterns, bars, timeframe);
        Analysis { patterns, signal }
    }

    // ===========================================
    // Internal helpers
    // ===========================================

    fn scan_family<T: OHLCV>(&self, bars: &[T], family: PatternFamily) -> Vec<PatternMatch> {
        let active: Vec<(&BuiltinDetector, Range<usize>)> = self
            .builtin
            .iter()
            .filter(|d| d.family() == family)
            .map(|d| (d, d.scan_bounds(bars.len())))
            .collect();

        let mut results = Vec::new();
        for index in 0..bars.len() {
            for (detector, bounds) in &active {
                if bounds.contains(&index) {
                    if let Some(m) = detector.detect(bars, index) {
                        results.push(m);
                    }
                }
            }
        }
        results
    }

    fn should_include(&self, m: &PatternMatch) -> bool {
        if let Some(min) = self.config.min_confidence {
            if m.confidence < min {
                return false;
            }
        }
        if let Some(ref filter) = self.config.kind_filter {
            if !filter.contains(&m.kind) {
                return false;
            }
        }
        true
    }

    fn validate(&self) -> Result<()> {
        for d in &self.builtin {
            d.validate_config()?;
        }
        if self.config.chart_min_bars < self.config.min_bars {
            return Err(PatternError::InvalidConfig(format!(
                "chart_min_bars ({}) must be >= min_bars ({})",
                self.config.chart_min_bars.get(),
                self.config.min_bars.get()
            )));
        }
        if let Some(min) = self.config.min_confidence {
            Ratio::new(min)?;
        }
        self.config.signal.validate()
    }
}

// ============================================================
// BUILDER
// ============================================================

/// Builder for creating PatternEngine instances
#[derive(Default)]
pub struct EngineBuilder {
    builtin: Vec<BuiltinDetector>,
    classifier: Option<Box<dyn PatternClassifier>>,
    config: EngineConfig,
}

/// Generate an array of `BuiltinDetector` variants using `Default::default()` for each inner type.
macro_rules! builtin_defaults {
  ($($variant:ident),* $(,)?) => {
    [$(BuiltinDetector::$variant(Default::default())),*]
  };
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every builtin detector with default thresholds
    pub fn with_all_defaults(self) -> Self {
        self.with_candlestick_defaults().with_chart_defaults()
    }

    /// Add candlestick detectors with defaults (8)
    pub fn with_candlestick_defaults(mut self) -> Self {
        self.builtin.extend(builtin_defaults![
            Doji,
            Hammer,
            ShootingStar,
            Engulfing,
            MorningStar,
            EveningStar,
            ThreeWhiteSoldiers,
            ThreeBlackCrows,
        ]);
        self
    }

    /// Add chart-geometry detectors with defaults (4)
    pub fn with_chart_defaults(mut self) -> Self {
        self.builtin
            .extend(builtin_defaults![DoubleTop, DoubleBottom, Triangle, Channel]);
        self
    }

    /// Add a builtin detector
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, detector: BuiltinDetector) -> Self {
        self.builtin.push(detector);
        self
    }

    /// Add with config validation
    pub fn add_checked(mut self, detector: BuiltinDetector) -> Result<Self> {
        detector.validate_config()?;
        self.builtin.push(detector);
        Ok(self)
    }

    /// Attach an external classifier; without one the classifier family is skipped
    pub fn classifier<C: PatternClassifier + 'static>(mut self, classifier: C) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set minimum confidence filter
    pub fn min_confidence(mut self, confidence: f64) -> Self {
        self.config.min_confidence = Some(confidence);
        self
    }

    /// Report only the given kinds
    pub fn only_kinds(mut self, kinds: impl IntoIterator<Item = PatternKind>) -> Self {
        self.config.kind_filter = Some(kinds.into_iter().collect());
        self
    }

    /// Enable/disable data validation
    pub fn validate_data(mut self, enable: bool) -> Self {
        self.config.validate_data = enable;
        self
    }

    pub fn classifier_config(mut self, config: ClassifierConfig) -> Self {
        self.config.classifier = config;
        self
    }

    pub fn signal_config(mut self, config: SignalConfig) -> Self {
        self.config.signal = config;
        self
    }

    /// Build the engine
    pub fn build(self) -> Result<PatternEngine> {
        let engine = PatternEngine {
            builtin: self.builtin,
            classifier: self.classifier,
            config: self.config,
        };
        engine.validate()?;
        Ok(engine)
    }
}

// ============================================================
// PARALLEL SCANNING
// ============================================================

use rayon::prelude::*;

/// Result of analysing a single instrument
#[derive(Debug)]
pub struct ScanResult {
    pub symbol: String,
    pub patterns: Vec<Pattern>,
    pub signal: Option<Signal>,
}

/// Error from analysing a single instrument
#[derive(Debug)]
pub struct ScanError {
    pub symbol: String,
    pub error: PatternError,
}

/// Analyse many instruments concurrently on one timeframe
pub fn scan_parallel<'a, T, I>(
    engine: &PatternEngine,
    instruments: I,
    timeframe: &str,
) -> (Vec<ScanResult>, Vec<ScanError>)
where
    T: OHLCV + Sync + 'a,
    I: IntoParallelIterator<Item = (&'a str, &'a [T])>,
{
    let results: Vec<_> = instruments
        .into_par_iter()
        .map(|(symbol, bars)| {
            if engine.config.validate_data {
                validate_bars(bars).map_err(|error| ScanError {
                    symbol: symbol.to_string(),
                    error,
                })?;
            }
            let Analysis { patterns, signal } = engine.analyze(bars, timeframe);
            Ok(ScanResult {
                symbol: symbol.to_string(),
                patterns,
                signal,
            })
        })
        .collect();

    let mut successes = Vec::new();
    let mut errors = Vec::new();

    for result in results {
        match result {
            Ok(r) => successes.push(r),
            Err(e) => errors.push(e),
        }
    }

    (successes, errors)
}

// ============================================================
// TESTS
// ============================================================
