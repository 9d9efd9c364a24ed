//! Single-bar candlestick detectors: Doji, Hammer, Shooting Star

use std::collections::HashMap;

use super::helpers::{
    self, require_nonzero_ratio, require_positive, HAMMER_BODY_RATIO, LONG_WICK_MULTIPLE,
    SHORT_WICK_MULTIPLE,
};
use crate::{
    params::{get_factor, get_ratio, ParamMeta, ParameterizedDetector},
    OHLCVExt, PatternDetector, PatternKind, PatternMatch, Ratio, Result, TradeLevels, OHLCV,
};

impl_with_defaults!(DojiDetector, HammerDetector, ShootingStarDetector);

// ============================================================
// DOJI
// ============================================================

/// Indecision bar: tiny body relative to its range
#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub max_body_ratio: Ratio,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            max_body_ratio: Ratio::new_const(helpers::DOJI_BODY_RATIO),
        }
    }
}

impl PatternDetector for DojiDetector {
    fn name(&self) -> &'static str {
        "doji"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::Doji]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let body = bar.body_size();
        let range = bar.total_range();

        if range <= 0.0 || body >= range * self.max_body_ratio.get() {
            return None;
        }

        let close = bar.close();
        // Direction stays neutral; the bar's own colour only orients the levels.
        let levels = if bar.is_bullish() {
            TradeLevels::new(close, bar.low() * 0.98, close * 1.015, close * 1.03)
        } else {
            TradeLevels::new(close, bar.high() * 1.02, close * 0.985, close * 0.97)
        };

        Some(PatternMatch::new(
            PatternKind::Doji,
            1.0 - body / range,
            index,
            index,
            levels,
        ))
    }

    fn validate_config(&self) -> Result<()> {
        require_nonzero_ratio("doji max_body_ratio", self.max_body_ratio)
    }
}

// ============================================================
// HAMMER FAMILY
// ============================================================

/// Which wick must be long
#[derive(Clone, Copy)]
enum LongWick {
    Lower,
    Upper,
}

/// Shared thresholds of the Hammer and Shooting Star shapes
#[derive(Debug, Clone, Copy)]
struct WickShape {
    max_body_ratio: Ratio,
    min_wick_multiple: f64,
    max_opposite_wick_multiple: f64,
}

impl WickShape {
    /// Confidence `0.8 * long_wick / range + 0.2` when the bar matches
    fn score<T: OHLCV>(&self, bar: &T, wick: LongWick) -> Option<f64> {
        let body = bar.body_size();
        let range = bar.total_range();
        let (long, short) = match wick {
            LongWick::Lower => (bar.lower_wick(), bar.upper_wick()),
            LongWick::Upper => (bar.upper_wick(), bar.lower_wick()),
        };

        let matched = range > 0.0
            && body < range * self.max_body_ratio.get()
            && long > body * self.min_wick_multiple
            && short < body * self.max_opposite_wick_multiple;

        matched.then(|| 0.8 * long / range + 0.2)
    }

    fn validate(&self, name: &'static str) -> Result<()> {
        require_nonzero_ratio(name, self.max_body_ratio)?;
        require_positive(name, self.min_wick_multiple)?;
        require_positive(name, self.max_opposite_wick_multiple)
    }
}

/// Bullish reversal: small body on top of a long lower wick
#[derive(Debug, Clone, Copy)]
pub struct HammerDetector {
    pub max_body_ratio: Ratio,
    pub min_wick_multiple: f64,
    pub max_opposite_wick_multiple: f64,
}

impl Default for HammerDetector {
    fn default() -> Self {
        Self {
            max_body_ratio: Ratio::new_const(HAMMER_BODY_RATIO),
            min_wick_multiple: LONG_WICK_MULTIPLE,
            max_opposite_wick_multiple: SHORT_WICK_MULTIPLE,
        }
    }
}

impl HammerDetector {
    fn shape(&self) -> WickShape {
        WickShape {
            max_body_ratio: self.max_body_ratio,
            min_wick_multiple: self.min_wick_multiple,
            max_opposite_wick_multiple: self.max_opposite_wick_multiple,
        }
    }
}

impl PatternDetector for HammerDetector {
    fn name(&self) -> &'static str {
        "hammer"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::Hammer]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let confidence = self.shape().score(bar, LongWick::Lower)?;
        let close = bar.close();

        Some(PatternMatch::new(
            PatternKind::Hammer,
            confidence,
            index,
            index,
            TradeLevels::new(bar.high() * 1.001, bar.low() * 0.995, close * 1.02, close * 1.04),
        ))
    }

    fn validate_config(&self) -> Result<()> {
        self.shape().validate("hammer")
    }
}

/// Bearish reversal: small body under a long upper wick
#[derive(Debug, Clone, Copy)]
pub struct ShootingStarDetector {
    pub max_body_ratio: Ratio,
    pub min_wick_multiple: f64,
    pub max_opposite_wick_multiple: f64,
}

impl Default for ShootingStarDetector {
    fn default() -> Self {
        Self {
            max_body_ratio: Ratio::new_const(HAMMER_BODY_RATIO),
            min_wick_multiple: LONG_WICK_MULTIPLE,
            max_opposite_wick_multiple: SHORT_WICK_MULTIPLE,
        }
    }
}

impl ShootingStarDetector {
    fn shape(&self) -> WickShape {
        WickShape {
            max_body_ratio: self.max_body_ratio,
            min_wick_multiple: self.min_wick_multiple,
            max_opposite_wick_multiple: self.max_opposite_wick_multiple,
        }
    }
}

impl PatternDetector for ShootingStarDetector {
    fn name(&self) -> &'static str {
        "shooting_star"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::ShootingStar]
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let confidence = self.shape().score(bar, LongWick::Upper)?;
        let close = bar.close();

        Some(PatternMatch::new(
            PatternKind::ShootingStar,
            confidence,
            index,
            index,
            TradeLevels::new(bar.low() * 0.999, bar.high() * 1.005, close * 0.98, close * 0.96),
        ))
    }

    fn validate_config(&self) -> Result<()> {
        self.shape().validate("shooting_star")
    }
}

// ============================================================
// PARAMETERS
// ============================================================

static DOJI_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "max_body_ratio",
    helpers::DOJI_BODY_RATIO,
    (0.05, 0.2, 0.05),
    "Maximum body as fraction of range",
)];

static WICK_PARAMS: &[ParamMeta] = &[
    ParamMeta::ratio(
        "max_body_ratio",
        HAMMER_BODY_RATIO,
        (0.2, 0.4, 0.05),
        "Maximum body as fraction of range",
    ),
    ParamMeta::factor(
        "min_wick_multiple",
        LONG_WICK_MULTIPLE,
        (1.5, 3.0, 0.5),
        "Long wick must exceed this multiple of the body",
    ),
    ParamMeta::factor(
        "max_opposite_wick_multiple",
        SHORT_WICK_MULTIPLE,
        (0.25, 1.0, 0.25),
        "Opposite wick must stay under this multiple of the body",
    ),
];

impl ParameterizedDetector for DojiDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOJI_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            max_body_ratio: get_ratio(params, "max_body_ratio", helpers::DOJI_BODY_RATIO)?,
        })
    }

    fn detector_name() -> &'static str {
        "doji"
    }
}

impl ParameterizedDetector for HammerDetector {
    fn param_meta() -> &'static [ParamMeta] {
        WICK_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            max_body_ratio: get_ratio(params, "max_body_ratio", HAMMER_BODY_RATIO)?,
            min_wick_multiple: get_factor(params, "min_wick_multiple", LONG_WICK_MULTIPLE)?,
            max_opposite_wick_multiple: get_factor(
                params,
                "max_opposite_wick_multiple",
                SHORT_WICK_MULTIPLE,
            )?,
        })
    }

    fn detector_name() -> &'static str {
        "hammer"
    }
}

impl ParameterizedDetector for ShootingStarDetector {
    fn param_meta() -> &'static [ParamMeta] {
        WICK_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            max_body_ratio: get_ratio(params, "max_body_ratio", HAMMER_BODY_RATIO)?,
            min_wick_multiple: get_factor(params, "min_wick_multiple", LONG_WICK_MULTIPLE)?,
            max_opposite_wick_multiple: get_factor(
                params,
                "max_opposite_wick_multiple",
                SHORT_WICK_MULTIPLE,
            )?,
        })
    }

    fn detector_name() -> &'static str {
        "shooting_star"
    }
}
