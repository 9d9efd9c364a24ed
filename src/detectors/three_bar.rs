//! Three-bar candlestick detectors
//!
//! Morning/Evening Star and Three White Soldiers/Black Crows. Every detector
//! looks at the bars `index - 2 ..= index`.

use std::collections::HashMap;

use super::helpers::{
    self, require_below_one, require_nonzero_ratio, SOLDIER_BODY_RATIO, SOLDIER_FIRST_INDEX,
    STAR_BODY_RATIO,
};
use crate::{
    params::{get_ratio, ParamMeta, ParameterizedDetector},
    OHLCVExt, PatternDetector, PatternKind, PatternMatch, Ratio, Result, TradeLevels, OHLCV,
};

impl_with_defaults!(
    MorningStarDetector,
    EveningStarDetector,
    ThreeWhiteSoldiersDetector,
    ThreeBlackCrowsDetector,
);

/// The three bars ending at `index`
#[inline]
fn triple<T: OHLCV>(bars: &[T], index: usize) -> Option<(&T, &T, &T)> {
    if index < 2 {
        return None;
    }
    Some((bars.get(index - 2)?, bars.get(index - 1)?, bars.get(index)?))
}

// ============================================================
// STARS
// ============================================================

/// Middle body small against both outer bodies
#[inline]
fn is_star_body<T: OHLCV>(first: &T, middle: &T, last: &T, max_ratio: f64) -> bool {
    let star = middle.body_size();
    star < first.body_size() * max_ratio && star < last.body_size() * max_ratio
}

/// `min(0.7 + 0.2 * last_body / first_body, 0.95)`
#[inline]
fn star_confidence<T: OHLCV>(first: &T, last: &T) -> f64 {
    (0.7 + 0.2 * last.body_size() / first.body_size()).min(0.95)
}

/// Bearish bar, small star, bullish bar closing above the first body's midpoint
#[derive(Debug, Clone, Copy)]
pub struct MorningStarDetector {
    pub max_star_ratio: Ratio,
}

impl Default for MorningStarDetector {
    fn default() -> Self {
        Self {
            max_star_ratio: Ratio::new_const(STAR_BODY_RATIO),
        }
    }
}

impl PatternDetector for MorningStarDetector {
    fn name(&self) -> &'static str {
        "morning_star"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::MorningStar]
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let (first, middle, last) = triple(bars, index)?;

        if !(first.is_bearish()
            && last.is_bullish()
            && is_star_body(first, middle, last, self.max_star_ratio.get())
            && last.close() > first.body_midpoint())
        {
            return None;
        }

        let close = last.close();
        let low = first.low().min(middle.low()).min(last.low());

        Some(PatternMatch::new(
            PatternKind::MorningStar,
            star_confidence(first, last),
            index - 2,
            index,
            TradeLevels::new(close * 1.005, low * 0.97, close * 1.03, close * 1.06),
        ))
    }

    fn validate_config(&self) -> Result<()> {
        require_nonzero_ratio("morning_star max_star_ratio", self.max_star_ratio)
    }
}

/// Bullish bar, small star, bearish bar closing below the first body's midpoint
#[derive(Debug, Clone, Copy)]
pub struct EveningStarDetector {
    pub max_star_ratio: Ratio,
}

impl Default for EveningStarDetector {
    fn default() -> Self {
        Self {
            max_star_ratio: Ratio::new_const(STAR_BODY_RATIO),
        }
    }
}

impl PatternDetector for EveningStarDetector {
    fn name(&self) -> &'static str {
        "evening_star"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::EveningStar]
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let (first, middle, last) = triple(bars, index)?;

        if !(first.is_bullish()
            && last.is_bearish()
            && is_star_body(first, middle, last, self.max_star_ratio.get())
            && last.close() < first.body_midpoint())
        {
            return None;
        }

        let close = last.close();
        let high = first.high().max(middle.high()).max(last.high());

        Some(PatternMatch::new(
            PatternKind::EveningStar,
            star_confidence(first, last),
            index - 2,
            index,
            TradeLevels::new(close * 0.995, high * 1.03, close * 0.97, close * 0.94),
        ))
    }

    fn validate_config(&self) -> Result<()> {
        require_nonzero_ratio("evening_star max_star_ratio", self.max_star_ratio)
    }
}

// ============================================================
// SOLDIERS / CROWS
// ============================================================

/// Mean body-to-range of bars whose bodies all exceed `min_ratio` of their range
fn strong_bodies<T: OHLCV>(bars: [&T; 3], min_ratio: f64) -> Option<f64> {
    let mut total = 0.0;
    for bar in bars {
        let ratio = bar.body_ratio()?;
        if ratio <= min_ratio {
            return None;
        }
        total += ratio;
    }
    Some(total / 3.0)
}

/// Three bullish bars with rising closes and long bodies
#[derive(Debug, Clone, Copy)]
pub struct ThreeWhiteSoldiersDetector {
    pub min_body_ratio: Ratio,
}

impl Default for ThreeWhiteSoldiersDetector {
    fn default() -> Self {
        Self {
            min_body_ratio: Ratio::new_const(SOLDIER_BODY_RATIO),
        }
    }
}

impl PatternDetector for ThreeWhiteSoldiersDetector {
    fn name(&self) -> &'static str {
        "three_white_soldiers"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::ThreeWhiteSoldiers]
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn first_index(&self) -> usize {
        SOLDIER_FIRST_INDEX
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let (a, b, c) = triple(bars, index)?;

        if !(a.is_bullish() && b.is_bullish() && c.is_bullish()) {
            return None;
        }
        if !(a.close() < b.close() && b.close() < c.close()) {
            return None;
        }
        let mean_ratio = strong_bodies([a, b, c], self.min_body_ratio.get())?;

        let close = c.close();
        let low = a.low().min(b.low()).min(c.low());

        Some(PatternMatch::new(
            PatternKind::ThreeWhiteSoldiers,
            0.8 * mean_ratio,
            index - 2,
            index,
            TradeLevels::new(close * 1.003, low * 0.975, close * 1.04, close * 1.08),
        ))
    }

    fn validate_config(&self) -> Result<()> {
        require_below_one("three_white_soldiers min_body_ratio", self.min_body_ratio)
    }
}

/// Three bearish bars with falling closes and long bodies
#[derive(Debug, Clone, Copy)]
pub struct ThreeBlackCrowsDetector {
    pub min_body_ratio: Ratio,
}

impl Default for ThreeBlackCrowsDetector {
    fn default() -> Self {
        Self {
            min_body_ratio: Ratio::new_const(SOLDIER_BODY_RATIO),
        }
    }
}

impl PatternDetector for ThreeBlackCrowsDetector {
    fn name(&self) -> &'static str {
        "three_black_crows"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::ThreeBlackCrows]
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn first_index(&self) -> usize {
        SOLDIER_FIRST_INDEX
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let (a, b, c) = triple(bars, index)?;

        if !(a.is_bearish() && b.is_bearish() && c.is_bearish()) {
            return None;
        }
        if !(a.close() > b.close() && b.close() > c.close()) {
            return None;
        }
        let mean_ratio = strong_bodies([a, b, c], self.min_body_ratio.get())?;

        let close = c.close();
        let high = a.high().max(b.high()).max(c.high());

        Some(PatternMatch::new(
            PatternKind::ThreeBlackCrows,
            0.8 * mean_ratio,
            index - 2,
            index,
            TradeLevels::new(close * 0.997, high * 1.025, close * 0.96, close * 0.92),
        ))
    }

    fn validate_config(&self) -> Result<()> {
        require_below_one("three_black_crows min_body_ratio", self.min_body_ratio)
    }
}

// ============================================================
// PARAMETERS
// ============================================================

static STAR_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "max_star_ratio",
    helpers::STAR_BODY_RATIO,
    (0.3, 0.7, 0.1),
    "Middle body must stay under this fraction of both outer bodies",
)];

static SOLDIER_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "min_body_ratio",
    helpers::SOLDIER_BODY_RATIO,
    (0.5, 0.8, 0.1),
    "Every body must exceed this fraction of its range",
)];

impl ParameterizedDetector for MorningStarDetector {
    fn param_meta() -> &'static [ParamMeta] {
        STAR_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            max_star_ratio: get_ratio(params, "max_star_ratio", STAR_BODY_RATIO)?,
        })
    }

    fn detector_name() -> &'static str {
        "morning_star"
    }
}

impl ParameterizedDetector for EveningStarDetector {
    fn param_meta() -> &'static [ParamMeta] {
        STAR_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            max_star_ratio: get_ratio(params, "max_star_ratio", STAR_BODY_RATIO)?,
        })
    }

    fn detector_name() -> &'static str {
        "evening_star"
    }
}

impl ParameterizedDetector for ThreeWhiteSoldiersDetector {
    fn param_meta() -> &'static [ParamMeta] {
        SOLDIER_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            min_body_ratio: get_ratio(params, "min_body_ratio", SOLDIER_BODY_RATIO)?,
        })
    }

    fn detector_name() -> &'static str {
        "three_white_soldiers"
    }
}

impl ParameterizedDetector for ThreeBlackCrowsDetector {
    fn param_meta() -> &'static [ParamMeta] {
        SOLDIER_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            min_body_ratio: get_ratio(params, "min_body_ratio", SOLDIER_BODY_RATIO)?,
        })
    }

    fn detector_name() -> &'static str {
        "three_black_crows"
    }
}
