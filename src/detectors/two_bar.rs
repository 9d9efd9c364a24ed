//! Two-bar candlestick detectors: Bullish and Bearish Engulfing

use std::collections::HashMap;

use super::helpers::require_nonzero_ratio;
use crate::{
    params::{get_ratio, ParamMeta, ParameterizedDetector},
    OHLCVExt, PatternDetector, PatternKind, PatternMatch, Ratio, Result, TradeLevels, OHLCV,
};

impl_with_defaults!(EngulfingDetector);

/// Engulfing confidence never exceeds this by default
const ENGULFING_CONFIDENCE_CAP: f64 = 0.9;

// ============================================================
// ENGULFING
// ============================================================

/// Second body opens beyond the first close and closes beyond the first open,
/// against the first bar's colour. Emits both directions.
#[derive(Debug, Clone, Copy)]
pub struct EngulfingDetector {
    /// Cap on `0.5 * body / prior_body`
    pub max_confidence: Ratio,
}

impl Default for EngulfingDetector {
    fn default() -> Self {
        Self {
            max_confidence: Ratio::new_const(ENGULFING_CONFIDENCE_CAP),
        }
    }
}

impl PatternDetector for EngulfingDetector {
    fn name(&self) -> &'static str {
        "engulfing"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::BullishEngulfing, PatternKind::BearishEngulfing]
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        if index < 1 {
            return None;
        }
        let prev = bars.get(index - 1)?;
        let curr = bars.get(index)?;

        let bullish = prev.is_bearish()
            && curr.is_bullish()
            && curr.open() < prev.close()
            && curr.close() > prev.open();
        let bearish = prev.is_bullish()
            && curr.is_bearish()
            && curr.open() > prev.close()
            && curr.close() < prev.open();

        if !bullish && !bearish {
            return None;
        }

        // The prior bar has a strict colour, so its body is non-zero.
        let confidence =
            (0.5 * curr.body_size() / prev.body_size()).min(self.max_confidence.get());
        let close = curr.close();

        let (kind, levels) = if bullish {
            (
                PatternKind::BullishEngulfing,
                TradeLevels::new(
                    close * 1.002,
                    prev.low().min(curr.low()) * 0.98,
                    close * 1.025,
                    close * 1.05,
                ),
            )
        } else {
            (
                PatternKind::BearishEngulfing,
                TradeLevels::new(
                    close * 0.998,
                    prev.high().max(curr.high()) * 1.02,
                    close * 0.975,
                    close * 0.95,
                ),
            )
        };

        Some(PatternMatch::new(kind, confidence, index - 1, index, levels))
    }

    fn validate_config(&self) -> Result<()> {
        require_nonzero_ratio("engulfing max_confidence", self.max_confidence)
    }
}

// ============================================================
// PARAMETERS
// ============================================================

static ENGULFING_PARAMS: &[ParamMeta] = &[ParamMeta::ratio(
    "max_confidence",
    ENGULFING_CONFIDENCE_CAP,
    (0.7, 1.0, 0.1),
    "Upper bound on engulfing confidence",
)];

impl ParameterizedDetector for EngulfingDetector {
    fn param_meta() -> &'static [ParamMeta] {
        ENGULFING_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            max_confidence: get_ratio(params, "max_confidence", ENGULFING_CONFIDENCE_CAP)?,
        })
    }

    fn detector_name() -> &'static str {
        "engulfing"
    }
}
