//! Chart-geometry detectors: Double Top/Bottom, Triangles, Channels
//!
//! These detectors look at a sliding window around or behind the trigger index
//! and override [`PatternDetector::scan_bounds`] accordingly. Overlapping windows
//! that see the same structure each report it.

use std::{collections::HashMap, ops::Range};

use super::helpers::{
    highest_high, highs_lows, lowest_low, require_nonzero_ratio, require_positive, trend_slope,
    FLAT_SLOPE, PARALLEL_TOLERANCE,
};
use crate::{
    params::{get_factor, get_period, get_ratio, ParamMeta, ParameterizedDetector},
    PatternDetector, PatternKind, PatternMatch, Period, Ratio, Result, TradeLevels, OHLCV,
};

impl_with_defaults!(
    DoubleTopDetector,
    DoubleBottomDetector,
    TriangleDetector,
    ChannelDetector,
);

const DOUBLE_WINDOW: usize = 20;
const DOUBLE_MIN_SEPARATION: usize = 10;
const DOUBLE_MIN_DEPTH: f64 = 0.02;
const DOUBLE_CONFIDENCE: f64 = 0.7;

const TRIANGLE_WINDOW: usize = 30;
/// Bars required after a triangle trigger index
const TRIANGLE_TRAILING_BARS: usize = 10;
const TRIANGLE_CONFIDENCE: f64 = 0.65;

const CHANNEL_WINDOW: usize = 25;
/// Bars required after a channel trigger index
const CHANNEL_TRAILING_BARS: usize = 5;
const CHANNEL_CONFIDENCE: f64 = 0.6;

/// `window .. len - trailing`, empty when the input is too short
#[inline]
fn trailing_bounds(window: usize, trailing: usize, len: usize) -> Range<usize> {
    let end = len.saturating_sub(trailing);
    window.min(end)..end
}

// ============================================================
// DOUBLE TOP / BOTTOM
// ============================================================

/// First and last positions (absolute) where `values` hits `extreme` exactly
fn extreme_span(values: impl Iterator<Item = f64>, extreme: f64, offset: usize) -> Option<(usize, usize)> {
    let mut first = None;
    let mut last = None;
    for (i, v) in values.enumerate() {
        if v == extreme {
            first.get_or_insert(offset + i);
            last = Some(offset + i);
        }
    }
    Some((first?, last?))
}

/// Two equal highs with a valley between them, centred on the trigger index
#[derive(Debug, Clone, Copy)]
pub struct DoubleTopDetector {
    /// Bars on each side of the trigger index
    pub window: Period,
    pub min_peak_separation: Period,
    /// Minimum `(resistance - support) / resistance`
    pub min_depth: Ratio,
}

impl Default for DoubleTopDetector {
    fn default() -> Self {
        Self {
            window: Period::new_const(DOUBLE_WINDOW),
            min_peak_separation: Period::new_const(DOUBLE_MIN_SEPARATION),
            min_depth: Ratio::new_const(DOUBLE_MIN_DEPTH),
        }
    }
}

impl PatternDetector for DoubleTopDetector {
    fn name(&self) -> &'static str {
        "double_top"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::DoubleTop]
    }

    fn min_bars(&self) -> usize {
        2 * self.window.get() + 1
    }

    fn scan_bounds(&self, len: usize) -> Range<usize> {
        let w = self.window.get();
        trailing_bounds(w, w, len)
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let w = self.window.get();
        if !self.scan_bounds(bars.len()).contains(&index) {
            return None;
        }
        let start = index - w;
        let neighbourhood = &bars[start..=index + w];

        let resistance = highest_high(neighbourhood);
        let (first, second) =
            extreme_span(neighbourhood.iter().map(OHLCV::high), resistance, start)?;
        if second - first < self.min_peak_separation.get() || resistance <= 0.0 {
            return None;
        }

        let support = lowest_low(&bars[first..=second]);
        let height = resistance - support;
        if height / resistance <= self.min_depth.get() {
            return None;
        }

        Some(PatternMatch::new(
            PatternKind::DoubleTop,
            DOUBLE_CONFIDENCE,
            first,
            second,
            TradeLevels::new(
                support,
                resistance * 1.01,
                support - height * 0.5,
                support - height,
            ),
        ))
    }

    fn validate_config(&self) -> Result<()> {
        require_nonzero_ratio("double_top min_depth", self.min_depth)
    }
}

/// Two equal lows with a ridge between them, centred on the trigger index
#[derive(Debug, Clone, Copy)]
pub struct DoubleBottomDetector {
    pub window: Period,
    pub min_peak_separation: Period,
    /// Minimum `(ridge - trough) / trough`
    pub min_depth: Ratio,
}

impl Default for DoubleBottomDetector {
    fn default() -> Self {
        Self {
            window: Period::new_const(DOUBLE_WINDOW),
            min_peak_separation: Period::new_const(DOUBLE_MIN_SEPARATION),
            min_depth: Ratio::new_const(DOUBLE_MIN_DEPTH),
        }
    }
}

impl PatternDetector for DoubleBottomDetector {
    fn name(&self) -> &'static str {
        "double_bottom"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::DoubleBottom]
    }

    fn min_bars(&self) -> usize {
        2 * self.window.get() + 1
    }

    fn scan_bounds(&self, len: usize) -> Range<usize> {
        let w = self.window.get();
        trailing_bounds(w, w, len)
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        let w = self.window.get();
        if !self.scan_bounds(bars.len()).contains(&index) {
            return None;
        }
        let start = index - w;
        let neighbourhood = &bars[start..=index + w];

        let trough = lowest_low(neighbourhood);
        let (first, second) =
            extreme_span(neighbourhood.iter().map(OHLCV::low), trough, start)?;
        if second - first < self.min_peak_separation.get() || trough <= 0.0 {
            return None;
        }

        let ridge = highest_high(&bars[first..=second]);
        let height = ridge - trough;
        if height / trough <= self.min_depth.get() {
            return None;
        }

        Some(PatternMatch::new(
            PatternKind::DoubleBottom,
            DOUBLE_CONFIDENCE,
            first,
            second,
            TradeLevels::new(ridge, trough * 0.99, ridge + height * 0.5, ridge + height),
        ))
    }

    fn validate_config(&self) -> Result<()> {
        require_nonzero_ratio("double_bottom min_depth", self.min_depth)
    }
}

// ============================================================
// TRIANGLES
// ============================================================

/// Flat boundary against a converging opposite boundary over the trailing window.
/// Emits Ascending (flat highs, rising lows) and Descending (falling highs, flat lows).
#[derive(Debug, Clone, Copy)]
pub struct TriangleDetector {
    /// Bars before the trigger index fitted by the trend lines
    pub window: Period,
    /// Slope magnitude treated as flat
    pub flat_slope: f64,
}

impl Default for TriangleDetector {
    fn default() -> Self {
        Self {
            window: Period::new_const(TRIANGLE_WINDOW),
            flat_slope: FLAT_SLOPE,
        }
    }
}

impl PatternDetector for TriangleDetector {
    fn name(&self) -> &'static str {
        "triangle"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::AscendingTriangle, PatternKind::DescendingTriangle]
    }

    fn min_bars(&self) -> usize {
        self.window.get() + TRIANGLE_TRAILING_BARS + 1
    }

    fn scan_bounds(&self, len: usize) -> Range<usize> {
        trailing_bounds(self.window.get(), TRIANGLE_TRAILING_BARS, len)
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        if !self.scan_bounds(bars.len()).contains(&index) {
            return None;
        }
        let start = index - self.window.get();
        let subset = &bars[start..index];
        let (highs, lows) = highs_lows(subset);
        let high_slope = trend_slope(&highs);
        let low_slope = trend_slope(&lows);
        let close = bars[index].close();
        let flat = self.flat_slope;

        let (kind, levels) = if high_slope.abs() < flat && low_slope > flat {
            (
                PatternKind::AscendingTriangle,
                TradeLevels::new(
                    highest_high(subset),
                    lowest_low(subset),
                    close * 1.03,
                    close * 1.06,
                ),
            )
        } else if high_slope < -flat && low_slope.abs() < flat {
            (
                PatternKind::DescendingTriangle,
                TradeLevels::new(
                    lowest_low(subset),
                    highest_high(subset),
                    close * 0.97,
                    close * 0.94,
                ),
            )
        } else {
            return None;
        };

        Some(PatternMatch::new(kind, TRIANGLE_CONFIDENCE, start, index, levels))
    }

    fn validate_config(&self) -> Result<()> {
        require_positive("triangle flat_slope", self.flat_slope)
    }
}

// ============================================================
// CHANNELS
// ============================================================

/// Parallel, clearly sloped highs and lows over the trailing window
#[derive(Debug, Clone, Copy)]
pub struct ChannelDetector {
    pub window: Period,
    /// Maximum `|high_slope - low_slope|`
    pub parallel_tolerance: f64,
    /// Minimum `|high_slope|`
    pub min_slope: f64,
}

impl Default for ChannelDetector {
    fn default() -> Self {
        Self {
            window: Period::new_const(CHANNEL_WINDOW),
            parallel_tolerance: PARALLEL_TOLERANCE,
            min_slope: FLAT_SLOPE,
        }
    }
}

impl PatternDetector for ChannelDetector {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn kinds(&self) -> &'static [PatternKind] {
        &[PatternKind::RisingChannel, PatternKind::FallingChannel]
    }

    fn min_bars(&self) -> usize {
        self.window.get() + CHANNEL_TRAILING_BARS + 1
    }

    fn scan_bounds(&self, len: usize) -> Range<usize> {
        trailing_bounds(self.window.get(), CHANNEL_TRAILING_BARS, len)
    }

    fn detect<T: OHLCV>(&self, bars: &[T], index: usize) -> Option<PatternMatch> {
        if !self.scan_bounds(bars.len()).contains(&index) {
            return None;
        }
        let start = index - self.window.get();
        let subset = &bars[start..index];
        let (highs, lows) = highs_lows(subset);
        let high_slope = trend_slope(&highs);
        let low_slope = trend_slope(&lows);

        if (high_slope - low_slope).abs() >= self.parallel_tolerance
            || high_slope.abs() <= self.min_slope
        {
            return None;
        }

        let close = bars[index].close();
        let (kind, levels) = if high_slope > 0.0 {
            (
                PatternKind::RisingChannel,
                TradeLevels::new(close, lowest_low(subset), close * 1.02, close * 1.04),
            )
        } else {
            (
                PatternKind::FallingChannel,
                TradeLevels::new(close, highest_high(subset), close * 0.98, close * 0.96),
            )
        };

        Some(PatternMatch::new(kind, CHANNEL_CONFIDENCE, start, index, levels))
    }

    fn validate_config(&self) -> Result<()> {
        require_positive("channel parallel_tolerance", self.parallel_tolerance)?;
        require_positive("channel min_slope", self.min_slope)
    }
}

// ============================================================
// PARAMETERS
// ============================================================

static DOUBLE_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "window",
        DOUBLE_WINDOW as f64,
        (10.0, 30.0, 5.0),
        "Bars on each side of the trigger index",
    ),
    ParamMeta::period(
        "min_peak_separation",
        DOUBLE_MIN_SEPARATION as f64,
        (5.0, 20.0, 5.0),
        "Minimum bars between the two extremes",
    ),
    ParamMeta::ratio(
        "min_depth",
        DOUBLE_MIN_DEPTH,
        (0.01, 0.05, 0.01),
        "Minimum retracement between the extremes",
    ),
];

static TRIANGLE_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "window",
        TRIANGLE_WINDOW as f64,
        (20.0, 40.0, 5.0),
        "Bars fitted by the trend lines",
    ),
    ParamMeta::factor(
        "flat_slope",
        FLAT_SLOPE,
        (0.0005, 0.002, 0.0005),
        "Slope magnitude treated as flat",
    ),
];

static CHANNEL_PARAMS: &[ParamMeta] = &[
    ParamMeta::period(
        "window",
        CHANNEL_WINDOW as f64,
        (15.0, 35.0, 5.0),
        "Bars fitted by the trend lines",
    ),
    ParamMeta::factor(
        "parallel_tolerance",
        PARALLEL_TOLERANCE,
        (0.00025, 0.001, 0.00025),
        "Maximum slope difference between boundaries",
    ),
    ParamMeta::factor(
        "min_slope",
        FLAT_SLOPE,
        (0.0005, 0.002, 0.0005),
        "Minimum boundary slope",
    ),
];

impl ParameterizedDetector for DoubleTopDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOUBLE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            window: get_period(params, "window", DOUBLE_WINDOW)?,
            min_peak_separation: get_period(params, "min_peak_separation", DOUBLE_MIN_SEPARATION)?,
            min_depth: get_ratio(params, "min_depth", DOUBLE_MIN_DEPTH)?,
        })
    }

    fn detector_name() -> &'static str {
        "double_top"
    }
}

impl ParameterizedDetector for DoubleBottomDetector {
    fn param_meta() -> &'static [ParamMeta] {
        DOUBLE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            window: get_period(params, "window", DOUBLE_WINDOW)?,
            min_peak_separation: get_period(params, "min_peak_separation", DOUBLE_MIN_SEPARATION)?,
            min_depth: get_ratio(params, "min_depth", DOUBLE_MIN_DEPTH)?,
        })
    }

    fn detector_name() -> &'static str {
        "double_bottom"
    }
}

impl ParameterizedDetector for TriangleDetector {
    fn param_meta() -> &'static [ParamMeta] {
        TRIANGLE_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            window: get_period(params, "window", TRIANGLE_WINDOW)?,
            flat_slope: get_factor(params, "flat_slope", FLAT_SLOPE)?,
        })
    }

    fn detector_name() -> &'static str {
        "triangle"
    }
}

impl ParameterizedDetector for ChannelDetector {
    fn param_meta() -> &'static [ParamMeta] {
        CHANNEL_PARAMS
    }

    fn with_params(params: &HashMap<&str, f64>) -> Result<Self> {
        Ok(Self {
            window: get_period(params, "window", CHANNEL_WINDOW)?,
            parallel_tolerance: get_factor(params, "parallel_tolerance", PARALLEL_TOLERANCE)?,
            min_slope: get_factor(params, "min_slope", FLAT_SLOPE)?,
        })
    }

    fn detector_name() -> &'static str {
        "channel"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    #[test]
    fn test_trailing_bounds_short_input() {
        assert!(trailing_bounds(30, 10, 35).is_empty());
        assert_eq!(trailing_bounds(30, 10, 45), 30..35);
        assert!(trailing_bounds(20, 20, 5).is_empty());
    }

    #[test]
    fn test_extreme_span() {
        let values = [1.0, 3.0, 2.0, 3.0, 0.5];
        assert_eq!(extreme_span(values.into_iter(), 3.0, 10), Some((11, 13)));
        assert_eq!(extreme_span(values.into_iter(), 9.0, 0), None);
    }

    #[test]
    fn test_detect_outside_bounds_is_none() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| Bar::new(i, 10.0, 11.0, 9.0, 10.0, 1.0))
            .collect();
        assert!(DoubleTopDetector::default().detect(&bars, 5).is_none());
        assert!(TriangleDetector::default().detect(&bars, 29).is_none());
        assert!(ChannelDetector::default().detect(&bars, 26).is_none());
    }
}
