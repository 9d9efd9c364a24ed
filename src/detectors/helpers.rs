//! Shared thresholds and geometry helpers for the detector modules

use crate::{PatternError, Ratio, Result, OHLCV};

// ============================================================
// DEFAULT THRESHOLDS
// ============================================================

/// Doji: body below this fraction of the range
pub const DOJI_BODY_RATIO: f64 = 0.1;
/// Hammer / Shooting Star: body below this fraction of the range
pub const HAMMER_BODY_RATIO: f64 = 0.3;
/// Hammer / Shooting Star: long wick longer than this multiple of the body
pub const LONG_WICK_MULTIPLE: f64 = 2.0;
/// Hammer / Shooting Star: opposite wick shorter than this multiple of the body
pub const SHORT_WICK_MULTIPLE: f64 = 0.5;
/// Star: middle body below this fraction of both outer bodies
pub const STAR_BODY_RATIO: f64 = 0.5;
/// Soldiers / Crows: every body above this fraction of its range
pub const SOLDIER_BODY_RATIO: f64 = 0.6;

/// First trigger index scanned for candlestick shapes
pub const CANDLESTICK_FIRST_INDEX: usize = 2;
/// Soldiers / Crows: first trigger index scanned
pub const SOLDIER_FIRST_INDEX: usize = 4;

/// Chart geometry: slope magnitude treated as flat
pub const FLAT_SLOPE: f64 = 0.001;
/// Channel: maximum slope difference between the two boundaries
pub const PARALLEL_TOLERANCE: f64 = 0.0005;

// ============================================================
// GEOMETRY
// ============================================================

/// Least-squares slope of `values` against their index.
///
/// Returns 0 for fewer than two values or a degenerate denominator.
pub fn trend_slope(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xy, mut sum_x2) = (0.0, 0.0, 0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let x = i as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }
    let denominator = n * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denominator
}

/// Highs and lows of a window as separate series
pub fn highs_lows<T: OHLCV>(bars: &[T]) -> (Vec<f64>, Vec<f64>) {
    bars.iter().map(|b| (b.high(), b.low())).unzip()
}

/// Highest high of a window (`-inf` when empty)
#[inline]
pub fn highest_high<T: OHLCV>(bars: &[T]) -> f64 {
    bars.iter().map(OHLCV::high).fold(f64::NEG_INFINITY, f64::max)
}

/// Lowest low of a window (`+inf` when empty)
#[inline]
pub fn lowest_low<T: OHLCV>(bars: &[T]) -> f64 {
    bars.iter().map(OHLCV::low).fold(f64::INFINITY, f64::min)
}

// ============================================================
// CONFIG VALIDATION
// ============================================================

/// A zero ratio threshold can never match
pub(crate) fn require_nonzero_ratio(field: &'static str, value: Ratio) -> Result<()> {
    if value.get() <= 0.0 {
        return Err(PatternError::InvalidConfig(format!("{field} must be > 0")));
    }
    Ok(())
}

/// A lower bound of 1.0 on a body-to-range ratio can never be exceeded
pub(crate) fn require_below_one(field: &'static str, value: Ratio) -> Result<()> {
    if value.get() >= 1.0 {
        return Err(PatternError::InvalidConfig(format!("{field} must be < 1")));
    }
    Ok(())
}

pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(PatternError::InvalidConfig(format!(
            "{field} must be positive and finite, got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trend_slope_linear() {
        let values: Vec<f64> = (0..10).map(|i| 3.0 + 0.5 * i as f64).collect();
        assert!((trend_slope(&values) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_trend_slope_degenerate() {
        assert_eq!(trend_slope(&[]), 0.0);
        assert_eq!(trend_slope(&[42.0]), 0.0);
        assert_eq!(trend_slope(&[1.0, 1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_require_below_one() {
        assert!(require_below_one("x", Ratio::new_const(0.6)).is_ok());
        assert!(require_below_one("x", Ratio::new_const(0.0)).is_ok());
        assert!(require_below_one("x", Ratio::new_const(1.0)).is_err());
    }

    #[test]
    fn test_require_positive() {
        assert!(require_positive("x", 1.0).is_ok());
        assert!(require_positive("x", 0.0).is_err());
        assert!(require_positive("x", f64::NAN).is_err());
    }
}
