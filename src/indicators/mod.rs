//! Technical indicators over closes or OHLCV bars
//!
//! Every function is pure. Outputs are aligned to the *last* bar of each lookback
//! window, so `output[j]` belongs to input index `j + (n - output.len())`.
//! Input that is too short for the requested period, or a zero period, yields an
//! empty vector rather than an error.
//!
//! # Example
//!
//! ```rust
//! use chartpulse::indicators::{ema, sma};
//!
//! let closes = [44.0, 44.3, 44.1, 44.2, 44.5, 43.9];
//! assert_eq!(sma(&closes, 5).len(), 2);
//! assert_eq!(ema(&closes, 5).len(), 2);
//! assert!(sma(&closes, 10).is_empty());
//! ```

pub mod momentum;
pub mod moving_average;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use momentum::*;
pub use moving_average::*;
pub use trend::*;
pub use volatility::*;
pub use volume::*;

use crate::{OHLCVExt, OHLCV};

/// Highest high and lowest low of a window. Caller guarantees `window` is non-empty.
#[inline]
pub(crate) fn high_low<T: OHLCV>(window: &[T]) -> (f64, f64) {
    window.iter().fold(
        (f64::NEG_INFINITY, f64::INFINITY),
        |(hh, ll), bar| (hh.max(bar.high()), ll.min(bar.low())),
    )
}

/// Typical price `(high + low + close) / 3` of every bar.
pub fn typical_prices<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter().map(|b| b.typical_price()).collect()
}

/// Closing prices of every bar.
pub fn closes<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.iter().map(|b| b.close()).collect()
}
