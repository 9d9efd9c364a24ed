//! Momentum oscillators: RSI, MACD, Stochastic, Williams %R, CCI

use serde::{Deserialize, Serialize};

use super::{ema, high_low, sma, typical_prices};
use crate::OHLCV;

// ============================================================
// RSI
// ============================================================

/// Relative Strength Index from EMA-smoothed gains and losses.
///
/// Needs `period + 1` closes; output length is `n - period`. When the smoothed loss
/// is exactly zero the RSI saturates at 100.
pub fn rsi(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period + 1 {
        return Vec::new();
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = closes
        .windows(2)
        .map(|w| {
            let change = w[1] - w[0];
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let avg_gains = ema(&gains, period);
    let avg_losses = ema(&losses, period);

    avg_gains
        .iter()
        .zip(&avg_losses)
        .map(|(&gain, &loss)| {
            if loss == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + gain / loss)
            }
        })
        .collect()
}

// ============================================================
// MACD
// ============================================================

/// One MACD output row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacdPoint {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// MACD line, signal line and histogram.
///
/// The fast and slow EMAs are aligned on their common tail (the shorter series),
/// so the output belongs to the last `len` closes.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Vec<MacdPoint> {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    if fast_ema.is_empty() || slow_ema.is_empty() {
        return Vec::new();
    }

    let common = fast_ema.len().min(slow_ema.len());
    let fast_tail = &fast_ema[fast_ema.len() - common..];
    let slow_tail = &slow_ema[slow_ema.len() - common..];

    let macd_line: Vec<f64> = fast_tail
        .iter()
        .zip(slow_tail)
        .map(|(f, s)| f - s)
        .collect();

    let signal_line = ema(&macd_line, signal);
    let offset = macd_line.len() - signal_line.len();

    signal_line
        .iter()
        .enumerate()
        .map(|(i, &signal)| {
            let macd = macd_line[offset + i];
            MacdPoint {
                macd,
                signal,
                histogram: macd - signal,
            }
        })
        .collect()
}

// ============================================================
// STOCHASTIC
// ============================================================

/// One Stochastic output row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StochasticPoint {
    pub k: f64,
    pub d: f64,
}

/// Raw %K for every full window; 50 when the window has no range.
pub fn stochastic_k<T: OHLCV>(bars: &[T], k_period: usize) -> Vec<f64> {
    if k_period == 0 || bars.len() < k_period {
        return Vec::new();
    }

    bars.windows(k_period)
        .map(|w| {
            let (hh, ll) = high_low(w);
            let close = w[w.len() - 1].close();
            if hh != ll {
                ((close - ll) / (hh - ll) * 100.0).clamp(0.0, 100.0)
            } else {
                50.0
            }
        })
        .collect()
}

/// Stochastic oscillator: %K with its `d_period` SMA (%D).
///
/// Rows are emitted only where %D exists.
pub fn stochastic<T: OHLCV>(bars: &[T], k_period: usize, d_period: usize) -> Vec<StochasticPoint> {
    let k_values = stochastic_k(bars, k_period);
    let d_values = sma(&k_values, d_period);
    let offset = k_values.len() - d_values.len();

    d_values
        .iter()
        .enumerate()
        .map(|(i, &d)| StochasticPoint {
            k: k_values[offset + i],
            d,
        })
        .collect()
}

// ============================================================
// WILLIAMS %R
// ============================================================

/// Williams %R in `[-100, 0]`; -50 when the window has no range.
pub fn williams_r<T: OHLCV>(bars: &[T], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    bars.windows(period)
        .map(|w| {
            let (hh, ll) = high_low(w);
            let close = w[w.len() - 1].close();
            if hh != ll {
                ((hh - close) / (hh - ll) * -100.0).clamp(-100.0, 0.0)
            } else {
                -50.0
            }
        })
        .collect()
}

// ============================================================
// CCI
// ============================================================

/// Commodity Channel Index; 0 when the mean absolute deviation is zero.
pub fn cci<T: OHLCV>(bars: &[T], period: usize) -> Vec<f64> {
    if period == 0 || bars.len() < period {
        return Vec::new();
    }

    let typical = typical_prices(bars);
    let means = sma(&typical, period);

    typical
        .windows(period)
        .zip(means)
        .map(|(w, mean)| {
            let current = w[w.len() - 1];
            let mean_dev = w.iter().map(|tp| (tp - mean).abs()).sum::<f64>() / period as f64;
            if mean_dev != 0.0 {
                (current - mean) / (0.015 * mean_dev)
            } else {
                0.0
            }
        })
        .collect()
}
