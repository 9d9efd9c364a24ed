//! Volatility indicators: Bollinger Bands, True Range, ATR

use serde::{Deserialize, Serialize};

use super::sma;
use crate::OHLCV;

/// One Bollinger Bands output row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBand {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bollinger Bands: SMA middle band, `k` population standard deviations either side.
pub fn bollinger(closes: &[f64], period: usize, k: f64) -> Vec<BollingerBand> {
    let means = sma(closes, period);

    closes
        .windows(period.max(1))
        .zip(means)
        .map(|(w, mean)| {
            let variance = w.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / period as f64;
            let half_width = k * variance.sqrt();
            BollingerBand {
                upper: mean + half_width,
                middle: mean,
                lower: mean - half_width,
            }
        })
        .collect()
}

/// True range of every bar after the first:
/// `max(high - low, |high - prev_close|, |low - prev_close|)`.
pub fn true_range<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    bars.windows(2)
        .map(|w| {
            let (prev, curr) = (&w[0], &w[1]);
            (curr.high() - curr.low())
                .max((curr.high() - prev.close()).abs())
                .max((curr.low() - prev.close()).abs())
        })
        .collect()
}

/// Average True Range: SMA of [`true_range`]. Needs `period + 1` bars.
pub fn atr<T: OHLCV>(bars: &[T], period: usize) -> Vec<f64> {
    if bars.len() < 2 {
        return Vec::new();
    }
    sma(&true_range(bars), period)
}
