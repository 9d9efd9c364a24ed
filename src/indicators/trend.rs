//! Average Directional Index
//!
//! Pipeline:
//!   1. `+DM` / `-DM` per bar pair. Only the larger move counts, and only if it is
//!      strictly positive; equal moves give zero for both.
//!   2. True range per bar pair.
//!   3. EMA smoothing of `+DM`, `-DM` and TR over `period`.
//!   4. `+DI = 100 * smoothed(+DM) / smoothed(TR)`, same for `-DI`.
//!   5. `DX = 100 * |+DI - -DI| / (+DI + -DI)`.
//!   6. `ADX` = mean of the last `period` DX values.

use serde::{Deserialize, Serialize};

use super::{ema, true_range};
use crate::OHLCV;

/// One ADX output row; every field lies in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdxPoint {
    pub adx: f64,
    pub plus_di: f64,
    pub minus_di: f64,
}

/// Directional movement `(+DM, -DM)` for every bar after the first.
pub fn directional_movement<T: OHLCV>(bars: &[T]) -> (Vec<f64>, Vec<f64>) {
    bars.windows(2)
        .map(|w| {
            let up = w[1].high() - w[0].high();
            let down = w[0].low() - w[1].low();
            let plus = if up > down && up > 0.0 { up } else { 0.0 };
            let minus = if down > up && down > 0.0 { down } else { 0.0 };
            (plus, minus)
        })
        .unzip()
}

/// Average Directional Index with its directional indicators.
///
/// A row is emitted once `period` DX values exist, so the output has
/// `n - 2 * period + 1` rows for `n` bars.
pub fn adx<T: OHLCV>(bars: &[T], period: usize) -> Vec<AdxPoint> {
    if period == 0 || bars.len() < period + 1 {
        return Vec::new();
    }

    let (plus_dm, minus_dm) = directional_movement(bars);
    let tr = true_range(bars);

    let smooth_plus = ema(&plus_dm, period);
    let smooth_minus = ema(&minus_dm, period);
    let smooth_tr = ema(&tr, period);

    let mut dx_values = Vec::with_capacity(smooth_tr.len());
    let mut out = Vec::new();

    for ((&p, &m), &t) in smooth_plus.iter().zip(&smooth_minus).zip(&smooth_tr) {
        let (plus_di, minus_di) = if t != 0.0 {
            (
                (p / t * 100.0).clamp(0.0, 100.0),
                (m / t * 100.0).clamp(0.0, 100.0),
            )
        } else {
            (0.0, 0.0)
        };

        let di_sum = plus_di + minus_di;
        let dx = if di_sum != 0.0 {
            ((plus_di - minus_di).abs() / di_sum * 100.0).min(100.0)
        } else {
            0.0
        };
        dx_values.push(dx);

        if dx_values.len() >= period {
            let recent = &dx_values[dx_values.len() - period..];
            let adx = recent.iter().sum::<f64>() / period as f64;
            out.push(AdxPoint {
                adx: adx.min(100.0),
                plus_di,
                minus_di,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    #[test]
    fn test_directional_movement_tie_is_zero() {
        let bars = vec![
            Bar::new(0, 10.0, 11.0, 9.0, 10.0, 1.0),
            // up move 1, down move 1
            Bar::new(1, 10.0, 12.0, 8.0, 10.0, 1.0),
        ];
        let (plus, minus) = directional_movement(&bars);
        assert_eq!(plus, vec![0.0]);
        assert_eq!(minus, vec![0.0]);
    }

    #[test]
    fn test_adx_steady_uptrend() {
        let bars: Vec<Bar> = (0..40)
            .map(|i| {
                let base = 100.0 + i as f64;
                Bar::new(i, base, base + 1.0, base - 0.5, base + 0.8, 1.0)
            })
            .collect();
        let out = adx(&bars, 14);
        assert_eq!(out.len(), 40 - 28 + 1);
        let last = out.last().unwrap();
        assert!(last.plus_di > last.minus_di);
        assert!(last.adx > 50.0);
    }

    #[test]
    fn test_adx_flat_market_is_zero() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| Bar::new(i, 10.0, 10.0, 10.0, 10.0, 1.0))
            .collect();
        let out = adx(&bars, 14);
        assert!(!out.is_empty());
        assert!(out.iter().all(|p| p.adx == 0.0 && p.plus_di == 0.0 && p.minus_di == 0.0));
    }
}
