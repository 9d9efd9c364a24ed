//! Volume indicators: On-Balance Volume and VWAP

use crate::{OHLCVExt, OHLCV};

/// On-Balance Volume. First value is always 0; same length as the input.
pub fn obv<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    let mut running = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        if i > 0 {
            let prev_close = bars[i - 1].close();
            if bar.close() > prev_close {
                running += bar.volume();
            } else if bar.close() < prev_close {
                running -= bar.volume();
            }
        }
        out.push(running);
    }
    out
}

/// Cumulative volume-weighted average of the typical price.
///
/// Falls back to the bar's own typical price while cumulative volume is zero.
pub fn vwap<T: OHLCV>(bars: &[T]) -> Vec<f64> {
    let mut weighted = 0.0;
    let mut total_volume = 0.0;

    bars.iter()
        .map(|bar| {
            let typical = bar.typical_price();
            weighted += typical * bar.volume();
            total_volume += bar.volume();
            if total_volume > 0.0 {
                weighted / total_volume
            } else {
                typical
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Bar;

    #[test]
    fn test_obv_accumulates_by_close_direction() {
        let bars = vec![
            Bar::new(0, 10.0, 11.0, 9.0, 10.0, 100.0),
            Bar::new(1, 10.0, 12.0, 9.0, 11.0, 50.0),
            Bar::new(2, 11.0, 12.0, 9.0, 11.0, 70.0),
            Bar::new(3, 11.0, 12.0, 8.0, 9.0, 30.0),
        ];
        assert_eq!(obv(&bars), vec![0.0, 50.0, 50.0, 20.0]);
    }

    #[test]
    fn test_vwap_zero_volume_falls_back_to_typical() {
        let bars = vec![
            Bar::new(0, 10.0, 12.0, 9.0, 9.0, 0.0),
            Bar::new(1, 10.0, 13.0, 10.0, 10.0, 0.0),
        ];
        assert_eq!(vwap(&bars), vec![10.0, 11.0]);
    }

    #[test]
    fn test_vwap_weights_by_volume() {
        let bars = vec![
            Bar::new(0, 10.0, 10.0, 10.0, 10.0, 1.0),
            Bar::new(1, 20.0, 20.0, 20.0, 20.0, 3.0),
        ];
        assert_eq!(vwap(&bars), vec![10.0, 17.5]);
    }

    #[test]
    fn test_empty_input() {
        let bars: Vec<Bar> = Vec::new();
        assert!(obv(&bars).is_empty());
        assert!(vwap(&bars).is_empty());
    }
}
