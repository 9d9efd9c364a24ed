//! Simple and exponential moving averages

/// Simple moving average. Output length is `n - period + 1`.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    // Sum each window directly: bounded inputs must give bounded means.
    values
        .windows(period)
        .map(|w| w.iter().sum::<f64>() / period as f64)
        .collect()
}

/// Exponential moving average seeded with the SMA of the first `period` values.
///
/// `ema[i] = x[i] * a + ema[i - 1] * (1 - a)` with `a = 2 / (period + 1)`.
/// Output length is `n - period + 1`.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || values.len() < period {
        return Vec::new();
    }

    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;

    let mut out = Vec::with_capacity(values.len() - period + 1);
    out.push(seed);

    let mut prev = seed;
    for &x in &values[period..] {
        prev = x * alpha + prev * (1.0 - alpha);
        out.push(prev);
    }
    out
}
