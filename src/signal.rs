//! Trade signal synthesis
//!
//! Votes the strong patterns of one detection pass into at most one Buy/Sell
//! signal, sized with ATR-based stop and targets.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{indicators::atr, Pattern, PatternError, Period, Ratio, Result, OHLCV};

/// Duration reported when no winning pattern carries one
const DEFAULT_DURATION: &str = "3-8 candles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    Buy,
    Sell,
    /// Never emitted by synthesis; a tied vote yields no signal
    Hold,
}

impl SignalAction {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalAction::Buy => "buy",
            SignalAction::Sell => "sell",
            SignalAction::Hold => "hold",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub action: SignalAction,
    pub confidence: f64,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub target1: f64,
    pub target2: f64,
    pub timeframe: String,
    pub expected_duration: String,
    pub probability: f64,
    /// Fraction of capital at risk
    pub position_size: f64,
    pub risk_reward_ratio: f64,
    pub reasoning: String,
}

/// Signal synthesis settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Patterns count toward the vote only above this confidence
    pub strong_threshold: Ratio,
    pub atr_period: Period,
    /// Trailing bars the ATR is computed over
    pub atr_lookback: Period,
    pub stop_atr_multiple: f64,
    pub target1_atr_multiple: f64,
    pub target2_atr_multiple: f64,
    /// ATR substitute as a fraction of price when ATR is unavailable
    pub atr_fallback_fraction: Ratio,
    /// Reward-to-risk reported when the stop sits on the entry
    pub fallback_risk_reward: f64,
    pub position_size: Ratio,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            strong_threshold: Ratio::new_const(0.6),
            atr_period: Period::new_const(14),
            atr_lookback: Period::new_const(20),
            stop_atr_multiple: 2.0,
            target1_atr_multiple: 2.0,
            target2_atr_multiple: 4.0,
            atr_fallback_fraction: Ratio::new_const(0.02),
            fallback_risk_reward: 2.0,
            position_size: Ratio::new_const(0.02),
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<()> {
        let multiples = [
            ("stop_atr_multiple", self.stop_atr_multiple),
            ("target1_atr_multiple", self.target1_atr_multiple),
            ("target2_atr_multiple", self.target2_atr_multiple),
            ("fallback_risk_reward", self.fallback_risk_reward),
        ];
        for (field, value) in multiples {
            if !value.is_finite() || value <= 0.0 {
                return Err(PatternError::InvalidConfig(format!(
                    "{field} must be positive and finite, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Vote strong patterns into a signal; `None` when nothing wins the vote.
pub fn synthesize<T: OHLCV>(
    patterns: &[Pattern],
    bars: &[T],
    timeframe: &str,
    config: &SignalConfig,
) -> Option<Signal> {
    let last = bars.last()?;
    let threshold = config.strong_threshold.get();

    let (bullish, bearish): (Vec<&Pattern>, Vec<&Pattern>) = patterns
        .iter()
        .filter(|p| p.confidence > threshold && !p.direction.is_neutral())
        .partition(|p| p.direction.is_bullish());

    let (action, relevant) = match bullish.len().cmp(&bearish.len()) {
        std::cmp::Ordering::Greater => (SignalAction::Buy, bullish),
        std::cmp::Ordering::Less => (SignalAction::Sell, bearish),
        std::cmp::Ordering::Equal => {
            if !bullish.is_empty() {
                debug!(timeframe, votes = bullish.len(), "tied pattern vote, no signal");
            }
            return None;
        }
    };

    let confidence = relevant.iter().map(|p| p.confidence).sum::<f64>() / relevant.len() as f64;
    let price = last.close();

    let lookback = config.atr_lookback.get().min(bars.len());
    let range = atr(&bars[bars.len() - lookback..], config.atr_period.get())
        .last()
        .copied()
        .unwrap_or(price * config.atr_fallback_fraction.get());

    let side = if action == SignalAction::Buy { 1.0 } else { -1.0 };
    let stop_loss = price - side * range * config.stop_atr_multiple;
    let target1 = price + side * range * config.target1_atr_multiple;
    let target2 = price + side * range * config.target2_atr_multiple;

    let risk = (price - stop_loss).abs();
    let risk_reward_ratio = if risk > 0.0 {
        (target1 - price).abs() / risk
    } else {
        config.fallback_risk_reward
    };

    let names: Vec<&str> = relevant.iter().map(|p| p.name()).collect();
    let reasoning = format!(
        "Detected {} strong {} patterns: {}",
        relevant.len(),
        action.as_str(),
        names.join(", ")
    );

    debug!(timeframe, action = action.as_str(), confidence, "signal generated");

    Some(Signal {
        action,
        confidence,
        entry_price: price,
        stop_loss,
        target1,
        target2,
        timeframe: timeframe.to_string(),
        expected_duration: relevant
            .first()
            .map(|p| p.expected_duration.clone())
            .unwrap_or_else(|| DEFAULT_DURATION.to_string()),
        probability: confidence,
        position_size: config.position_size.get(),
        risk_reward_ratio,
        reasoning,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bar, Direction, PatternKind};

    fn pattern(kind: PatternKind, confidence: f64) -> Pattern {
        let profile = kind.profile();
        Pattern {
            kind,
            name: kind.name().into(),
            timeframe: "1h".into(),
            timestamp: 0,
            confidence,
            start_index: 0,
            end_index: 0,
            direction: kind.typical_direction(),
            entry_price: 100.0,
            stop_loss: 99.0,
            target1: 101.0,
            target2: 102.0,
            expected_duration: profile.expected_duration.into(),
            probability: profile.probability.unwrap_or(confidence),
            risk_reward_ratio: profile.risk_reward,
        }
    }

    fn steady_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| Bar::new(i as i64, 100.0, 101.0, 99.0, 100.0, 1.0))
            .collect()
    }

    #[test]
    fn test_buy_with_atr_levels() {
        let patterns = [
            pattern(PatternKind::Hammer, 0.8),
            pattern(PatternKind::BullishEngulfing, 0.7),
        ];
        let s = synthesize(&patterns, &steady_bars(30), "1h", &SignalConfig::default()).unwrap();

        assert_eq!(s.action, SignalAction::Buy);
        assert!((s.confidence - 0.75).abs() < 1e-12);
        assert_eq!(s.probability, s.confidence);
        // true range is 2.0 on every bar
        assert!((s.stop_loss - 96.0).abs() < 1e-9);
        assert!((s.target1 - 104.0).abs() < 1e-9);
        assert!((s.target2 - 108.0).abs() < 1e-9);
        assert!((s.risk_reward_ratio - 1.0).abs() < 1e-9);
        assert_eq!(s.expected_duration, "2-5 candles");
        assert_eq!(s.reasoning, "Detected 2 strong buy patterns: Hammer, Bullish Engulfing");
    }

    #[test]
    fn test_sell_uses_fallback_atr() {
        let patterns = [pattern(PatternKind::ShootingStar, 0.9)];
        let s = synthesize(&patterns, &steady_bars(5), "1h", &SignalConfig::default()).unwrap();

        assert_eq!(s.action, SignalAction::Sell);
        assert!((s.stop_loss - 104.0).abs() < 1e-9);
        assert!((s.target1 - 96.0).abs() < 1e-9);
        assert!((s.target2 - 92.0).abs() < 1e-9);
    }

    #[test]
    fn test_tie_and_weak_yield_none() {
        let bars = steady_bars(30);
        let config = SignalConfig::default();

        let tied = [
            pattern(PatternKind::Hammer, 0.8),
            pattern(PatternKind::ShootingStar, 0.8),
        ];
        assert!(synthesize(&tied, &bars, "1h", &config).is_none());

        let weak = [pattern(PatternKind::Hammer, 0.6)];
        assert!(synthesize(&weak, &bars, "1h", &config).is_none());

        let neutral = [pattern(PatternKind::Doji, 0.95)];
        assert!(synthesize(&neutral, &bars, "1h", &config).is_none());

        assert!(synthesize(&[], &bars, "1h", &config).is_none());
        assert!(synthesize::<Bar>(&tied[..1], &[], "1h", &config).is_none());
    }

    #[test]
    fn test_zero_risk_uses_fallback_ratio() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| Bar::new(i, 0.0, 0.0, 0.0, 0.0, 1.0))
            .collect();
        let patterns = [pattern(PatternKind::Hammer, 0.8)];
        let s = synthesize(&patterns, &bars, "1h", &SignalConfig::default()).unwrap();
        assert_eq!(s.risk_reward_ratio, 2.0);
    }

    #[test]
    fn test_config_validation() {
        let mut config = SignalConfig::default();
        assert!(config.validate().is_ok());
        config.stop_atr_multiple = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_direction_helpers() {
        assert!(Direction::Neutral.is_neutral());
        assert!(!Direction::Bullish.is_neutral());
    }
}
