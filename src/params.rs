//! Parameter metadata for tunable detectors
//!
//! Each tunable detector publishes the thresholds it reads, so callers can:
//! - sweep thresholds in a grid search
//! - build detectors from loosely typed key/value maps
//! - render the parameter list in a settings screen
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use chartpulse::params::ParameterizedDetector;
//! use chartpulse::prelude::*;
//!
//! for param in HammerDetector::param_meta() {
//!     println!("{}: {:?} (default: {})", param.name, param.param_type, param.default);
//! }
//!
//! let mut overrides = HashMap::new();
//! overrides.insert("min_wick_multiple", 3.0);
//! let hammer = HammerDetector::with_params(&overrides).unwrap();
//! assert_eq!(hammer.min_wick_multiple, 3.0);
//! ```

use std::collections::HashMap;

use crate::{PatternError, Period, Ratio, Result};

// ============================================================
// PARAMETER TYPES
// ============================================================

/// Type of parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
  /// Fraction in 0.0..=1.0
  Ratio,
  /// Positive bar count
  Period,
  /// Positive multiplier, may exceed 1.0 (e.g. wick-to-body multiple)
  Factor,
}

/// Metadata for a single detector parameter
#[derive(Debug, Clone)]
pub struct ParamMeta {
  /// Parameter name (e.g., "max_body_ratio")
  pub name: &'static str,
  pub param_type: ParamType,
  pub default: f64,
  /// Range for optimization: (min, max, step)
  pub range: (f64, f64, f64),
  pub description: &'static str,
}

impl ParamMeta {
  pub const fn ratio(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Ratio, default, range, description }
  }

  pub const fn period(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Period, default, range, description }
  }

  pub const fn factor(
    name: &'static str,
    default: f64,
    range: (f64, f64, f64),
    description: &'static str,
  ) -> Self {
    Self { name, param_type: ParamType::Factor, default, range, description }
  }

  /// Generate all values for grid search
  pub fn generate_grid(&self) -> Vec<f64> {
    let (min, max, step) = self.range;
    if step <= 0.0 {
      return vec![min];
    }
    let mut values = Vec::new();
    let mut i = 0usize;
    loop {
      let v = min + step * i as f64;
      if v > max + step * 1e-9 {
        break;
      }
      values.push(v);
      i += 1;
    }
    values
  }

  /// Validate a value for this parameter
  pub fn validate(&self, value: f64) -> Result<()> {
    let (min, max, _) = self.range;
    if value.is_nan() || value < min || value > max {
      return Err(PatternError::OutOfRange { field: self.name, value, min, max });
    }
    match self.param_type {
      ParamType::Ratio => Ratio::new(value).map(|_| ()),
      ParamType::Period => {
        if value < 1.0 || value.fract() != 0.0 {
          return Err(PatternError::InvalidValue("Period must be a positive integer"));
        }
        Ok(())
      },
      ParamType::Factor => {
        if value <= 0.0 {
          return Err(PatternError::InvalidValue("Factor must be positive"));
        }
        Ok(())
      },
    }
  }
}

// ============================================================
// PARAMETERIZED DETECTOR TRAIT
// ============================================================

/// Detector whose thresholds can be discovered and overridden
pub trait ParameterizedDetector: Sized {
  /// Returns metadata for all configurable parameters
  fn param_meta() -> &'static [ParamMeta];

  /// Creates a detector with parameters from a HashMap
  ///
  /// Missing parameters use their default values.
  fn with_params(params: &HashMap<&str, f64>) -> Result<Self>;

  /// Detector name as reported by [`PatternDetector::name`](crate::PatternDetector::name)
  fn detector_name() -> &'static str;
}

// ============================================================
// PARAMETER VALUE HELPERS
// ============================================================

/// Helper to get a Ratio from params with default fallback
pub fn get_ratio(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<Ratio> {
  let value = params.get(key).copied().unwrap_or(default);
  Ratio::new(value)
}

/// Helper to get a Period from params with default fallback
pub fn get_period(params: &HashMap<&str, f64>, key: &str, default: usize) -> Result<Period> {
  let value = params.get(key).copied().unwrap_or(default as f64);
  if value.is_nan() || value < 0.0 || value.fract() != 0.0 {
    return Err(PatternError::InvalidValue("Period must be a positive integer"));
  }
  Period::new(value as usize)
}

/// Helper to get a positive finite multiplier from params with default fallback
pub fn get_factor(params: &HashMap<&str, f64>, key: &str, default: f64) -> Result<f64> {
  let value = params.get(key).copied().unwrap_or(default);
  if !value.is_finite() || value <= 0.0 {
    return Err(PatternError::InvalidValue("Factor must be positive and finite"));
  }
  Ok(value)
}

// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_param_meta_constructors() {
    let ratio = ParamMeta::ratio("max_body_ratio", 0.3, (0.1, 0.5, 0.1), "Body limit");
    assert_eq!(ratio.param_type, ParamType::Ratio);
    assert_eq!(ratio.default, 0.3);

    let period = ParamMeta::period("window", 20.0, (10.0, 30.0, 5.0), "Window");
    assert_eq!(period.param_type, ParamType::Period);

    let factor = ParamMeta::factor("min_wick_multiple", 2.0, (1.5, 3.0, 0.5), "Wick");
    assert_eq!(factor.param_type, ParamType::Factor);
  }

  #[test]
  fn test_generate_grid() {
    let meta = ParamMeta::ratio("test", 0.5, (0.3, 0.7, 0.2), "Test");

    let grid = meta.generate_grid();
    assert_eq!(grid.len(), 3);
    assert!((grid[0] - 0.3).abs() < 1e-12);
    assert!((grid[1] - 0.5).abs() < 1e-12);
    assert!((grid[2] - 0.7).abs() < 1e-12);
  }

  #[test]
  fn test_generate_grid_no_drift() {
    let meta = ParamMeta::ratio("test", 0.1, (0.1, 1.0, 0.1), "Test");
    assert_eq!(meta.generate_grid().len(), 10);
  }

  #[test]
  fn test_validate_ratio() {
    let meta = ParamMeta::ratio("test", 0.5, (0.3, 0.7, 0.1), "Test");

    assert!(meta.validate(0.5).is_ok());
    assert!(meta.validate(0.3).is_ok());
    assert!(meta.validate(0.7).is_ok());
    assert!(meta.validate(0.2).is_err());
    assert!(meta.validate(0.8).is_err());
    assert!(meta.validate(f64::NAN).is_err());
  }

  #[test]
  fn test_validate_period() {
    let meta = ParamMeta::period("test", 20.0, (10.0, 30.0, 5.0), "Test");

    assert!(meta.validate(20.0).is_ok());
    assert!(meta.validate(12.5).is_err());
    assert!(meta.validate(8.0).is_err());
  }

  #[test]
  fn test_validate_factor() {
    let meta = ParamMeta::factor("test", 2.0, (0.0, 4.0, 0.5), "Test");

    assert!(meta.validate(2.5).is_ok());
    assert!(meta.validate(0.0).is_err());
  }

  #[test]
  fn test_get_helpers() {
    let mut params = HashMap::new();
    params.insert("ratio", 0.8);
    params.insert("period", 25.0);
    params.insert("factor", 3.0);

    assert!((get_ratio(&params, "ratio", 0.5).unwrap().get() - 0.8).abs() < f64::EPSILON);
    assert!((get_ratio(&params, "missing", 0.5).unwrap().get() - 0.5).abs() < f64::EPSILON);
    assert_eq!(get_period(&params, "period", 20).unwrap().get(), 25);
    assert_eq!(get_period(&params, "missing", 20).unwrap().get(), 20);
    assert_eq!(get_factor(&params, "factor", 2.0).unwrap(), 3.0);
  }

  #[test]
  fn test_get_helpers_reject_bad_values() {
    let mut params = HashMap::new();
    params.insert("ratio", 1.5);
    params.insert("period", 2.5);
    params.insert("factor", -1.0);

    assert!(get_ratio(&params, "ratio", 0.5).is_err());
    assert!(get_period(&params, "period", 20).is_err());
    assert!(get_factor(&params, "factor", 2.0).is_err());
  }
}
