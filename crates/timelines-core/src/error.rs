//! Typed errors for degenerate dashboard configuration.

use thiserror::Error;

/// Configuration problems detected before any computation runs.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error(
    "estimated lifespan must be a positive number of years, got {0}"
  )]
  InvalidLifespan(f64),

  #[error(
    "invalid birthday '{0}'; expected YYYY-MM-DD"
  )]
  InvalidBirthday(String),

  #[error("invalid month {0}; expected 1-12")]
  InvalidMonth(u32),

  #[error(
    "invalid hide pattern '{pattern}': {reason}"
  )]
  InvalidPattern {
    pattern: String,
    reason:  String
  },

  #[error(
    "event limit must be at least 1"
  )]
  InvalidLimit,

  #[error("unknown timezone '{0}'")]
  InvalidTimezone(String),

  #[error(
    "unknown clock style '{0}'; expected 12h or 24h"
  )]
  InvalidClock(String),

  #[error("unknown config key '{0}'")]
  UnknownKey(String),

  #[error(
    "invalid value '{value}' for config key '{key}'"
  )]
  InvalidValue {
    key:   String,
    value: String
  }
}
