//! Build configuration passed unmodified to every rule action.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A primitive configuration value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstValue {
  Bool(bool),
  Int(i64),
  Float(f64),
  Str(String),
}

impl ConstValue {
  /// Parse a command-line value, trying bool, integer and float before
  /// falling back to a string.
  pub fn parse(raw: &str) -> Self {
    if let Ok(b) = raw.parse::<bool>() {
      return ConstValue::Bool(b);
    }
    if let Ok(i) = raw.parse::<i64>() {
      return ConstValue::Int(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
      return ConstValue::Float(f);
    }
    ConstValue::Str(raw.to_string())
  }
}

impl fmt::Display for ConstValue {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConstValue::Bool(b) => write!(f, "{}", b),
      ConstValue::Int(i) => write!(f, "{}", i),
      ConstValue::Float(x) => write!(f, "{}", x),
      ConstValue::Str(s) => f.write_str(s),
    }
  }
}

/// Immutable key/value configuration.
pub type Config = BTreeMap<String, ConstValue>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
  #[error("invalid override `{0}`: expected KEY=VALUE")]
  MalformedOverride(String),

  #[error("invalid override `{0}`: empty key")]
  EmptyKey(String),
}

/// Split a `KEY=VALUE` override into its parts.
pub fn parse_override(raw: &str) -> Result<(String, ConstValue), ConfigError> {
  let (key, value) = raw
    .split_once('=')
    .ok_or_else(|| ConfigError::MalformedOverride(raw.to_string()))?;

  let key = key.trim();
  if key.is_empty() {
    return Err(ConfigError::EmptyKey(raw.to_string()));
  }

  Ok((key.to_string(), ConstValue::parse(value)))
}
