//! Session configuration: the flush granularity.

use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;

/// Granularity used when none is configured.
pub const DEFAULT_GRANULARITY: u32 = 1;

/// Largest accepted granularity; keeps `-granularity` and `batch + granularity`
/// well inside `i64`.
pub const MAX_GRANULARITY: u32 = i32::MAX as u32;

/// On-disk form of [`CounterConfig`]. Signed so that negative values are
/// reported as invalid granularity rather than as a parse failure.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RawCounterConfig {
    granularity: i64,
}

impl Default for RawCounterConfig {
    fn default() -> Self {
        Self {
            granularity: i64::from(DEFAULT_GRANULARITY),
        }
    }
}

/// Configuration for an [`InstructionCounter`](crate::counter::InstructionCounter) session.
///
/// The granularity is the number of units added on every flush, independent of
/// the pending batch. It is fixed for the lifetime of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterConfig {
    /// Units added to every flushed batch.
    pub granularity: u32,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            granularity: DEFAULT_GRANULARITY,
        }
    }
}

impl CounterConfig {
    /// Create a validated config with the given granularity.
    pub fn new(granularity: u32) -> Result<Self, ConfigError> {
        let config = Self { granularity };
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON config such as `{"granularity": 8}`.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: RawCounterConfig = serde_json::from_str(json)?;
        let granularity = u32::try_from(raw.granularity)
            .ok()
            .filter(|&g| (1..=MAX_GRANULARITY).contains(&g))
            .ok_or(ConfigError::InvalidGranularity(raw.granularity))?;
        Ok(Self { granularity })
    }

    /// Load and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        log::debug!("Loading counter config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Check that the granularity is usable as a signed baseline.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_GRANULARITY).contains(&self.granularity) {
            return Err(ConfigError::InvalidGranularity(i64::from(
                self.granularity,
            )));
        }
        Ok(())
    }

    /// Baseline a fresh or just-flushed batch is set to: `-granularity`.
    #[inline]
    pub fn baseline(&self) -> i64 {
        -i64::from(self.granularity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_granularity_is_one() {
        let config = CounterConfig::default();
        assert_eq!(config.granularity, 1);
        assert_eq!(config.baseline(), -1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_granularity_rejected() {
        let err = CounterConfig::new(0).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGranularity(0)));
    }

    #[test]
    fn oversized_granularity_rejected() {
        let too_big = i32::MAX as u32 + 1;
        assert!(matches!(
            CounterConfig::new(too_big),
            Err(ConfigError::InvalidGranularity(g)) if g == i64::from(too_big)
        ));
        assert!(CounterConfig::new(MAX_GRANULARITY).is_ok());
    }

    #[test]
    fn json_missing_field_uses_default() {
        let config = CounterConfig::from_json_str("{}").unwrap();
        assert_eq!(config, CounterConfig::default());
    }

    #[test]
    fn json_granularity_parsed() {
        let config = CounterConfig::from_json_str(r#"{"granularity": 16}"#).unwrap();
        assert_eq!(config.granularity, 16);
        assert_eq!(config.baseline(), -16);
    }

    #[test]
    fn json_errors_are_reported() {
        assert!(matches!(
            CounterConfig::from_json_str(r#"{"granularity": -3}"#),
            Err(ConfigError::InvalidGranularity(-3))
        ));
        assert!(matches!(
            CounterConfig::from_json_str(r#"{"granularity": 3000000000}"#),
            Err(ConfigError::InvalidGranularity(3_000_000_000))
        ));
        assert!(matches!(
            CounterConfig::from_json_str(r#"{"granularity": "eight"}"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            CounterConfig::from_json_str(r#"{"granularity": 0}"#),
            Err(ConfigError::InvalidGranularity(0))
        ));
        assert!(matches!(
            CounterConfig::from_json_str(r#"{"granularity": 1, "extra": true}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = CounterConfig::from_file("/nonexistent/execount.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
