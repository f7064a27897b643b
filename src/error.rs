//! Error types for counter configuration.
//!
//! The counting operations themselves are total; errors only arise while a
//! session is being configured.

use thiserror::Error;

/// Result alias for session construction.
pub type Result<T> = std::result::Result<T, CounterError>;

/// Errors raised while building or loading a [`CounterConfig`](crate::config::CounterConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Granularity must be at least 1 and fit in an `i32`.
    #[error("invalid granularity {0} (must be in 1..={max})", max = i32::MAX)]
    InvalidGranularity(i64),

    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Config file is not valid JSON for a counter config.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while creating an [`InstructionCounter`](crate::counter::InstructionCounter).
#[derive(Debug, Error)]
pub enum CounterError {
    #[error("invalid counter configuration: {0}")]
    Config(#[from] ConfigError),
}
