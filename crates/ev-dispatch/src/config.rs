//! Configuration of the call-dispatch path.

use std::{env, num::ParseIntError};
use thiserror::Error;

/// Environment variable overriding [`EvmConfig::max_call_depth`].
pub const MAX_CALL_DEPTH_ENV: &str = "EV_MAX_CALL_DEPTH";

/// Maximum call depth of the Ethereum mainnet.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 1024;

/// Tunables of the [`Evm`](crate::Evm) call path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvmConfig {
    /// Calls made at a depth above this limit fail with
    /// [`ExecutionError::CallDepthExceeded`](crate::ExecutionError::CallDepthExceeded).
    pub max_call_depth: usize,
}

impl EvmConfig {
    /// Constructs a configuration with the provided depth limit.
    pub const fn new(max_call_depth: usize) -> Self {
        Self { max_call_depth }
    }

    /// Parses a configuration from a string representation of the depth limit.
    pub fn parse_depth(value: &str) -> Result<Self, ConfigError> {
        value.trim().parse().map(Self::new).map_err(ConfigError::InvalidDepth)
    }

    /// Loads the configuration from [`MAX_CALL_DEPTH_ENV`].
    pub fn from_env() -> Result<Self, ConfigError> {
        let var = MAX_CALL_DEPTH_ENV;
        let raw = env::var(var).map_err(|_| ConfigError::MissingEnv { var: var.into() })?;
        if raw.trim().is_empty() {
            return Err(ConfigError::EmptyEnv { var: var.into() });
        }
        Self::parse_depth(&raw)
    }

    /// Loads the configuration from [`MAX_CALL_DEPTH_ENV`], falling back to the default when the
    /// variable is unset.
    pub fn from_env_or_default() -> Result<Self, ConfigError> {
        match Self::from_env() {
            Err(ConfigError::MissingEnv { .. }) => Ok(Self::default()),
            other => other,
        }
    }
}

impl Default for EvmConfig {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CALL_DEPTH)
    }
}

/// Errors that can occur while building an [`EvmConfig`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The environment variable was not set.
    #[error("environment variable {var} is not set")]
    MissingEnv {
        /// Name of the environment variable that was not present.
        var: String,
    },
    /// The environment variable was empty or whitespace.
    #[error("environment variable {var} is empty")]
    EmptyEnv {
        /// Name of the environment variable that evaluated to an empty string.
        var: String,
    },
    /// The depth limit could not be parsed.
    #[error("invalid max call depth: {0}")]
    InvalidDepth(ParseIntError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_depth_from_str() {
        let cfg = EvmConfig::parse_depth(" 64 ").unwrap();
        assert_eq!(cfg.max_call_depth, 64);
    }

    #[test]
    fn rejects_invalid_depth() {
        let err = EvmConfig::parse_depth("deep").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDepth(_)));
    }

    #[test]
    fn defaults_to_mainnet_depth() {
        assert_eq!(EvmConfig::default().max_call_depth, 1024);
    }
}
