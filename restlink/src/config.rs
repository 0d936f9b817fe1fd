//! Configuration loading from environment variables
//!
//! Helpers for reading environment variables and `.env` files, and the
//! [`ExposerConfig`] read from them.

use std::env;
use std::str::FromStr;

/// Load environment variables from `.env` files if it exists.
///
/// Call this at the start of your application before accessing config.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

/// Get a required environment variable.
///
/// Returns an error if the variable is not set.
pub fn get_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::Missing(key.to_string()))
}

/// Get an optional environment with a default value
pub fn get_env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get and parse an environment variable.
pub fn get_env_parsed<T: FromStr>(key: &str) -> Result<T, ConfigError> {
    let value = get_env(key)?;
    value.parse().map_err(|_| ConfigError::Invalid {
        key: key.to_string(),
        value,
    })
}

/// Get and parse an environment variable with a default.
pub fn get_env_parsed_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Where exposed APIs are rooted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposerConfig {
    /// Prefix of every API root, e.g. `/` or `/services`.
    pub base_path: String,
}

impl ExposerConfig {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Reads `RESTLINK_BASE_PATH`, defaulting to `/`.
    pub fn from_env() -> Self {
        Self::new(get_env_or("RESTLINK_BASE_PATH", "/"))
    }
}

impl Default for ExposerConfig {
    fn default() -> Self {
        Self::new("/")
    }
}

/// Configuration loading errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Environment variable is not set.
    Missing(String),
    /// Multiple environment variables are not set.
    MissingMultiple(Vec<String>),
    /// Environment variable value is invalid.
    Invalid { key: String, value: String },
}
impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Missing(key) => {
                write!(f, "Missing required environment variable '{}'", key)
            }
            ConfigError::MissingMultiple(keys) => {
                writeln!(f, "Missing required environment variables:")?;
                for key in keys {
                    writeln!(f, "  - {}", key)?;
                }
                Ok(())
            }
            ConfigError::Invalid { key, value } => {
                write!(
                    f,
                    "Invalid value '{}' for environment variable '{}' (failed to parse as expected type)",
                    value, key
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}
