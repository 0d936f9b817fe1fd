use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{get_env_or, get_env_parsed_or};

type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Configuration for the tracing/logging system.
///
/// Use the builder pattern to configure logging output format and level.
///
/// # Examples
///
/// ```ignore
/// use restlink::prelude::*;
///
/// // JSON logging for production
/// Restlink::new()
///     .with_tracing(TracingConfig::new().json())
///     .exposer(exposer)
///     .listen("127.0.0.1:3000")
///     .await
/// ```
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Output logs as JSON.
    pub json: bool,
    /// The minimum log level.
    pub level: Level,
    /// Include the target (module path) in logs.
    pub with_target: bool,
    /// Include the source file in logs.
    pub with_file: bool,
    /// Include line numbers in logs.
    pub with_line_number: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            json: false,
            level: Level::INFO,
            with_target: true,
            with_file: false,
            with_line_number: false,
        }
    }
}

impl TracingConfig {
    /// Creates a new tracing configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `RESTLINK_LOG_FORMAT` (`text` or `json`) and
    /// `RESTLINK_LOG_LEVEL` (e.g. `debug`). Unset or unparsable values keep
    /// the defaults.
    pub fn from_env() -> Self {
        let config = Self::default().level(get_env_parsed_or("RESTLINK_LOG_LEVEL", Level::INFO));
        if get_env_or("RESTLINK_LOG_FORMAT", "text").eq_ignore_ascii_case("json") {
            config.json()
        } else {
            config
        }
    }

    /// Enables JSON output format.
    pub fn json(mut self) -> Self {
        self.json = true;
        self
    }

    /// Sets the minimum log level.
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Configures whether to include the target in logs.
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Configures whether to include file names in logs.
    pub fn with_file(mut self, enabled: bool) -> Self {
        self.with_file = enabled;
        self
    }

    /// Configures whether to include line numbers in logs.
    pub fn with_line_number(mut self, enabled: bool) -> Self {
        self.with_line_number = enabled;
        self
    }

    /// Installs the global subscriber. Does nothing if one is already set.
    pub fn init(self) {
        if let Err(e) = self.try_init() {
            eprintln!("tracing subscriber not installed: {}", e);
        }
    }

    /// Installs the global subscriber, failing if one is already set.
    pub fn try_init(self) -> Result<(), InitError> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string()));

        let builder = fmt()
            .with_env_filter(filter)
            .with_target(self.with_target)
            .with_file(self.with_file)
            .with_line_number(self.with_line_number);

        if self.json {
            builder.json().try_init()
        } else {
            builder.try_init()
        }
    }
}
