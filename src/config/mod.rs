//! Configuration management.
//!
//! This module handles:
//! - Environment variable loading
//! - Configuration validation
//! - Default value handling
//!
//! Detector thresholds and scoring weights are not configured here; they are
//! fixed tables injected into the engine at construction.
//!
//! # Example
//!
//! ```
//! use llm_diagnostics::config::{Config, DEFAULT_TOP_FIXES};
//!
//! // Create a config directly (use Config::from_env() in production)
//! let config = Config {
//!     log_level: "info".to_string(),
//!     top_fixes: DEFAULT_TOP_FIXES,
//!     max_fixes: 0,
//! };
//!
//! assert_eq!(config.fix_limit(), None);
//! ```

mod validation;

pub use validation::{validate_config, MAX_MAX_FIXES, MAX_TOP_FIXES, MIN_TOP_FIXES};

use crate::error::ConfigError;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default size of the top-fixes slice in summaries.
pub const DEFAULT_TOP_FIXES: usize = 3;

/// Default cap on fixes returned per request.
pub const DEFAULT_MAX_FIXES: usize = 20;

/// Application configuration.
///
/// Use [`Config::from_env`] to load configuration from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Log level or filter directive (error, warn, info, debug, trace).
    pub log_level: String,
    /// Number of fixes in the summary's top slice.
    pub top_fixes: usize,
    /// Cap on fixes returned per request; 0 means unlimited.
    pub max_fixes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            top_fixes: DEFAULT_TOP_FIXES,
            max_fixes: DEFAULT_MAX_FIXES,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Optional environment variables (with defaults):
    /// - `LOG_LEVEL`: Logging level (default: `info`)
    /// - `TOP_FIXES`: Size of the top-fixes slice (default: `3`)
    /// - `MAX_FIXES`: Cap on returned fixes, `0` for unlimited (default: `20`)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if:
    /// - `TOP_FIXES` or `MAX_FIXES` is not a valid non-negative integer
    /// - Any value fails validation (see [`validate_config`])
    #[must_use = "configuration should be used"]
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| DEFAULT_LOG_LEVEL.into());
        let top_fixes = parse_env_usize("TOP_FIXES", DEFAULT_TOP_FIXES)?;
        let max_fixes = parse_env_usize("MAX_FIXES", DEFAULT_MAX_FIXES)?;

        let config = Self {
            log_level,
            top_fixes,
            max_fixes,
        };

        validate_config(&config)?;
        Ok(config)
    }

    /// The fix cap, `None` when unlimited.
    #[must_use]
    pub const fn fix_limit(&self) -> Option<usize> {
        match self.max_fixes {
            0 => None,
            n => Some(n),
        }
    }
}

/// Parse an environment variable as usize, using a default if not set.
fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    std::env::var(name).map_or(Ok(default), |val| {
        val.trim().parse().map_err(|_| ConfigError::InvalidValue {
            var: name.into(),
            reason: "must be a non-negative integer".into(),
        })
    })
}
