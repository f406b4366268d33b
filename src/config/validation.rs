//! Configuration validation.
//!
//! This module provides validation logic for configuration values,
//! ensuring they are within acceptable ranges.

use super::Config;
use crate::error::ConfigError;

/// Minimum size of the top-fixes slice.
pub const MIN_TOP_FIXES: usize = 1;

/// Maximum size of the top-fixes slice.
pub const MAX_TOP_FIXES: usize = 10;

/// Largest allowed fix cap.
pub const MAX_MAX_FIXES: usize = 100;

/// Validate configuration values.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if any value is out of range:
/// - `LOG_LEVEL` must not be empty
/// - `TOP_FIXES` must be between 1 and 10
/// - `MAX_FIXES` must be at most 100
#[must_use = "validation result should be checked"]
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.log_level.trim().is_empty() {
        return Err(ConfigError::InvalidValue {
            var: "LOG_LEVEL".into(),
            reason: "must not be empty".into(),
        });
    }

    if !(MIN_TOP_FIXES..=MAX_TOP_FIXES).contains(&config.top_fixes) {
        return Err(ConfigError::InvalidValue {
            var: "TOP_FIXES".into(),
            reason: format!("must be between {MIN_TOP_FIXES} and {MAX_TOP_FIXES}"),
        });
    }

    if config.max_fixes > MAX_MAX_FIXES {
        return Err(ConfigError::InvalidValue {
            var: "MAX_FIXES".into(),
            reason: format!("must be between 0 and {MAX_MAX_FIXES}"),
        });
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_empty_log_level() {
        let config = Config {
            log_level: "  ".to_string(),
            ..Config::default()
        };
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { var, .. } if var == "LOG_LEVEL"));
    }

    #[test_case(0, false ; "below minimum")]
    #[test_case(MIN_TOP_FIXES, true ; "minimum")]
    #[test_case(MAX_TOP_FIXES, true ; "maximum")]
    #[test_case(11, false ; "above maximum")]
    fn test_top_fixes_bounds(top_fixes: usize, valid: bool) {
        let config = Config {
            top_fixes,
            ..Config::default()
        };
        assert_eq!(validate_config(&config).is_ok(), valid);
    }

    #[test_case(0, true ; "unlimited")]
    #[test_case(MAX_MAX_FIXES, true ; "maximum")]
    #[test_case(101, false ; "above maximum")]
    fn test_max_fixes_bounds(max_fixes: usize, valid: bool) {
        let config = Config {
            max_fixes,
            ..Config::default()
        };
        assert_eq!(validate_config(&config).is_ok(), valid);
    }
}
