//! Configuration precedence: environment variables > YAML file > defaults.
//!
//! Unlike a silent fallback, an environment variable that is set but cannot
//! be parsed is an error: a typo in `NUM_USERS` should not quietly run the
//! default load.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::utils::parse_duration_string;

/// Default values for every optional setting.
pub struct ConfigDefaults;

impl ConfigDefaults {
    pub const NUM_USERS: usize = 10;
    pub const SPAWN_RATE: f64 = 0.0;
    pub const USER_PROFILES: &'static str = "web=1,api=1,errorhandling=1";
    pub const TEST_DURATION: Duration = Duration::from_secs(2 * 60 * 60);
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
    pub const MIN_WAIT: Duration = Duration::from_millis(3000);
    pub const MAX_WAIT: Duration = Duration::from_millis(15000);
    pub const METRICS_PORT: u16 = 9090;
    pub const LOG_FORMAT: &'static str = "text";
    pub const LOG_LEVEL: &'static str = "info";
}

/// Resolves individual settings according to precedence.
pub struct ConfigMerger;

impl ConfigMerger {
    /// Value of `env_var`, ignoring unset and empty variables.
    pub fn env_value(env_var: &str) -> Option<String> {
        env::var(env_var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Merge a `FromStr` value with precedence: env > yaml > default.
    pub fn merge_parsed<T>(env_var: &str, yaml_value: Option<T>, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::env_value(env_var) {
            Some(raw) => raw
                .parse::<T>()
                .map_err(|e| ConfigError::invalid(env_var, format!("'{}': {}", raw, e))),
            None => Ok(yaml_value.unwrap_or(default)),
        }
    }

    /// Merge a duration with precedence: env > yaml > default.
    pub fn merge_duration(
        env_var: &str,
        yaml_value: Option<Duration>,
        default: Duration,
    ) -> Result<Duration, ConfigError> {
        match Self::env_value(env_var) {
            Some(raw) => parse_duration_string(&raw).map_err(|e| ConfigError::invalid(env_var, e)),
            None => Ok(yaml_value.unwrap_or(default)),
        }
    }

    /// Merge a boolean flag with precedence: env > yaml > default.
    ///
    /// Only "true" (any case) or "1" in the environment count as true.
    pub fn merge_bool(env_var: &str, yaml_value: Option<bool>, default: bool) -> bool {
        match Self::env_value(env_var) {
            Some(raw) => raw.eq_ignore_ascii_case("true") || raw == "1",
            None => yaml_value.unwrap_or(default),
        }
    }

    /// Merge a string with precedence: env > yaml > default.
    pub fn merge_string(env_var: &str, yaml_value: Option<String>, default: &str) -> String {
        Self::env_value(env_var)
            .or(yaml_value)
            .unwrap_or_else(|| default.to_string())
    }

    /// Merge an optional string with precedence: env > yaml.
    pub fn merge_optional_string(env_var: &str, yaml_value: Option<String>) -> Option<String> {
        Self::env_value(env_var).or(yaml_value)
    }
}
