use std::collections::HashMap;
use tokio::time::Duration;

use crate::client::{parse_custom_headers, ClientConfig};
use crate::config_merge::{ConfigDefaults, ConfigMerger};
use crate::errors::ConfigError;
use crate::logging::LogFormat;
use crate::outcome::{TolerancePolicy, DEFAULT_CHECKOUT_TOTAL_THRESHOLD};
use crate::profiles::{UserProfile, WeightOverrides};
use crate::user::WaitTime;
use crate::utils::parse_weighted_list;
use crate::yaml_config::{YamlConfig, YamlDuration};

/// Main configuration for the load test.
#[derive(Debug, Clone)]
pub struct Config {
    pub target_url: String,
    pub request_timeout: Duration,
    pub skip_tls_verify: bool,
    pub custom_headers: Option<String>,
    pub num_users: usize,
    /// Users started per second; 0 starts them all at once.
    pub spawn_rate: f64,
    pub user_profiles: Vec<(UserProfile, u32)>,
    pub test_duration: Duration,
    pub wait: WaitTime,
    pub tolerance: TolerancePolicy,
    /// 0 disables the metrics server.
    pub metrics_port: u16,
    pub log_format: LogFormat,
    pub log_level: String,
    pub weight_overrides: WeightOverrides,
    pub config_file: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables, layered over the
    /// YAML file named by `CONFIG_FILE` when set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config_file = ConfigMerger::env_value("CONFIG_FILE");
        let yaml = match config_file {
            Some(ref path) => YamlConfig::from_file(path)?,
            None => YamlConfig::default(),
        };

        let mut config = Self::from_sources(&yaml)?;
        config.config_file = config_file;
        Ok(config)
    }

    /// Resolve every setting from the environment, then `yaml`, then defaults.
    pub fn from_sources(yaml: &YamlConfig) -> Result<Self, ConfigError> {
        let target_url = ConfigMerger::merge_optional_string("TARGET_URL", yaml.target.base_url.clone())
            .ok_or_else(|| ConfigError::MissingVar("TARGET_URL".to_string()))?;

        let request_timeout = ConfigMerger::merge_duration(
            "REQUEST_TIMEOUT",
            yaml_duration(&yaml.target.timeout, "target.timeout")?,
            ConfigDefaults::REQUEST_TIMEOUT,
        )?;

        let skip_tls_verify =
            ConfigMerger::merge_bool("SKIP_TLS_VERIFY", yaml.target.skip_tls_verify, false);

        let custom_headers =
            ConfigMerger::merge_optional_string("CUSTOM_HEADERS", yaml.target.custom_headers.clone());

        let num_users =
            ConfigMerger::merge_parsed("NUM_USERS", yaml.users.count, ConfigDefaults::NUM_USERS)?;

        let spawn_rate = ConfigMerger::merge_parsed(
            "SPAWN_RATE",
            yaml.users.spawn_rate,
            ConfigDefaults::SPAWN_RATE,
        )?;

        let raw_profiles = match ConfigMerger::env_value("USER_PROFILES") {
            Some(raw) => {
                parse_weighted_list(&raw).map_err(|e| ConfigError::invalid("USER_PROFILES", e))?
            }
            None => match yaml.profile_weights()? {
                Some(weights) => weights,
                None => parse_weighted_list(ConfigDefaults::USER_PROFILES)
                    .map_err(|e| ConfigError::invalid("USER_PROFILES", e))?,
            },
        };
        let user_profiles = raw_profiles
            .into_iter()
            .map(|(name, weight)| Ok((name.parse::<UserProfile>()?, weight)))
            .collect::<Result<Vec<_>, ConfigError>>()?;

        let test_duration = ConfigMerger::merge_duration(
            "TEST_DURATION",
            yaml_duration(&yaml.duration, "duration")?,
            ConfigDefaults::TEST_DURATION,
        )?;

        let min_wait = ConfigMerger::merge_duration(
            "MIN_WAIT",
            yaml_duration(&yaml.wait.min, "wait.min")?,
            ConfigDefaults::MIN_WAIT,
        )?;
        let max_wait = ConfigMerger::merge_duration(
            "MAX_WAIT",
            yaml_duration(&yaml.wait.max, "wait.max")?,
            ConfigDefaults::MAX_WAIT,
        )?;

        let checkout_total_threshold = ConfigMerger::merge_parsed(
            "CHECKOUT_TOTAL_THRESHOLD",
            yaml.checkout.tolerated_total_above,
            DEFAULT_CHECKOUT_TOTAL_THRESHOLD,
        )?;

        let metrics_port = ConfigMerger::merge_parsed(
            "METRICS_PORT",
            yaml.metrics.port,
            ConfigDefaults::METRICS_PORT,
        )?;

        let log_format = ConfigMerger::merge_string(
            "LOG_FORMAT",
            yaml.logging.format.clone(),
            ConfigDefaults::LOG_FORMAT,
        )
        .parse::<LogFormat>()?;
        let log_level = ConfigMerger::merge_string(
            "LOG_LEVEL",
            yaml.logging.level.clone(),
            ConfigDefaults::LOG_LEVEL,
        );

        let config = Config {
            target_url,
            request_timeout,
            skip_tls_verify,
            custom_headers,
            num_users,
            spawn_rate,
            user_profiles,
            test_duration,
            wait: WaitTime::new(min_wait, max_wait),
            tolerance: TolerancePolicy {
                checkout_total_threshold,
            },
            metrics_port,
            log_format,
            log_level,
            weight_overrides: WeightOverrides::new(yaml.task_weights.clone()),
            config_file: None,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks ranges and cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_url.starts_with("http://") || self.target_url.starts_with("https://")) {
            return Err(ConfigError::invalid(
                "TARGET_URL",
                format!("'{}' must start with http:// or https://", self.target_url),
            ));
        }

        if self.num_users == 0 {
            return Err(ConfigError::invalid("NUM_USERS", "must be greater than 0"));
        }

        if !self.spawn_rate.is_finite() || self.spawn_rate < 0.0 {
            return Err(ConfigError::invalid("SPAWN_RATE", "must be 0 or a positive number"));
        }

        if self.test_duration.is_zero() {
            return Err(ConfigError::invalid("TEST_DURATION", "must be greater than 0"));
        }

        if self.wait.min > self.wait.max {
            return Err(ConfigError::invalid(
                "MIN_WAIT",
                format!(
                    "{:?} is greater than MAX_WAIT {:?}",
                    self.wait.min, self.wait.max
                ),
            ));
        }

        let threshold = self.tolerance.checkout_total_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::invalid(
                "CHECKOUT_TOTAL_THRESHOLD",
                "must be 0 or a positive number",
            ));
        }

        if self.user_profiles.is_empty() {
            return Err(ConfigError::invalid("USER_PROFILES", "at least one profile is required"));
        }

        parse_custom_headers(self.custom_headers.as_deref())?;

        Ok(())
    }

    /// Creates a ClientConfig from this Config.
    pub fn to_client_config(&self) -> ClientConfig {
        ClientConfig {
            timeout: self.request_timeout,
            skip_tls_verify: self.skip_tls_verify,
            custom_headers: self.custom_headers.clone(),
        }
    }

    /// Prints the configuration summary.
    pub fn print_summary(&self) {
        println!("Starting load test:");
        println!("  Target URL: {}", self.target_url);
        if let Some(ref path) = self.config_file {
            println!("  Config File: {}", path);
        }
        println!("  Virtual Users: {}", self.num_users);
        if self.spawn_rate > 0.0 {
            println!("  Spawn Rate: {} users/s", self.spawn_rate);
        } else {
            println!("  Spawn Rate: all at once");
        }
        let profiles: Vec<String> = self
            .user_profiles
            .iter()
            .map(|(p, w)| format!("{}={}", p, w))
            .collect();
        println!("  User Profiles: {}", profiles.join(","));
        println!("  Overall Test Duration: {:?}", self.test_duration);
        println!("  Wait Between Tasks: {:?} - {:?}", self.wait.min, self.wait.max);
        println!(
            "  Checkout 406 Tolerated Above Total: {}",
            self.tolerance.checkout_total_threshold
        );
        println!("  Request Timeout: {:?}", self.request_timeout);
        println!("  Skip TLS Verify: {}", self.skip_tls_verify);

        match parse_custom_headers(self.custom_headers.as_deref()) {
            Ok(headers) if !headers.is_empty() => {
                println!("  Custom Headers Enabled: Yes");
                for (name, value) in headers.iter() {
                    println!(
                        "    {}: {}",
                        name,
                        value.to_str().unwrap_or("<non-ASCII or sensitive value>")
                    );
                }
            }
            _ => println!("  Custom Headers Enabled: No"),
        }

        if self.weight_overrides.is_empty() {
            println!("  Task Weight Overrides: none");
        } else {
            println!("  Task Weight Overrides: {}", self.weight_overrides.len());
        }

        if self.metrics_port == 0 {
            println!("  Metrics Server: disabled");
        } else {
            println!("  Metrics Server: port {}", self.metrics_port);
        }
    }

    /// Number of users per profile after allocation.
    pub fn profile_counts(&self, allocation: &[UserProfile]) -> HashMap<UserProfile, usize> {
        let mut counts = HashMap::new();
        for profile in allocation {
            *counts.entry(*profile).or_insert(0) += 1;
        }
        counts
    }
}

fn yaml_duration(value: &Option<YamlDuration>, field: &str) -> Result<Option<Duration>, ConfigError> {
    value.as_ref().map(|d| d.to_std_duration(field)).transpose()
}
