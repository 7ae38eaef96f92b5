//! YAML configuration file support.
//!
//! Every field is optional; values missing here fall back to environment
//! variables and then to defaults (see [`crate::config`]).
//!
//! ```yaml
//! target:
//!   baseUrl: http://front-end.sock-shop
//!   timeout: 30s
//! users:
//!   count: 50
//!   spawnRate: 5
//!   profiles: web=3,api=1,errorhandling=1
//! duration: 30m
//! wait:
//!   min: 3000ms
//!   max: 15000ms
//! checkout:
//!   toleratedTotalAbove: 100
//! taskWeights:
//!   cart_page.checkout: 10
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::errors::ConfigError;
use crate::utils::{parse_duration_string, parse_weighted_list};

/// Duration in YAML: a bare number of seconds, or a string such as "500ms" or "2h".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YamlDuration {
    Seconds(u64),
    String(String),
}

impl YamlDuration {
    pub fn to_std_duration(&self, field: &str) -> Result<Duration, ConfigError> {
        match self {
            YamlDuration::Seconds(s) => Ok(Duration::from_secs(*s)),
            YamlDuration::String(s) => parse_duration_string(s)
                .map_err(|e| ConfigError::invalid(field, format!("'{}': {}", s, e))),
        }
    }
}

/// Profile mix: either "web=3,api=1" or a map of profile name to weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YamlProfiles {
    List(String),
    Weights(BTreeMap<String, u32>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YamlTarget {
    pub base_url: Option<String>,
    pub timeout: Option<YamlDuration>,
    pub skip_tls_verify: Option<bool>,
    pub custom_headers: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YamlUsers {
    pub count: Option<usize>,
    pub spawn_rate: Option<f64>,
    pub profiles: Option<YamlProfiles>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YamlWait {
    pub min: Option<YamlDuration>,
    pub max: Option<YamlDuration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YamlCheckout {
    pub tolerated_total_above: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YamlMetrics {
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YamlLogging {
    pub format: Option<String>,
    pub level: Option<String>,
}

/// Root of the YAML configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct YamlConfig {
    #[serde(default)]
    pub target: YamlTarget,

    #[serde(default)]
    pub users: YamlUsers,

    pub duration: Option<YamlDuration>,

    #[serde(default)]
    pub wait: YamlWait,

    #[serde(default)]
    pub checkout: YamlCheckout,

    #[serde(default)]
    pub metrics: YamlMetrics,

    #[serde(default)]
    pub logging: YamlLogging,

    /// `"<group>.<task>": weight`
    #[serde(default)]
    pub task_weights: HashMap<String, u32>,
}

impl YamlConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Profile mix as "name=weight" pairs, in file order for the string form.
    pub fn profile_weights(&self) -> Result<Option<Vec<(String, u32)>>, ConfigError> {
        match self.users.profiles.as_ref() {
            None => Ok(None),
            Some(YamlProfiles::List(s)) => parse_weighted_list(s)
                .map(Some)
                .map_err(|e| ConfigError::invalid("users.profiles", e)),
            Some(YamlProfiles::Weights(map)) => {
                Ok(Some(map.iter().map(|(k, v)| (k.clone(), *v)).collect()))
            }
        }
    }
}
