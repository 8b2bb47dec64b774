//! Serializable experiment configuration.
//!
//! An experiment is a set of named conditions, each with its own staircase and
//! simulated listener, plus run settings (seed, trial cap, repetitions).
//! Loaded from TOML:
//!
//! ```toml
//! [run]
//! seed = 42
//! max_trials = 200
//!
//! [[condition]]
//! name = "tone_1k"
//! [condition.staircase]
//! start_level = 60.0
//! step_sizes = [8.0, 4.0]
//! n_up = 1
//! n_down = 2
//! n_trials = 10
//! n_reversals = 6
//! min_level = 0.0
//! max_level = 80.0
//! [condition.listener]
//! threshold = 35.0
//! slope = 0.5
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stairlab_core::{ConfigError as StaircaseConfigError, StaircaseConfig, ThresholdRule};

use crate::listener::{ListenerConfig, ListenerError};

/// Errors from loading or validating an experiment config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("serialize config TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("experiment has no conditions")]
    NoConditions,
    #[error("condition names must be non-empty")]
    EmptyConditionName,
    #[error("condition name '{0}' may only contain letters, digits, '_', '-' and '.', and must not contain '..'")]
    InvalidConditionName(String),
    #[error("duplicate condition name '{0}'")]
    DuplicateCondition(String),
    #[error("condition '{condition}': {source}")]
    Staircase {
        condition: String,
        source: StaircaseConfigError,
    },
    #[error("condition '{condition}': {source}")]
    Listener {
        condition: String,
        source: ListenerError,
    },
    #[error("run.max_trials must be at least 1")]
    ZeroMaxTrials,
    #[error("run.repetitions must be at least 1")]
    ZeroRepetitions,
}

/// Settings shared by every condition of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    /// Master seed for the RNG hierarchy.
    #[serde(default)]
    pub seed: u64,
    /// Hard cap on trials per session; a staircase that has not finished by
    /// then is reported as truncated.
    #[serde(default = "default_max_trials")]
    pub max_trials: usize,
    /// How many times every condition is run.
    #[serde(default = "default_repetitions")]
    pub repetitions: usize,
}

fn default_max_trials() -> usize {
    500
}

fn default_repetitions() -> usize {
    1
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            max_trials: default_max_trials(),
            repetitions: default_repetitions(),
        }
    }
}

/// Condition names become artifact directory names, so they are restricted
/// to `[A-Za-z0-9_.-]` with no `..`.
pub fn is_valid_condition_name(name: &str) -> bool {
    !name.is_empty()
        && !name.contains("..")
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// One experimental condition: a staircase plus the listener that answers it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub name: String,
    pub staircase: StaircaseConfig,
    #[serde(default)]
    pub listener: ListenerConfig,
    #[serde(default)]
    pub threshold_rule: ThresholdRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub run: RunSettings,
    #[serde(rename = "condition")]
    pub conditions: Vec<ConditionConfig>,
}

impl ExperimentConfig {
    /// Load and validate an experiment from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate an experiment from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.conditions.is_empty() {
            return Err(ConfigError::NoConditions);
        }
        if self.run.max_trials == 0 {
            return Err(ConfigError::ZeroMaxTrials);
        }
        if self.run.repetitions == 0 {
            return Err(ConfigError::ZeroRepetitions);
        }

        let mut seen = HashSet::new();
        for condition in &self.conditions {
            if condition.name.trim().is_empty() {
                return Err(ConfigError::EmptyConditionName);
            }
            if !is_valid_condition_name(&condition.name) {
                return Err(ConfigError::InvalidConditionName(condition.name.clone()));
            }
            if !seen.insert(condition.name.as_str()) {
                return Err(ConfigError::DuplicateCondition(condition.name.clone()));
            }
            condition
                .staircase
                .validate()
                .map_err(|source| ConfigError::Staircase {
                    condition: condition.name.clone(),
                    source,
                })?;
            condition
                .listener
                .validate()
                .map_err(|source| ConfigError::Listener {
                    condition: condition.name.clone(),
                    source,
                })?;
        }
        Ok(())
    }

    pub fn condition(&self, name: &str) -> Option<&ConditionConfig> {
        self.conditions.iter().find(|c| c.name == name)
    }

    /// Deterministic content hash of this configuration.
    ///
    /// Two identical configs share an id; any parameter change produces a new one.
    pub fn experiment_id(&self) -> String {
        let json = serde_json::to_string(self).expect("ExperimentConfig serialization failed");
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}
