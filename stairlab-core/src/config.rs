//! Staircase configuration and validation.
//!
//! A `StaircaseConfig` is plain data that can be built in code or loaded from
//! TOML. `validate()` is run by `StaircaseController::new`, so an invalid
//! configuration never produces a controller.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors raised while loading or validating a staircase configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error(
        "the number of reversals must be equal to or greater than the number of step sizes: \
         found {step_sizes} step sizes but {reversals} reversal(s)"
    )]
    InsufficientReversals { step_sizes: usize, reversals: usize },

    #[error("step_sizes must contain at least one entry")]
    EmptyStepSchedule,

    #[error("step size at index {index} must be finite and non-negative, got {value}")]
    InvalidStepSize { index: usize, value: f64 },

    #[error("up/down rule must be at least 1-up/1-down, got {n_up}-up/{n_down}-down")]
    InvalidRule { n_up: u32, n_down: u32 },

    #[error("min_level ({min}) must not exceed max_level ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("start_level {start} lies outside [{min}, {max}]")]
    StartOutOfBounds { start: f64, min: f64, max: f64 },

    #[error("{0} must be a finite number")]
    NonFinite(&'static str),

    #[error("parse staircase TOML: {0}")]
    Parse(String),

    #[error("read staircase config: {0}")]
    Io(String),
}

/// Parameters of one adaptive staircase run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaircaseConfig {
    /// Level presented on the first trial.
    pub start_level: f64,

    /// Step magnitude indexed by reversal count. The last entry is reused once
    /// the reversal count runs past the end of the schedule.
    pub step_sizes: Vec<f64>,

    /// Nominal up rule. Not consulted when moving the level: a single
    /// incorrect response always raises it.
    pub n_up: u32,

    /// Consecutive correct responses required to lower the level.
    pub n_down: u32,

    /// Minimum number of trials before the run may finish.
    pub n_trials: usize,

    /// Minimum number of reversals before the run may finish.
    pub n_reversals: usize,

    /// Use 1-down until the first reversal, then `n_down`.
    #[serde(default)]
    pub rapid_descend: bool,

    pub min_level: f64,
    pub max_level: f64,
}

impl StaircaseConfig {
    /// Check every structural constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("start_level", self.start_level),
            ("min_level", self.min_level),
            ("max_level", self.max_level),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::NonFinite(name));
            }
        }

        if self.step_sizes.is_empty() {
            return Err(ConfigError::EmptyStepSchedule);
        }
        if let Some((index, &value)) = self
            .step_sizes
            .iter()
            .enumerate()
            .find(|(_, s)| !s.is_finite() || **s < 0.0)
        {
            return Err(ConfigError::InvalidStepSize { index, value });
        }

        if self.n_reversals < self.step_sizes.len() {
            return Err(ConfigError::InsufficientReversals {
                step_sizes: self.step_sizes.len(),
                reversals: self.n_reversals,
            });
        }

        if self.n_up == 0 || self.n_down == 0 {
            return Err(ConfigError::InvalidRule {
                n_up: self.n_up,
                n_down: self.n_down,
            });
        }

        if self.min_level > self.max_level {
            return Err(ConfigError::InvalidBounds {
                min: self.min_level,
                max: self.max_level,
            });
        }
        if self.start_level < self.min_level || self.start_level > self.max_level {
            return Err(ConfigError::StartOutOfBounds {
                start: self.start_level,
                min: self.min_level,
                max: self.max_level,
            });
        }

        Ok(())
    }

    /// Parse and validate a config from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Step size used at a given reversal count.
    pub fn step_size_for(&self, reversal_count: usize) -> f64 {
        self.step_sizes[self.step_index_for(reversal_count)]
    }

    /// Schedule position for a given reversal count, saturating at the last entry.
    pub fn step_index_for(&self, reversal_count: usize) -> usize {
        reversal_count.min(self.step_sizes.len().saturating_sub(1))
    }

    /// The up/down rule in force before the first reversal.
    pub fn initial_n_down(&self) -> u32 {
        if self.rapid_descend {
            1
        } else {
            self.n_down
        }
    }
}

impl Default for StaircaseConfig {
    /// 1-up/2-down staircase converging on ~70.7% correct.
    fn default() -> Self {
        Self {
            start_level: 60.0,
            step_sizes: vec![8.0, 4.0],
            n_up: 1,
            n_down: 2,
            n_trials: 10,
            n_reversals: 2,
            rapid_descend: false,
            min_level: 50.0,
            max_level: 80.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(StaircaseConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_too_few_reversals() {
        let config = StaircaseConfig {
            step_sizes: vec![8.0, 8.0, 4.0, 4.0],
            n_reversals: 2,
            rapid_descend: true,
            ..StaircaseConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InsufficientReversals {
                step_sizes: 4,
                reversals: 2
            })
        );
    }

    #[test]
    fn reversals_equal_to_schedule_length_is_allowed() {
        let config = StaircaseConfig {
            step_sizes: vec![8.0, 8.0, 4.0, 4.0],
            n_reversals: 4,
            ..StaircaseConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staircase.toml");
        let config = StaircaseConfig {
            rapid_descend: true,
            ..StaircaseConfig::default()
        };
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();
        assert_eq!(StaircaseConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn from_file_validates_and_reports_io() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        let config = StaircaseConfig {
            n_reversals: 1,
            ..StaircaseConfig::default()
        };
        std::fs::write(&path, config.to_toml().unwrap()).unwrap();
        assert!(matches!(
            StaircaseConfig::from_file(&path),
            Err(ConfigError::InsufficientReversals { .. })
        ));

        let missing = dir.path().join("missing.toml");
        match StaircaseConfig::from_file(&missing) {
            Err(ConfigError::Io(msg)) => assert!(msg.contains("missing.toml")),
            other => panic!("expected Io error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_schedule() {
        let config = StaircaseConfig {
            step_sizes: vec![],
            ..StaircaseConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::EmptyStepSchedule));
    }

    #[test]
    fn rejects_negative_or_nan_step() {
        let config = StaircaseConfig {
            step_sizes: vec![8.0, -4.0],
            ..StaircaseConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStepSize { index: 1, .. })
        ));

        let config = StaircaseConfig {
            step_sizes: vec![f64::NAN],
            ..StaircaseConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidStepSize { index: 0, .. })
        ));
    }

    #[test]
    fn rejects_zero_rule() {
        let config = StaircaseConfig {
            n_down: 0,
            ..StaircaseConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRule { .. })));
    }

    #[test]
    fn rejects_bad_bounds() {
        let inverted = StaircaseConfig {
            min_level: 90.0,
            max_level: 80.0,
            ..StaircaseConfig::default()
        };
        assert!(matches!(inverted.validate(), Err(ConfigError::InvalidBounds { .. })));

        let outside = StaircaseConfig {
            start_level: 85.0,
            ..StaircaseConfig::default()
        };
        assert!(matches!(outside.validate(), Err(ConfigError::StartOutOfBounds { .. })));

        let infinite = StaircaseConfig {
            max_level: f64::INFINITY,
            ..StaircaseConfig::default()
        };
        assert_eq!(infinite.validate(), Err(ConfigError::NonFinite("max_level")));
    }

    #[test]
    fn step_index_saturates() {
        let config = StaircaseConfig::default();
        assert_eq!(config.step_index_for(0), 0);
        assert_eq!(config.step_index_for(1), 1);
        assert_eq!(config.step_index_for(7), 1);
        assert_eq!(config.step_size_for(0), 8.0);
        assert_eq!(config.step_size_for(5), 4.0);
    }

    #[test]
    fn initial_rule_honours_rapid_descend() {
        let mut config = StaircaseConfig::default();
        assert_eq!(config.initial_n_down(), 2);
        config.rapid_descend = true;
        assert_eq!(config.initial_n_down(), 1);
    }

    #[test]
    fn toml_roundtrip() {
        let config = StaircaseConfig {
            rapid_descend: true,
            ..StaircaseConfig::default()
        };
        let toml_str = config.to_toml().unwrap();
        let parsed = StaircaseConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn toml_defaults_rapid_descend_to_false() {
        let toml_str = r#"
start_level = 60.0
step_sizes = [8.0, 4.0]
n_up = 1
n_down = 2
n_trials = 10
n_reversals = 2
min_level = 50.0
max_level = 80.0
"#;
        let config = StaircaseConfig::from_toml(toml_str).unwrap();
        assert!(!config.rapid_descend);
    }

    #[test]
    fn toml_is_validated() {
        let toml_str = r#"
start_level = 60.0
step_sizes = [8.0, 8.0, 4.0, 4.0]
n_up = 1
n_down = 2
n_trials = 10
n_reversals = 2
min_level = 50.0
max_level = 80.0
"#;
        assert!(matches!(
            StaircaseConfig::from_toml(toml_str),
            Err(ConfigError::InsufficientReversals { .. })
        ));
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            StaircaseConfig::from_toml("start_level = \"loud\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
