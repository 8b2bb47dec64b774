//! Simulated listener — logistic psychometric function with guessing and lapses.
//!
//! `p(correct | level) = guess + (1 - guess - lapse) / (1 + exp(-slope * (level - threshold)))`
//!
//! Higher levels are easier (the staircase lowers the level after correct
//! responses). Sampling uses a seeded `StdRng` so sessions are reproducible.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stairlab_core::Response;

use crate::session::Responder;

/// Errors from listener parameter validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ListenerError {
    #[error("threshold must be finite, got {0}")]
    NonFiniteThreshold(f64),
    #[error("slope must be finite and > 0, got {0}")]
    InvalidSlope(f64),
    #[error("{name} must lie in [0, 1), got {value}")]
    RateOutOfRange { name: &'static str, value: f64 },
    #[error("guess_rate + lapse_rate must be < 1, got {0}")]
    RatesTooLarge(f64),
}

/// Psychometric function parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Level at the midpoint of the logistic.
    pub threshold: f64,
    /// Logistic slope per level unit.
    pub slope: f64,
    /// Floor of the function (e.g. 0.5 for 2AFC).
    #[serde(default)]
    pub guess_rate: f64,
    /// Probability of missing a clearly audible stimulus.
    #[serde(default)]
    pub lapse_rate: f64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            threshold: 40.0,
            slope: 0.5,
            guess_rate: 0.0,
            lapse_rate: 0.0,
        }
    }
}

impl ListenerConfig {
    pub fn validate(&self) -> Result<(), ListenerError> {
        if !self.threshold.is_finite() {
            return Err(ListenerError::NonFiniteThreshold(self.threshold));
        }
        if !self.slope.is_finite() || self.slope <= 0.0 {
            return Err(ListenerError::InvalidSlope(self.slope));
        }
        for (name, value) in [("guess_rate", self.guess_rate), ("lapse_rate", self.lapse_rate)] {
            if !(0.0..1.0).contains(&value) {
                return Err(ListenerError::RateOutOfRange { name, value });
            }
        }
        let total = self.guess_rate + self.lapse_rate;
        if total >= 1.0 {
            return Err(ListenerError::RatesTooLarge(total));
        }
        Ok(())
    }

    /// Probability of a correct response at `level`.
    pub fn p_correct(&self, level: f64) -> f64 {
        let core = 1.0 / (1.0 + (-self.slope * (level - self.threshold)).exp());
        self.guess_rate + (1.0 - self.guess_rate - self.lapse_rate) * core
    }

    /// Level at which `p_correct` reaches `target`, if reachable.
    ///
    /// Used to compare a staircase's estimate against the level it should
    /// converge on (e.g. 0.7071 for 1-up/2-down).
    pub fn level_for(&self, target: f64) -> Option<f64> {
        let span = 1.0 - self.guess_rate - self.lapse_rate;
        let core = (target - self.guess_rate) / span;
        if core <= 0.0 || core >= 1.0 {
            return None;
        }
        Some(self.threshold - (1.0 / core - 1.0).ln() / self.slope)
    }
}

/// A listener that answers from a psychometric function.
#[derive(Debug, Clone)]
pub struct SimulatedListener {
    config: ListenerConfig,
    rng: StdRng,
}

impl SimulatedListener {
    pub fn new(config: ListenerConfig, rng: StdRng) -> Result<Self, ListenerError> {
        config.validate()?;
        Ok(Self { config, rng })
    }

    pub fn config(&self) -> &ListenerConfig {
        &self.config
    }

    pub fn respond_at(&mut self, level: f64) -> Response {
        let p = self.config.p_correct(level);
        Response::from(self.rng.gen::<f64>() < p)
    }
}

impl Responder for SimulatedListener {
    fn respond(&mut self, level: f64) -> Option<Response> {
        Some(self.respond_at(level))
    }
}

/// Convergence point of a transformed n-down rule: `0.5^(1/n_down)`.
pub fn target_p_correct(n_down: u32) -> f64 {
    0.5_f64.powf(1.0 / n_down as f64)
}
