//! Experiment runner — simulate every condition of an `ExperimentConfig`.
//!
//! Each repetition runs all conditions interleaved against simulated
//! listeners. Listener RNGs come from the `RngHierarchy`, keyed by
//! `(experiment_id, condition, repetition)`, so a given config and seed always
//! reproduce the same sessions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use stairlab_core::{ConfigError as StaircaseConfigError, StaircaseController, TracingObserver};

use crate::config::{ConditionConfig, ConfigError, ExperimentConfig};
use crate::interleave::{run_interleaved, InterleavedResult, Track};
use crate::listener::{ListenerError, SimulatedListener};
use crate::rng::RngHierarchy;
use crate::session::{run_session, SessionResult, SCHEMA_VERSION};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("staircase error: {0}")]
    Staircase(#[from] StaircaseConfigError),
    #[error("listener error: {0}")]
    Listener(#[from] ListenerError),
    #[error("condition '{0}' not found in experiment")]
    UnknownCondition(String),
}

/// Result of a full simulated experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub experiment_id: String,
    pub created_at: DateTime<Utc>,
    pub seed: u64,
    /// One interleaved run per repetition.
    pub repetitions: Vec<InterleavedResult>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl ExperimentResult {
    pub fn sessions(&self) -> impl Iterator<Item = &SessionResult> {
        self.repetitions.iter().flat_map(|r| r.sessions.iter())
    }

    pub fn finished_count(&self) -> usize {
        self.sessions().filter(|s| s.finished()).count()
    }
}

/// Build a seeded listener and a traced controller for one condition.
fn prepare(
    condition: &ConditionConfig,
    rngs: &RngHierarchy,
    experiment_id: &str,
    repetition: usize,
) -> Result<(StaircaseController, SimulatedListener, u64), RunError> {
    let seed = rngs.sub_seed(experiment_id, &condition.name, repetition as u64);
    let listener = SimulatedListener::new(
        condition.listener.clone(),
        rngs.rng_for(experiment_id, &condition.name, repetition as u64),
    )?;
    let controller = StaircaseController::new(condition.staircase.clone())?
        .with_observer(TracingObserver::new(condition.name.clone()));
    Ok((controller, listener, seed))
}

/// Simulate every condition, interleaved, for each configured repetition.
pub fn run_experiment(config: &ExperimentConfig) -> Result<ExperimentResult, RunError> {
    config.validate()?;
    let experiment_id = config.experiment_id();
    let rngs = RngHierarchy::new(config.run.seed);

    tracing::info!(
        experiment_id = %experiment_id,
        conditions = config.conditions.len(),
        repetitions = config.run.repetitions,
        seed = config.run.seed,
        "experiment start"
    );

    let mut repetitions = Vec::with_capacity(config.run.repetitions);
    for repetition in 0..config.run.repetitions {
        let mut tracks = Vec::with_capacity(config.conditions.len());
        for condition in &config.conditions {
            let (controller, listener, seed) =
                prepare(condition, &rngs, &experiment_id, repetition)?;
            tracks.push(
                Track::new(
                    condition.name.clone(),
                    controller,
                    Box::new(listener),
                    condition.threshold_rule,
                )
                .with_seed(seed),
            );
        }
        repetitions.push(run_interleaved(tracks, config.run.max_trials, repetition));
    }

    let result = ExperimentResult {
        schema_version: SCHEMA_VERSION,
        experiment_id,
        created_at: Utc::now(),
        seed: config.run.seed,
        repetitions,
    };
    tracing::info!(
        sessions = result.sessions().count(),
        finished = result.finished_count(),
        "experiment complete"
    );
    Ok(result)
}

/// Simulate a single condition on its own (no interleaving).
pub fn run_condition(
    config: &ExperimentConfig,
    name: &str,
    repetition: usize,
) -> Result<SessionResult, RunError> {
    let condition = config
        .condition(name)
        .ok_or_else(|| RunError::UnknownCondition(name.to_string()))?;
    let experiment_id = config.experiment_id();
    let rngs = RngHierarchy::new(config.run.seed);
    let (controller, mut listener, seed) = prepare(condition, &rngs, &experiment_id, repetition)?;
    let result = run_session(
        &condition.name,
        controller,
        &mut listener,
        config.run.max_trials,
        condition.threshold_rule,
    );
    Ok(result.with_seed(seed).with_repetition(repetition))
}
