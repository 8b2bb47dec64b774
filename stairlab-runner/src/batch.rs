//! Monte Carlo batch — repeat simulated sessions to characterise a staircase.
//!
//! Runs are independent and executed in parallel with rayon. Each run's
//! listener seed is derived from its repetition index, so the summary does
//! not depend on thread count.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ExperimentConfig;
use crate::experiment::{run_condition, RunError};
use crate::listener::target_p_correct;
use crate::session::SessionResult;

/// Aggregate statistics over a batch of simulated sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub condition: String,
    pub runs: usize,
    pub finished_fraction: f64,
    pub mean_trials: f64,
    /// Number of runs that produced a threshold estimate.
    pub estimates: usize,
    pub threshold_mean: Option<f64>,
    pub threshold_std: Option<f64>,
    /// The listener's logistic midpoint.
    pub true_threshold: f64,
    /// Proportion correct the rule converges on.
    pub target_p_correct: f64,
    /// Listener level at `target_p_correct`.
    pub target_level: Option<f64>,
    /// `threshold_mean - target_level`.
    pub bias: Option<f64>,
}

/// Run `runs` independent sessions of one condition.
pub fn run_condition_batch(
    config: &ExperimentConfig,
    condition: &str,
    runs: usize,
) -> Result<Vec<SessionResult>, RunError> {
    (0..runs)
        .into_par_iter()
        .map(|repetition| run_condition(config, condition, repetition))
        .collect()
}

/// Summarise a batch against the condition's listener.
pub fn summarize(
    config: &ExperimentConfig,
    condition: &str,
    sessions: &[SessionResult],
) -> Result<BatchSummary, RunError> {
    let cond = config
        .condition(condition)
        .ok_or_else(|| RunError::UnknownCondition(condition.to_string()))?;

    let runs = sessions.len();
    let n = runs.max(1) as f64;
    let finished = sessions.iter().filter(|s| s.finished()).count();
    let total_trials: usize = sessions.iter().map(|s| s.trial_count).sum();

    let thresholds: Vec<f64> = sessions
        .iter()
        .filter_map(|s| s.threshold.map(|t| t.mean))
        .collect();
    let (threshold_mean, threshold_std) = mean_std(&thresholds);

    let target = target_p_correct(cond.staircase.n_down);
    let target_level = cond.listener.level_for(target);
    let bias = threshold_mean.zip(target_level).map(|(m, t)| m - t);

    Ok(BatchSummary {
        condition: condition.to_string(),
        runs,
        finished_fraction: finished as f64 / n,
        mean_trials: total_trials as f64 / n,
        estimates: thresholds.len(),
        threshold_mean,
        threshold_std,
        true_threshold: cond.listener.threshold,
        target_p_correct: target,
        target_level,
        bias,
    })
}

/// Batch every condition of the experiment, `runs` sessions each.
pub fn run_batch(config: &ExperimentConfig, runs: usize) -> Result<Vec<BatchSummary>, RunError> {
    config.validate()?;
    config
        .conditions
        .iter()
        .map(|c| {
            let sessions = run_condition_batch(config, &c.name, runs)?;
            let summary = summarize(config, &c.name, &sessions)?;
            tracing::info!(
                condition = %summary.condition,
                runs = summary.runs,
                finished_fraction = summary.finished_fraction,
                threshold_mean = summary.threshold_mean,
                bias = summary.bias,
                "batch summary"
            );
            Ok(summary)
        })
        .collect()
}

fn mean_std(values: &[f64]) -> (Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if values.len() < 2 {
        return (Some(mean), Some(0.0));
    }
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (Some(mean), Some(var.sqrt()))
}
