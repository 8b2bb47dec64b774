//! Per-trial observer hook.
//!
//! The controller keeps no global diagnostic state. Anything that wants to
//! watch a run (logging, live plots, telemetry) registers a `TrialObserver`,
//! which is called once after every completed transition.

use crate::domain::{Response, TrialRecord};
use crate::staircase::StaircaseStatus;
use serde::{Deserialize, Serialize};

/// Snapshot of one completed transition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialEvent {
    pub trial_number: usize,
    /// Level the stimulus was presented at.
    pub level: f64,
    /// Level for the next trial, after adjustment and clamping.
    pub next_level: f64,
    pub response: Response,
    pub reversal: bool,
    pub reversal_count: usize,
    /// Step size in force for this trial.
    pub step_size: f64,
    pub status: StaircaseStatus,
    /// True only on the trial that moved the run from Running to Finished.
    pub just_finished: bool,
}

impl TrialEvent {
    pub fn record(&self) -> TrialRecord {
        TrialRecord {
            trial_number: self.trial_number,
            level: self.level,
            response: self.response,
            reversal: self.reversal,
        }
    }
}

/// Receives every transition of a controller.
pub trait TrialObserver: Send {
    fn on_trial(&mut self, event: &TrialEvent);
}

impl<F> TrialObserver for F
where
    F: FnMut(&TrialEvent) + Send,
{
    fn on_trial(&mut self, event: &TrialEvent) {
        self(event)
    }
}

/// Observer that forwards transitions to `tracing`.
///
/// Each trial is logged at `debug`; the finishing trial at `info`.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    label: String,
}

impl TracingObserver {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl TrialObserver for TracingObserver {
    fn on_trial(&mut self, event: &TrialEvent) {
        tracing::debug!(
            staircase = %self.label,
            trial = event.trial_number,
            level = event.level,
            next_level = event.next_level,
            response = %event.response,
            reversal = event.reversal,
            reversals = event.reversal_count,
            step = event.step_size,
            "trial recorded"
        );
        if event.just_finished {
            tracing::info!(
                staircase = %self.label,
                trials = event.trial_number + 1,
                reversals = event.reversal_count,
                final_level = event.next_level,
                "staircase complete"
            );
        }
    }
}
