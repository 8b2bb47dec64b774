//! Session driver — the trial loop around a single staircase.
//!
//! Presents `current_level` to a `Responder`, feeds the answer back to the
//! controller, and stops when the staircase finishes, the trial cap is hit,
//! or the responder has nothing more to say.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use stairlab_core::{
    estimate_threshold, Response, StaircaseConfig, StaircaseController, ThresholdEstimate,
    ThresholdRule, TrialRecord,
};

/// Current schema version for persisted session artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Anything that can answer a trial presented at a given level.
///
/// Returning `None` ends the session early (scripted input ran out, the
/// experimenter aborted, ...).
pub trait Responder {
    fn respond(&mut self, level: f64) -> Option<Response>;
}

impl<R: Responder + ?Sized> Responder for Box<R> {
    fn respond(&mut self, level: f64) -> Option<Response> {
        (**self).respond(level)
    }
}

/// Replays a fixed list of responses, ignoring the presented level.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResponder {
    responses: VecDeque<Response>,
}

impl ScriptedResponder {
    pub fn new(responses: impl IntoIterator<Item = Response>) -> Self {
        Self {
            responses: responses.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.responses.len()
    }
}

impl Responder for ScriptedResponder {
    fn respond(&mut self, _level: f64) -> Option<Response> {
        self.responses.pop_front()
    }
}

/// Why a session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The staircase met its trial and reversal minimums.
    Finished,
    /// The trial cap was reached first.
    TrialCap,
    /// The responder stopped answering.
    ResponderExhausted,
}

/// Complete record of one staircase session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub condition: String,
    #[serde(default)]
    pub repetition: usize,
    /// Seed of the simulated listener, if one was used.
    pub seed: Option<u64>,
    pub config: StaircaseConfig,
    pub records: Vec<TrialRecord>,
    pub final_level: f64,
    pub trial_count: usize,
    pub reversal_count: usize,
    pub stop_reason: StopReason,
    pub threshold_rule: ThresholdRule,
    pub threshold: Option<ThresholdEstimate>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl SessionResult {
    /// Summarise a controller's run.
    pub fn from_controller(
        condition: impl Into<String>,
        controller: &StaircaseController,
        stop_reason: StopReason,
        rule: ThresholdRule,
    ) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            condition: condition.into(),
            repetition: 0,
            seed: None,
            config: controller.config().clone(),
            records: controller.log().all().to_vec(),
            final_level: controller.current_level(),
            trial_count: controller.trial_count(),
            reversal_count: controller.reversal_count(),
            stop_reason,
            threshold_rule: rule,
            threshold: estimate_threshold(controller.log(), rule),
        }
    }

    pub fn finished(&self) -> bool {
        self.stop_reason == StopReason::Finished
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_repetition(mut self, repetition: usize) -> Self {
        self.repetition = repetition;
        self
    }
}

/// Advance `controller` by one trial. Returns the stop reason if the session
/// is over after (or instead of) this trial.
pub(crate) fn step<R: Responder + ?Sized>(
    controller: &mut StaircaseController,
    responder: &mut R,
    max_trials: usize,
) -> Option<StopReason> {
    if controller.is_finished() {
        return Some(StopReason::Finished);
    }
    if controller.trial_count() >= max_trials {
        return Some(StopReason::TrialCap);
    }
    let response = match responder.respond(controller.current_level()) {
        Some(r) => r,
        None => return Some(StopReason::ResponderExhausted),
    };
    controller.record_response(response);
    if controller.is_finished() {
        Some(StopReason::Finished)
    } else if controller.trial_count() >= max_trials {
        Some(StopReason::TrialCap)
    } else {
        None
    }
}

/// Drive one staircase to completion.
pub fn run_session<R: Responder + ?Sized>(
    condition: &str,
    mut controller: StaircaseController,
    responder: &mut R,
    max_trials: usize,
    rule: ThresholdRule,
) -> SessionResult {
    tracing::debug!(condition, max_trials, start = controller.current_level(), "session start");

    let stop_reason = loop {
        if let Some(reason) = step(&mut controller, responder, max_trials) {
            break reason;
        }
    };

    let result = SessionResult::from_controller(condition, &controller, stop_reason, rule);
    log_outcome(&result);
    result
}

pub(crate) fn log_outcome(result: &SessionResult) {
    match result.stop_reason {
        StopReason::Finished => tracing::info!(
            condition = %result.condition,
            repetition = result.repetition,
            trials = result.trial_count,
            reversals = result.reversal_count,
            threshold = result.threshold.map(|t| t.mean),
            "session finished"
        ),
        StopReason::TrialCap => tracing::warn!(
            condition = %result.condition,
            repetition = result.repetition,
            trials = result.trial_count,
            reversals = result.reversal_count,
            "session hit trial cap before converging"
        ),
        StopReason::ResponderExhausted => tracing::info!(
            condition = %result.condition,
            repetition = result.repetition,
            trials = result.trial_count,
            "session ended: no further responses"
        ),
    }
}
