//! Interleaved staircases.
//!
//! Several independent staircases share one listener session: trials are
//! dealt round-robin across the tracks that are still running, so the
//! listener cannot follow any single track. Each track keeps its own
//! controller and stop condition.

use serde::{Deserialize, Serialize};

use stairlab_core::{StaircaseController, ThresholdRule, TrialRecord};

use crate::session::{log_outcome, step, Responder, SessionResult, StopReason};

/// One staircase taking part in an interleaved run.
pub struct Track {
    pub condition: String,
    pub controller: StaircaseController,
    pub responder: Box<dyn Responder + Send>,
    pub rule: ThresholdRule,
    pub seed: Option<u64>,
    stop: Option<StopReason>,
}

impl Track {
    pub fn new(
        condition: impl Into<String>,
        controller: StaircaseController,
        responder: Box<dyn Responder + Send>,
        rule: ThresholdRule,
    ) -> Self {
        Self {
            condition: condition.into(),
            controller,
            responder,
            rule,
            seed: None,
            stop: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn is_active(&self) -> bool {
        self.stop.is_none()
    }

    fn into_result(self, repetition: usize) -> SessionResult {
        let stop = self.stop.unwrap_or(StopReason::ResponderExhausted);
        let result = SessionResult::from_controller(self.condition, &self.controller, stop, self.rule)
            .with_repetition(repetition);
        match self.seed {
            Some(seed) => result.with_seed(seed),
            None => result,
        }
    }
}

/// A trial as it was presented in the interleaved sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterleavedTrial {
    /// Position in the overall presentation order, from 0.
    pub sequence: usize,
    pub condition: String,
    pub record: TrialRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterleavedResult {
    pub sessions: Vec<SessionResult>,
    pub sequence: Vec<InterleavedTrial>,
}

/// Run `tracks` round-robin until every one has stopped.
///
/// `max_trials` caps each track individually.
pub fn run_interleaved(tracks: Vec<Track>, max_trials: usize, repetition: usize) -> InterleavedResult {
    let mut tracks = tracks;
    let mut sequence = Vec::new();

    tracing::debug!(tracks = tracks.len(), max_trials, "interleaved run start");

    while tracks.iter().any(Track::is_active) {
        for track in tracks.iter_mut().filter(|t| t.is_active()) {
            let before = track.controller.trial_count();
            track.stop = step(&mut track.controller, &mut track.responder, max_trials);
            if track.controller.trial_count() > before {
                if let Some(record) = track.controller.log().last() {
                    sequence.push(InterleavedTrial {
                        sequence: sequence.len(),
                        condition: track.condition.clone(),
                        record: *record,
                    });
                }
            }
        }
    }

    let sessions: Vec<SessionResult> = tracks
        .into_iter()
        .map(|t| t.into_result(repetition))
        .collect();
    for session in &sessions {
        log_outcome(session);
    }

    InterleavedResult { sessions, sequence }
}
