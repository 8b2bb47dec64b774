//! Staircase controller state machine.
//!
//! Each call to `record_response` performs one transition, in this order:
//! 1. append the response to the full history
//! 2. detect a reversal on the tail of the history
//! 3. pick the step size from the reversal count (this trial included)
//! 4. push into the response window and move the level if the window calls for it
//! 5. clamp the level into `[min_level, max_level]`
//! 6. on the first reversal of a rapid-descend run, switch to the configured `n_down`
//! 7. evaluate termination
//! 8. append the trial to the log (with the level that was presented)
//! 9. advance the trial counter
//!
//! The order is load-bearing: the step index must be updated before the level
//! moves, and the rule switch must follow the level change.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, StaircaseConfig};
use crate::domain::{InvalidResponse, Response, TrialRecord};
use crate::staircase::observer::{TrialEvent, TrialObserver};
use crate::staircase::reversal::detect_reversal;
use crate::staircase::window::ResponseWindow;
use crate::trial_log::TrialLog;

/// Whether the run may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaircaseStatus {
    Running,
    Finished,
}

/// Mutable state of a run. Owned by the controller and exposed read-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaircaseState {
    pub current_level: f64,
    pub trial_count: usize,
    /// 1 during the rapid-descend phase, `n_down` otherwise.
    pub effective_n_down: u32,
    pub response_window: ResponseWindow,
    pub full_response_history: Vec<Response>,
    pub step_index: usize,
    pub reversal_count: usize,
    pub status: StaircaseStatus,
}

impl StaircaseState {
    fn initial(config: &StaircaseConfig) -> Self {
        Self {
            current_level: config.start_level,
            trial_count: 0,
            effective_n_down: config.initial_n_down(),
            response_window: ResponseWindow::new(),
            full_response_history: Vec::new(),
            step_index: 0,
            reversal_count: 0,
            status: StaircaseStatus::Running,
        }
    }

    /// Length of the history tail inspected for reversals.
    pub fn effective_n_back(&self) -> usize {
        self.effective_n_down as usize + 1
    }
}

/// Adaptive staircase over a single run.
pub struct StaircaseController {
    config: StaircaseConfig,
    state: StaircaseState,
    log: TrialLog,
    observer: Option<Box<dyn TrialObserver>>,
}

impl StaircaseController {
    /// Validate `config` and start a run at `config.start_level`.
    pub fn new(config: StaircaseConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let state = StaircaseState::initial(&config);
        Ok(Self {
            config,
            state,
            log: TrialLog::new(),
            observer: None,
        })
    }

    /// Attach an observer that is called after every transition.
    pub fn with_observer(mut self, observer: impl TrialObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn set_observer(&mut self, observer: Option<Box<dyn TrialObserver>>) {
        self.observer = observer;
    }

    /// Build a controller and feed it `responses` in order.
    pub fn replay<I>(config: StaircaseConfig, responses: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = Response>,
    {
        let mut controller = Self::new(config)?;
        for response in responses {
            controller.record_response(response);
        }
        Ok(controller)
    }

    // ── Transition ─────────────────────────────────────────────────────

    /// Record a response given as an integer score (+1 / -1).
    ///
    /// Any other score is rejected before any state is touched.
    pub fn record_score(&mut self, score: i64) -> Result<TrialRecord, InvalidResponse> {
        let response = Response::try_from(score)?;
        Ok(self.record_response(response))
    }

    /// Apply one trial's response and return the record appended to the log.
    pub fn record_response(&mut self, response: Response) -> TrialRecord {
        let presented = self.state.current_level;
        let n_down = self.state.effective_n_down as usize;

        self.state.full_response_history.push(response);

        let reversal = detect_reversal(
            &self.state.full_response_history,
            self.state.effective_n_back(),
            n_down,
        );
        if reversal {
            self.state.reversal_count += 1;
        }

        self.state.step_index = self.config.step_index_for(self.state.reversal_count);
        let step = self.config.step_sizes[self.state.step_index];

        self.state.response_window.push(response);
        if self.state.response_window.is_correct_run(n_down) {
            self.state.current_level -= step;
            self.state.response_window.clear();
        } else if self.state.response_window.contains_incorrect() {
            self.state.current_level += step;
            self.state.response_window.clear();
        }
        debug_assert!(self.state.response_window.len() < n_down.max(1));

        self.state.current_level = self
            .state
            .current_level
            .clamp(self.config.min_level, self.config.max_level);

        if self.config.rapid_descend && reversal && self.state.reversal_count == 1 {
            self.state.effective_n_down = self.config.n_down;
        }

        let mut just_finished = false;
        if self.state.status == StaircaseStatus::Running
            && self.state.trial_count + 1 >= self.config.n_trials
            && self.state.reversal_count >= self.config.n_reversals
        {
            self.state.status = StaircaseStatus::Finished;
            just_finished = true;
        }

        let record = TrialRecord {
            trial_number: self.state.trial_count,
            level: presented,
            response,
            reversal,
        };
        self.log.append(record);
        self.state.trial_count += 1;

        if let Some(observer) = self.observer.as_mut() {
            observer.on_trial(&TrialEvent {
                trial_number: record.trial_number,
                level: presented,
                next_level: self.state.current_level,
                response,
                reversal,
                reversal_count: self.state.reversal_count,
                step_size: step,
                status: self.state.status,
                just_finished,
            });
        }

        record
    }

    // ── Accessors ──────────────────────────────────────────────────────

    /// Level to present on the next trial.
    pub fn current_level(&self) -> f64 {
        self.state.current_level
    }

    pub fn trial_count(&self) -> usize {
        self.state.trial_count
    }

    pub fn status(&self) -> StaircaseStatus {
        self.state.status
    }

    pub fn is_finished(&self) -> bool {
        self.state.status == StaircaseStatus::Finished
    }

    pub fn reversal_count(&self) -> usize {
        self.state.reversal_count
    }

    pub fn step_index(&self) -> usize {
        self.state.step_index
    }

    /// Step size at the current schedule position.
    pub fn current_step_size(&self) -> f64 {
        self.config.step_sizes[self.state.step_index]
    }

    pub fn effective_n_down(&self) -> u32 {
        self.state.effective_n_down
    }

    pub fn effective_n_back(&self) -> usize {
        self.state.effective_n_back()
    }

    pub fn config(&self) -> &StaircaseConfig {
        &self.config
    }

    pub fn state(&self) -> &StaircaseState {
        &self.state
    }

    pub fn log(&self) -> &TrialLog {
        &self.log
    }

    /// Consume the controller, keeping its trial log for archiving.
    pub fn into_log(self) -> TrialLog {
        self.log
    }
}

impl fmt::Debug for StaircaseController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaircaseController")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("trials", &self.log.len())
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use Response::{Correct as C, Incorrect as I};

    fn controller() -> StaircaseController {
        StaircaseController::new(StaircaseConfig::default()).unwrap()
    }

    #[test]
    fn initial_state() {
        let s = controller();
        assert_eq!(s.current_level(), 60.0);
        assert_eq!(s.trial_count(), 0);
        assert_eq!(s.step_index(), 0);
        assert_eq!(s.effective_n_down(), 2);
        assert_eq!(s.effective_n_back(), 3);
        assert_eq!(s.status(), StaircaseStatus::Running);
        assert!(s.state().response_window.is_empty());
        assert!(s.log().is_empty());
    }

    #[test]
    fn rapid_descend_starts_one_down() {
        let config = StaircaseConfig {
            rapid_descend: true,
            ..StaircaseConfig::default()
        };
        let s = StaircaseController::new(config).unwrap();
        assert_eq!(s.effective_n_down(), 1);
        assert_eq!(s.effective_n_back(), 2);
    }

    #[test]
    fn window_accumulates_until_run_completes() {
        let mut s = controller();
        s.record_response(C);
        assert_eq!(s.state().response_window.as_slice(), &[C]);
        assert_eq!(s.current_level(), 60.0);
        s.record_response(C);
        assert!(s.state().response_window.is_empty());
        assert_eq!(s.current_level(), 52.0);
    }

    #[test]
    fn incorrect_clears_window() {
        let mut s = controller();
        s.record_response(C);
        s.record_response(I);
        assert!(s.state().response_window.is_empty());
        // [C, I] is not a 2-down reversal pattern: step stays 8.
        assert_eq!(s.current_level(), 68.0);
        assert_eq!(s.reversal_count(), 0);
    }

    #[test]
    fn invalid_score_leaves_state_untouched() {
        let mut s = controller();
        s.record_response(C);
        let before = s.state().clone();
        let log_before = s.log().clone();

        assert_eq!(s.record_score(0), Err(InvalidResponse(0)));
        assert_eq!(s.record_score(2), Err(InvalidResponse(2)));

        assert_eq!(s.state(), &before);
        assert_eq!(s.log(), &log_before);
    }

    #[test]
    fn record_score_accepts_plus_minus_one() {
        let mut s = controller();
        let r = s.record_score(1).unwrap();
        assert_eq!(r.response, C);
        let r = s.record_score(-1).unwrap();
        assert_eq!(r.response, I);
        assert_eq!(s.trial_count(), 2);
    }

    #[test]
    fn trial_numbers_are_zero_based_and_sequential() {
        let s = StaircaseController::replay(StaircaseConfig::default(), [C, I, C, C]).unwrap();
        let numbers: Vec<usize> = s.log().all().iter().map(|r| r.trial_number).collect();
        assert_eq!(numbers, vec![0, 1, 2, 3]);
    }

    #[test]
    fn finishes_when_both_minimums_met() {
        let config = StaircaseConfig {
            n_trials: 4,
            ..StaircaseConfig::default()
        };
        let mut s = StaircaseController::new(config).unwrap();
        // Reversals at trial 2 ([C,C,I]) and trial 4 ([I,C,C]).
        for r in [C, C, I] {
            s.record_response(r);
        }
        assert_eq!(s.reversal_count(), 1);
        assert!(!s.is_finished());
        s.record_response(C);
        assert!(!s.is_finished());
        s.record_response(C);
        assert_eq!(s.reversal_count(), 2);
        assert!(s.is_finished());
    }

    #[test]
    fn reversals_alone_do_not_finish() {
        let config = StaircaseConfig {
            n_trials: 50,
            ..StaircaseConfig::default()
        };
        let s = StaircaseController::replay(config, [C, C, I, C, C, I, C, C, I]).unwrap();
        assert!(s.reversal_count() >= 2);
        assert!(!s.is_finished());
    }

    #[test]
    fn trial_minimum_counts_the_current_trial() {
        // n_trials = 5: the fifth call (trial_count 4 before increment) may finish.
        let config = StaircaseConfig {
            n_trials: 5,
            ..StaircaseConfig::default()
        };
        let mut s = StaircaseController::replay(config, [C, C, I, C]).unwrap();
        assert_eq!(s.reversal_count(), 1);
        s.record_response(C);
        assert_eq!(s.reversal_count(), 2);
        assert_eq!(s.trial_count(), 5);
        assert!(s.is_finished());
    }

    #[test]
    fn keeps_recording_after_finish() {
        let config = StaircaseConfig {
            n_trials: 1,
            ..StaircaseConfig::default()
        };
        let mut s = StaircaseController::replay(config, [C, C, I, C, C]).unwrap();
        assert!(s.is_finished());
        s.record_response(I);
        assert!(s.is_finished());
        assert_eq!(s.trial_count(), 6);
    }

    #[test]
    fn observer_sees_every_transition() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let config = StaircaseConfig {
            n_trials: 3,
            ..StaircaseConfig::default()
        };
        let mut s = StaircaseController::new(config)
            .unwrap()
            .with_observer(move |e: &TrialEvent| sink.lock().unwrap().push(*e));

        for r in [C, C, I, C, C] {
            s.record_response(r);
        }

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 5);
        assert_eq!(events[1].level, 60.0);
        assert_eq!(events[1].next_level, 52.0);
        assert_eq!(events[2].step_size, 4.0);
        assert!(events[2].reversal);
        let finishing: Vec<usize> = events
            .iter()
            .filter(|e| e.just_finished)
            .map(|e| e.trial_number)
            .collect();
        assert_eq!(finishing, vec![4]);
        assert_eq!(events[4].status, StaircaseStatus::Finished);
        for (event, record) in events.iter().zip(s.log().all()) {
            assert_eq!(&event.record(), record);
        }
    }

    #[test]
    fn set_observer_attaches_and_detaches() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut s = controller();

        s.record_response(C);
        s.set_observer(Some(Box::new(move |e: &TrialEvent| {
            sink.lock().unwrap().push(e.trial_number)
        })));
        s.record_response(C);
        s.record_response(I);
        s.set_observer(None);
        s.record_response(I);

        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
        assert_eq!(s.trial_count(), 4);
        assert!(format!("{s:?}").contains("observer: false"));
    }

    #[test]
    fn into_log_keeps_records() {
        let s = StaircaseController::replay(StaircaseConfig::default(), [C, C, I]).unwrap();
        let log = s.into_log();
        assert_eq!(log.len(), 3);
        assert_eq!(log.reversal_count(), 1);
    }

    #[test]
    fn debug_output_mentions_state() {
        let s = controller();
        let text = format!("{s:?}");
        assert!(text.contains("StaircaseController"));
        assert!(text.contains("current_level"));
    }
}
