//! StairLab Core — adaptive staircase controller for psychoacoustic experiments.
//!
//! This crate contains the decision logic only:
//! - Binary responses and per-trial records
//! - Append-only trial log with correct / incorrect / reversal views
//! - Validated staircase configuration (TOML loadable)
//! - The staircase controller state machine (reversals, step schedule,
//!   rapid descend, termination)
//! - Observer hook for per-trial diagnostics
//! - Threshold estimation from reversal levels
//!
//! No audio, no I/O during a run. Persistence and simulation live in
//! `stairlab-runner`.

pub mod config;
pub mod domain;
pub mod staircase;
pub mod threshold;
pub mod trial_log;

pub use config::{ConfigError, StaircaseConfig};
pub use domain::{InvalidResponse, Response, TrialRecord};
pub use staircase::{
    StaircaseController, StaircaseState, StaircaseStatus, TracingObserver, TrialEvent,
    TrialObserver,
};
pub use threshold::{estimate_threshold, ThresholdEstimate, ThresholdRule};
pub use trial_log::TrialLog;
