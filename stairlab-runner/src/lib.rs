//! StairLab Runner — sessions, simulation, and artifacts around the core
//! staircase.
//!
//! This crate builds on `stairlab-core` to provide:
//! - Experiment configuration (TOML) with named conditions
//! - A session driver over any `Responder`
//! - Simulated listeners (logistic psychometric function)
//! - Deterministic RNG hierarchy for reproducible simulations
//! - Interleaved multi-staircase runs
//! - Monte Carlo batches (rayon)
//! - JSON / CSV / Markdown export

pub mod batch;
pub mod config;
pub mod experiment;
pub mod export;
pub mod interleave;
pub mod listener;
pub mod rng;
pub mod session;

pub use batch::{run_batch, run_condition_batch, summarize, BatchSummary};
pub use config::{
    is_valid_condition_name, ConditionConfig, ConfigError, ExperimentConfig, RunSettings,
};
pub use experiment::{run_condition, run_experiment, ExperimentResult, RunError};
pub use interleave::{run_interleaved, InterleavedResult, InterleavedTrial, Track};
pub use listener::{target_p_correct, ListenerConfig, ListenerError, SimulatedListener};
pub use rng::RngHierarchy;
pub use session::{
    run_session, Responder, ScriptedResponder, SessionResult, StopReason, SCHEMA_VERSION,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<ExperimentConfig>();
        assert_sync::<ExperimentConfig>();
        assert_send::<ListenerConfig>();
        assert_sync::<ListenerConfig>();
    }

    #[test]
    fn result_types_are_send_sync() {
        assert_send::<SessionResult>();
        assert_sync::<SessionResult>();
        assert_send::<ExperimentResult>();
        assert_sync::<ExperimentResult>();
        assert_send::<BatchSummary>();
        assert_sync::<BatchSummary>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }

    #[test]
    fn drivers_can_move_between_threads() {
        assert_send::<SimulatedListener>();
        assert_send::<ScriptedResponder>();
        assert_send::<Track>();
    }
}
