//! Adaptive up/down staircase.
//!
//! `StaircaseController` maps a stream of binary responses to a stream of
//! presentation levels and a termination verdict (transformed up-down,
//! Levitt-style). One controller drives exactly one run; it must be fed
//! responses strictly in trial order.

pub mod controller;
pub mod observer;
pub mod reversal;
pub mod window;

pub use controller::{StaircaseController, StaircaseState, StaircaseStatus};
pub use observer::{TracingObserver, TrialEvent, TrialObserver};
pub use reversal::detect_reversal;
pub use window::ResponseWindow;
