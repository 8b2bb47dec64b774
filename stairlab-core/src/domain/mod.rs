//! Domain types for StairLab

pub mod response;
pub mod trial;

pub use response::{InvalidResponse, Response};
pub use trial::TrialRecord;
