//! TrialRecord: one row of the audit trail.

use super::response::Response;
use serde::{Deserialize, Serialize};

/// Outcome of a single trial as it was presented.
///
/// `level` is the level the stimulus was played at, i.e. the controller's
/// level *before* the response moved it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
    /// Zero-based trial index within the run.
    pub trial_number: usize,
    pub level: f64,
    pub response: Response,
    /// True if this trial completed a direction change.
    pub reversal: bool,
}

impl TrialRecord {
    pub fn is_correct(&self) -> bool {
        self.response.is_correct()
    }
}
