//! Append-only trial history for a single staircase run.
//!
//! The log is an audit trail: records are appended once and never edited or
//! removed. Filtered views (correct, incorrect, reversals) feed plotting and
//! the reversal count that drives the step schedule.

use crate::domain::{Response, TrialRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrialLog {
    records: Vec<TrialRecord>,
}

impl TrialLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: TrialRecord) {
        self.records.push(record);
    }

    /// All records in insertion order.
    pub fn all(&self) -> &[TrialRecord] {
        &self.records
    }

    pub fn correct(&self) -> Vec<&TrialRecord> {
        self.filter_response(Response::Correct)
    }

    pub fn incorrect(&self) -> Vec<&TrialRecord> {
        self.filter_response(Response::Incorrect)
    }

    pub fn reversals(&self) -> Vec<&TrialRecord> {
        self.records.iter().filter(|r| r.reversal).collect()
    }

    pub fn reversal_count(&self) -> usize {
        self.records.iter().filter(|r| r.reversal).count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn last(&self) -> Option<&TrialRecord> {
        self.records.last()
    }

    /// Presented level per trial (level-over-time series).
    pub fn levels(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.level).collect()
    }

    /// Presented level at each reversal, in order.
    pub fn reversal_levels(&self) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.reversal)
            .map(|r| r.level)
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TrialRecord> {
        self.records.iter()
    }

    fn filter_response(&self, response: Response) -> Vec<&TrialRecord> {
        self.records
            .iter()
            .filter(|r| r.response == response)
            .collect()
    }
}

impl<'a> IntoIterator for &'a TrialLog {
    type Item = &'a TrialRecord;
    type IntoIter = std::slice::Iter<'a, TrialRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
