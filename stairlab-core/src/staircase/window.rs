//! Bounded run of responses since the last level change.

use crate::domain::Response;
use serde::{Deserialize, Serialize};

/// Responses accumulated since the level last moved.
///
/// Cleared only when a level change is applied: after `n_down` consecutive
/// corrects, or as soon as an incorrect arrives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseWindow {
    responses: Vec<Response>,
}

impl ResponseWindow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, response: Response) {
        self.responses.push(response);
    }

    pub fn clear(&mut self) {
        self.responses.clear();
    }

    /// Window holds exactly `n` responses, all correct.
    pub fn is_correct_run(&self, n: usize) -> bool {
        self.responses.len() == n && self.responses.iter().all(|r| r.is_correct())
    }

    pub fn contains_incorrect(&self) -> bool {
        self.responses.iter().any(|r| !r.is_correct())
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }

    pub fn as_slice(&self) -> &[Response] {
        &self.responses
    }
}
