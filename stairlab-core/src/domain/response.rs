//! Binary listener response.
//!
//! Responses arrive already decoded into two symbolic values. The integer
//! score form (+1 / -1) is what gets persisted and what untyped callers pass in.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A score that is neither +1 nor -1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid response score {0}: expected 1 (correct) or -1 (incorrect)")]
pub struct InvalidResponse(pub i64);

/// Outcome of a single trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Response {
    Correct,
    Incorrect,
}

impl Response {
    /// Integer score: +1 for correct, -1 for incorrect.
    pub fn score(self) -> i64 {
        match self {
            Response::Correct => 1,
            Response::Incorrect => -1,
        }
    }

    pub fn is_correct(self) -> bool {
        self == Response::Correct
    }
}

impl TryFrom<i64> for Response {
    type Error = InvalidResponse;

    fn try_from(score: i64) -> Result<Self, Self::Error> {
        match score {
            1 => Ok(Response::Correct),
            -1 => Ok(Response::Incorrect),
            other => Err(InvalidResponse(other)),
        }
    }
}

impl From<Response> for i64 {
    fn from(response: Response) -> Self {
        response.score()
    }
}

impl From<bool> for Response {
    fn from(correct: bool) -> Self {
        if correct {
            Response::Correct
        } else {
            Response::Incorrect
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Correct => write!(f, "correct"),
            Response::Incorrect => write!(f, "incorrect"),
        }
    }
}
