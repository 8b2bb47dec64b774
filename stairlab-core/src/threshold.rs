//! Threshold estimation from reversal levels.
//!
//! The customary estimate is the mean of the levels at which reversals
//! occurred, discarding the first one (it mostly reflects the starting level).

use serde::{Deserialize, Serialize};

use crate::trial_log::TrialLog;

/// Which reversals contribute to the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "n", rename_all = "snake_case")]
pub enum ThresholdRule {
    /// Drop the first `k` reversals and average the rest.
    ///
    /// Fewer than `k + 1` reversals yield no estimate: with `DiscardFirst(1)`
    /// a log holding a single reversal gives `None`, not that reversal's
    /// level. Use `All` to average a lone reversal.
    DiscardFirst(usize),
    /// Average only the last `n` reversals.
    LastN(usize),
    /// Average every reversal.
    All,
}

impl Default for ThresholdRule {
    fn default() -> Self {
        ThresholdRule::DiscardFirst(1)
    }
}

impl ThresholdRule {
    fn select<'a>(&self, levels: &'a [f64]) -> &'a [f64] {
        match *self {
            ThresholdRule::DiscardFirst(k) => &levels[k.min(levels.len())..],
            ThresholdRule::LastN(n) => &levels[levels.len().saturating_sub(n)..],
            ThresholdRule::All => levels,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdEstimate {
    pub mean: f64,
    /// Sample standard deviation; 0.0 when a single reversal is used.
    pub std_dev: f64,
    pub reversals_used: usize,
}

/// Estimate the threshold from the log's reversal levels.
///
/// Returns `None` when no reversal survives the rule.
pub fn estimate_threshold(log: &TrialLog, rule: ThresholdRule) -> Option<ThresholdEstimate> {
    let levels = log.reversal_levels();
    estimate_from_levels(rule.select(&levels))
}

fn estimate_from_levels(levels: &[f64]) -> Option<ThresholdEstimate> {
    if levels.is_empty() {
        return None;
    }
    let n = levels.len() as f64;
    let mean = levels.iter().sum::<f64>() / n;
    let std_dev = if levels.len() > 1 {
        let var = levels.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    } else {
        0.0
    };
    Some(ThresholdEstimate {
        mean,
        std_dev,
        reversals_used: levels.len(),
    })
}
