//! Reversal detection over the tail of the response history.

use crate::domain::Response;

/// True iff the last `n_back` responses form a direction change.
///
/// The tail must equal either `n_down` corrects followed by one incorrect, or
/// one incorrect followed by `n_down` corrects. A history shorter than
/// `n_back` never reverses.
pub fn detect_reversal(history: &[Response], n_back: usize, n_down: usize) -> bool {
    if n_back == 0 || history.len() < n_back || n_back != n_down + 1 {
        return false;
    }
    let tail = &history[history.len() - n_back..];

    let downward = tail[..n_down].iter().all(|r| r.is_correct()) && !tail[n_down].is_correct();
    let upward = !tail[0].is_correct() && tail[1..].iter().all(|r| r.is_correct());
    downward || upward
}
