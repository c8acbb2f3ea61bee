use cherrytrail_core::round::{RoundOutcome, RoundResult};
use cherrytrail_core::storage::HighScoreStore;

use crate::config::ScoreConfig;

/// Final score for a finished round.
///
/// Scoring: `ceil((lives * LIVES + cherries * CHERRY + floor(time * TIME)) * multiplier)`.
/// A lost round scores nothing.
pub fn calculate_score(result: &RoundResult, cfg: &ScoreConfig) -> u64 {
    if result.outcome == RoundOutcome::Lost {
        return 0;
    }
    let time_bonus = (result.time_remaining as f32 * cfg.time).floor().max(0.0) as u64;
    let base = u64::from(result.lives) * cfg.lives
        + u64::from(result.cherries) * cfg.cherry
        + time_bonus;
    let multiplier = cfg.difficulty.get(result.difficulty).multiplier;
    (base as f64 * f64::from(multiplier)).ceil() as u64
}

/// Persist `score` if it beats the stored high score. Returns whether it did.
///
/// A storage failure is logged; the score still counts as a new high score
/// for this session.
pub fn submit_score(store: &mut dyn HighScoreStore, score: u64) -> bool {
    let previous = store.high_score();
    if score <= previous {
        return false;
    }
    if let Err(e) = store.set_high_score(score) {
        tracing::warn!(score, "failed to persist high score: {e}");
    } else {
        tracing::info!(score, previous, "new high score");
    }
    true
}
