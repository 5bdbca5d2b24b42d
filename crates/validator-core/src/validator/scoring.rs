use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::constants::WEIGHT_SCALE;
use crate::types::WeightVote;

// Absorbs float error so exact shares like 125.0 do not floor to 124.
const FLOOR_TOLERANCE: f64 = 1e-9;

/// Highest `max_allowed_weights` scores, descending; equal scores keep ascending worker id.
pub fn cut_to_max_allowed_weights(
    scores: &BTreeMap<u64, f64>,
    max_allowed_weights: usize,
) -> Vec<(u64, f64)> {
    let mut ranked: Vec<(u64, f64)> = scores.iter().map(|(uid, s)| (*uid, *s)).collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    ranked.truncate(max_allowed_weights);
    ranked
}

/// `floor(score * 1000 / sum)` per worker; zero weights are left out of the vote.
pub fn normalize_weights(retained: &[(u64, f64)]) -> WeightVote {
    let total: f64 = retained.iter().map(|(_, s)| s.max(0.0)).sum();
    let mut vote = WeightVote::default();
    if total <= 0.0 || !total.is_finite() {
        return vote;
    }
    for (uid, score) in retained {
        let share = (score.max(0.0) * WEIGHT_SCALE / total + FLOOR_TOLERANCE).floor();
        let weight = share.min(f64::from(u16::MAX)) as u16;
        if weight == 0 {
            continue;
        }
        vote.uids.push(*uid);
        vote.weights.push(weight);
    }
    vote
}

pub fn build_vote(scores: &BTreeMap<u64, f64>, max_allowed_weights: usize) -> WeightVote {
    normalize_weights(&cut_to_max_allowed_weights(scores, max_allowed_weights))
}
