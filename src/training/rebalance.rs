use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

use crate::models::ApplicationRecord;

/// Negatives needed so positives make up `ratio` of the result.
pub fn negative_target(n_pos: usize, ratio: f64) -> usize {
    (n_pos as f64 * (1.0 - ratio) / ratio).floor() as usize
}

/// Subsample negatives so positives make up `ratio` of the batch.
///
/// Returns all positives followed by `negative_target(n_pos)` negatives
/// drawn without replacement. If the batch has no positives, or not enough
/// negatives, it comes back unchanged.
pub fn rebalance(batch: Vec<ApplicationRecord>, ratio: f64, seed: u64) -> Vec<ApplicationRecord> {
    let n_pos = batch.iter().filter(|r| r.is_positive()).count();
    let n_neg_target = negative_target(n_pos, ratio);
    let n_neg = batch.iter().filter(|r| r.is_negative()).count();

    if n_pos == 0 || n_neg < n_neg_target {
        tracing::info!(
            positives = n_pos,
            negatives = n_neg,
            needed = n_neg_target,
            "Skipping rebalance, using batch as-is"
        );
        return batch;
    }

    let (positives, rest): (Vec<_>, Vec<_>) = batch.into_iter().partition(|r| r.is_positive());
    let mut negatives: Vec<_> = rest.into_iter().filter(|r| r.is_negative()).collect();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut picked = index::sample(&mut rng, negatives.len(), n_neg_target).into_vec();
    picked.sort_unstable();

    let mut out = positives;
    out.reserve(n_neg_target);
    // Walk from the back so swap_remove never disturbs a pending index.
    let mut sampled: Vec<_> = picked
        .into_iter()
        .rev()
        .map(|i| negatives.swap_remove(i))
        .collect();
    sampled.reverse();
    out.extend(sampled);

    tracing::info!(
        positives = n_pos,
        negatives = n_neg_target,
        dropped = n_neg - n_neg_target,
        "Batch rebalanced"
    );
    out
}
