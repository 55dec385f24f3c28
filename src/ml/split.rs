use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),

    #[error("stratified split needs at least two classes, found {0}")]
    SingleClass(usize),

    #[error("class {class} has only {count} member(s); at least 2 are required")]
    ClassTooSmall { class: u8, count: usize },
}

/// Row indices of a train/evaluation partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition row indices so each class keeps its share in both halves.
///
/// Every class contributes `round(n * test_fraction)` rows to the test side,
/// clamped so that both sides keep at least one row of every class.
pub fn stratified_split(labels: &[u8], test_fraction: f64, seed: u64) -> Result<Split, SplitError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(SplitError::InvalidFraction(test_fraction));
    }

    let mut by_class: BTreeMap<u8, Vec<usize>> = BTreeMap::new();
    for (idx, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(idx);
    }

    if by_class.len() < 2 {
        return Err(SplitError::SingleClass(by_class.len()));
    }
    if let Some((&class, members)) = by_class.iter().find(|(_, m)| m.len() < 2) {
        return Err(SplitError::ClassTooSmall {
            class,
            count: members.len(),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::with_capacity(labels.len()),
        test: Vec::new(),
    };

    for members in by_class.values_mut() {
        members.shuffle(&mut rng);
        let n_test = ((members.len() as f64 * test_fraction).round() as usize)
            .clamp(1, members.len() - 1);
        split.test.extend_from_slice(&members[..n_test]);
        split.train.extend_from_slice(&members[n_test..]);
    }

    split.train.shuffle(&mut rng);
    split.test.shuffle(&mut rng);
    Ok(split)
}
