/// Hard labels from probabilities: `p >= threshold` is positive.
pub fn threshold_predictions(probabilities: &[f64], threshold: f64) -> Vec<u8> {
    probabilities
        .iter()
        .map(|&p| u8::from(p >= threshold))
        .collect()
}

/// Binary F1 for the positive class. Zero when there are no true positives.
pub fn f1_score(truth: &[u8], predicted: &[u8]) -> f64 {
    let mut tp = 0usize;
    let mut fp = 0usize;
    let mut fn_ = 0usize;

    for (&t, &p) in truth.iter().zip(predicted) {
        match (t, p) {
            (1, 1) => tp += 1,
            (0, 1) => fp += 1,
            (1, 0) => fn_ += 1,
            _ => {}
        }
    }

    if tp == 0 {
        return 0.0;
    }
    let tp = tp as f64;
    2.0 * tp / (2.0 * tp + fp as f64 + fn_ as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        assert_eq!(threshold_predictions(&[0.1, 0.25, 0.9], 0.25), vec![0, 1, 1]);
    }

    #[test]
    fn test_f1() {
        // tp=2, fp=1, fn=1 → precision 2/3, recall 2/3
        let truth = [1, 1, 1, 0, 0];
        let pred = [1, 1, 0, 1, 0];
        assert!((f1_score(&truth, &pred) - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_f1_perfect_and_empty() {
        assert_eq!(f1_score(&[1, 0], &[1, 0]), 1.0);
        assert_eq!(f1_score(&[0, 0], &[0, 0]), 0.0);
        assert_eq!(f1_score(&[1, 1], &[0, 0]), 0.0);
    }
}
