use crate::ml::Classifier;
use crate::models::{ApplicationRecord, RiskLevel, RiskPrediction};

use super::features::feature_vector;

/// Round to 4 decimal places, ties to even.
pub fn round_probability(probability: f64) -> f64 {
    (probability * 10_000.0).round_ties_even() / 10_000.0
}

/// Score a batch. Output order matches input order.
pub fn score_records(
    classifier: &dyn Classifier,
    records: &[ApplicationRecord],
) -> Vec<RiskPrediction> {
    let rows: Vec<Vec<f64>> = records.iter().map(feature_vector).collect();

    classifier
        .predict_proba(&rows)
        .into_iter()
        .map(|p| RiskPrediction {
            probability: round_probability(p),
            risk_level: RiskLevel::from_probability(p),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::test_support::sample_record;

    /// Returns the income column scaled down, so each row gets a known score.
    struct IncomeProbe;

    impl Classifier for IncomeProbe {
        fn predict_proba(&self, rows: &[Vec<f64>]) -> Vec<f64> {
            let idx = crate::scoring::features::feature_names()
                .iter()
                .position(|n| n == "AMT_INCOME_TOTAL")
                .unwrap();
            rows.iter().map(|r| r[idx] / 1_000_000.0).collect()
        }
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_probability(0.123456), 0.1235);
        assert_eq!(round_probability(0.0), 0.0);
        assert_eq!(round_probability(1.0), 1.0);
        // 1/32 and 3/32 scale to exact .5 ties
        assert_eq!(round_probability(0.03125), 0.0312);
        assert_eq!(round_probability(0.09375), 0.0938);
    }

    #[test]
    fn test_rounding_idempotent() {
        for p in [0.0, 0.12345, 0.25, 0.333333, 0.44995, 0.987654321, 1.0] {
            let once = round_probability(p);
            assert_eq!(round_probability(once), once);
        }
    }

    #[test]
    fn test_scores_in_input_order() {
        let incomes = [100_000.0, 300_000.0, 450_000.0, 900_000.0];
        let records: Vec<_> = incomes
            .iter()
            .enumerate()
            .map(|(i, &income)| {
                let mut r = sample_record(i as i64, None);
                r.amt_income_total = income;
                r
            })
            .collect();

        let predictions = score_records(&IncomeProbe, &records);

        assert_eq!(predictions.len(), records.len());
        assert_eq!(predictions[0].probability, 0.1);
        assert_eq!(predictions[0].risk_level, RiskLevel::LowRisk);
        assert_eq!(predictions[1].risk_level, RiskLevel::ModerateRisk);
        assert_eq!(predictions[2].risk_level, RiskLevel::ModerateRisk);
        assert_eq!(predictions[3].probability, 0.9);
        assert_eq!(predictions[3].risk_level, RiskLevel::HighRisk);
    }

    #[test]
    fn test_empty_batch() {
        assert!(score_records(&IncomeProbe, &[]).is_empty());
    }
}
