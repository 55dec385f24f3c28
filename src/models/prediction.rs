use std::fmt;

use serde::{Deserialize, Serialize};

/// Probabilities strictly below this are low risk.
pub const LOW_RISK_BELOW: f64 = 0.25;
/// Probabilities strictly above this are high risk.
pub const HIGH_RISK_ABOVE: f64 = 0.45;

/// Categorical risk bucket returned to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    LowRisk,
    ModerateRisk,
    HighRisk,
}

impl RiskLevel {
    /// Bucket a fraud probability. The closed interval [0.25, 0.45] is
    /// moderate.
    pub fn from_probability(probability: f64) -> Self {
        if probability < LOW_RISK_BELOW {
            RiskLevel::LowRisk
        } else if probability > HIGH_RISK_ABOVE {
            RiskLevel::HighRisk
        } else {
            RiskLevel::ModerateRisk
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::LowRisk => "low_risk",
            RiskLevel::ModerateRisk => "moderate_risk",
            RiskLevel::HighRisk => "high_risk",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scoring output for one application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPrediction {
    /// Fraud probability rounded to 4 decimal places.
    pub probability: f64,
    pub risk_level: RiskLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buckets() {
        assert_eq!(RiskLevel::from_probability(0.0), RiskLevel::LowRisk);
        assert_eq!(RiskLevel::from_probability(0.2499), RiskLevel::LowRisk);
        assert_eq!(RiskLevel::from_probability(0.30), RiskLevel::ModerateRisk);
        assert_eq!(RiskLevel::from_probability(0.4501), RiskLevel::HighRisk);
        assert_eq!(RiskLevel::from_probability(1.0), RiskLevel::HighRisk);
    }

    #[test]
    fn test_boundaries_are_moderate() {
        assert_eq!(RiskLevel::from_probability(0.25), RiskLevel::ModerateRisk);
        assert_eq!(RiskLevel::from_probability(0.45), RiskLevel::ModerateRisk);
    }

    #[test]
    fn test_serialized_names() {
        let json = serde_json::to_string(&RiskPrediction {
            probability: 0.5,
            risk_level: RiskLevel::HighRisk,
        })
        .unwrap();
        assert_eq!(json, r#"{"probability":0.5,"risk_level":"high_risk"}"#);
        assert_eq!(RiskLevel::ModerateRisk.to_string(), "moderate_risk");
    }
}
