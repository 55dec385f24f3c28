use crate::models::application::{ApplicationRecord, CREDIT_TO_INCOME_COLUMN, FEATURE_FIELDS};

/// `AMT_CREDIT / AMT_INCOME_TOTAL` as plain IEEE division.
///
/// Zero income is not rejected: a positive credit yields `+inf` and a zero
/// credit yields `NaN`. Both flow into the model unchanged; tree splits
/// route them deterministically.
pub fn credit_to_income(record: &ApplicationRecord) -> f64 {
    record.amt_credit / record.amt_income_total
}

/// Model input for one record: schema features followed by the engineered
/// ratio. Identifier and label never appear here.
pub fn feature_vector(record: &ApplicationRecord) -> Vec<f64> {
    let mut features = record.raw_features();
    let ratio = credit_to_income(record);
    if !ratio.is_finite() {
        tracing::debug!(
            sk_id_curr = record.sk_id_curr,
            amt_income_total = record.amt_income_total,
            "Non-finite CREDIT_TO_INCOME"
        );
    }
    features.push(ratio);
    features
}

/// Column names matching `feature_vector`, as stored in model artifacts.
pub fn feature_names() -> Vec<String> {
    FEATURE_FIELDS
        .iter()
        .map(|f| f.wire.to_string())
        .chain(std::iter::once(CREDIT_TO_INCOME_COLUMN.to_string()))
        .collect()
}
