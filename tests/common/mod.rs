use std::path::Path;

use serde_json::{json, Map, Value};

use fraud_risk::dataset::write_records;
use fraud_risk::models::application::{ID_COLUMN, LABEL_COLUMN};
use fraud_risk::models::{ApplicationRecord, FEATURE_FIELDS};

/// Wire-format JSON for one application. Every feature is 1 except the
/// income, which is `income`, and the credit amount.
#[allow(dead_code)]
pub fn record_json(id: i64, target: Option<i64>, income: f64) -> Value {
    let mut obj = Map::new();
    obj.insert(ID_COLUMN.into(), json!(id));
    if let Some(t) = target {
        obj.insert(LABEL_COLUMN.into(), json!(t));
    }
    for field in FEATURE_FIELDS {
        obj.insert(field.wire.into(), json!(1));
    }
    obj.insert("AMT_INCOME_TOTAL".into(), json!(income));
    obj.insert("AMT_CREDIT".into(), json!(250_000.0));
    Value::Object(obj)
}

#[allow(dead_code)]
pub fn record(id: i64, target: Option<i64>) -> ApplicationRecord {
    serde_json::from_value(record_json(id, target, 100_000.0 + id as f64))
        .expect("test record must deserialize")
}

/// `positives` rows labelled 1 with a visibly riskier profile, then
/// `negatives` rows labelled 0. Ids start at `first_id`.
#[allow(dead_code)]
pub fn labeled_batch(first_id: i64, positives: usize, negatives: usize) -> Vec<ApplicationRecord> {
    let mut rows = Vec::with_capacity(positives + negatives);
    for i in 0..positives {
        let mut r = record(first_id + i as i64, Some(1));
        r.amt_credit = 900_000.0;
        r.prev_status_refused_sum = 4;
        rows.push(r);
    }
    for i in 0..negatives {
        rows.push(record(first_id + (positives + i) as i64, Some(0)));
    }
    rows
}

/// Write records as a CSV with wire-name headers.
#[allow(dead_code)]
pub fn write_csv(path: &Path, records: &[ApplicationRecord]) {
    let bytes = write_records(records).expect("Failed to encode CSV");
    std::fs::write(path, bytes).expect("Failed to write CSV");
}
