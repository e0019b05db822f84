//! Record encoding against a feature schema
//!
//! Maps an arbitrary raw record onto the exact fixed-width numeric vector the
//! trained model expects. The schema is iterated as a declarative table; the
//! record never drives the output shape.

use super::{FeatureSchema, RawRecord, SchemaColumn};
use crate::error::{ChurnError, Result};
use serde_json::Value;

/// Encode one raw record into a vector conforming to `schema`.
///
/// Invariants:
/// - output length always equals `schema.len()`, whatever fields the record
///   supplies or omits;
/// - an unseen or unknown categorical value leaves its whole indicator group
///   at zero (the implicit reference-level encoding), never errors;
/// - an unparseable continuous value is a `MalformedInput` error naming the
///   offending field.
///
/// A record that already carries a column by its encoded name (e.g.
/// `"Contract_One year": 1.0`) passes that value through, so encoding a prior
/// encode's output keyed by column names reproduces the same vector.
pub fn encode(record: &RawRecord, schema: &FeatureSchema) -> Result<Vec<f64>> {
    let mut out = Vec::with_capacity(schema.len());

    for column in schema.columns() {
        let value = match column {
            SchemaColumn::Continuous { field } => match record.get(field) {
                Some(v) => coerce_numeric(field, v)?,
                None => 0.0,
            },
            SchemaColumn::Indicator { field, level } => {
                // Pass-through for already-encoded inputs keyed by column name
                if let Some(direct) = record.get(&column.name()).and_then(numeric_value) {
                    direct
                } else {
                    match record.get(field) {
                        Some(Value::String(s)) if s == level => 1.0,
                        _ => 0.0,
                    }
                }
            }
        };
        out.push(value);
    }

    Ok(out)
}

/// Strict coercion for continuous fields. Numbers pass, numeric strings
/// parse, booleans map to 1/0, absent or null values encode as zero.
fn coerce_numeric(field: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n.as_f64().ok_or_else(|| malformed(field, value)),
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| malformed(field, value)),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Null => Ok(0.0),
        _ => Err(malformed(field, value)),
    }
}

/// Lenient numeric view used for pass-through lookups; strings do not count.
fn numeric_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn malformed(field: &str, value: &Value) -> ChurnError {
    let rendered = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    ChurnError::MalformedInput {
        field: field.to_string(),
        value: rendered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(pairs: &[(&str, Value)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_output_length_matches_schema() {
        let schema = FeatureSchema::telco();

        let empty = RawRecord::new();
        assert_eq!(encode(&empty, &schema).unwrap().len(), schema.len());

        let partial = record(&[("tenure", json!(5)), ("gender", json!("Female"))]);
        assert_eq!(encode(&partial, &schema).unwrap().len(), schema.len());
    }

    #[test]
    fn test_reference_level_encodes_all_zeros() {
        let schema = FeatureSchema::telco();
        // "Month-to-month" is the dropped reference level for Contract
        let rec = record(&[("Contract", json!("Month-to-month"))]);
        let vec = encode(&rec, &schema).unwrap();

        let names = schema.column_names();
        let one_year = names.iter().position(|n| n == "Contract_One year").unwrap();
        let two_year = names.iter().position(|n| n == "Contract_Two year").unwrap();
        assert_eq!(vec[one_year], 0.0);
        assert_eq!(vec[two_year], 0.0);
    }

    #[test]
    fn test_unseen_level_encodes_all_zeros() {
        let schema = FeatureSchema::telco();
        let rec = record(&[("Contract", json!("Decade plan"))]);
        let vec = encode(&rec, &schema).unwrap();

        let names = schema.column_names();
        for (i, name) in names.iter().enumerate() {
            if name.starts_with("Contract_") {
                assert_eq!(vec[i], 0.0, "{} should be zero for an unseen level", name);
            }
        }
    }

    #[test]
    fn test_malformed_continuous_names_field() {
        let schema = FeatureSchema::telco();
        let rec = record(&[("TotalCharges", json!("abc"))]);
        match encode(&rec, &schema) {
            Err(ChurnError::MalformedInput { field, value }) => {
                assert_eq!(field, "TotalCharges");
                assert_eq!(value, "abc");
            }
            other => panic!("expected MalformedInput, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_string_coercion() {
        let schema = FeatureSchema::telco();
        let rec = record(&[("TotalCharges", json!("350.25"))]);
        let vec = encode(&rec, &schema).unwrap();
        let idx = schema
            .column_names()
            .iter()
            .position(|n| n == "TotalCharges")
            .unwrap();
        assert_eq!(vec[idx], 350.25);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let schema = FeatureSchema::telco();
        let rec = record(&[("FavoriteColor", json!("blue")), ("tenure", json!(3))]);
        let vec = encode(&rec, &schema).unwrap();
        assert_eq!(vec.len(), schema.len());
        assert_eq!(vec[1], 3.0);
    }

    #[test]
    fn test_end_to_end_example() {
        let schema = FeatureSchema::telco();
        let rec = record(&[
            ("gender", json!("Female")),
            ("Partner", json!("No")),
            ("tenure", json!(5)),
            ("MonthlyCharges", json!(70.5)),
            ("TotalCharges", json!("350.25")),
            ("Contract", json!("Month-to-month")),
        ]);
        let vec = encode(&rec, &schema).unwrap();
        let names = schema.column_names();

        let at = |name: &str| vec[names.iter().position(|n| n == name).unwrap()];
        assert_eq!(at("gender_Male"), 0.0);
        assert_eq!(at("Partner_Yes"), 0.0);
        assert_eq!(at("Contract_One year"), 0.0);
        assert_eq!(at("Contract_Two year"), 0.0);
        assert_eq!(at("tenure"), 5.0);
        assert_eq!(at("MonthlyCharges"), 70.5);
        assert_eq!(at("TotalCharges"), 350.25);
    }

    #[test]
    fn test_encode_is_idempotent_on_canonical_output() {
        let schema = FeatureSchema::telco();
        let rec = record(&[
            ("gender", json!("Male")),
            ("tenure", json!(12)),
            ("Contract", json!("Two year")),
            ("PaymentMethod", json!("Mailed check")),
        ]);
        let first = encode(&rec, &schema).unwrap();

        // Reinterpret the output as a raw record keyed by column names
        let as_record: RawRecord = schema
            .column_names()
            .into_iter()
            .zip(first.iter())
            .map(|(name, v)| (name, json!(*v)))
            .collect();
        let second = encode(&as_record, &schema).unwrap();
        assert_eq!(first, second);
    }
}
