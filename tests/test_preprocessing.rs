//! Integration test: Preprocessing pipeline end-to-end

use polars::prelude::*;
use telco_churn::preprocessing::{sample_fraction, ChurnPreprocessor};

fn raw_telco_df() -> DataFrame {
    df!(
        "customerID" => &["0001", "0002", "0003", "0004", "0005", "0006", "0007", "0008"],
        "tenure" => &[1i32, 34, 2, 45, 8, 22, 10, 62],
        "MonthlyCharges" => &[29.85, 56.95, 53.85, 42.30, 70.70, 99.65, 89.10, 104.80],
        "TotalCharges" => &["29.85", "1889.5", "108.15", "1840.75", "151.65", " ", "820.5", "6300.85"],
        "Contract" => &["Month-to-month", "One year", "Month-to-month", "One year",
                        "Month-to-month", "Month-to-month", "Two year", "One year"],
        "PaymentMethod" => &["Electronic check", "Mailed check", "Mailed check", "Bank transfer (automatic)",
                             "Electronic check", "Electronic check", "Credit card (automatic)", "Bank transfer (automatic)"],
        "Churn" => &["No", "No", "Yes", "No", "Yes", "Yes", "No", "No"],
    )
    .unwrap()
}

#[test]
fn test_unparseable_charges_rows_dropped() {
    let df = raw_telco_df();
    let mut preprocessor = ChurnPreprocessor::new();
    let output = preprocessor.preprocess(&df).unwrap();

    // Row 6 has a blank TotalCharges and is gone
    assert_eq!(output.encoded.height(), 7);
    let ids: Vec<Option<&str>> = output
        .encoded
        .column("customerID")
        .unwrap()
        .str()
        .unwrap()
        .into_iter()
        .collect();
    assert!(!ids.contains(&Some("0006")));
}

#[test]
fn test_schema_matches_encoded_columns() {
    let df = raw_telco_df();
    let mut preprocessor = ChurnPreprocessor::new();
    let output = preprocessor.preprocess(&df).unwrap();

    // Everything between the id and the label matches the schema, in order
    let encoded_names: Vec<String> = output
        .encoded
        .get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let feature_names = &encoded_names[1..encoded_names.len() - 1];
    assert_eq!(feature_names, output.schema.column_names().as_slice());
}

#[test]
fn test_reference_levels_absent_from_schema() {
    let df = raw_telco_df();
    let mut preprocessor = ChurnPreprocessor::new();
    let output = preprocessor.preprocess(&df).unwrap();

    let names = output.schema.column_names();
    // First sorted level of each categorical column is the dropped reference
    assert!(!names.contains(&"Contract_Month-to-month".to_string()));
    assert!(names.contains(&"Contract_One year".to_string()));
    assert!(names.contains(&"Contract_Two year".to_string()));
    assert!(!names.contains(&"PaymentMethod_Bank transfer (automatic)".to_string()));
}

#[test]
fn test_label_is_binary() {
    let df = raw_telco_df();
    let mut preprocessor = ChurnPreprocessor::new();
    let output = preprocessor.preprocess(&df).unwrap();

    let labels: Vec<Option<i32>> = output
        .encoded
        .column("Churn")
        .unwrap()
        .i32()
        .unwrap()
        .into_iter()
        .collect();
    assert!(labels.iter().all(|v| matches!(v, Some(0) | Some(1))));
    // "Yes" rows that survive the charges filter: 0003 and 0005
    assert_eq!(labels.iter().filter(|v| **v == Some(1)).count(), 2);
}

#[test]
fn test_continuous_columns_standardized() {
    let df = raw_telco_df();
    let mut preprocessor = ChurnPreprocessor::new();
    let output = preprocessor.preprocess(&df).unwrap();

    let charges: Vec<f64> = output
        .encoded
        .column("MonthlyCharges")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    let mean: f64 = charges.iter().sum::<f64>() / charges.len() as f64;
    assert!(mean.abs() < 1e-9, "standardized mean should be ~0, got {}", mean);
}

#[test]
fn test_preprocessing_is_deterministic() {
    let df = raw_telco_df();
    let a = ChurnPreprocessor::new().preprocess(&df).unwrap();
    let b = ChurnPreprocessor::new().preprocess(&df).unwrap();
    assert!(a.encoded.equals(&b.encoded));
    assert_eq!(a.schema, b.schema);
}

#[test]
fn test_reduced_sample_reproducible() {
    let df = raw_telco_df();
    let a = sample_fraction(&df, 0.5, 42).unwrap();
    let b = sample_fraction(&df, 0.5, 42).unwrap();
    assert!(a.equals(&b));
    assert_eq!(a.height(), 4);

    let c = sample_fraction(&df, 0.5, 7).unwrap();
    assert!(!a.equals(&c));
}
