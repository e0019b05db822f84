//! Feature schema definitions
//!
//! A `FeatureSchema` is the single source of truth for the shape of the model
//! input: an ordered list of columns, each either a continuous pass-through or
//! a one-hot indicator for a `(field, level)` pair. The schema is built once
//! at preprocessing time and must be reproduced bit-for-bit at serving time,
//! so position *i* always means the same semantic feature.

mod encoder;

pub use encoder::encode;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A raw input record: field name to JSON value, as received from an HTTP
/// request body or assembled from a dataset row.
pub type RawRecord = HashMap<String, serde_json::Value>;

/// One column of the encoded feature vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SchemaColumn {
    /// Continuous feature: the raw field value passes through as f64.
    Continuous { field: String },
    /// One-hot indicator: 1.0 iff the record's value for `field` equals
    /// `level`. One level per field is implicitly dropped as the reference.
    Indicator { field: String, level: String },
}

impl SchemaColumn {
    /// Output column name. Indicators follow the `<field>_<level>` convention
    /// used by the training-time one-hot encoder.
    pub fn name(&self) -> String {
        match self {
            SchemaColumn::Continuous { field } => field.clone(),
            SchemaColumn::Indicator { field, level } => format!("{}_{}", field, level),
        }
    }
}

/// Ordered, immutable set of feature columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSchema {
    columns: Vec<SchemaColumn>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<SchemaColumn>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Output column names in vector order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// The canonical Telco churn schema the served model was trained against.
    ///
    /// Column names and order must match the training-time encoder output
    /// exactly; this is a static contract with the promoted model, it is not
    /// re-checked at runtime.
    pub fn telco() -> Self {
        let mut columns = Vec::with_capacity(30);
        for field in ["SeniorCitizen", "tenure", "MonthlyCharges", "TotalCharges"] {
            columns.push(SchemaColumn::Continuous {
                field: field.to_string(),
            });
        }
        let indicators: &[(&str, &str)] = &[
            ("gender", "Male"),
            ("Partner", "Yes"),
            ("Dependents", "Yes"),
            ("PhoneService", "Yes"),
            ("MultipleLines", "No phone service"),
            ("MultipleLines", "Yes"),
            ("InternetService", "Fiber optic"),
            ("InternetService", "No"),
            ("OnlineSecurity", "No internet service"),
            ("OnlineSecurity", "Yes"),
            ("OnlineBackup", "No internet service"),
            ("OnlineBackup", "Yes"),
            ("DeviceProtection", "No internet service"),
            ("DeviceProtection", "Yes"),
            ("TechSupport", "No internet service"),
            ("TechSupport", "Yes"),
            ("StreamingTV", "No internet service"),
            ("StreamingTV", "Yes"),
            ("StreamingMovies", "No internet service"),
            ("StreamingMovies", "Yes"),
            ("Contract", "One year"),
            ("Contract", "Two year"),
            ("PaperlessBilling", "Yes"),
            ("PaymentMethod", "Credit card (automatic)"),
            ("PaymentMethod", "Electronic check"),
            ("PaymentMethod", "Mailed check"),
        ];
        for (field, level) in indicators {
            columns.push(SchemaColumn::Indicator {
                field: field.to_string(),
                level: level.to_string(),
            });
        }
        Self::new(columns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telco_schema_shape() {
        let schema = FeatureSchema::telco();
        assert_eq!(schema.len(), 30);

        let names = schema.column_names();
        assert_eq!(names[0], "SeniorCitizen");
        assert_eq!(names[4], "gender_Male");
        assert_eq!(names[29], "PaymentMethod_Mailed check");
    }

    #[test]
    fn test_indicator_column_naming() {
        let col = SchemaColumn::Indicator {
            field: "Contract".to_string(),
            level: "One year".to_string(),
        };
        assert_eq!(col.name(), "Contract_One year");
    }

    #[test]
    fn test_schema_roundtrip_serde() {
        let schema = FeatureSchema::telco();
        let json = serde_json::to_string(&schema).unwrap();
        let restored: FeatureSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, restored);
    }
}
