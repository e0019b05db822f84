//! The churn preprocessing pipeline

use super::{OneHotEncoder, StandardScaler};
use crate::error::{ChurnError, Result};
use crate::schema::{FeatureSchema, SchemaColumn};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Result of a preprocessing run.
pub struct PreprocessOutput {
    /// Encoded dataset: id, scaled continuous, dummies, binary label
    pub encoded: DataFrame,
    /// Schema describing the feature columns (everything but id and label)
    pub schema: FeatureSchema,
}

/// Converts the raw churn table into its encoded training representation.
///
/// Steps, in order: coerce the charges column and drop rows where the
/// coercion fails, forward-fill remaining nulls, one-hot encode the
/// categorical columns (first sorted level dropped), standardize the
/// continuous columns, and map the label to 1/0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnPreprocessor {
    pub id_column: String,
    pub label_column: String,
    /// Numeric column that arrives as text and needs coercion
    pub charges_column: String,
    scaler: StandardScaler,
    encoder: OneHotEncoder,
}

impl Default for ChurnPreprocessor {
    fn default() -> Self {
        Self::new()
    }
}

impl ChurnPreprocessor {
    pub fn new() -> Self {
        Self {
            id_column: "customerID".to_string(),
            label_column: "Churn".to_string(),
            charges_column: "TotalCharges".to_string(),
            scaler: StandardScaler::new(),
            encoder: OneHotEncoder::new(),
        }
    }

    /// Run the full pipeline on a raw dataset.
    pub fn preprocess(&mut self, df: &DataFrame) -> Result<PreprocessOutput> {
        let rows_in = df.height();

        let df = self.coerce_charges(df)?;
        let dropped = rows_in - df.height();
        if dropped > 0 {
            info!(dropped, column = %self.charges_column, "Dropped rows with unparseable charges");
        }

        let df = forward_fill(&df)?;

        let (continuous, categorical) = self.partition_columns(&df);
        if continuous.is_empty() {
            return Err(ChurnError::PreprocessingError(
                "no continuous columns detected".to_string(),
            ));
        }

        // Fit + apply the two transforms
        let scaled = self.scaler.fit_transform(&df, &continuous)?;
        self.encoder.fit(&df, &categorical)?;
        let dummies = self.encoder.transform(&df)?;

        // Assemble: id, scaled continuous, dummies, label
        let mut columns: Vec<Column> = Vec::with_capacity(2 + continuous.len() + dummies.width());
        columns.push(df.column(&self.id_column)?.clone());
        for name in &continuous {
            columns.push(scaled.column(name)?.clone());
        }
        for col in dummies.get_columns() {
            columns.push(col.clone());
        }
        columns.push(self.encode_label(&df)?);

        let encoded = DataFrame::new(columns).map_err(|e| ChurnError::DataError(e.to_string()))?;

        let mut schema_columns: Vec<SchemaColumn> = continuous
            .iter()
            .map(|field| SchemaColumn::Continuous {
                field: field.clone(),
            })
            .collect();
        schema_columns.extend(self.encoder.schema_columns());

        info!(
            rows = encoded.height(),
            features = schema_columns.len(),
            "Preprocessing complete"
        );

        Ok(PreprocessOutput {
            encoded,
            schema: FeatureSchema::new(schema_columns),
        })
    }

    /// The fitted scaler, for replaying the standardization transform.
    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// Dropped reference levels recorded at fit time.
    pub fn reference_levels(&self) -> Vec<(String, String)> {
        self.encoder.reference_levels()
    }

    /// Cast the charges column to f64 (unparseable values become null) and
    /// drop the rows where the cast failed.
    fn coerce_charges(&self, df: &DataFrame) -> Result<DataFrame> {
        let casted = df
            .column(&self.charges_column)
            .map_err(|_| ChurnError::FeatureNotFound(self.charges_column.clone()))?
            .cast(&DataType::Float64)
            .map_err(|e| ChurnError::DataError(e.to_string()))?;

        let mut result = df.clone();
        result = result
            .with_column(casted)
            .map_err(|e| ChurnError::DataError(e.to_string()))?
            .clone();

        let mask = result
            .column(&self.charges_column)?
            .as_materialized_series()
            .is_not_null();
        result
            .filter(&mask)
            .map_err(|e| ChurnError::DataError(e.to_string()))
    }

    /// Partition feature columns by dtype, excluding the id and label.
    fn partition_columns(&self, df: &DataFrame) -> (Vec<String>, Vec<String>) {
        let mut continuous = Vec::new();
        let mut categorical = Vec::new();
        for col in df.get_columns() {
            let name = col.name().to_string();
            if name == self.id_column || name == self.label_column {
                continue;
            }
            match col.dtype() {
                DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Float32
                | DataType::Float64 => continuous.push(name),
                DataType::String => categorical.push(name),
                _ => {}
            }
        }
        (continuous, categorical)
    }

    /// Map the textual Yes/No label onto 1/0.
    fn encode_label(&self, df: &DataFrame) -> Result<Column> {
        let ca = df
            .column(&self.label_column)
            .map_err(|_| ChurnError::FeatureNotFound(self.label_column.clone()))?
            .as_materialized_series()
            .str()
            .map_err(|e| ChurnError::DataError(e.to_string()))?
            .clone();

        let values: Vec<i32> = ca
            .into_iter()
            .map(|opt| match opt {
                Some("Yes") => 1,
                _ => 0,
            })
            .collect();
        Ok(Column::new(self.label_column.as_str().into(), values))
    }
}

/// Forward-fill nulls column-wise. Rows before the first non-null value in a
/// column stay null and flow downstream as NaN.
fn forward_fill(df: &DataFrame) -> Result<DataFrame> {
    let columns: Vec<Column> = df
        .get_columns()
        .iter()
        .map(|col| {
            col.as_materialized_series()
                .fill_null(FillNullStrategy::Forward(None))
                .map(Column::from)
        })
        .collect::<PolarsResult<Vec<_>>>()
        .map_err(|e| ChurnError::DataError(e.to_string()))?;
    DataFrame::new(columns).map_err(|e| ChurnError::DataError(e.to_string()))
}

/// Draw the reduced sub-sample: a uniformly random fraction of rows under a
/// fixed seed, so the sample is reproducible across runs.
pub fn sample_fraction(df: &DataFrame, fraction: f64, seed: u64) -> Result<DataFrame> {
    let n = df.height();
    let keep = ((n as f64) * fraction).round() as usize;

    let mut indices: Vec<u32> = (0..n as u32).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices.truncate(keep);

    let idx = IdxCa::from_vec("idx".into(), indices);
    df.take(&idx).map_err(|e| ChurnError::DataError(e.to_string()))
}
