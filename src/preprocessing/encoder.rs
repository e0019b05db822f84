//! One-hot encoding with a dropped reference level

use crate::error::{ChurnError, Result};
use crate::schema::SchemaColumn;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Fitted levels for one categorical column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnLevels {
    column: String,
    /// Dropped reference level (first in sorted order)
    reference: String,
    /// Levels that get an indicator column, in sorted order
    kept: Vec<String>,
}

/// One-hot encoder over string columns.
///
/// Levels are ordered alphabetically and the first level of each column is
/// dropped as the implicit reference, so the layout is deterministic for a
/// given dataset. Indicator columns are named `<column>_<level>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    fitted: Vec<ColumnLevels>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit level sets for the named columns, in the given column order.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        self.fitted.clear();
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| ChurnError::FeatureNotFound(col_name.clone()))?;
            let ca = column
                .as_materialized_series()
                .str()
                .map_err(|e| ChurnError::DataError(e.to_string()))?
                .clone();

            // BTreeSet gives the sorted, deterministic level order
            let mut levels: Vec<String> = ca
                .into_iter()
                .flatten()
                .map(|s| s.to_string())
                .collect::<std::collections::BTreeSet<_>>()
                .into_iter()
                .collect();

            if levels.is_empty() {
                return Err(ChurnError::PreprocessingError(format!(
                    "categorical column '{}' has no non-null values",
                    col_name
                )));
            }

            let reference = levels.remove(0);
            self.fitted.push(ColumnLevels {
                column: col_name.clone(),
                reference,
                kept: levels,
            });
        }
        self.is_fitted = true;
        Ok(self)
    }

    /// Produce the dummy columns for `df` as a new frame, in fitted order.
    /// A null or unseen value leaves its whole group at zero.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }

        let mut dummies: Vec<Column> = Vec::new();
        for fitted in &self.fitted {
            let column = df
                .column(&fitted.column)
                .map_err(|_| ChurnError::FeatureNotFound(fitted.column.clone()))?;
            let ca = column
                .as_materialized_series()
                .str()
                .map_err(|e| ChurnError::DataError(e.to_string()))?
                .clone();

            for level in &fitted.kept {
                let values: Vec<f64> = ca
                    .into_iter()
                    .map(|opt| match opt {
                        Some(v) if v == level => 1.0,
                        _ => 0.0,
                    })
                    .collect();
                let name = format!("{}_{}", fitted.column, level);
                dummies.push(Column::new(name.into(), values));
            }
        }

        DataFrame::new(dummies).map_err(|e| ChurnError::DataError(e.to_string()))
    }

    /// Schema columns describing the encoder's output, in output order.
    pub fn schema_columns(&self) -> Vec<SchemaColumn> {
        self.fitted
            .iter()
            .flat_map(|f| {
                f.kept.iter().map(|level| SchemaColumn::Indicator {
                    field: f.column.clone(),
                    level: level.clone(),
                })
            })
            .collect()
    }

    /// Dropped reference level per fitted column, in fitted order.
    pub fn reference_levels(&self) -> Vec<(String, String)> {
        self.fitted
            .iter()
            .map(|f| (f.column.clone(), f.reference.clone()))
            .collect()
    }
}
