//! Standardization of continuous features

use crate::error::{ChurnError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Fitted parameters for one column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    mean: f64,
    scale: f64,
}

/// Zero-mean, unit-variance scaler.
///
/// The fitted mean/scale per column is kept so the exact same transform can
/// be replayed on later data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: HashMap<String, ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit the scaler on the named columns.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        for col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| ChurnError::FeatureNotFound(col_name.clone()))?;
            let ca = column
                .as_materialized_series()
                .cast(&DataType::Float64)?
                .f64()
                .map_err(|e| ChurnError::DataError(e.to_string()))?
                .clone();

            let mean = ca.mean().unwrap_or(0.0);
            let std = ca.std(1).unwrap_or(1.0);
            self.params.insert(
                col_name.clone(),
                ScalerParams {
                    mean,
                    scale: if std == 0.0 { 1.0 } else { std },
                },
            );
        }
        self.is_fitted = true;
        Ok(self)
    }

    /// Replace every fitted column with its standardized values.
    /// Nulls stay null and flow through.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(ChurnError::ModelNotFitted);
        }

        let mut result = df.clone();
        for (col_name, params) in &self.params {
            let Ok(column) = df.column(col_name) else {
                continue;
            };
            let values: Vec<Option<f64>> = column
                .as_materialized_series()
                .cast(&DataType::Float64)?
                .f64()
                .map_err(|e| ChurnError::DataError(e.to_string()))?
                .into_iter()
                .map(|opt| opt.map(|v| (v - params.mean) / params.scale))
                .collect();
            let scaled = Series::new(col_name.as_str().into(), values);
            result = result
                .with_column(scaled)
                .map_err(|e| ChurnError::DataError(e.to_string()))?
                .clone();
        }
        Ok(result)
    }

    /// Fit and transform in one step.
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Fitted (mean, scale) for a column, if present.
    pub fn params(&self, column: &str) -> Option<(f64, f64)> {
        self.params.get(column).map(|p| (p.mean, p.scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Column::new("tenure".into(), &[1.0, 2.0, 3.0, 4.0, 5.0]),
            Column::new("other".into(), &["a", "b", "c", "d", "e"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_standardized_mean_and_std() {
        let df = frame();
        let mut scaler = StandardScaler::new();
        let out = scaler.fit_transform(&df, &["tenure".to_string()]).unwrap();

        let ca = out.column("tenure").unwrap().f64().unwrap().clone();
        assert!(ca.mean().unwrap().abs() < 1e-12);
        assert!((ca.std(1).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_transform_replayable() {
        let df = frame();
        let mut scaler = StandardScaler::new();
        scaler.fit(&df, &["tenure".to_string()]).unwrap();

        let (mean, scale) = scaler.params("tenure").unwrap();
        assert_eq!(mean, 3.0);
        assert!(scale > 0.0);

        // Replaying on fresh data uses the stored parameters
        let fresh = DataFrame::new(vec![Column::new("tenure".into(), &[3.0])]).unwrap();
        let out = scaler.transform(&fresh).unwrap();
        let v = out.column("tenure").unwrap().f64().unwrap().get(0).unwrap();
        assert!(v.abs() < 1e-12);
    }

    #[test]
    fn test_unfitted_transform_fails() {
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&frame()),
            Err(ChurnError::ModelNotFitted)
        ));
    }
}
