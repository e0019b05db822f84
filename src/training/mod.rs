//! Model training module
//!
//! The model zoo is intentionally small: the grid enumerates logistic
//! regression over a few regularization strengths and random forests over a
//! few estimator counts. The experiment protocol fits every configuration,
//! scores it on a held-out split, and selects the best by F1.

pub mod decision_tree;
mod experiment;
pub mod logistic;
mod metrics;
pub mod random_forest;

pub use experiment::{
    candidates_from_runs, evaluate_candidates, run_experiment, select_best, train_val_split,
    Candidate, SelectionResult, TrainOptions, PRODUCTION_ALIAS,
};
pub use logistic::LogisticRegression;
pub use metrics::{roc_auc, roc_curve, ClassificationMetrics, ConfusionMatrix};
pub use random_forest::RandomForestClassifier;

use crate::error::{ChurnError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One point of the hyperparameter grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelConfig {
    /// Logistic regression with inverse regularization strength C
    Logistic { c: f64 },
    /// Random forest with a fixed estimator count
    Forest { n_estimators: usize },
}

impl ModelConfig {
    /// Run name, mirroring the tracker convention `<family>_<param>=<value>`.
    pub fn name(&self) -> String {
        match self {
            ModelConfig::Logistic { c } => format!("LogisticRegression_C={}", c),
            ModelConfig::Forest { n_estimators } => format!("RandomForest_n={}", n_estimators),
        }
    }

    /// Hyperparameters as tracker params.
    pub fn params(&self) -> HashMap<String, String> {
        let mut params = HashMap::new();
        match self {
            ModelConfig::Logistic { c } => {
                params.insert("model".to_string(), "LogisticRegression".to_string());
                params.insert("C".to_string(), c.to_string());
            }
            ModelConfig::Forest { n_estimators } => {
                params.insert("model".to_string(), "RandomForest".to_string());
                params.insert("n_estimators".to_string(), n_estimators.to_string());
            }
        }
        params
    }

    /// Build the (unfitted) model for this configuration.
    pub fn build(&self, seed: u64) -> ChurnModel {
        match self {
            ModelConfig::Logistic { c } => {
                ChurnModel::Logistic(LogisticRegression::new().with_c(*c).with_max_iter(1000))
            }
            ModelConfig::Forest { n_estimators } => ChurnModel::Forest(
                RandomForestClassifier::new(*n_estimators).with_random_state(seed),
            ),
        }
    }
}

/// Enumerate the full grid: logistic configurations first, then forests.
pub fn config_grid(c_grid: &[f64], n_estimators_grid: &[usize]) -> Vec<ModelConfig> {
    let mut grid: Vec<ModelConfig> = c_grid.iter().map(|&c| ModelConfig::Logistic { c }).collect();
    grid.extend(
        n_estimators_grid
            .iter()
            .map(|&n| ModelConfig::Forest { n_estimators: n }),
    );
    grid
}

/// A fitted model from the grid. Serializable so the registry can persist it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ChurnModel {
    Logistic(LogisticRegression),
    Forest(RandomForestClassifier),
}

impl ChurnModel {
    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            ChurnModel::Logistic(m) => m.fit(x, y).map(|_| ()),
            ChurnModel::Forest(m) => m.fit(x, y).map(|_| ()),
        }
    }

    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            ChurnModel::Logistic(m) => m.predict(x),
            ChurnModel::Forest(m) => m.predict(x),
        }
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            ChurnModel::Logistic(m) => m.predict_proba(x),
            ChurnModel::Forest(m) => m.predict_proba(x),
        }
    }
}

/// Split an encoded dataset into the feature matrix and label vector,
/// excluding the identifier column.
pub fn design_matrix(
    df: &DataFrame,
    id_column: &str,
    label_column: &str,
) -> Result<(Array2<f64>, Array1<f64>, Vec<String>)> {
    let feature_cols: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != id_column && name.as_str() != label_column)
        .map(|s| s.to_string())
        .collect();

    let target = df
        .column(label_column)
        .map_err(|_| ChurnError::FeatureNotFound(label_column.to_string()))?
        .cast(&DataType::Float64)
        .map_err(|e| ChurnError::DataError(e.to_string()))?;
    let y: Array1<f64> = target
        .f64()
        .map_err(|e| ChurnError::DataError(e.to_string()))?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect();

    let n_rows = df.height();
    let n_cols = feature_cols.len();
    let col_data: Vec<Vec<f64>> = feature_cols
        .iter()
        .map(|col_name| {
            let series = df
                .column(col_name)
                .map_err(|_| ChurnError::FeatureNotFound(col_name.clone()))?
                .cast(&DataType::Float64)
                .map_err(|e| ChurnError::DataError(e.to_string()))?;
            let values: Vec<f64> = series
                .f64()
                .map_err(|e| ChurnError::DataError(e.to_string()))?
                .into_iter()
                .map(|v| v.unwrap_or(f64::NAN))
                .collect();
            Ok(values)
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    let col_refs: Vec<&[f64]> = col_data.iter().map(|c| c.as_slice()).collect();
    let x = Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_refs[c][r]);

    Ok((x, y, feature_cols))
}
