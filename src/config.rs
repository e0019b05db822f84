//! Pipeline configuration
//!
//! All tunable parameters live in one `PipelineConfig`, read once at process
//! start from a JSON params file (with env-var fallbacks for the common ones)
//! and treated as immutable afterwards.

use crate::error::{ChurnError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the whole pipeline: data, training, tracking, serving.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Experiment name used by the tracker
    pub experiment_name: String,
    /// Directory for experiment tracking storage
    pub tracking_dir: String,
    /// Directory for the model registry
    pub registry_dir: String,
    /// Path of the dataset inside the data root
    pub data_path: String,
    /// Dataset revision identifier (resolves to an immutable snapshot)
    pub data_revision: String,
    /// Root directory holding dataset revisions
    pub data_root: String,
    /// Fraction of rows held out for validation
    pub validation_split: f64,
    /// Seed for splits and sampling
    pub random_seed: u64,
    /// Fraction kept in the reduced dataset
    pub reduced_fraction: f64,
    /// Regularization strengths tried for logistic regression
    pub c_grid: Vec<f64>,
    /// Estimator counts tried for the random forest
    pub n_estimators_grid: Vec<usize>,
    /// Serving host
    pub host: String,
    /// Serving port
    pub port: u16,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            experiment_name: "churn-prediction".to_string(),
            tracking_dir: std::env::var("TRACKING_DIR").unwrap_or_else(|_| "./mlruns".to_string()),
            registry_dir: std::env::var("REGISTRY_DIR").unwrap_or_else(|_| "./registry".to_string()),
            data_path: "processed/full.parquet".to_string(),
            data_revision: "v1".to_string(),
            data_root: std::env::var("DATA_ROOT").unwrap_or_else(|_| "./data".to_string()),
            validation_split: 0.2,
            random_seed: 42,
            reduced_fraction: 0.3,
            c_grid: vec![0.1, 1.0, 10.0],
            n_estimators_grid: vec![50, 100, 200],
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5001),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a JSON params file.
    /// Missing keys fall back to the defaults above.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a params file if one exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.validation_split) || self.validation_split == 0.0 {
            return Err(ChurnError::ConfigError(format!(
                "validation_split must be in (0, 1), got {}",
                self.validation_split
            )));
        }
        if !(0.0..=1.0).contains(&self.reduced_fraction) {
            return Err(ChurnError::ConfigError(format!(
                "reduced_fraction must be in [0, 1], got {}",
                self.reduced_fraction
            )));
        }
        if self.c_grid.is_empty() && self.n_estimators_grid.is_empty() {
            return Err(ChurnError::ConfigError(
                "both model grids are empty, nothing to train".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.validation_split, 0.2);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.c_grid, vec![0.1, 1.0, 10.0]);
        assert_eq!(config.n_estimators_grid, vec![50, 100, 200]);
    }

    #[test]
    fn test_partial_params_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"validation_split": 0.25, "random_seed": 7}"#).unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.validation_split, 0.25);
        assert_eq!(config.random_seed, 7);
        // Unspecified keys keep their defaults
        assert_eq!(config.n_estimators_grid, vec![50, 100, 200]);
    }

    #[test]
    fn test_invalid_split_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"validation_split": 1.5}"#).unwrap();
        assert!(PipelineConfig::from_file(&path).is_err());
    }
}
