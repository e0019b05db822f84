//! Experiment protocol: grid sweep, selection, evaluation, promotion
//!
//! `run_experiment` fits every grid configuration on a seeded train/validation
//! split and records each as a tracked run with a registered model.
//! `evaluate_candidates` re-scores the candidates with ROC artifacts, picks
//! the best by F1, and promotes it to the `production` alias.

use super::{config_grid, roc_auc, roc_curve, ClassificationMetrics, ConfusionMatrix, ModelConfig};
use crate::error::{ChurnError, Result};
use crate::registry::ModelRegistry;
use crate::tracking::{ExperimentTracker, Run, RunStatus};
use ndarray::{Array1, Array2, Axis};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{info, warn};

/// Alias the serving layer resolves at startup.
pub const PRODUCTION_ALIAS: &str = "production";

/// Options for a grid sweep.
#[derive(Debug, Clone)]
pub struct TrainOptions {
    pub validation_split: f64,
    pub random_seed: u64,
    pub c_grid: Vec<f64>,
    pub n_estimators_grid: Vec<usize>,
}

impl Default for TrainOptions {
    fn default() -> Self {
        Self {
            validation_split: 0.2,
            random_seed: 42,
            c_grid: vec![0.1, 1.0, 10.0],
            n_estimators_grid: vec![50, 100, 200],
        }
    }
}

/// One successfully trained grid point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub config: ModelConfig,
    pub run_id: String,
    pub model_id: String,
    pub metrics: ClassificationMetrics,
}

/// Outcome of the evaluation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionResult {
    pub best: Candidate,
    pub promoted_alias: String,
}

/// Shuffle rows with a seeded generator and split off the validation tail.
///
/// The same seed always produces the same partition, so separate training
/// and evaluation invocations see identical validation sets.
pub fn train_val_split(
    x: &Array2<f64>,
    y: &Array1<f64>,
    validation_split: f64,
    seed: u64,
) -> Result<(Array2<f64>, Array2<f64>, Array1<f64>, Array1<f64>)> {
    if x.nrows() != y.len() {
        return Err(ChurnError::ShapeError {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if !(0.0..1.0).contains(&validation_split) || validation_split == 0.0 {
        return Err(ChurnError::TrainingError(format!(
            "validation_split must be in (0, 1), got {}",
            validation_split
        )));
    }

    let n = x.nrows();
    let n_val = ((n as f64) * validation_split).ceil() as usize;
    if n_val == 0 || n_val >= n {
        return Err(ChurnError::TrainingError(format!(
            "cannot split {} rows with validation_split {}",
            n, validation_split
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (val_idx, train_idx) = indices.split_at(n_val);
    let x_train = x.select(Axis(0), train_idx);
    let x_val = x.select(Axis(0), val_idx);
    let y_train = y.select(Axis(0), train_idx);
    let y_val = y.select(Axis(0), val_idx);

    Ok((x_train, x_val, y_train, y_val))
}

/// Fit and score every grid configuration.
///
/// A configuration that fails to fit is logged as a failed run and skipped;
/// the sweep errors only when no configuration produced a usable model.
pub fn run_experiment(
    x: &Array2<f64>,
    y: &Array1<f64>,
    options: &TrainOptions,
    tracker: &mut ExperimentTracker,
    registry: &ModelRegistry,
) -> Result<Vec<Candidate>> {
    let (x_train, x_val, y_train, y_val) =
        train_val_split(x, y, options.validation_split, options.random_seed)?;
    info!(
        train_rows = x_train.nrows(),
        val_rows = x_val.nrows(),
        "split dataset"
    );

    let grid = config_grid(&options.c_grid, &options.n_estimators_grid);
    let mut candidates = Vec::new();

    for config in grid {
        let name = config.name();
        let run_id = tracker.start_run(&name)?;
        for (key, value) in config.params() {
            tracker.log_param(&run_id, &key, &value)?;
        }

        let mut model = config.build(options.random_seed);
        let fitted = model
            .fit(&x_train, &y_train)
            .and_then(|_| model.predict(&x_val));

        let y_pred = match fitted {
            Ok(pred) => pred,
            Err(e) => {
                warn!(run = %name, error = %e, "configuration failed, skipping");
                tracker.finish_run(&run_id, RunStatus::Failed)?;
                continue;
            }
        };

        let metrics = ClassificationMetrics::compute(&y_val, &y_pred);
        tracker.log_metric(&run_id, "accuracy", metrics.accuracy)?;
        tracker.log_metric(&run_id, "precision", metrics.precision)?;
        tracker.log_metric(&run_id, "recall", metrics.recall)?;
        tracker.log_metric(&run_id, "f1_score", metrics.f1_score)?;

        let model_id = registry.push(
            &model,
            &name,
            Some(run_id.clone()),
            metric_map(&metrics),
        )?;
        tracker.log_param(&run_id, "model_id", &model_id)?;
        tracker.finish_run(&run_id, RunStatus::Finished)?;
        info!(
            run = %name,
            accuracy = metrics.accuracy,
            f1_score = metrics.f1_score,
            "trained candidate"
        );

        candidates.push(Candidate {
            config,
            run_id,
            model_id,
            metrics,
        });
    }

    if candidates.is_empty() {
        return Err(ChurnError::NoViableModel);
    }
    Ok(candidates)
}

/// Rebuild candidates from previously tracked runs, so evaluation can run in
/// a separate invocation from training. Runs without a registered model are
/// ignored.
pub fn candidates_from_runs(runs: &[Run]) -> Vec<Candidate> {
    runs.iter()
        .filter(|r| r.status == RunStatus::Finished)
        .filter_map(|run| {
            let model_id = run.params.get("model_id")?.clone();
            let config = match run.params.get("model")?.as_str() {
                "LogisticRegression" => ModelConfig::Logistic {
                    c: run.params.get("C")?.parse().ok()?,
                },
                "RandomForest" => ModelConfig::Forest {
                    n_estimators: run.params.get("n_estimators")?.parse().ok()?,
                },
                _ => return None,
            };
            Some(Candidate {
                config,
                run_id: run.run_id.clone(),
                model_id,
                metrics: ClassificationMetrics {
                    accuracy: run.metrics.get("accuracy").copied().unwrap_or(0.0),
                    precision: run.metrics.get("precision").copied().unwrap_or(0.0),
                    recall: run.metrics.get("recall").copied().unwrap_or(0.0),
                    f1_score: run.metrics.get("f1_score").copied().unwrap_or(0.0),
                    auc: None,
                    n_samples: 0,
                },
            })
        })
        .collect()
}

/// Pick the candidate with the highest F1. Ties keep the earlier candidate,
/// so grid order decides between equal scores.
pub fn select_best(candidates: &[Candidate]) -> Result<&Candidate> {
    let mut best: Option<&Candidate> = None;
    for candidate in candidates {
        match best {
            Some(current) if candidate.metrics.f1_score > current.metrics.f1_score => {
                best = Some(candidate);
            }
            None => best = Some(candidate),
            _ => {}
        }
    }
    best.ok_or(ChurnError::NoViableModel)
}

/// Re-score every candidate on the validation split with probability-based
/// metrics and artifacts, then promote the best by F1 to `production`.
pub fn evaluate_candidates(
    candidates: &[Candidate],
    x_val: &Array2<f64>,
    y_val: &Array1<f64>,
    tracker: &mut ExperimentTracker,
    registry: &ModelRegistry,
) -> Result<SelectionResult> {
    let mut rescored = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let (model, _) = registry.pull(&candidate.model_id)?;
        let proba = model.predict_proba(x_val)?;
        let y_pred = proba.mapv(|p| if p >= 0.5 { 1.0 } else { 0.0 });

        let auc = roc_auc(y_val, &proba);
        let mut metrics = ClassificationMetrics::compute(y_val, &y_pred);
        metrics.auc = Some(auc);

        tracker.log_metric(&candidate.run_id, "eval_accuracy", metrics.accuracy)?;
        tracker.log_metric(&candidate.run_id, "eval_f1_score", metrics.f1_score)?;
        tracker.log_metric(&candidate.run_id, "eval_auc", auc)?;

        let curve = roc_curve(y_val, &proba);
        tracker.log_artifact(
            &candidate.run_id,
            "roc_curve.csv",
            roc_curve_csv(&curve).as_bytes(),
        )?;
        let cm = ConfusionMatrix::compute(y_val, &y_pred);
        tracker.log_artifact(
            &candidate.run_id,
            "confusion_matrix.json",
            serde_json::to_string_pretty(&cm)?.as_bytes(),
        )?;

        rescored.push(Candidate {
            config: candidate.config.clone(),
            run_id: candidate.run_id.clone(),
            model_id: candidate.model_id.clone(),
            metrics,
        });
    }

    let best = select_best(&rescored)?.clone();
    registry.set_alias(PRODUCTION_ALIAS, &best.model_id)?;
    info!(
        model = %best.config.name(),
        f1_score = best.metrics.f1_score,
        "promoted best model to '{}'",
        PRODUCTION_ALIAS
    );

    Ok(SelectionResult {
        best,
        promoted_alias: PRODUCTION_ALIAS.to_string(),
    })
}

fn metric_map(metrics: &ClassificationMetrics) -> HashMap<String, f64> {
    let mut map = HashMap::new();
    map.insert("accuracy".to_string(), metrics.accuracy);
    map.insert("f1_score".to_string(), metrics.f1_score);
    map
}

fn roc_curve_csv(curve: &[(f64, f64)]) -> String {
    let mut csv = String::from("fpr,tpr\n");
    for (fpr, tpr) in curve {
        csv.push_str(&format!("{},{}\n", fpr, tpr));
    }
    csv
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array};
    use tempfile::TempDir;

    fn toy_dataset() -> (Array2<f64>, Array1<f64>) {
        // 40 rows, two informative clusters
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..40 {
            let offset = if i % 2 == 0 { 0.0 } else { 5.0 };
            rows.push([offset + (i as f64) * 0.01, offset - (i as f64) * 0.01]);
            labels.push(if i % 2 == 0 { 0.0 } else { 1.0 });
        }
        let x = Array::from_shape_fn((40, 2), |(r, c)| rows[r][c]);
        (x, Array1::from(labels))
    }

    fn make_candidate(name: &str, f1: f64) -> Candidate {
        Candidate {
            config: ModelConfig::Logistic { c: 1.0 },
            run_id: name.to_string(),
            model_id: name.to_string(),
            metrics: ClassificationMetrics {
                accuracy: f1,
                precision: f1,
                recall: f1,
                f1_score: f1,
                auc: None,
                n_samples: 10,
            },
        }
    }

    #[test]
    fn test_split_is_deterministic() {
        let (x, y) = toy_dataset();
        let a = train_val_split(&x, &y, 0.2, 42).unwrap();
        let b = train_val_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(a.1, b.1);
        assert_eq!(a.3, b.3);

        let c = train_val_split(&x, &y, 0.2, 7).unwrap();
        assert_ne!(a.1, c.1);
    }

    #[test]
    fn test_split_sizes() {
        let (x, y) = toy_dataset();
        let (x_train, x_val, y_train, y_val) = train_val_split(&x, &y, 0.2, 42).unwrap();
        assert_eq!(x_val.nrows(), 8);
        assert_eq!(x_train.nrows(), 32);
        assert_eq!(y_train.len(), 32);
        assert_eq!(y_val.len(), 8);
    }

    #[test]
    fn test_split_rejects_degenerate_fraction() {
        let (x, y) = toy_dataset();
        assert!(train_val_split(&x, &y, 0.0, 42).is_err());
        assert!(train_val_split(&x, &y, 1.0, 42).is_err());
    }

    #[test]
    fn test_select_best_strictly_greater_keeps_first_tie() {
        let candidates = vec![
            make_candidate("a", 0.62),
            make_candidate("b", 0.71),
            make_candidate("c", 0.71),
        ];
        let best = select_best(&candidates).unwrap();
        assert_eq!(best.run_id, "b");
    }

    #[test]
    fn test_select_best_empty() {
        assert!(matches!(
            select_best(&[]),
            Err(ChurnError::NoViableModel)
        ));
    }

    #[test]
    fn test_full_sweep_and_promotion() {
        let (x, y) = toy_dataset();
        let tracking = TempDir::new().unwrap();
        let registry_dir = TempDir::new().unwrap();
        let mut tracker = ExperimentTracker::new(tracking.path(), "churn-test").unwrap();
        let registry = ModelRegistry::new(registry_dir.path()).unwrap();

        let options = TrainOptions {
            c_grid: vec![1.0],
            n_estimators_grid: vec![10],
            ..TrainOptions::default()
        };
        let candidates = run_experiment(&x, &y, &options, &mut tracker, &registry).unwrap();
        assert_eq!(candidates.len(), 2);
        for candidate in &candidates {
            let run = tracker.get_run(&candidate.run_id).unwrap();
            assert!(run.metrics.contains_key("f1_score"));
        }

        let (_, x_val, _, y_val) =
            train_val_split(&x, &y, options.validation_split, options.random_seed).unwrap();
        let result =
            evaluate_candidates(&candidates, &x_val, &y_val, &mut tracker, &registry).unwrap();

        assert_eq!(result.promoted_alias, PRODUCTION_ALIAS);
        let promoted = registry.pull_alias(PRODUCTION_ALIAS).unwrap();
        assert!(promoted.is_some());

        let run = tracker.get_run(&result.best.run_id).unwrap();
        assert!(run.metrics.contains_key("eval_auc"));
        assert!(run.artifacts.contains(&"roc_curve.csv".to_string()));
    }

    #[test]
    fn test_candidates_rebuilt_from_runs() {
        let mut params = std::collections::HashMap::new();
        params.insert("model".to_string(), "RandomForest".to_string());
        params.insert("n_estimators".to_string(), "100".to_string());
        params.insert("model_id".to_string(), "abc12345".to_string());
        let mut metrics = std::collections::HashMap::new();
        metrics.insert("f1_score".to_string(), 0.7);
        metrics.insert("accuracy".to_string(), 0.8);

        let runs = vec![
            Run {
                run_id: "r1".to_string(),
                run_name: "RandomForest_n=100".to_string(),
                status: RunStatus::Finished,
                start_time: 0,
                end_time: Some(1),
                params,
                metrics,
                artifacts: Vec::new(),
            },
            Run {
                run_id: "r2".to_string(),
                run_name: "broken".to_string(),
                status: RunStatus::Failed,
                start_time: 0,
                end_time: Some(1),
                params: std::collections::HashMap::new(),
                metrics: std::collections::HashMap::new(),
                artifacts: Vec::new(),
            },
        ];

        let candidates = candidates_from_runs(&runs);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].model_id, "abc12345");
        assert_eq!(
            candidates[0].config,
            ModelConfig::Forest { n_estimators: 100 }
        );
        assert_eq!(candidates[0].metrics.f1_score, 0.7);
    }

    #[test]
    fn test_split_shape_mismatch() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 0.0, 1.0];
        assert!(train_val_split(&x, &y, 0.2, 42).is_err());
    }
}
