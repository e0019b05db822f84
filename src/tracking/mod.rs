//! Local experiment tracking
//!
//! Persists experiments, runs, params, metrics, and artifacts to the local
//! file system as JSON. Layout under the tracking directory:
//!
//! ```text
//! <tracking_dir>/
//!   <experiment>/
//!     runs.json            all runs for the experiment
//!     artifacts/<run_id>/  artifact files logged during a run
//! ```

use crate::error::{ChurnError, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

/// A single tracked run: one model configuration fitted and scored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub run_name: String,
    pub status: RunStatus,
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub params: HashMap<String, String>,
    pub metrics: HashMap<String, f64>,
    pub artifacts: Vec<String>,
}

/// File-backed tracker scoped to one experiment name.
pub struct ExperimentTracker {
    experiment: String,
    base_dir: PathBuf,
    runs: Vec<Run>,
}

impl ExperimentTracker {
    /// Open (or create) the experiment under `base_dir`, loading prior runs.
    pub fn new(base_dir: impl AsRef<Path>, experiment: &str) -> Result<Self> {
        let base_dir = base_dir.as_ref().join(experiment);
        fs::create_dir_all(&base_dir)?;

        let runs_file = base_dir.join("runs.json");
        let runs = if runs_file.exists() {
            let contents = fs::read_to_string(&runs_file)?;
            serde_json::from_str(&contents)
                .map_err(|e| ChurnError::TrackingError(format!("corrupt runs file: {}", e)))?
        } else {
            Vec::new()
        };

        Ok(Self {
            experiment: experiment.to_string(),
            base_dir,
            runs,
        })
    }

    pub fn experiment_name(&self) -> &str {
        &self.experiment
    }

    /// Begin a new run and return its id.
    pub fn start_run(&mut self, run_name: &str) -> Result<String> {
        let run_id = Uuid::new_v4().to_string();
        self.runs.push(Run {
            run_id: run_id.clone(),
            run_name: run_name.to_string(),
            status: RunStatus::Running,
            start_time: Utc::now().timestamp_millis(),
            end_time: None,
            params: HashMap::new(),
            metrics: HashMap::new(),
            artifacts: Vec::new(),
        });
        self.persist()?;
        Ok(run_id)
    }

    pub fn log_param(&mut self, run_id: &str, key: &str, value: &str) -> Result<()> {
        let run = self.run_mut(run_id)?;
        run.params.insert(key.to_string(), value.to_string());
        self.persist()
    }

    pub fn log_metric(&mut self, run_id: &str, key: &str, value: f64) -> Result<()> {
        let run = self.run_mut(run_id)?;
        run.metrics.insert(key.to_string(), value);
        self.persist()
    }

    /// Write an artifact file under the run's artifact directory and record it.
    pub fn log_artifact(&mut self, run_id: &str, file_name: &str, contents: &[u8]) -> Result<PathBuf> {
        let dir = self.base_dir.join("artifacts").join(run_id);
        fs::create_dir_all(&dir)?;
        let path = dir.join(file_name);
        fs::write(&path, contents)?;

        let run = self.run_mut(run_id)?;
        run.artifacts.push(file_name.to_string());
        self.persist()?;
        Ok(path)
    }

    pub fn finish_run(&mut self, run_id: &str, status: RunStatus) -> Result<()> {
        let run = self.run_mut(run_id)?;
        run.status = status;
        run.end_time = Some(Utc::now().timestamp_millis());
        self.persist()
    }

    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn get_run(&self, run_id: &str) -> Option<&Run> {
        self.runs.iter().find(|r| r.run_id == run_id)
    }

    fn run_mut(&mut self, run_id: &str) -> Result<&mut Run> {
        self.runs
            .iter_mut()
            .find(|r| r.run_id == run_id)
            .ok_or_else(|| ChurnError::TrackingError(format!("unknown run id: {}", run_id)))
    }

    fn persist(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.runs)?;
        fs::write(self.base_dir.join("runs.json"), json)?;
        Ok(())
    }
}
