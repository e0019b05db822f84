//! Local model registry
//!
//! Stores serialized models on the local file system, one JSON file per
//! model, with a separate alias map. The serving layer resolves the
//! `production` alias at startup to pick up the promoted model.

use crate::error::{ChurnError, Result};
use crate::training::ChurnModel;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Metadata stored beside each registered model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMeta {
    pub model_id: String,
    pub name: String,
    pub registered_at: i64,
    pub run_id: Option<String>,
    pub metrics: HashMap<String, f64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelEntry {
    meta: ModelMeta,
    model: ChurnModel,
}

pub struct ModelRegistry {
    base_dir: PathBuf,
}

impl ModelRegistry {
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(base_dir.join("models"))?;
        Ok(Self { base_dir })
    }

    /// Register a model and return its id.
    pub fn push(
        &self,
        model: &ChurnModel,
        name: &str,
        run_id: Option<String>,
        metrics: HashMap<String, f64>,
    ) -> Result<String> {
        let model_id = Uuid::new_v4().to_string()[..8].to_string();
        let entry = ModelEntry {
            meta: ModelMeta {
                model_id: model_id.clone(),
                name: name.to_string(),
                registered_at: Utc::now().timestamp_millis(),
                run_id,
                metrics,
            },
            model: model.clone(),
        };
        let json = serde_json::to_string_pretty(&entry)?;
        fs::write(self.model_file(&model_id), json)?;
        Ok(model_id)
    }

    pub fn pull(&self, model_id: &str) -> Result<(ChurnModel, ModelMeta)> {
        let path = self.model_file(model_id);
        if !path.exists() {
            return Err(ChurnError::RegistryError(format!(
                "no model with id {}",
                model_id
            )));
        }
        let contents = fs::read_to_string(&path)?;
        let entry: ModelEntry = serde_json::from_str(&contents)
            .map_err(|e| ChurnError::RegistryError(format!("corrupt model file: {}", e)))?;
        Ok((entry.model, entry.meta))
    }

    /// Point an alias at a model, replacing any previous target.
    pub fn set_alias(&self, alias: &str, model_id: &str) -> Result<()> {
        if !self.model_file(model_id).exists() {
            return Err(ChurnError::RegistryError(format!(
                "cannot alias unknown model {}",
                model_id
            )));
        }
        let mut aliases = self.load_aliases()?;
        aliases.insert(alias.to_string(), model_id.to_string());
        let json = serde_json::to_string_pretty(&aliases)?;
        fs::write(self.aliases_file(), json)?;
        Ok(())
    }

    /// Resolve an alias to a model, if the alias exists.
    pub fn pull_alias(&self, alias: &str) -> Result<Option<(ChurnModel, ModelMeta)>> {
        let aliases = self.load_aliases()?;
        match aliases.get(alias) {
            Some(model_id) => self.pull(model_id).map(Some),
            None => Ok(None),
        }
    }

    pub fn list(&self) -> Result<Vec<ModelMeta>> {
        let mut metas = Vec::new();
        for dir_entry in fs::read_dir(self.base_dir.join("models"))? {
            let path = dir_entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            let entry: ModelEntry = serde_json::from_str(&contents)
                .map_err(|e| ChurnError::RegistryError(format!("corrupt model file: {}", e)))?;
            metas.push(entry.meta);
        }
        metas.sort_by_key(|m| m.registered_at);
        Ok(metas)
    }

    fn model_file(&self, model_id: &str) -> PathBuf {
        self.base_dir.join("models").join(format!("{}.json", model_id))
    }

    fn aliases_file(&self) -> PathBuf {
        self.base_dir.join("aliases.json")
    }

    fn load_aliases(&self) -> Result<HashMap<String, String>> {
        let path = self.aliases_file();
        if !path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&path)?;
        serde_json::from_str(&contents)
            .map_err(|e| ChurnError::RegistryError(format!("corrupt alias file: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::LogisticRegression;
    use ndarray::array;
    use tempfile::TempDir;

    fn fitted_model() -> ChurnModel {
        let mut m = LogisticRegression::new();
        let x = array![[0.0], [1.0], [2.0], [3.0]];
        let y = array![0.0, 0.0, 1.0, 1.0];
        m.fit(&x, &y).unwrap();
        ChurnModel::Logistic(m)
    }

    #[test]
    fn test_push_pull_roundtrip() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        let model = fitted_model();

        let mut metrics = HashMap::new();
        metrics.insert("f1_score".to_string(), 0.71);
        let id = registry
            .push(&model, "LogisticRegression_C=1", None, metrics)
            .unwrap();

        let (pulled, meta) = registry.pull(&id).unwrap();
        assert_eq!(meta.name, "LogisticRegression_C=1");
        assert_eq!(meta.metrics["f1_score"], 0.71);

        let x = array![[0.0], [3.0]];
        assert_eq!(
            model.predict(&x).unwrap(),
            pulled.predict(&x).unwrap()
        );
    }

    #[test]
    fn test_alias_resolution() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        let model = fitted_model();

        assert!(registry.pull_alias("production").unwrap().is_none());

        let first = registry.push(&model, "a", None, HashMap::new()).unwrap();
        let second = registry.push(&model, "b", None, HashMap::new()).unwrap();

        registry.set_alias("production", &first).unwrap();
        registry.set_alias("production", &second).unwrap();

        let (_, meta) = registry.pull_alias("production").unwrap().unwrap();
        assert_eq!(meta.model_id, second);
    }

    #[test]
    fn test_alias_requires_existing_model() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        assert!(registry.set_alias("production", "deadbeef").is_err());
    }

    #[test]
    fn test_list_returns_all_registered_models() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        assert!(registry.list().unwrap().is_empty());

        let model = fitted_model();
        let first = registry.push(&model, "a", None, HashMap::new()).unwrap();
        let second = registry.push(&model, "b", None, HashMap::new()).unwrap();

        let metas = registry.list().unwrap();
        assert_eq!(metas.len(), 2);
        let ids: Vec<&str> = metas.iter().map(|m| m.model_id.as_str()).collect();
        assert!(ids.contains(&first.as_str()));
        assert!(ids.contains(&second.as_str()));
    }

    #[test]
    fn test_pull_unknown_model() {
        let dir = TempDir::new().unwrap();
        let registry = ModelRegistry::new(dir.path()).unwrap();
        assert!(registry.pull("missing").is_err());
    }
}
