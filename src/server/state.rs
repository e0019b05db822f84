//! Application state shared across handlers

use crate::registry::ModelMeta;
use crate::schema::FeatureSchema;
use crate::training::ChurnModel;

use super::ServeConfig;

/// The model resolved from the `production` alias at startup.
#[derive(Debug, Clone)]
pub struct PromotedModel {
    pub model: ChurnModel,
    pub meta: ModelMeta,
}

/// Immutable per-process state. The model is loaded once at startup; a
/// degraded server carries `None` and rejects predictions with 503.
pub struct AppState {
    pub config: ServeConfig,
    pub schema: FeatureSchema,
    pub model: Option<PromotedModel>,
}

impl AppState {
    pub fn new(config: ServeConfig, model: Option<PromotedModel>) -> Self {
        Self {
            config,
            schema: FeatureSchema::telco(),
            model,
        }
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }
}
