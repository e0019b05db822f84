//! Request handlers

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request, State},
    Json,
};
use ndarray::Array2;
use serde_json::json;
use tracing::debug;

use crate::schema::{encode, RawRecord};

use super::error::{Result, ServeError};
use super::state::AppState;

/// JSON body extractor whose rejection renders the standard `{"error": ...}`
/// body instead of axum's plain-text response.
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ServeError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ServeError::InvalidBody(rejection.body_text())),
        }
    }
}

/// Score one customer record against the production model.
///
/// The request body is a flat JSON object of raw fields; categorical fields
/// carry their string level and indicator columns are derived from the baked
/// schema. Responds `{"prediction": 0}` or `{"prediction": 1}`.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    ApiJson(record): ApiJson<RawRecord>,
) -> Result<Json<serde_json::Value>> {
    let promoted = state.model.as_ref().ok_or(ServeError::ModelUnavailable)?;

    let features = encode(&record, &state.schema)?;
    let n_features = features.len();
    let x = Array2::from_shape_vec((1, n_features), features)
        .map_err(|e| ServeError::Internal(format!("feature vector shape: {}", e)))?;

    let prediction = promoted
        .model
        .predict(&x)
        .map_err(|e| ServeError::Prediction(e.to_string()))?;
    let label = if prediction[0] >= 0.5 { 1 } else { 0 };

    debug!(model = %promoted.meta.name, prediction = label, "scored record");
    Ok(Json(json!({ "prediction": label })))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let model = state
        .model
        .as_ref()
        .map(|p| json!({ "name": p.meta.name, "model_id": p.meta.model_id }));
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "model_loaded": state.model_loaded(),
        "model": model,
    }))
}
