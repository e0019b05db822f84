//! Error types for the server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::error::ChurnError;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("no model is loaded")]
    ModelUnavailable,

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("malformed value for field '{field}': {value}")]
    MalformedInput { field: String, value: String },

    #[error("prediction failed: {0}")]
    Prediction(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<ChurnError> for ServeError {
    fn from(err: ChurnError) -> Self {
        match err {
            ChurnError::MalformedInput { field, value } => {
                ServeError::MalformedInput { field, value }
            }
            ChurnError::ModelUnavailable => ServeError::ModelUnavailable,
            other => ServeError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServeError::ModelUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Model not loaded. Train and promote a model, then restart the server.".to_string(),
            ),
            ServeError::InvalidBody(..) | ServeError::MalformedInput { .. } => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ServeError::Prediction(msg) => {
                tracing::error!(detail = %msg, "Prediction error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Prediction failed".to_string())
            }
            ServeError::Internal(msg) => {
                tracing::error!(detail = %msg, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "An internal error occurred".to_string())
            }
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServeError>;
