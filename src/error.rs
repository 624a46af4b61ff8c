use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::path::PathBuf;
use thiserror::Error;

/// Startup asset failures. Logged and absorbed: a missing or broken asset
/// degrades the service instead of aborting it.
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("session mutex poisoned: {0}")]
    Poisoned(String),
    #[error("inference failed: {0}")]
    Inference(#[from] ort::Error),
}

/// Per-request prediction failures, surfaced to the client as
/// `{"error": <message>}` with the matching status code.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("AI model not loaded. Please check server logs.")]
    ModelUnavailable,
    #[error("Failed to process image or predict: {0}")]
    Decode(String),
    #[error("Failed to process image or predict: {0}")]
    Inference(String),
}

impl From<ModelError> for PredictError {
    fn from(err: ModelError) -> Self {
        PredictError::Inference(err.to_string())
    }
}

impl PredictError {
    pub fn status_code(&self) -> StatusCode {
        // Decode failures are deliberately 500, not 400: the only 400 the
        // API produces is a request body without an `image` key.
        match self {
            PredictError::ModelUnavailable
            | PredictError::Decode(_)
            | PredictError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PredictError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
