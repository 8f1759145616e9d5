use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::translate::TranslationError;

/// Errors returned by the HTTP handlers, rendered as `{"error": <message>}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Translator model not loaded")]
    ModelNotLoaded,

    #[error("No text provided")]
    NoTextProvided,

    /// Model failure, message passed through to the client unchanged
    #[error(transparent)]
    Translation(#[from] TranslationError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::ModelNotLoaded => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::NoTextProvided => StatusCode::BAD_REQUEST,
            ApiError::Translation(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
