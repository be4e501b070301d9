//! Request-level errors and their HTTP mapping.
//!
//! Provider and parse failures never reach this type: the orchestrator turns
//! them into placeholder content inside an otherwise normal response.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::log_error;

/// Message returned on every API call while no usable credential is configured
pub const NOT_CONFIGURED_MESSAGE: &str = "Server is not configured correctly. Check API key.";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed request fields
    #[error("{0}")]
    Validation(String),
    /// Missing or invalid service credential
    #[error("{0}")]
    NotConfigured(String),
}

impl AppError {
    pub fn not_configured() -> Self {
        Self::NotConfigured(NOT_CONFIGURED_MESSAGE.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotConfigured(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        log_error!("Request failed with {}: {}", status, self);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
