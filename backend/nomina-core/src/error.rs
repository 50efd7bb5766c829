// src/error.rs
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::store::StoreError;

// --- Response Envelope ---

/// `{ success, data }` on success, `{ success, message, errors? }` on failure.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn failure(message: impl Into<String>, errors: Option<Vec<String>>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors,
        }
    }
}

/// Shorthand for handlers: `Ok(ok(data))`.
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::ok(data))
}

// --- Error Handling ---

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Missing or invalid bearer token")]
    Unauthorized,
    #[error("Request exceeded the report timeout")]
    Timeout,
    #[error("Store error: {0}")]
    Store(StoreError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation(vec![message.into()])
    }

    /// Turns a collected list of messages into an error, or `Ok` when there are none.
    pub fn check(errors: Vec<String>) -> Result<(), AppError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(errors))
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => AppError::NotFound(what),
            StoreError::Conflict(what) => AppError::Conflict(what),
            other => AppError::Store(other),
        }
    }
}

impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Internal(format!("CSV export failed: {}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, errors) = match self {
            AppError::Validation(errors) => {
                warn!("Rejected request: {}", errors.join("; "));
                (
                    StatusCode::BAD_REQUEST,
                    "Parámetros inválidos".to_string(),
                    Some(errors),
                )
            }
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, what, None),
            AppError::Conflict(what) => {
                warn!("Conflict: {}", what);
                (StatusCode::CONFLICT, what, None)
            }
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "No autorizado".to_string(),
                None,
            ),
            AppError::Timeout => {
                warn!("Request timed out");
                (
                    StatusCode::REQUEST_TIMEOUT,
                    "La consulta tardó demasiado. Intente con un periodo más corto o reintente.".to_string(),
                    None,
                )
            }
            AppError::Store(ref e) => {
                error!("Store failure: {}", e); // Log the cause, keep the response generic
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno del servidor".to_string(),
                    None,
                )
            }
            AppError::Internal(ref msg) => {
                error!("Internal failure: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error interno del servidor".to_string(),
                    None,
                )
            }
        };

        (status, Json(ApiResponse::failure(message, errors))).into_response()
    }
}
