//! Error handling module for the plant tracker.
//!
//! One error type is shared by the record stores, the state container and the
//! HTTP layer, with a mapping to status codes and the response envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const UNINITIALIZED_STORE: &str = "UNINITIALIZED_STORE";
    pub const DUPLICATE_KEY: &str = "DUPLICATE_KEY";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
    pub const STORAGE_FAILURE: &str = "STORAGE_FAILURE";
}

/// Application error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// An operation was attempted before the store finished initializing
    UninitializedStore,
    /// A record with this id already exists
    DuplicateKey(String),
    /// No record with this id
    NotFound(String),
    /// Malformed input rejected before reaching storage
    InvalidArgument(String),
    /// Durable layer fault (I/O, corruption, permissions)
    Storage(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::UninitializedStore => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DuplicateKey(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::UninitializedStore => codes::UNINITIALIZED_STORE,
            AppError::DuplicateKey(_) => codes::DUPLICATE_KEY,
            AppError::NotFound(_) => codes::NOT_FOUND,
            AppError::InvalidArgument(_) => codes::INVALID_ARGUMENT,
            AppError::Storage(_) => codes::STORAGE_FAILURE,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::UninitializedStore => "Plant store is not initialized".to_string(),
            AppError::DuplicateKey(id) => format!("Plant {} already exists", id),
            AppError::NotFound(id) => format!("Plant {} not found", id),
            AppError::InvalidArgument(msg) => msg.clone(),
            AppError::Storage(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Storage(format!("Database error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        tracing::error!("I/O error: {:?}", err);
        AppError::Storage(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        tracing::error!("JSON error: {:?}", err);
        AppError::Storage(format!("Corrupt plant snapshot: {}", err))
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
