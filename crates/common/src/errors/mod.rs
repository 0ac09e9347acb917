//! Error types for DocChat
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - HTTP status code mapping
//! - Structured error responses
//! - Error codes for client handling

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    UnknownModel,
    NoDocuments,
    UnsupportedFileType,

    // Resource errors (4xxx)
    NotFound,
    ChatNotFound,
    DocumentNotFound,

    // Database errors (7xxx)
    DatabaseError,

    // External service errors (8xxx)
    InferenceUnavailable,
    InferenceFailed,
    ExtractionError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::UnknownModel => 1002,
            ErrorCode::NoDocuments => 1003,
            ErrorCode::UnsupportedFileType => 1004,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::ChatNotFound => 4002,
            ErrorCode::DocumentNotFound => 4003,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,

            // External (8xxx)
            ErrorCode::InferenceUnavailable => 8001,
            ErrorCode::InferenceFailed => 8002,
            ErrorCode::ExtractionError => 8003,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Unknown model id: '{id}'")]
    UnknownModel { id: String },

    #[error("At least one document is required. Upload documents first.")]
    NoDocuments,

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Chat not found: {id}")]
    ChatNotFound { id: String },

    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    // Inference errors
    //
    // Transient and fatal upstream failures are kept as separate variants so
    // the retry driver can match on the tag instead of inspecting messages.
    #[error("Inference service unavailable (status {status})")]
    InferenceUnavailable { status: u16 },

    #[error("Inference request failed: {message}")]
    InferenceFailed { message: String },

    // Extraction errors
    #[error("Extraction error: {0}")]
    Extraction(#[from] crate::extract::ExtractError),

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::UnknownModel { .. } => ErrorCode::UnknownModel,
            AppError::NoDocuments => ErrorCode::NoDocuments,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::ChatNotFound { .. } => ErrorCode::ChatNotFound,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::InferenceUnavailable { .. } => ErrorCode::InferenceUnavailable,
            AppError::InferenceFailed { .. } => ErrorCode::InferenceFailed,
            AppError::Extraction(e) => match e {
                crate::extract::ExtractError::UnsupportedFileType { .. } => {
                    ErrorCode::UnsupportedFileType
                }
                _ => ErrorCode::ExtractionError,
            },
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } | AppError::NoDocuments => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. }
            | AppError::ChatNotFound { .. }
            | AppError::DocumentNotFound { .. } => StatusCode::NOT_FOUND,

            // 422 Unprocessable Entity
            AppError::UnknownModel { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Extraction(crate::extract::ExtractError::UnsupportedFileType { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 500 Internal Server Error
            AppError::Database(_)
            | AppError::Internal { .. }
            | AppError::Configuration { .. }
            | AppError::Serialization(_)
            | AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 502 Bad Gateway
            AppError::InferenceFailed { .. } | AppError::Extraction(_) => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable
            AppError::InferenceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Whether this error is a transient upstream failure worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::InferenceUnavailable { .. })
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string(),
        }
    }
}
