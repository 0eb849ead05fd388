//! Error types for the action archive
//!
//! Every request failure is converted to `AppError`, which implements
//! `IntoResponse` so the upload handler can return it directly.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Application-wide error type
///
/// The first six variants are the request-scoped failures of an archive
/// run. `Config` and `Internal` only occur during startup.
#[derive(Debug, Error)]
pub enum AppError {
    /// `date` query parameter could not be parsed (400)
    #[error("could not parse date: {0}")]
    InvalidDateFormat(String),

    /// Upload route called with anything but PUT (405)
    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    /// Registry call failed (500)
    #[error("could not get actions: {0}")]
    UpstreamFetchFailed(String),

    /// Actions could not be encoded as JSON (500)
    #[error("could not marshal actions: {0}")]
    SerializationFailed(String),

    /// Opening or streaming the object failed (500)
    #[error("could not write file: {0}")]
    StorageWriteFailed(String),

    /// Committing the object failed (500)
    #[error("could not put file: {0}")]
    StoragePutFailed(String),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable snake_case name used in response bodies and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidDateFormat(_) => "invalid_date_format",
            AppError::MethodNotAllowed(_) => "method_not_allowed",
            AppError::UpstreamFetchFailed(_) => "upstream_fetch_failed",
            AppError::SerializationFailed(_) => "serialization_failed",
            AppError::StorageWriteFailed(_) => "storage_write_failed",
            AppError::StoragePutFailed(_) => "storage_put_failed",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidDateFormat(_) => StatusCode::BAD_REQUEST,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::UpstreamFetchFailed(_)
            | AppError::SerializationFailed(_)
            | AppError::StorageWriteFailed(_)
            | AppError::StoragePutFailed(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to its HTTP status code and a JSON body
    /// carrying the message and the error kind.
    fn into_response(self) -> Response {
        use axum::Json;

        let status = self.status_code();
        let error_type = self.kind();
        let error_message = match &self {
            AppError::Internal(_) => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        // Record error metric
        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = Json(serde_json::json!({
            "error": error_message,
            "type": error_type,
        }));

        let mut response = (status, body).into_response();
        if matches!(self, AppError::MethodNotAllowed(_)) {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("PUT"));
        }
        response
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
