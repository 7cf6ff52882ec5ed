//! Unified error handling for freeapi-control.
//!
//! `ResolutionError` describes why one balance check failed. `AppError` is
//! what an operation returns to its caller and maps onto HTTP responses.

use crate::store::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Why a single balance resolution failed.
///
/// Only the billing call can produce one of these; a failed model listing
/// degrades to an empty model list instead.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolutionError {
    /// Connection refused, DNS failure, socket error.
    Network(String),
    /// The billing request did not finish within the configured timeout.
    Timeout(Duration),
    /// The billing response body was not valid JSON.
    MalformedResponse(String),
    /// The remote answered but without `hard_limit_usd`.
    RemoteRejected(String),
}

impl ResolutionError {
    /// Short machine-readable kind, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Timeout(_) => "timeout",
            Self::MalformedResponse(_) => "malformed_response",
            Self::RemoteRejected(_) => "remote_rejected",
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Request failed: {}", msg),
            Self::Timeout(after) => {
                write!(f, "Request timed out after {}s", after.as_secs_f64())
            }
            Self::MalformedResponse(msg) => {
                write!(f, "Failed to parse API response: {}", msg)
            }
            Self::RemoteRejected(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ResolutionError {}

/// Error type for operations exposed to the HTTP layer and the CLI.
#[derive(Debug)]
pub enum AppError {
    /// No site with the given id.
    NotFound(String),
    /// Request payload failed validation.
    Validation(String),
    /// Missing or wrong admin token.
    Unauthorized,
    /// A single balance check failed.
    Resolution(ResolutionError),
    /// Reading or writing the site store failed.
    Storage(StorageError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "Site not found: {}", id),
            Self::Validation(msg) => write!(f, "Invalid request: {}", msg),
            Self::Unauthorized => write!(f, "Invalid or missing admin token"),
            Self::Resolution(err) => write!(f, "{}", err),
            Self::Storage(err) => write!(f, "Storage error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resolution(err) => Some(err),
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err)
    }
}

impl From<ResolutionError> for AppError {
    fn from(err: ResolutionError) -> Self {
        Self::Resolution(err)
    }
}

/// Error response structure for JSON serialization.
#[derive(Serialize)]
struct ErrorResponseBody {
    success: bool,
    error: String,
    r#type: &'static str,
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Resolution(ResolutionError::Timeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            Self::Resolution(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error type string.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "invalid_request",
            Self::Unauthorized => "unauthorized",
            Self::Resolution(_) => "resolution_failed",
            Self::Storage(_) => "storage_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = ErrorResponseBody {
            success: false,
            error: self.to_string(),
            r#type: self.error_type(),
        };
        (status, Json(body)).into_response()
    }
}
