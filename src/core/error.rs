//! Error type system for the LaTeX compile service
//!
//! This module provides:
//! - Classification of request failures (validation, compiler, timeout, internal)
//! - HTTP status code mapping
//! - JSON error bodies that carry compiler log excerpts

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Main error type for the compile service
#[derive(Debug, thiserror::Error)]
pub enum LatexError {
    // Request errors
    #[error("Invalid request: {0}")]
    Validation(String),

    // Compiler errors
    #[error("LaTeX compilation failed with exit code {exit_code}")]
    CompilationFailed { exit_code: i32, log: String },

    #[error("PDF file was not created")]
    MissingOutput { log: String },

    #[error("LaTeX compilation timed out after {seconds}s")]
    Timeout { seconds: u64, log: String },

    #[error("Compiler not available: {0}")]
    CompilerUnavailable(String),

    // Filesystem and process errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LatexError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            LatexError::Validation(_) | LatexError::CompilationFailed { .. } => {
                StatusCode::BAD_REQUEST
            }

            // 408 Request Timeout
            LatexError::Timeout { .. } => StatusCode::REQUEST_TIMEOUT,

            // 503 Service Unavailable
            LatexError::CompilerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            LatexError::MissingOutput { .. } | LatexError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error class name for API responses
    pub fn error_type(&self) -> &'static str {
        match self {
            LatexError::Validation(_) => "ValidationError",
            LatexError::CompilationFailed { .. } | LatexError::MissingOutput { .. } => {
                "CompileError"
            }
            LatexError::Timeout { .. } => "TimeoutError",
            LatexError::CompilerUnavailable(_) | LatexError::Internal(_) => "InternalError",
        }
    }

    /// Compiler log captured before the failure, empty when none exists
    pub fn log(&self) -> &str {
        match self {
            LatexError::CompilationFailed { log, .. }
            | LatexError::MissingOutput { log }
            | LatexError::Timeout { log, .. } => log,
            _ => "",
        }
    }

    /// Exit code reported by the compiler, `-1` when the process never exited normally
    pub fn exit_code(&self) -> i32 {
        match self {
            LatexError::CompilationFailed { exit_code, .. } => *exit_code,
            LatexError::MissingOutput { .. } => 0,
            _ => -1,
        }
    }
}

/// Error body returned by the compile endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Error class (ValidationError, CompileError, TimeoutError, InternalError)
    pub kind: String,
    /// Compiler log excerpt, empty when the compiler never ran
    pub log: String,
}

impl ErrorResponse {
    /// Create an error response from a LatexError
    pub fn from_error(error: &LatexError) -> Self {
        Self {
            error: error.to_string(),
            kind: error.error_type().to_string(),
            log: error.log().to_string(),
        }
    }
}

/// Implement IntoResponse for LatexError to enable automatic error handling in Axum
impl IntoResponse for LatexError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        let error_response = ErrorResponse::from_error(&self);

        if status_code.is_server_error() {
            tracing::error!(
                error_type = self.error_type(),
                status_code = %status_code,
                "Request failed: {}",
                self
            );
        } else {
            tracing::warn!(
                error_type = self.error_type(),
                status_code = %status_code,
                "Request rejected: {}",
                self
            );
        }

        (status_code, Json(error_response)).into_response()
    }
}

/// Result type alias for operations that can fail with LatexError
pub type Result<T> = std::result::Result<T, LatexError>;
