//! Error types for report fetching, batch ingestion, and the HTTP boundary.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Failure to obtain the raw bytes of one report file.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to fetch file {file} (attempt {attempts}): {source}")]
    Transport {
        file: String,
        attempts: u32,
        source: reqwest::Error,
    },

    #[error("failed to fetch file {file} (attempt {attempts}): received status {status}")]
    Status {
        file: String,
        attempts: u32,
        status: u16,
    },

    #[error("failed to read response body for {file}: {source}")]
    Body { file: String, source: reqwest::Error },

    #[error("failed to read file {file}: {source}")]
    Local {
        file: String,
        source: std::io::Error,
    },
}

/// Error that fails a whole ingestion batch.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("failed to store {entity} for scan {scan_id}: {source}")]
    Persist {
        entity: &'static str,
        scan_id: String,
        source: sqlx::Error,
    },

    #[error("ingestion task failed: {0}")]
    Task(String),
}

/// Body of every error response. Carries a message only.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Application error type mapping to HTTP status codes.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Ingestion error: {0}")]
    Ingestion(#[from] IngestError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Check if this error represents a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized: API key required".to_string(),
            ),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::TooManyRequests => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too Many Requests".to_string(),
            ),
            AppError::Ingestion(e) => {
                tracing::error!(error = %e, "Ingestion error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error: Error scanning files".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_error_is_not_found() {
        let err = AppError::NotFound("scan".to_string());
        assert!(err.is_not_found());
        assert!(!AppError::Unauthorized.is_not_found());
    }

    #[test]
    fn app_error_display() {
        let err = AppError::Validation("repo must not be empty".to_string());
        assert_eq!(err.to_string(), "Validation error: repo must not be empty");
    }

    #[test]
    fn app_error_from_sqlx() {
        let sqlx_err = sqlx::Error::RowNotFound;
        let err: AppError = sqlx_err.into();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn fetch_error_reports_attempts_and_status() {
        let err = FetchError::Status {
            file: "report.json".to_string(),
            attempts: 2,
            status: 503,
        };
        assert_eq!(
            err.to_string(),
            "failed to fetch file report.json (attempt 2): received status 503"
        );
    }

    #[test]
    fn ingest_error_wraps_fetch_error_transparently() {
        let fetch = FetchError::Local {
            file: "missing.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        let err: IngestError = fetch.into();
        assert_eq!(err.to_string(), "failed to read file missing.json: not found");
    }

    #[test]
    fn ingestion_error_maps_to_generic_500() {
        let err = AppError::Ingestion(IngestError::Task("panicked".to_string()));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn internal_error_hides_detail() {
        let response = AppError::Internal("handler panicked: boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_error_maps_to_400() {
        let response = AppError::Validation("bad body".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
