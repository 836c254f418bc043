//! API key authentication extractor for Axum handlers.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;
use crate::AppState;

/// Header carrying the shared API key.
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Proof that the request carried the configured API key.
///
/// Use as an Axum extractor in handlers that require authentication:
/// ```ignore
/// async fn handler(_key: ApiKey) -> impl IntoResponse { ... }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ApiKey;

impl FromRequestParts<AppState> for ApiKey {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let provided = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .ok_or(AppError::Unauthorized)?;

        if provided != state.config.api_key {
            tracing::warn!(path = %parts.uri.path(), "Rejected request with invalid API key");
            return Err(AppError::Forbidden("Invalid API key".to_string()));
        }

        Ok(ApiKey)
    }
}
