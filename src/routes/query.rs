//! Vulnerability query route.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::errors::AppError;
use crate::middleware::auth::ApiKey;
use crate::middleware::validated_json::ValidatedJson;
use crate::models::request::QueryRequest;
use crate::services::query as query_service;
use crate::AppState;

/// POST /query: stored vulnerabilities filtered by exact severity.
///
/// Responds 200 with the matches, or 204 when nothing matched.
pub async fn by_severity(
    State(state): State<AppState>,
    _key: ApiKey,
    ValidatedJson(body): ValidatedJson<QueryRequest>,
) -> Result<Response, AppError> {
    let records = query_service::query_by_severity(&state.store, body.filters.severity()).await?;
    if records.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok(Json(records).into_response())
}
