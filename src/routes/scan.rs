//! Scan routes: batch ingestion and lookup of a stored report.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::errors::AppError;
use crate::middleware::auth::ApiKey;
use crate::middleware::validated_json::ValidatedJson;
use crate::models::request::ScanRequest;
use crate::models::scan::ScanReport;
use crate::services::scan as scan_service;
use crate::AppState;

/// POST /scan: fetch, parse, and store the listed report files.
///
/// Responds 201 with every stored report, or 204 when the batch yielded none.
pub async fn ingest(
    State(state): State<AppState>,
    _key: ApiKey,
    ValidatedJson(body): ValidatedJson<ScanRequest>,
) -> Result<Response, AppError> {
    tracing::info!(repo = %body.repo, files = body.files.len(), "Scan requested");

    let reports = state.ingestor.ingest(&body.repo, &body.files).await?;
    if reports.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    Ok((StatusCode::CREATED, Json(reports)).into_response())
}

/// GET /scans/{scan_id}: a stored report with its vulnerabilities, summary, and metadata.
pub async fn get_by_id(
    State(state): State<AppState>,
    _key: ApiKey,
    Path(scan_id): Path<String>,
) -> Result<Json<ScanReport>, AppError> {
    let report = scan_service::find_by_id(&state.store, &scan_id).await?;
    Ok(Json(report))
}
