//! Route definitions for the scan ingestion API.

pub mod health;
pub mod query;
pub mod scan;

use std::any::Any;

use axum::{
    http::StatusCode,
    middleware::from_fn_with_state,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer, limit::RequestBodyLimitLayer, timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::errors::AppError;
use crate::middleware::concurrency::limit_concurrent_requests;
use crate::AppState;

/// Build the application router.
///
/// Authenticated endpoints share the global request cap; health probes are
/// open and uncapped.
pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/scan", post(scan::ingest))
        .route("/scans/{scan_id}", get(scan::get_by_id))
        .route("/query", post(query::by_severity))
        .route_layer(from_fn_with_state(state.clone(), limit_concurrent_requests));

    Router::new()
        .merge(api)
        .route("/health", get(health::live))
        .route("/health/ready", get(health::ready))
        .fallback(not_found)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            state.config.request_timeout(),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> AppError {
    AppError::NotFound("Not Found".to_string())
}

/// Turn a handler panic into the generic 500 response.
fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(msg) = panic.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    };

    AppError::Internal(format!("handler panicked: {detail}")).into_response()
}
