//! Global cap on requests being served at once.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::errors::AppError;
use crate::AppState;

/// Reject the request with 429 when every request slot is taken.
///
/// The slot is held until the inner handler has produced its response.
pub async fn limit_concurrent_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Ok(_slot) = state.request_slots.try_acquire() else {
        tracing::warn!(path = %request.uri().path(), "Request limit reached");
        return Err(AppError::TooManyRequests);
    };

    Ok(next.run(request).await)
}
