//! Bearer-token authentication for the signal route.
//!
//! The upstream analyzers call with `Authorization: Bearer <key>`. When no
//! key is configured the route is open, which is the local development
//! mode.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use crate::observability::metrics;
use crate::AppState;

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.engine.config().api_key.as_deref() else {
        return Ok(next.run(request).await);
    };

    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    match token {
        Some(token) if token == expected => Ok(next.run(request).await),
        _ => {
            tracing::warn!("rejected signal request with missing or invalid API key");
            state.metrics.increment(metrics::UNAUTHORIZED, 1).await;
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}
