//! Health check endpoints for load balancers and monitoring

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::AppState;

/// Basic health check - fast, no work performed.
/// Use for load balancer health checks
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Detailed health check with configuration state and metrics.
pub async fn health_detail(State(state): State<Arc<AppState>>) -> Json<DetailedHealthResponse> {
    let config = state.engine.config();
    let checks = vec![
        HealthCheck {
            name: "engine_config".to_string(),
            status: match config.validate() {
                Ok(()) => "ok".to_string(),
                Err(_) => "invalid".to_string(),
            },
        },
        HealthCheck {
            name: "auth".to_string(),
            status: if config.api_key.is_some() {
                "enabled".to_string()
            } else {
                "open".to_string()
            },
        },
    ];

    let metrics = state.metrics.snapshot().await;

    Json(DetailedHealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
        metrics: HealthMetrics {
            uptime_secs: metrics.uptime_secs,
            counters: metrics.counters,
            histogram_means: metrics.histogram_means,
        },
    })
}

#[derive(Serialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub version: String,
    pub checks: Vec<HealthCheck>,
    pub metrics: HealthMetrics,
}

#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct HealthMetrics {
    pub uptime_secs: u64,
    pub counters: HashMap<String, u64>,
    pub histogram_means: HashMap<String, f64>,
}
