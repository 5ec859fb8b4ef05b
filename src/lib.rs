pub mod config;
pub mod engine;
pub mod handlers {
    pub mod manifest;
    pub mod signal;
}
pub mod health;
pub mod middleware;
pub mod models;
pub mod observability;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::EngineConfig;
pub use engine::ConfluenceEngine;
pub use models::*;
pub use observability::MetricsCollector;

/// Application state shared across handlers
pub struct AppState {
    pub engine: ConfluenceEngine,
    pub metrics: MetricsCollector,
}

impl AppState {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        Ok(Self {
            engine: ConfluenceEngine::new(config)?,
            metrics: MetricsCollector::new(),
        })
    }
}

/// Build the API router
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Signal route (bearer auth when a key is configured)
    let signal_routes = Router::new()
        .route("/signal", post(handlers::signal::generate_signal))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth_middleware,
        ))
        .with_state(state.clone());

    // Open routes: manifest is static configuration
    let open_routes = Router::new()
        .route("/manifest", get(handlers::manifest::get_manifest))
        .with_state(state.clone());

    let health_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/health", get(health::health_detail))
        .with_state(state);

    Router::new()
        .nest("/v1", signal_routes)
        .nest("/v1", open_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
