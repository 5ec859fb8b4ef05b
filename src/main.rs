use std::sync::Arc;
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting Confluence Signal Engine...");

    // Weight tables and thresholds; malformed config is fatal here,
    // before the server binds
    let config = signal_engine::EngineConfig::load()?;
    info!(
        trend = config.weights.trend,
        structure = config.weights.structure,
        flow = config.weights.flow,
        external = config.weights.external,
        threshold = config.signal_threshold,
        "✓ Engine configuration loaded"
    );
    if config.api_key.is_none() {
        tracing::warn!("⚠ No API key configured, signal route is open");
    }

    let state = Arc::new(signal_engine::AppState::new(config)?);
    let app = signal_engine::app(state);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("🚀 Signal engine listening on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
