//! Signal generation endpoint.

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{AnalysisSnapshot, Direction, EngineError, TradingSignal};
use crate::observability::metrics;
use crate::AppState;

/// POST /v1/signal - evaluate one analysis snapshot
pub async fn generate_signal(
    State(state): State<Arc<AppState>>,
    Json(snapshot): Json<AnalysisSnapshot>,
) -> Result<Json<TradingSignal>, (StatusCode, String)> {
    let request_id = Uuid::new_v4();
    let started = Instant::now();
    state.metrics.increment(metrics::SIGNAL_REQUESTS, 1).await;

    info!(
        %request_id,
        symbol = %snapshot.symbol,
        timeframe = %snapshot.timeframe,
        "evaluating snapshot"
    );

    match state.engine.evaluate(&snapshot) {
        Ok(evaluation) => {
            if !evaluation.unknown_labels.is_empty() {
                state
                    .metrics
                    .increment(metrics::UNKNOWN_LABELS, evaluation.unknown_labels.len() as u64)
                    .await;
            }
            let direction_counter = match evaluation.signal.signal {
                Direction::Buy => metrics::SIGNAL_BUY,
                Direction::Sell => metrics::SIGNAL_SELL,
                Direction::NoSignal => metrics::SIGNAL_NONE,
            };
            state.metrics.increment(direction_counter, 1).await;
            state
                .metrics
                .histogram(
                    metrics::SIGNAL_EVAL_DURATION_MS,
                    started.elapsed().as_secs_f64() * 1000.0,
                )
                .await;

            info!(
                %request_id,
                signal = evaluation.signal.signal.as_str(),
                net_bias = evaluation.confluence.net_bias,
                confidence = evaluation.confluence.confidence,
                "signal generated"
            );
            Ok(Json(evaluation.signal))
        }
        Err(EngineError::Validation(message)) => {
            state.metrics.increment(metrics::VALIDATION_ERRORS, 1).await;
            warn!(%request_id, %message, "snapshot rejected");
            Err((StatusCode::UNPROCESSABLE_ENTITY, message))
        }
        Err(e) => {
            state.metrics.increment(metrics::API_ERRORS, 1).await;
            tracing::error!(%request_id, error = %e, "signal evaluation failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}
