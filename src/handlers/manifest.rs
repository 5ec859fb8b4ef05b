//! Capability manifest endpoint - static configuration descriptor.

use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Manifest {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub operations: Vec<Operation>,
    pub categories: Vec<CategoryDescriptor>,
    pub thresholds: Thresholds,
}

#[derive(Debug, Serialize)]
pub struct Operation {
    pub name: &'static str,
    pub method: &'static str,
    pub path: &'static str,
    pub summary: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CategoryDescriptor {
    pub category: &'static str,
    pub weight: f64,
}

#[derive(Debug, Serialize)]
pub struct Thresholds {
    pub signal_threshold: f64,
    pub confidence_calibration: f64,
}

/// GET /v1/manifest - describe the engine's operations and weighting
pub async fn get_manifest(State(state): State<Arc<AppState>>) -> Json<Manifest> {
    let config = state.engine.config();
    Json(Manifest {
        name: "signal-engine",
        version: env!("CARGO_PKG_VERSION"),
        description: "Confluence decision engine: scores classical, SMC, flow, \
                      and external evidence into one explainable trading signal.",
        operations: vec![
            Operation {
                name: "generate_signal",
                method: "POST",
                path: "/v1/signal",
                summary: "Evaluate an analysis snapshot into a trading signal",
            },
            Operation {
                name: "manifest",
                method: "GET",
                path: "/v1/manifest",
                summary: "Static capability descriptor",
            },
        ],
        categories: vec![
            CategoryDescriptor {
                category: "trend",
                weight: config.weights.trend,
            },
            CategoryDescriptor {
                category: "structure",
                weight: config.weights.structure,
            },
            CategoryDescriptor {
                category: "flow",
                weight: config.weights.flow,
            },
            CategoryDescriptor {
                category: "external",
                weight: config.weights.external,
            },
        ],
        thresholds: Thresholds {
            signal_threshold: config.signal_threshold,
            confidence_calibration: config.confidence_calibration,
        },
    })
}
