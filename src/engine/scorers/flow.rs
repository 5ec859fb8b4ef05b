//! Flow scorer: volume delta / CVD plus orderbook pressure.
//!
//! CVD trend is categorical (±0.5); the imbalance ratio maps linearly
//! from [0, 1] onto [-0.5, +0.5] around the balanced 0.5. Detected
//! spoofing suppresses conviction: spoofed walls invalidate the reading
//! but say nothing about the opposite side, so the score shrinks rather
//! than reverses.

use crate::config::EngineConfig;
use crate::engine::normalize::NormalizedSnapshot;
use crate::engine::scorers::{clamp_unit, pretty, weight_of, Category, CategoryScore, Factor};

/// Share of the flow score that survives a spoofing flag.
pub(crate) const SPOOFING_RETENTION: f64 = 0.6;

pub fn score(snap: &NormalizedSnapshot, config: &EngineConfig) -> CategoryScore {
    let mut factors = Vec::new();
    let mut total = 0.0;

    let cvd = clamp_unit(weight_of(&config.vocab.cvd, &snap.volume_delta.cvd_trend));
    if cvd != 0.0 {
        factors.push(Factor::new(
            Category::Flow,
            format!("{} CVD trend", pretty(&snap.volume_delta.cvd_trend)),
            cvd,
        ));
        total += cvd;
    }

    // normalizer has clamped the ratio to [0, 1]
    let imbalance = snap.orderbook.imbalance_ratio - 0.5;
    if imbalance != 0.0 {
        let label = if imbalance > 0.0 {
            "bid-heavy orderbook imbalance"
        } else {
            "ask-heavy orderbook imbalance"
        };
        factors.push(Factor::new(Category::Flow, label, imbalance));
        total += imbalance;
    }

    let mut score = clamp_unit(total);
    if snap.orderbook.spoofing_detected.unwrap_or(false) {
        let before = score;
        score *= SPOOFING_RETENTION;
        if score != before {
            factors.push(Factor::new(
                Category::Flow,
                "orderbook spoofing detected",
                score - before,
            ));
        }
    }

    CategoryScore {
        category: Category::Flow,
        score,
        factors,
    }
}
