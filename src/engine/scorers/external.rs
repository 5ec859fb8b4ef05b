//! External scorer: on-chain flow and macro context.
//!
//! Corroborating evidence only; the category weight keeps it from ever
//! driving the thesis. Open interest needs to know which side the rest of
//! the snapshot favors, so this scorer runs second-pass against the
//! provisional bias of Trend + Structure + Flow.

use crate::config::EngineConfig;
use crate::engine::normalize::NormalizedSnapshot;
use crate::engine::scorers::{clamp_unit, weight_of, Category, CategoryScore, Factor};

const SMART_MONEY_WEIGHT: f64 = 0.3;
const FUNDING_WEIGHT: f64 = 0.2;

/// Per-transaction amplification of the on-chain term, capped at 4.
const TRANSACTION_GAIN: f64 = 0.05;

pub fn score(
    snap: &NormalizedSnapshot,
    config: &EngineConfig,
    provisional_bias: f64,
) -> CategoryScore {
    let mut factors = Vec::new();
    let mut total = 0.0;

    let on_chain = &snap.on_chain;
    let whale = clamp_unit(weight_of(&config.vocab.whale, &on_chain.whale_movement));
    let flow = (on_chain.smart_money_net_flow / config.smart_money_saturation).clamp(-1.0, 1.0)
        * SMART_MONEY_WEIGHT;

    // a burst of significant transactions makes the flow reading louder
    let transactions = on_chain
        .significant_transactions
        .as_ref()
        .map_or(0, |t| t.len())
        .min(4);
    let amplification = 1.0 + TRANSACTION_GAIN * transactions as f64;

    if whale != 0.0 {
        let term = whale * amplification;
        factors.push(Factor::new(
            Category::External,
            format!("whale {}", on_chain.whale_movement),
            term,
        ));
        total += term;
    }
    if flow != 0.0 {
        let term = flow * amplification;
        let label = if flow > 0.0 {
            "positive smart-money net flow"
        } else {
            "negative smart-money net flow"
        };
        factors.push(Factor::new(Category::External, label, term));
        total += term;
    }

    let macro_data = &snap.macro_data;
    // stretched funding mean-reverts: positive funding leans bearish
    let funding = -FUNDING_WEIGHT
        * (macro_data.funding_rate / config.funding_saturation).clamp(-1.0, 1.0);
    if funding != 0.0 {
        let label = if macro_data.funding_rate > 0.0 {
            "elevated positive funding"
        } else {
            "negative funding"
        };
        factors.push(Factor::new(Category::External, label, funding));
        total += funding;
    }

    let bias_sign = if provisional_bias > 0.0 {
        1.0
    } else if provisional_bias < 0.0 {
        -1.0
    } else {
        0.0
    };
    let oi_magnitude = clamp_unit(weight_of(
        &config.vocab.open_interest,
        &macro_data.open_interest_change,
    ));
    let oi = oi_magnitude * bias_sign;
    if oi != 0.0 {
        let side = if bias_sign > 0.0 { "bullish" } else { "bearish" };
        let label = if oi_magnitude > 0.0 {
            format!("rising open interest behind the {side} move")
        } else {
            format!("falling open interest against the {side} move")
        };
        factors.push(Factor::new(Category::External, label, oi));
        total += oi;
    }

    CategoryScore {
        category: Category::External,
        score: clamp_unit(total),
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::normalize::{normalize, testutil::neutral_snapshot};
    use crate::models::{AnalysisSnapshot, MacroData, OnChainData};

    fn scored(
        provisional: f64,
        mutate: impl FnOnce(&mut AnalysisSnapshot),
    ) -> CategoryScore {
        let config = EngineConfig::default();
        let mut snapshot = neutral_snapshot();
        mutate(&mut snapshot);
        let snap = normalize(&snapshot, &config).unwrap();
        score(&snap, &config, provisional)
    }

    #[test]
    fn absent_categories_score_zero() {
        let result = scored(0.4, |_| {});
        assert_eq!(result.score, 0.0);
        assert!(result.factors.is_empty());
    }

    #[test]
    fn whale_inflow_and_positive_flow_lean_bullish() {
        let result = scored(0.0, |s| {
            s.on_chain = Some(OnChainData {
                whale_movement: "inflow".to_string(),
                smart_money_net_flow: 1500.0,
                significant_transactions: None,
            });
        });
        // 0.3 whale + 0.3 saturated flow
        assert!((result.score - 0.6).abs() < 1e-9);
    }

    #[test]
    fn smart_money_flow_saturates() {
        let modest = scored(0.0, |s| {
            s.on_chain = Some(OnChainData {
                whale_movement: "neutral".to_string(),
                smart_money_net_flow: 500.0,
                significant_transactions: None,
            });
        });
        let huge = scored(0.0, |s| {
            s.on_chain = Some(OnChainData {
                whale_movement: "neutral".to_string(),
                smart_money_net_flow: 5_000_000.0,
                significant_transactions: None,
            });
        });
        assert!((modest.score - 0.15).abs() < 1e-9);
        assert!((huge.score - 0.3).abs() < 1e-9);
    }

    #[test]
    fn transaction_burst_amplifies_flow() {
        let quiet = scored(0.0, |s| {
            s.on_chain = Some(OnChainData {
                whale_movement: "outflow".to_string(),
                smart_money_net_flow: 0.0,
                significant_transactions: None,
            });
        });
        let busy = scored(0.0, |s| {
            s.on_chain = Some(OnChainData {
                whale_movement: "outflow".to_string(),
                smart_money_net_flow: 0.0,
                significant_transactions: Some(vec![
                    serde_json::json!({}),
                    serde_json::json!({}),
                ]),
            });
        });
        assert!(busy.score < quiet.score);
        assert!((busy.score - quiet.score * 1.1).abs() < 1e-9);
    }

    #[test]
    fn positive_funding_leans_bearish() {
        let result = scored(0.0, |s| {
            s.macro_data = Some(MacroData {
                funding_rate: 0.02,
                open_interest_change: "neutral".to_string(),
                news_sentiment: None,
            });
        });
        assert!((result.score + 0.2).abs() < 1e-9);
    }

    #[test]
    fn rising_open_interest_reinforces_the_provisional_side() {
        let with_bullish_bias = scored(0.4, |s| {
            s.macro_data = Some(MacroData {
                funding_rate: 0.0,
                open_interest_change: "increasing".to_string(),
                news_sentiment: None,
            });
        });
        let with_bearish_bias = scored(-0.4, |s| {
            s.macro_data = Some(MacroData {
                funding_rate: 0.0,
                open_interest_change: "increasing".to_string(),
                news_sentiment: None,
            });
        });
        assert!((with_bullish_bias.score - 0.2).abs() < 1e-9);
        assert!((with_bearish_bias.score + 0.2).abs() < 1e-9);
    }

    #[test]
    fn open_interest_is_inert_without_a_provisional_direction() {
        let result = scored(0.0, |s| {
            s.macro_data = Some(MacroData {
                funding_rate: 0.0,
                open_interest_change: "increasing".to_string(),
                news_sentiment: None,
            });
        });
        assert_eq!(result.score, 0.0);
    }
}
