//! Trend scorer: classical indicator states.
//!
//! Five indicator contributions, each clamped to [-1, 1], are averaged so
//! no single indicator can dominate the category. Divergence is handled
//! separately: it corroborates or damps the momentum consensus but never
//! flips its sign on its own.

use crate::config::EngineConfig;
use crate::engine::normalize::NormalizedSnapshot;
use crate::engine::scorers::{clamp_unit, pretty, weight_of, Category, CategoryScore, Factor};

const INDICATOR_COUNT: f64 = 5.0;

/// How much of an aligned divergence is added on top of the consensus.
const ALIGNED_DIVERGENCE_GAIN: f64 = 0.25;

pub fn score(snap: &NormalizedSnapshot, config: &EngineConfig) -> CategoryScore {
    let vocab = &config.vocab;
    let indicators = &snap.indicators;

    let contributions = [
        ("EMA", weight_of(&vocab.ema, &indicators.ema_signal), &indicators.ema_signal),
        ("RSI", weight_of(&vocab.rsi, &indicators.rsi_signal), &indicators.rsi_signal),
        (
            "MACD",
            weight_of(&vocab.macd, &indicators.macd_crossover_signal),
            &indicators.macd_crossover_signal,
        ),
        ("BB", weight_of(&vocab.bb, &indicators.bb_signal), &indicators.bb_signal),
        (
            "Stoch",
            weight_of(&vocab.stoch, &indicators.stoch_signal),
            &indicators.stoch_signal,
        ),
    ];

    let mut factors = Vec::new();
    let mut sum = 0.0;
    for (name, raw_weight, label) in contributions {
        let weight = clamp_unit(raw_weight);
        sum += weight;
        if weight != 0.0 {
            factors.push(Factor::new(
                Category::Trend,
                format!("{name} {}", pretty(label)),
                weight / INDICATOR_COUNT,
            ));
        }
    }
    let mut score = sum / INDICATOR_COUNT;

    let divergence = clamp_unit(weight_of(&vocab.rsi_divergence, &indicators.rsi_divergence));
    if divergence != 0.0 && score != 0.0 {
        let opposing = (divergence > 0.0) != (score > 0.0);
        let before = score;
        if opposing {
            // damp toward zero, proportional to divergence strength
            score *= 1.0 - divergence.abs();
        } else {
            score = clamp_unit(score + ALIGNED_DIVERGENCE_GAIN * divergence);
        }
        factors.push(Factor::new(
            Category::Trend,
            format!("RSI {}", pretty(&indicators.rsi_divergence)),
            score - before,
        ));
    }

    CategoryScore {
        category: Category::Trend,
        score: clamp_unit(score),
        factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::normalize::{normalize, testutil::neutral_snapshot};

    fn scored(mutate: impl FnOnce(&mut crate::models::AnalysisSnapshot)) -> CategoryScore {
        let config = EngineConfig::default();
        let mut snapshot = neutral_snapshot();
        mutate(&mut snapshot);
        let snap = normalize(&snapshot, &config).unwrap();
        score(&snap, &config)
    }

    #[test]
    fn neutral_indicators_score_zero() {
        let result = scored(|_| {});
        assert_eq!(result.score, 0.0);
        assert!(result.factors.is_empty());
    }

    #[test]
    fn aligned_bullish_indicators_average_out() {
        let result = scored(|s| {
            s.indicators.ema_signal = "strong_bullish_aligned".to_string();
            s.indicators.rsi_signal = "bullish_momentum".to_string();
            s.indicators.macd_crossover_signal = "bullish_crossover".to_string();
            s.indicators.bb_signal = "cross_above_middle".to_string();
            s.indicators.stoch_signal = "bullish_momentum_stoch".to_string();
        });
        // (1.0 + 0.6 + 0.7 + 0.4 + 0.5) / 5
        assert!((result.score - 0.64).abs() < 1e-9);
        assert_eq!(result.factors.len(), 5);
    }

    #[test]
    fn no_single_indicator_dominates() {
        let result = scored(|s| {
            s.indicators.ema_signal = "strong_bullish_aligned".to_string();
        });
        assert!(result.score <= 0.2 + 1e-9);
    }

    #[test]
    fn overbought_penalizes_bullish_continuation() {
        let bullish = scored(|s| {
            s.indicators.ema_signal = "bullish_short_term".to_string();
        });
        let stretched = scored(|s| {
            s.indicators.ema_signal = "bullish_short_term".to_string();
            s.indicators.rsi_signal = "overbought".to_string();
        });
        assert!(stretched.score < bullish.score);
    }

    #[test]
    fn opposing_divergence_damps_but_never_flips() {
        let bearish = scored(|s| {
            s.indicators.ema_signal = "bearish_short_term".to_string();
            s.indicators.macd_crossover_signal = "bearish_crossover".to_string();
        });
        let damped = scored(|s| {
            s.indicators.ema_signal = "bearish_short_term".to_string();
            s.indicators.macd_crossover_signal = "bearish_crossover".to_string();
            s.indicators.rsi_divergence = "potential_bullish_divergence".to_string();
        });
        assert!(damped.score > bearish.score);
        assert!(damped.score < 0.0, "divergence must not flip the sign");
    }

    #[test]
    fn aligned_divergence_reinforces() {
        let plain = scored(|s| {
            s.indicators.rsi_signal = "bullish_momentum".to_string();
        });
        let confirmed = scored(|s| {
            s.indicators.rsi_signal = "bullish_momentum".to_string();
            s.indicators.rsi_divergence = "potential_bullish_divergence".to_string();
        });
        assert!(confirmed.score > plain.score);
    }

    #[test]
    fn divergence_alone_is_not_primary() {
        let result = scored(|s| {
            s.indicators.rsi_divergence = "potential_bullish_divergence".to_string();
        });
        assert_eq!(result.score, 0.0);
    }
}
