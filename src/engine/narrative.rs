//! Reason composer: renders the decision into one explanatory sentence.
//!
//! Always non-empty. A directional signal names its top contributing
//! factors and the structure that anchored the entry; NO_SIGNAL explains
//! the dominant cause of indecision.

use crate::config::EngineConfig;
use crate::engine::confluence::ConfluenceResult;
use crate::engine::levels::Levels;
use crate::engine::normalize::NormalizedSnapshot;
use crate::engine::scorers::structure::inside_equilibrium;
use crate::models::Direction;

/// Factors rendered into the justification, per the ranking in
/// [`ConfluenceResult`].
const MAX_FACTORS: usize = 4;
const MIN_FACTORS: usize = 2;

pub fn signal_reason(result: &ConfluenceResult, levels: &Levels) -> String {
    let tone = match result.direction {
        Direction::Buy => "Bullish",
        Direction::Sell => "Bearish",
        Direction::NoSignal => "Neutral",
    };
    let factors = top_factor_labels(result);
    let listed = if factors.is_empty() {
        "broad alignment across categories".to_string()
    } else {
        factors.join(", ")
    };
    format!(
        "{tone} confluence: {listed}; entry anchored at {} (net bias {:.2}, confidence {:.2}).",
        levels.anchor.describe(result.direction),
        result.net_bias,
        result.confidence,
    )
}

/// Reason for a NO_SIGNAL decision.
pub fn indecision_reason(
    config: &EngineConfig,
    snap: &NormalizedSnapshot,
    result: &ConfluenceResult,
) -> String {
    if let Some(band) = inside_equilibrium(snap) {
        return format!(
            "No trade: price is trading inside the equilibrium zone [{}, {}], damping structural evidence toward indecision (net bias {:.2}).",
            band.low(),
            band.high(),
            result.net_bias,
        );
    }

    // conflicting categories: meaningful scores on both sides of zero
    let strongest_bull = result
        .categories
        .iter()
        .filter(|c| c.score >= 0.2)
        .max_by(|a, b| a.score.total_cmp(&b.score));
    let strongest_bear = result
        .categories
        .iter()
        .filter(|c| c.score <= -0.2)
        .min_by(|a, b| a.score.total_cmp(&b.score));
    if let (Some(bull), Some(bear)) = (strongest_bull, strongest_bear) {
        return format!(
            "No trade: conflicting category signals: {} leans bullish ({:.2}) while {} leans bearish ({:.2}); net bias {:.2} stays inside the +/-{:.2} neutral band.",
            bull.category.as_str(),
            bull.score,
            bear.category.as_str(),
            bear.score,
            result.net_bias,
            config.signal_threshold,
        );
    }

    match result.ranked_factors.first() {
        Some(factor) => format!(
            "No trade: net bias {:.2} (led by {}) stays inside the +/-{:.2} neutral band.",
            result.net_bias, factor.label, config.signal_threshold,
        ),
        None => "No trade: all signal categories are neutral.".to_string(),
    }
}

/// Reason when a direction was decided but no structural reference could
/// anchor the levels.
pub fn insufficient_structure_reason(direction: Direction, result: &ConfluenceResult) -> String {
    format!(
        "{} bias (net {:.2}, confidence {:.2}) discarded: no unmitigated order block, unfilled fair value gap, or reference price to anchor entry levels.",
        direction.as_str(),
        result.net_bias,
        result.confidence,
    )
}

fn top_factor_labels(result: &ConfluenceResult) -> Vec<String> {
    let significant = result
        .ranked_factors
        .iter()
        .take(MAX_FACTORS)
        .filter(|f| f.contribution != 0.0)
        .count();
    result
        .ranked_factors
        .iter()
        .take(significant.max(MIN_FACTORS).min(result.ranked_factors.len()))
        .map(|f| f.label.clone())
        .collect()
}
