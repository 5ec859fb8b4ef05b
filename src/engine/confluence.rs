//! Confluence aggregator: weighted category sum → net bias, confidence,
//! direction, and the ranked factor list the reason composer renders.

use crate::config::{CategoryWeights, EngineConfig};
use crate::engine::scorers::{Category, CategoryScore, Factor};
use crate::models::Direction;

/// Aggregated view of one evaluation.
#[derive(Debug, Clone)]
pub struct ConfluenceResult {
    /// Weighted sum of category scores, clamped to [-1, 1].
    pub net_bias: f64,
    /// min(1, |net_bias| * calibration).
    pub confidence: f64,
    pub direction: Direction,
    /// The four category scores, in fixed trend/structure/flow/external order.
    pub categories: Vec<CategoryScore>,
    /// All factors with contributions scaled by their category weight,
    /// strongest first. Ties break on category priority, then label.
    pub ranked_factors: Vec<Factor>,
}

pub(crate) fn category_weight(weights: &CategoryWeights, category: Category) -> f64 {
    match category {
        Category::Trend => weights.trend,
        Category::Structure => weights.structure,
        Category::Flow => weights.flow,
        Category::External => weights.external,
    }
}

/// Bias of the first-pass categories, fed to the external scorer as
/// directional context.
pub fn provisional_bias(
    weights: &CategoryWeights,
    trend: &CategoryScore,
    structure: &CategoryScore,
    flow: &CategoryScore,
) -> f64 {
    weights.trend * trend.score + weights.structure * structure.score + weights.flow * flow.score
}

/// Combine the four category scores into the final decision.
///
/// Pure summation: evaluation order of the scorers cannot change the
/// outcome, which is what makes parallel scoring safe.
pub fn aggregate(config: &EngineConfig, categories: Vec<CategoryScore>) -> ConfluenceResult {
    let weights = &config.weights;
    let net: f64 = categories
        .iter()
        .map(|c| category_weight(weights, c.category) * c.score)
        .sum();
    let net_bias = net.clamp(-1.0, 1.0);

    let confidence = (net_bias.abs() * config.confidence_calibration).min(1.0);

    let direction = if net_bias > config.signal_threshold {
        Direction::Buy
    } else if net_bias < -config.signal_threshold {
        Direction::Sell
    } else {
        Direction::NoSignal
    };

    let mut ranked_factors: Vec<Factor> = categories
        .iter()
        .flat_map(|c| {
            let weight = category_weight(weights, c.category);
            c.factors.iter().map(move |f| Factor {
                category: f.category,
                label: f.label.clone(),
                contribution: f.contribution * weight,
            })
        })
        .collect();
    ranked_factors.sort_by(|a, b| {
        b.contribution
            .abs()
            .total_cmp(&a.contribution.abs())
            .then(a.category.priority().cmp(&b.category.priority()))
            .then(a.label.cmp(&b.label))
    });

    ConfluenceResult {
        net_bias,
        confidence,
        direction,
        categories,
        ranked_factors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(category: Category, value: f64) -> CategoryScore {
        let mut s = CategoryScore::neutral(category);
        s.score = value;
        if value != 0.0 {
            s.factors
                .push(Factor::new(category, format!("{} factor", category.as_str()), value));
        }
        s
    }

    fn all(trend: f64, structure: f64, flow: f64, external: f64) -> Vec<CategoryScore> {
        vec![
            score(Category::Trend, trend),
            score(Category::Structure, structure),
            score(Category::Flow, flow),
            score(Category::External, external),
        ]
    }

    #[test]
    fn all_neutral_is_no_signal_with_zero_confidence() {
        let result = aggregate(&EngineConfig::default(), all(0.0, 0.0, 0.0, 0.0));
        assert_eq!(result.direction, Direction::NoSignal);
        assert_eq!(result.net_bias, 0.0);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn weighted_sum_crosses_the_dead_zone() {
        let config = EngineConfig::default();
        let result = aggregate(&config, all(0.64, 1.0, 0.65, 0.6));
        // 0.25*0.64 + 0.35*1.0 + 0.25*0.65 + 0.15*0.6
        assert!((result.net_bias - 0.7625).abs() < 1e-9);
        assert_eq!(result.direction, Direction::Buy);
        assert!((result.confidence - 0.7625).abs() < 1e-9);
    }

    #[test]
    fn net_inside_dead_zone_is_no_signal() {
        let config = EngineConfig::default();
        let result = aggregate(&config, all(0.2, 0.1, 0.0, 0.0));
        assert!(result.net_bias > 0.0);
        assert!(result.net_bias < config.signal_threshold);
        assert_eq!(result.direction, Direction::NoSignal);
        // confidence reflects the (weak) evidence even without a direction
        assert!(result.confidence > 0.0);
    }

    #[test]
    fn bearish_net_sells() {
        let result = aggregate(&EngineConfig::default(), all(-0.5, -0.8, -0.2, 0.0));
        assert_eq!(result.direction, Direction::Sell);
    }

    #[test]
    fn aggregation_is_order_independent() {
        let config = EngineConfig::default();
        let forward = aggregate(&config, all(0.3, -0.4, 0.5, 0.1));
        let mut reversed = all(0.3, -0.4, 0.5, 0.1);
        reversed.reverse();
        let backward = aggregate(&config, reversed);
        assert_eq!(forward.net_bias, backward.net_bias);
        assert_eq!(forward.direction, backward.direction);
    }

    #[test]
    fn factors_rank_by_weighted_contribution() {
        let config = EngineConfig::default();
        // raw flow factor is larger, but structure outweighs it after scaling
        let result = aggregate(&config, all(0.0, 0.6, 0.7, 0.0));
        assert_eq!(result.ranked_factors[0].category, Category::Structure);
    }

    #[test]
    fn equal_contributions_break_ties_by_category_priority() {
        let config = EngineConfig::default();
        let mut trend = CategoryScore::neutral(Category::Trend);
        trend.factors.push(Factor::new(Category::Trend, "a", 0.35));
        let mut structure = CategoryScore::neutral(Category::Structure);
        structure
            .factors
            .push(Factor::new(Category::Structure, "b", 0.25));
        let categories = vec![
            trend,
            structure,
            CategoryScore::neutral(Category::Flow),
            CategoryScore::neutral(Category::External),
        ];
        // 0.35*0.25 == 0.25*0.35: structure wins the tie
        let result = aggregate(&config, categories);
        assert_eq!(result.ranked_factors[0].category, Category::Structure);
    }

    #[test]
    fn confidence_calibration_scales_and_saturates() {
        let mut config = EngineConfig::default();
        config.confidence_calibration = 2.0;
        let result = aggregate(&config, all(0.64, 1.0, 0.65, 0.6));
        assert_eq!(result.confidence, 1.0);
    }
}
