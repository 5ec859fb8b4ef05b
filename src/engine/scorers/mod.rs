//! Category scorers: pure mappings from one snapshot category to a
//! directional score in [-1, 1] plus the factor labels behind it.
//!
//! Scorers have no data dependency on each other (the external scorer
//! receives the provisional bias as a plain argument), so they can run in
//! any order. The aggregator combines them by summation, which keeps the
//! result identical regardless of evaluation order.

use serde::Serialize;
use std::collections::HashMap;

pub mod external;
pub mod flow;
pub mod structure;
pub mod trend;

/// Signal category identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Trend,
    Structure,
    Flow,
    External,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Trend => "trend",
            Category::Structure => "structure",
            Category::Flow => "flow",
            Category::External => "external",
        }
    }

    /// Tie-break order for factor ranking: structure beats trend beats
    /// flow beats external.
    pub fn priority(&self) -> u8 {
        match self {
            Category::Structure => 0,
            Category::Trend => 1,
            Category::Flow => 2,
            Category::External => 3,
        }
    }
}

/// One contributing factor: a human-readable label and its signed
/// contribution to the category score (later scaled by the category
/// weight for ranking).
#[derive(Debug, Clone)]
pub struct Factor {
    pub category: Category,
    pub label: String,
    pub contribution: f64,
}

impl Factor {
    pub fn new(category: Category, label: impl Into<String>, contribution: f64) -> Self {
        Self {
            category,
            label: label.into(),
            contribution,
        }
    }
}

/// Result of scoring one category.
#[derive(Debug, Clone)]
pub struct CategoryScore {
    pub category: Category,
    /// Directional score in [-1, 1].
    pub score: f64,
    pub factors: Vec<Factor>,
}

impl CategoryScore {
    pub fn neutral(category: Category) -> Self {
        Self {
            category,
            score: 0.0,
            factors: Vec::new(),
        }
    }
}

/// Weight table lookup. Unknown labels score neutral; the normalizer has
/// already logged them.
pub(crate) fn weight_of(table: &HashMap<String, f64>, label: &str) -> f64 {
    table.get(label).copied().unwrap_or(0.0)
}

pub(crate) fn clamp_unit(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}

/// "bullish_bos" → "bullish BOS", for reason text.
pub(crate) fn pretty(label: &str) -> String {
    label
        .split('_')
        .map(|word| match word {
            "bos" => "BOS".to_string(),
            "choch" => "CHoCH".to_string(),
            "fvg" => "FVG".to_string(),
            "ema" => "EMA".to_string(),
            "rsi" => "RSI".to_string(),
            "macd" => "MACD".to_string(),
            "bb" => "BB".to_string(),
            "cvd" => "CVD".to_string(),
            "ob" => "order block".to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
