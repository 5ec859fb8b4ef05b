//! Wire types: analysis snapshot in, trading signal out.
//!
//! Field names follow the upstream analyzer contract. Indicator and flow
//! vocabularies are open strings scored through configured weight tables,
//! so a new label from a producer is a configuration change, not a schema
//! change.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Inclusive price zone, serialized as a two-element `[low, high]` array.
///
/// Producers occasionally emit the bounds reversed; accessors re-order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceZone(pub Decimal, pub Decimal);

impl PriceZone {
    pub fn low(&self) -> Decimal {
        self.0.min(self.1)
    }

    pub fn high(&self) -> Decimal {
        self.0.max(self.1)
    }

    pub fn midpoint(&self) -> Decimal {
        (self.low() + self.high()) / Decimal::TWO
    }

    pub fn contains(&self, price: Decimal) -> bool {
        self.low() <= price && price <= self.high()
    }
}

/// Analysis snapshot submitted by the upstream analyzers.
///
/// `on_chain` and `macro_data` are nullable categories; the normalizer
/// substitutes neutral sentinels when they are absent.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AnalysisSnapshot {
    #[validate(length(min = 1, message = "symbol must not be empty"))]
    pub symbol: String,
    #[validate(length(min = 1, message = "timeframe must not be empty"))]
    pub timeframe: String,
    /// Reference price of the candle the snapshot was taken from, when the
    /// caller has one. Level derivation falls back to structure-only
    /// references without it.
    #[serde(default)]
    pub current_price: Option<Decimal>,
    pub indicators: IndicatorsData,
    #[serde(default)]
    pub smc: SmcData,
    pub volume_delta: VolumeDeltaData,
    pub orderbook: OrderbookData,
    #[serde(default)]
    pub on_chain: Option<OnChainData>,
    #[serde(default)]
    pub macro_data: Option<MacroData>,
}

/// Classical indicator states. All six labels are open vocabularies.
#[derive(Debug, Clone, Deserialize)]
pub struct IndicatorsData {
    pub ema_signal: String,
    pub rsi_signal: String,
    pub rsi_divergence: String,
    pub macd_crossover_signal: String,
    pub bb_signal: String,
    pub stoch_signal: String,
}

/// Smart Money Concepts structure as reported by the upstream detector.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmcData {
    #[serde(default)]
    pub swing_points: SwingPoints,
    #[serde(default)]
    pub bos_choch: BosChoch,
    #[serde(default)]
    pub fvg: Fvg,
    #[serde(default)]
    pub eq_zone: EqZone,
    #[serde(default)]
    pub order_block: OrderBlockSet,
}

/// Swing point timestamps, oldest first. The producer orders these; the
/// engine only compares them for recency, it never prices them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SwingPoints {
    #[serde(default)]
    pub swing_highs: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub swing_lows: Vec<DateTime<Utc>>,
}

/// Break-of-Structure / Change-of-Character event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BosChoch {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub level: Option<Decimal>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_bias: Option<String>,
}

/// Fair Value Gap event plus every gap the producer still tracks as
/// unfilled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Fvg {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub zone: Option<PriceZone>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub all_unmitigated_fvg: Vec<UnmitigatedFvg>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnmitigatedFvg {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub zone: PriceZone,
}

/// Clusters of equal highs / equal lows (liquidity pools).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EqZone {
    #[serde(default)]
    pub eq_high: Vec<Decimal>,
    #[serde(default)]
    pub eq_low: Vec<Decimal>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderBlockSet {
    #[serde(default)]
    pub bullish_ob: Option<OrderBlock>,
    #[serde(default)]
    pub bearish_ob: Option<OrderBlock>,
}

/// Order block: a supply/demand zone valid until price returns into it.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderBlock {
    pub low: Decimal,
    pub high: Decimal,
    #[serde(default)]
    pub mitigated: bool,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub candle_type: Option<String>,
}

impl OrderBlock {
    pub fn zone(&self) -> PriceZone {
        PriceZone(self.low, self.high)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VolumeDeltaData {
    /// Signed buy-minus-sell executed volume of the current candle.
    pub current_delta: f64,
    pub cvd_trend: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderbookData {
    #[serde(default)]
    pub bid_wall: Option<Decimal>,
    #[serde(default)]
    pub ask_wall: Option<Decimal>,
    /// Bid-weighted fraction of resting depth; 0.5 is balanced.
    pub imbalance_ratio: f64,
    #[serde(default)]
    pub spoofing_detected: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OnChainData {
    pub whale_movement: String,
    pub smart_money_net_flow: f64,
    /// Opaque to the engine; only the count matters.
    #[serde(default)]
    pub significant_transactions: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MacroData {
    pub funding_rate: f64,
    pub open_interest_change: String,
    #[serde(default)]
    pub news_sentiment: Option<String>,
}

/// Final decision direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Buy,
    Sell,
    NoSignal,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
            Direction::NoSignal => "NO_SIGNAL",
        }
    }
}

/// Trading signal returned to the caller.
///
/// Price levels are present only when a direction was decided and a
/// structural reference existed to anchor them. `reason` is never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSignal {
    pub symbol: String,
    pub timeframe: String,
    pub signal: Direction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_loss: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_1: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_2: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub take_profit_3: Option<Decimal>,
    /// Risk/reward for the first take-profit, e.g. "1:1.50".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_reward_ratio: Option<String>,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
}

impl TradingSignal {
    /// A decision with no actionable levels.
    pub fn no_signal(symbol: String, timeframe: String, reason: String, confidence: f64) -> Self {
        Self {
            symbol,
            timeframe,
            signal: Direction::NoSignal,
            entry: None,
            stop_loss: None,
            take_profit_1: None,
            take_profit_2: None,
            take_profit_3: None,
            risk_reward_ratio: None,
            reason,
            confidence_score: Some(confidence),
        }
    }
}

/// Engine error taxonomy.
///
/// Low confidence and conflicting categories are NOT errors; they are
/// legitimate NO_SIGNAL outcomes.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Missing or malformed required field; rejected before scoring.
    #[error("invalid snapshot: {0}")]
    Validation(String),

    /// Direction decided but no structural price reference to anchor
    /// levels. Surfaced to callers as a NO_SIGNAL response, never as a
    /// transport failure.
    #[error("no structural reference available to derive price levels")]
    InsufficientStructure,

    /// Malformed weight table or threshold; fatal at startup.
    #[error("invalid engine configuration: {0}")]
    Configuration(String),
}
