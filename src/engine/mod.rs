//! The confluence decision engine.
//!
//! A pure function of an [`AnalysisSnapshot`](crate::models::AnalysisSnapshot)
//! and a read-only [`EngineConfig`]: normalize, score the four categories,
//! aggregate, derive levels, compose the reason. No I/O and no retained
//! state, so concurrent evaluation needs no locking and always produces
//! identical output for identical input.

pub mod confluence;
pub mod levels;
pub mod narrative;
pub mod normalize;
pub mod scorers;

pub use confluence::ConfluenceResult;
pub use levels::{LevelAnchor, Levels};
pub use normalize::NormalizedSnapshot;
pub use scorers::{Category, CategoryScore, Factor};

use tracing::debug;

use crate::config::EngineConfig;
use crate::models::{AnalysisSnapshot, Direction, EngineError, TradingSignal};

/// Full evaluation output: the wire-level signal plus the intermediate
/// confluence view for logging, metrics, and dry-run inspection.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub signal: TradingSignal,
    pub confluence: ConfluenceResult,
    /// Vocabulary labels that matched no weight table (scored neutral).
    pub unknown_labels: Vec<String>,
}

/// Stateless orchestrator over the scoring pipeline.
pub struct ConfluenceEngine {
    config: EngineConfig,
}

impl ConfluenceEngine {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Evaluate one snapshot into a trading signal.
    pub fn generate_signal(&self, snapshot: &AnalysisSnapshot) -> Result<TradingSignal, EngineError> {
        self.evaluate(snapshot).map(|evaluation| evaluation.signal)
    }

    /// Evaluate one snapshot, keeping the intermediate confluence result.
    pub fn evaluate(&self, snapshot: &AnalysisSnapshot) -> Result<Evaluation, EngineError> {
        let snap = normalize::normalize(snapshot, &self.config)?;

        let trend = scorers::trend::score(&snap, &self.config);
        let structure = scorers::structure::score(&snap, &self.config);
        let flow = scorers::flow::score(&snap, &self.config);
        // two-pass: open interest needs to know which side the first-pass
        // categories favor
        let provisional =
            confluence::provisional_bias(&self.config.weights, &trend, &structure, &flow);
        let external = scorers::external::score(&snap, &self.config, provisional);

        let result = confluence::aggregate(
            &self.config,
            vec![trend, structure, flow, external],
        );
        debug!(
            symbol = %snap.symbol,
            net_bias = result.net_bias,
            confidence = result.confidence,
            direction = result.direction.as_str(),
            "confluence aggregated"
        );

        let signal = match result.direction {
            Direction::NoSignal => TradingSignal::no_signal(
                snap.symbol.clone(),
                snap.timeframe.clone(),
                narrative::indecision_reason(&self.config, &snap, &result),
                result.confidence,
            ),
            direction => match levels::derive(&snap, &self.config, direction) {
                Ok(levels) => TradingSignal {
                    symbol: snap.symbol.clone(),
                    timeframe: snap.timeframe.clone(),
                    signal: direction,
                    entry: Some(levels.entry),
                    stop_loss: Some(levels.stop_loss),
                    take_profit_1: Some(levels.take_profits[0]),
                    take_profit_2: Some(levels.take_profits[1]),
                    take_profit_3: Some(levels.take_profits[2]),
                    risk_reward_ratio: Some(levels.risk_reward_ratio.clone()),
                    reason: narrative::signal_reason(&result, &levels),
                    confidence_score: Some(result.confidence),
                },
                // a direction without derivable levels degrades to
                // NO_SIGNAL; the caller expects a response, not a failure
                Err(EngineError::InsufficientStructure) => TradingSignal::no_signal(
                    snap.symbol.clone(),
                    snap.timeframe.clone(),
                    narrative::insufficient_structure_reason(direction, &result),
                    result.confidence,
                ),
                Err(e) => return Err(e),
            },
        };

        Ok(Evaluation {
            signal,
            confluence: result,
            unknown_labels: snap.unknown_labels,
        })
    }
}
