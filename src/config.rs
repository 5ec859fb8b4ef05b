//! Engine configuration: category weights, decision thresholds, and the
//! label → weight vocabularies the scorers look up.
//!
//! Vocabularies are data, not match arms: a new label from an upstream
//! analyzer is added here (or through `engine.toml` / `ENGINE_*` env
//! overrides), never by recompiling the scorers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::EngineError;

/// Relative weight of each signal category in the confluence sum.
///
/// Structure (SMC) is the primary thesis driver; external/macro evidence
/// is corroborating only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub trend: f64,
    pub structure: f64,
    pub flow: f64,
    pub external: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            trend: 0.25,
            structure: 0.35,
            flow: 0.25,
            external: 0.15,
        }
    }
}

/// Label → signed weight tables, one per vocabulary.
///
/// Weights are clamped to [-1, 1] at validation. Labels missing from a
/// table score 0 (forward-compatibility policy; the normalizer logs them).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyTables {
    pub ema: HashMap<String, f64>,
    pub rsi: HashMap<String, f64>,
    pub rsi_divergence: HashMap<String, f64>,
    pub macd: HashMap<String, f64>,
    pub bb: HashMap<String, f64>,
    pub stoch: HashMap<String, f64>,
    pub bos_choch: HashMap<String, f64>,
    pub cvd: HashMap<String, f64>,
    pub whale: HashMap<String, f64>,
    /// Magnitudes applied in the provisional-bias direction, so rising
    /// open interest reinforces whichever side the other categories favor.
    pub open_interest: HashMap<String, f64>,
}

fn table(entries: &[(&str, f64)]) -> HashMap<String, f64> {
    entries
        .iter()
        .map(|(label, weight)| (label.to_string(), *weight))
        .collect()
}

impl Default for VocabularyTables {
    fn default() -> Self {
        Self {
            ema: table(&[
                ("strong_bullish_aligned", 1.0),
                ("strong_bearish_aligned", -1.0),
                ("bullish_short_term", 0.6),
                ("bearish_short_term", -0.6),
                ("golden_cross_potential", 0.4),
                ("death_cross_potential", -0.4),
                ("neutral_or_ranging_ema", 0.0),
            ]),
            rsi: table(&[
                ("strong_bullish_momentum", 0.8),
                ("strong_bearish_momentum", -0.8),
                ("bullish_momentum", 0.6),
                ("bearish_momentum", -0.6),
                // stretched conditions penalize continuation regardless of
                // the directional wording
                ("overbought", -0.3),
                ("oversold", 0.3),
                ("overbought_bullish_momentum", 0.2),
                ("oversold_bearish_momentum", -0.2),
                ("neutral", 0.0),
            ]),
            rsi_divergence: table(&[
                ("potential_bullish_divergence", 0.4),
                ("potential_bearish_divergence", -0.4),
                ("no_divergence", 0.0),
            ]),
            macd: table(&[
                ("bullish_crossover", 0.7),
                ("bearish_crossover", -0.7),
                ("no_crossover", 0.0),
            ]),
            bb: table(&[
                ("cross_above_middle", 0.4),
                ("cross_below_middle", -0.4),
                ("above_middle_band", 0.2),
                ("below_middle_band", -0.2),
                ("bounce_from_lower", 0.3),
                ("bounce_from_upper", -0.3),
                ("oversold_band_extreme", 0.3),
                ("overbought_band_extreme", -0.3),
                // volatility states carry no direction
                ("squeeze_potential", 0.0),
                ("expansion_ongoing", 0.0),
                ("normal_volatility", 0.0),
                ("neutral_band_range", 0.0),
            ]),
            stoch: table(&[
                ("oversold_bullish_cross", 0.7),
                ("overbought_bearish_cross", -0.7),
                ("bullish_momentum_stoch", 0.5),
                ("bearish_momentum_stoch", -0.5),
                ("oversold", 0.3),
                ("overbought", -0.3),
                ("neutral_stoch", 0.0),
            ]),
            bos_choch: table(&[
                ("bullish_bos", 1.0),
                ("bearish_bos", -1.0),
                ("bullish_choch", 0.8),
                ("bearish_choch", -0.8),
                ("bullish_choch_potential", 0.5),
                ("bearish_choch_potential", -0.5),
                ("no_signal", 0.0),
                ("ranging", 0.0),
            ]),
            cvd: table(&[("bullish", 0.5), ("bearish", -0.5), ("neutral", 0.0)]),
            whale: table(&[("inflow", 0.3), ("outflow", -0.3), ("neutral", 0.0)]),
            open_interest: table(&[
                ("increasing", 0.2),
                ("decreasing", -0.1),
                ("neutral", 0.0),
            ]),
        }
    }
}

/// Complete engine configuration.
///
/// Read-only after startup; the engine never mutates it, which is what
/// makes concurrent evaluation safe without locking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub weights: CategoryWeights,
    /// Dead zone: |net bias| must exceed this for a directional signal.
    pub signal_threshold: f64,
    /// Confidence calibration: confidence = min(1, |net| * k).
    pub confidence_calibration: f64,
    /// Fractional clearance applied beyond the structural stop edge.
    pub stop_buffer_pct: f64,
    /// Percentage stop distance when no structural stop exists.
    pub fallback_stop_pct: f64,
    /// |smart_money_net_flow| at which the on-chain flow term saturates.
    pub smart_money_saturation: f64,
    /// |funding_rate| treated as extreme by the mean-reversion term.
    pub funding_saturation: f64,
    pub vocab: VocabularyTables,
    /// Bearer token required on the signal route; route is open when unset.
    pub api_key: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            weights: CategoryWeights::default(),
            signal_threshold: 0.15,
            confidence_calibration: 1.0,
            stop_buffer_pct: 0.005,
            fallback_stop_pct: 0.02,
            smart_money_saturation: 1000.0,
            funding_saturation: 0.01,
            vocab: VocabularyTables::default(),
            api_key: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `engine.toml` (optional) layered with
    /// `ENGINE_*` environment variables over the built-in defaults.
    pub fn load() -> Result<Self, EngineError> {
        let source = config::Config::builder()
            .add_source(config::File::with_name("engine").required(false))
            .add_source(
                config::Environment::with_prefix("ENGINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| EngineError::Configuration(e.to_string()))?;

        let config: EngineConfig = source
            .try_deserialize()
            .map_err(|e| EngineError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject malformed weight tables before the engine is constructed.
    pub fn validate(&self) -> Result<(), EngineError> {
        let weights = [
            ("trend", self.weights.trend),
            ("structure", self.weights.structure),
            ("flow", self.weights.flow),
            ("external", self.weights.external),
        ];
        for (name, w) in weights {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(EngineError::Configuration(format!(
                    "category weight '{name}' must be in [0, 1], got {w}"
                )));
            }
        }
        let total: f64 = weights.iter().map(|(_, w)| w).sum();
        if total <= 0.0 {
            return Err(EngineError::Configuration(
                "category weights must not all be zero".to_string(),
            ));
        }

        if !self.signal_threshold.is_finite() || !(0.0..1.0).contains(&self.signal_threshold) {
            return Err(EngineError::Configuration(format!(
                "signal_threshold must be in [0, 1), got {}",
                self.signal_threshold
            )));
        }
        if !self.confidence_calibration.is_finite() || self.confidence_calibration <= 0.0 {
            return Err(EngineError::Configuration(format!(
                "confidence_calibration must be positive, got {}",
                self.confidence_calibration
            )));
        }
        if !self.stop_buffer_pct.is_finite() || !(0.0..0.2).contains(&self.stop_buffer_pct) {
            return Err(EngineError::Configuration(format!(
                "stop_buffer_pct must be in [0, 0.2), got {}",
                self.stop_buffer_pct
            )));
        }
        // the percentage stop backs the risk ladder, so zero is malformed
        if !self.fallback_stop_pct.is_finite()
            || self.fallback_stop_pct <= 0.0
            || self.fallback_stop_pct >= 0.2
        {
            return Err(EngineError::Configuration(format!(
                "fallback_stop_pct must be in (0, 0.2), got {}",
                self.fallback_stop_pct
            )));
        }
        for (name, sat) in [
            ("smart_money_saturation", self.smart_money_saturation),
            ("funding_saturation", self.funding_saturation),
        ] {
            if !sat.is_finite() || sat <= 0.0 {
                return Err(EngineError::Configuration(format!(
                    "{name} must be positive, got {sat}"
                )));
            }
        }

        for (name, vocab_table) in [
            ("ema", &self.vocab.ema),
            ("rsi", &self.vocab.rsi),
            ("rsi_divergence", &self.vocab.rsi_divergence),
            ("macd", &self.vocab.macd),
            ("bb", &self.vocab.bb),
            ("stoch", &self.vocab.stoch),
            ("bos_choch", &self.vocab.bos_choch),
            ("cvd", &self.vocab.cvd),
            ("whale", &self.vocab.whale),
            ("open_interest", &self.vocab.open_interest),
        ] {
            for (label, weight) in vocab_table {
                if !weight.is_finite() || !(-1.0..=1.0).contains(weight) {
                    return Err(EngineError::Configuration(format!(
                        "vocab.{name}['{label}'] must be in [-1, 1], got {weight}"
                    )));
                }
            }
        }

        Ok(())
    }
}
