//! Snapshot validation and normalization.
//!
//! Everything downstream of this module assumes a well-formed snapshot:
//! required fields present, numerics finite, nullable categories replaced
//! with neutral sentinels, and every unknown vocabulary label already
//! logged and counted.

use tracing::warn;
use validator::Validate;

use crate::config::EngineConfig;
use crate::models::{
    AnalysisSnapshot, EngineError, IndicatorsData, MacroData, OnChainData, OrderbookData, SmcData,
    VolumeDeltaData,
};
use rust_decimal::Decimal;

/// Snapshot after validation. `on_chain` and `macro_data` are always
/// populated (neutral sentinel when the caller sent null), so the scorers
/// never branch on absence.
#[derive(Debug, Clone)]
pub struct NormalizedSnapshot {
    pub symbol: String,
    pub timeframe: String,
    pub current_price: Option<Decimal>,
    pub indicators: IndicatorsData,
    pub smc: SmcData,
    pub volume_delta: VolumeDeltaData,
    pub orderbook: OrderbookData,
    pub on_chain: OnChainData,
    pub macro_data: MacroData,
    /// Labels that matched no weight table. Scored neutral; surfaced so
    /// the transport layer can count them as anomalies.
    pub unknown_labels: Vec<String>,
}

impl OnChainData {
    fn neutral() -> Self {
        Self {
            whale_movement: "neutral".to_string(),
            smart_money_net_flow: 0.0,
            significant_transactions: None,
        }
    }
}

impl MacroData {
    fn neutral() -> Self {
        Self {
            funding_rate: 0.0,
            open_interest_change: "neutral".to_string(),
            news_sentiment: None,
        }
    }
}

/// Validate a raw snapshot and produce the normalized form.
pub fn normalize(
    snapshot: &AnalysisSnapshot,
    config: &EngineConfig,
) -> Result<NormalizedSnapshot, EngineError> {
    snapshot
        .validate()
        .map_err(|e| EngineError::Validation(e.to_string()))?;

    ensure_finite("volume_delta.current_delta", snapshot.volume_delta.current_delta)?;
    ensure_finite("orderbook.imbalance_ratio", snapshot.orderbook.imbalance_ratio)?;
    if let Some(on_chain) = &snapshot.on_chain {
        ensure_finite("on_chain.smart_money_net_flow", on_chain.smart_money_net_flow)?;
    }
    if let Some(macro_data) = &snapshot.macro_data {
        ensure_finite("macro_data.funding_rate", macro_data.funding_rate)?;
    }

    let mut orderbook = snapshot.orderbook.clone();
    if !(0.0..=1.0).contains(&orderbook.imbalance_ratio) {
        warn!(
            symbol = %snapshot.symbol,
            imbalance_ratio = orderbook.imbalance_ratio,
            "imbalance_ratio outside [0, 1], clamping"
        );
        orderbook.imbalance_ratio = orderbook.imbalance_ratio.clamp(0.0, 1.0);
    }

    let on_chain = snapshot.on_chain.clone().unwrap_or_else(OnChainData::neutral);
    let macro_data = snapshot
        .macro_data
        .clone()
        .unwrap_or_else(MacroData::neutral);

    let unknown_labels = scan_unknown_labels(snapshot, &on_chain, &macro_data, config);

    Ok(NormalizedSnapshot {
        symbol: snapshot.symbol.clone(),
        timeframe: snapshot.timeframe.clone(),
        current_price: snapshot.current_price,
        indicators: snapshot.indicators.clone(),
        smc: snapshot.smc.clone(),
        volume_delta: snapshot.volume_delta.clone(),
        orderbook,
        on_chain,
        macro_data,
        unknown_labels,
    })
}

fn ensure_finite(field: &str, value: f64) -> Result<(), EngineError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "{field} must be a finite number"
        )))
    }
}

/// Check every vocabulary-scored label against its table. Unknown labels
/// score neutral downstream; here they are logged once per request.
fn scan_unknown_labels(
    snapshot: &AnalysisSnapshot,
    on_chain: &OnChainData,
    macro_data: &MacroData,
    config: &EngineConfig,
) -> Vec<String> {
    let vocab = &config.vocab;
    let indicators = &snapshot.indicators;
    let mut checks: Vec<(&str, &str, &std::collections::HashMap<String, f64>)> = vec![
        ("ema_signal", &indicators.ema_signal, &vocab.ema),
        ("rsi_signal", &indicators.rsi_signal, &vocab.rsi),
        (
            "rsi_divergence",
            &indicators.rsi_divergence,
            &vocab.rsi_divergence,
        ),
        (
            "macd_crossover_signal",
            &indicators.macd_crossover_signal,
            &vocab.macd,
        ),
        ("bb_signal", &indicators.bb_signal, &vocab.bb),
        ("stoch_signal", &indicators.stoch_signal, &vocab.stoch),
        ("cvd_trend", &snapshot.volume_delta.cvd_trend, &vocab.cvd),
        ("whale_movement", &on_chain.whale_movement, &vocab.whale),
        (
            "open_interest_change",
            &macro_data.open_interest_change,
            &vocab.open_interest,
        ),
    ];
    if let Some(kind) = &snapshot.smc.bos_choch.kind {
        checks.push(("bos_choch.type", kind, &vocab.bos_choch));
    }

    let mut unknown = Vec::new();
    for (field, label, vocab_table) in checks {
        if !label.is_empty() && !vocab_table.contains_key(label) {
            warn!(field, label, "unknown signal label, scoring neutral");
            unknown.push(format!("{field}={label}"));
        }
    }
    unknown
}


#[cfg(test)]
mod tests {
    use super::testutil::neutral_snapshot;
    use super::*;

    #[test]
    fn absent_nullable_categories_become_neutral_sentinels() {
        let config = EngineConfig::default();
        let normalized = normalize(&neutral_snapshot(), &config).unwrap();
        assert_eq!(normalized.on_chain.whale_movement, "neutral");
        assert_eq!(normalized.on_chain.smart_money_net_flow, 0.0);
        assert_eq!(normalized.macro_data.open_interest_change, "neutral");
        assert_eq!(normalized.macro_data.funding_rate, 0.0);
        assert!(normalized.unknown_labels.is_empty());
    }

    #[test]
    fn empty_symbol_is_rejected() {
        let config = EngineConfig::default();
        let mut snapshot = neutral_snapshot();
        snapshot.symbol = String::new();
        let err = normalize(&snapshot, &config).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn non_finite_delta_is_rejected() {
        let config = EngineConfig::default();
        let mut snapshot = neutral_snapshot();
        snapshot.volume_delta.current_delta = f64::NAN;
        assert!(matches!(
            normalize(&snapshot, &config),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn imbalance_ratio_is_clamped_not_rejected() {
        let config = EngineConfig::default();
        let mut snapshot = neutral_snapshot();
        snapshot.orderbook.imbalance_ratio = 1.7;
        let normalized = normalize(&snapshot, &config).unwrap();
        assert_eq!(normalized.orderbook.imbalance_ratio, 1.0);
    }

    #[test]
    fn unknown_labels_are_collected_not_rejected() {
        let config = EngineConfig::default();
        let mut snapshot = neutral_snapshot();
        snapshot.indicators.rsi_signal = "hyperbolic_bullish".to_string();
        snapshot.volume_delta.cvd_trend = "sideways_chop".to_string();
        let normalized = normalize(&snapshot, &config).unwrap();
        assert_eq!(normalized.unknown_labels.len(), 2);
        assert!(normalized.unknown_labels[0].contains("hyperbolic_bullish"));
    }
}
