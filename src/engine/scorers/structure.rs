//! Structure scorer: Smart Money Concepts evidence.
//!
//! The structural break (BOS/CHoCH) carries the primary weight, scaled by
//! recency. Unmitigated order blocks and unfilled fair value gaps add
//! aligned bonuses; price sitting inside an equilibrium band damps the
//! whole category toward indecision.

use rust_decimal::Decimal;

use crate::config::EngineConfig;
use crate::engine::normalize::NormalizedSnapshot;
use crate::engine::scorers::{clamp_unit, pretty, weight_of, Category, CategoryScore, Factor};
use crate::models::{PriceZone, SmcData, UnmitigatedFvg};

/// Multiplier on a break older than the newest swing point.
const STALE_BREAK_DISCOUNT: f64 = 0.6;

/// Equilibrium implies indecision: structure keeps only this share of its
/// score while price trades inside an equal-high/low band.
pub(crate) const EQUILIBRIUM_DAMPING: f64 = 0.5;

const ALIGNED_ORDER_BLOCK_BONUS: f64 = 0.3;
const STANDALONE_ORDER_BLOCK_BONUS: f64 = 0.15;
const ALIGNED_FVG_BONUS: f64 = 0.2;
const STANDALONE_FVG_BONUS: f64 = 0.1;

pub fn score(snap: &NormalizedSnapshot, config: &EngineConfig) -> CategoryScore {
    let smc = &snap.smc;
    let mut factors = Vec::new();
    let mut total = 0.0;

    let kind = smc.bos_choch.kind.as_deref().unwrap_or("");
    let base = clamp_unit(weight_of(&config.vocab.bos_choch, kind));
    let break_term = base * recency_factor(smc);
    if break_term != 0.0 {
        let label = match smc.bos_choch.level {
            Some(level) => format!("{} at {level}", pretty(kind)),
            None => pretty(kind),
        };
        factors.push(Factor::new(Category::Structure, label, break_term));
        total += break_term;
    }
    let direction = if break_term > 0.0 {
        1.0
    } else if break_term < 0.0 {
        -1.0
    } else {
        0.0
    };

    let blocks = [
        (&smc.order_block.bullish_ob, 1.0, "bullish order block"),
        (&smc.order_block.bearish_ob, -1.0, "bearish order block"),
    ];
    for (block, side, name) in blocks {
        let Some(block) = block else { continue };
        if block.mitigated {
            continue;
        }
        // full bonus only when aligned with the break; half standalone
        let magnitude = if direction == 0.0 {
            STANDALONE_ORDER_BLOCK_BONUS
        } else if direction == side {
            ALIGNED_ORDER_BLOCK_BONUS
        } else {
            0.0
        };
        if magnitude > 0.0 {
            let term = side * magnitude;
            factors.push(Factor::new(
                Category::Structure,
                format!("unmitigated {name}"),
                term,
            ));
            total += term;
        }
    }

    if let (Some(fvg_kind), Some(zone)) = (smc.fvg.kind.as_deref(), smc.fvg.zone) {
        let side = fvg_side(fvg_kind);
        if side != 0.0 && is_unfilled(zone, &smc.fvg.all_unmitigated_fvg) {
            let magnitude = if direction == 0.0 {
                STANDALONE_FVG_BONUS
            } else if direction == side {
                ALIGNED_FVG_BONUS
            } else {
                0.0
            };
            if magnitude > 0.0 {
                let term = side * magnitude;
                factors.push(Factor::new(
                    Category::Structure,
                    format!("unfilled {}", pretty(fvg_kind)),
                    term,
                ));
                total += term;
            }
        }
    }

    let mut score = clamp_unit(total);

    if let Some(band) = inside_equilibrium(snap) {
        let before = score;
        score *= EQUILIBRIUM_DAMPING;
        if score != before {
            factors.push(Factor::new(
                Category::Structure,
                format!(
                    "price inside equilibrium zone [{}, {}]",
                    band.low(),
                    band.high()
                ),
                score - before,
            ));
        }
    }

    CategoryScore {
        category: Category::Structure,
        score,
        factors,
    }
}

/// A break at (or after) the newest swing point scores full weight;
/// anything older is discounted. Events arrive already time-ordered from
/// the producer, so a missing timestamp is treated as current.
fn recency_factor(smc: &SmcData) -> f64 {
    let Some(break_ts) = smc.bos_choch.timestamp else {
        return 1.0;
    };
    let latest_swing = smc
        .swing_points
        .swing_highs
        .iter()
        .chain(smc.swing_points.swing_lows.iter())
        .max();
    match latest_swing {
        Some(swing_ts) if break_ts < *swing_ts => STALE_BREAK_DISCOUNT,
        _ => 1.0,
    }
}

fn fvg_side(kind: &str) -> f64 {
    if kind.starts_with("bullish") {
        1.0
    } else if kind.starts_with("bearish") {
        -1.0
    } else {
        0.0
    }
}

/// A gap counts as unfilled while the producer still lists it. An empty
/// list means the producer does not track mitigation; trust the event.
pub(crate) fn is_unfilled(zone: PriceZone, unmitigated: &[UnmitigatedFvg]) -> bool {
    unmitigated.is_empty()
        || unmitigated
            .iter()
            .any(|f| f.zone.low() == zone.low() && f.zone.high() == zone.high())
}

/// The equal-high/low band containing the reference price, if any.
/// Bands get a 0.1% tolerance, matching how the producer clusters levels.
pub(crate) fn inside_equilibrium(snap: &NormalizedSnapshot) -> Option<PriceZone> {
    let price = snap.current_price?;
    equilibrium_band(&snap.smc.eq_zone.eq_high, price)
        .or_else(|| equilibrium_band(&snap.smc.eq_zone.eq_low, price))
}

fn equilibrium_band(levels: &[Decimal], price: Decimal) -> Option<PriceZone> {
    let low = levels.iter().min()?;
    let high = levels.iter().max()?;
    let tolerance = if low == high {
        price.abs() * Decimal::new(1, 3)
    } else {
        (*high - *low) * Decimal::new(1, 3)
    };
    let band = PriceZone(*low - tolerance, *high + tolerance);
    band.contains(price).then_some(band)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::normalize::{normalize, testutil::neutral_snapshot};
    use crate::models::{AnalysisSnapshot, BosChoch, Fvg, OrderBlock};
    use chrono::{TimeZone, Utc};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn bullish_ob() -> OrderBlock {
        OrderBlock {
            low: dec("20280"),
            high: dec("20320"),
            mitigated: false,
            start_time: None,
            candle_type: Some("bearish_candle_before_bullish_move".to_string()),
        }
    }

    fn scored(mutate: impl FnOnce(&mut AnalysisSnapshot)) -> CategoryScore {
        let config = EngineConfig::default();
        let mut snapshot = neutral_snapshot();
        mutate(&mut snapshot);
        let snap = normalize(&snapshot, &config).unwrap();
        score(&snap, &config)
    }

    #[test]
    fn empty_structure_scores_zero() {
        let result = scored(|_| {});
        assert_eq!(result.score, 0.0);
        assert!(result.factors.is_empty());
    }

    #[test]
    fn bullish_bos_with_aligned_block_and_gap_saturates() {
        let result = scored(|s| {
            s.smc.bos_choch = BosChoch {
                kind: Some("bullish_bos".to_string()),
                level: Some(dec("20500")),
                direction: Some("up".to_string()),
                timestamp: None,
                current_bias: None,
            };
            s.smc.order_block.bullish_ob = Some(bullish_ob());
            s.smc.fvg = Fvg {
                kind: Some("bullish_fvg".to_string()),
                zone: Some(PriceZone(dec("20300"), dec("20450"))),
                timestamp: None,
                all_unmitigated_fvg: vec![],
            };
        });
        // 1.0 + 0.3 + 0.2 clamps to 1.0
        assert_eq!(result.score, 1.0);
        assert_eq!(result.factors.len(), 3);
        assert!(result.factors[0].label.contains("BOS at 20500"));
    }

    #[test]
    fn mitigated_order_block_contributes_nothing() {
        let result = scored(|s| {
            s.smc.bos_choch.kind = Some("bullish_bos".to_string());
            s.smc.order_block.bullish_ob = Some(OrderBlock {
                mitigated: true,
                ..bullish_ob()
            });
        });
        assert_eq!(result.score, 1.0);
        assert_eq!(result.factors.len(), 1, "no order block factor expected");
    }

    #[test]
    fn misaligned_order_block_adds_no_bonus() {
        let aligned = scored(|s| {
            s.smc.bos_choch.kind = Some("bearish_choch_potential".to_string());
            s.smc.order_block.bearish_ob = Some(OrderBlock {
                low: dec("20600"),
                high: dec("20650"),
                mitigated: false,
                start_time: None,
                candle_type: None,
            });
        });
        let misaligned = scored(|s| {
            s.smc.bos_choch.kind = Some("bearish_choch_potential".to_string());
            s.smc.order_block.bullish_ob = Some(bullish_ob());
        });
        // -0.5 - 0.3 versus -0.5 with the wrong-side block ignored
        assert!((aligned.score + 0.8).abs() < 1e-9);
        assert!((misaligned.score + 0.5).abs() < 1e-9);
    }

    #[test]
    fn standalone_block_scores_half_bonus() {
        let result = scored(|s| {
            s.smc.order_block.bullish_ob = Some(bullish_ob());
        });
        assert!((result.score - 0.15).abs() < 1e-9);
    }

    #[test]
    fn gap_no_longer_tracked_is_filled() {
        let result = scored(|s| {
            s.smc.fvg = Fvg {
                kind: Some("bullish_fvg".to_string()),
                zone: Some(PriceZone(dec("20300"), dec("20450"))),
                timestamp: None,
                all_unmitigated_fvg: vec![UnmitigatedFvg {
                    kind: Some("bullish_fvg".to_string()),
                    // different gap still open; the event's own gap is gone
                    zone: PriceZone(dec("19800"), dec("19900")),
                }],
            };
        });
        assert_eq!(result.score, 0.0);
    }

    #[test]
    fn stale_break_is_discounted() {
        let older = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let fresh = scored(|s| {
            s.smc.bos_choch.kind = Some("bullish_bos".to_string());
            s.smc.bos_choch.timestamp = Some(newer);
            s.smc.swing_points.swing_highs = vec![older];
        });
        let stale = scored(|s| {
            s.smc.bos_choch.kind = Some("bullish_bos".to_string());
            s.smc.bos_choch.timestamp = Some(older);
            s.smc.swing_points.swing_lows = vec![newer];
        });
        assert_eq!(fresh.score, 1.0);
        assert!((stale.score - STALE_BREAK_DISCOUNT).abs() < 1e-9);
    }

    #[test]
    fn equilibrium_price_damps_structure() {
        let trending = scored(|s| {
            s.smc.bos_choch.kind = Some("bullish_choch".to_string());
        });
        let ranging = scored(|s| {
            s.smc.bos_choch.kind = Some("bullish_choch".to_string());
            s.current_price = Some(dec("20500"));
            s.smc.eq_zone.eq_high = vec![dec("20495"), dec("20505")];
        });
        assert!((trending.score - 0.8).abs() < 1e-9);
        assert!((ranging.score - 0.4).abs() < 1e-9);
        assert!(ranging
            .factors
            .iter()
            .any(|f| f.label.contains("equilibrium")));
    }
}
