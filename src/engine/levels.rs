//! Level calculator: entry, stop-loss, and three take-profits from
//! structural references.
//!
//! Priority for the entry anchor: same-side unmitigated order block edge,
//! then nearest unfilled fair value gap, then the caller's reference
//! price. With none of those the direction is discarded; a price is
//! never fabricated.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::config::EngineConfig;
use crate::engine::normalize::NormalizedSnapshot;
use crate::engine::scorers::structure::is_unfilled;
use crate::models::{Direction, EngineError, PriceZone};

/// Which structural reference anchored the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelAnchor {
    OrderBlock,
    FairValueGap,
    ReferencePrice,
}

impl LevelAnchor {
    pub fn describe(&self, direction: Direction) -> &'static str {
        match (self, direction) {
            (LevelAnchor::OrderBlock, Direction::Buy) => "the bullish order block high",
            (LevelAnchor::OrderBlock, _) => "the bearish order block low",
            (LevelAnchor::FairValueGap, Direction::Buy) => "the unfilled bullish FVG boundary",
            (LevelAnchor::FairValueGap, _) => "the unfilled bearish FVG boundary",
            (LevelAnchor::ReferencePrice, _) => "the current reference price",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Levels {
    pub entry: Decimal,
    pub stop_loss: Decimal,
    /// Ascending for BUY, descending for SELL.
    pub take_profits: [Decimal; 3],
    /// Risk/reward for the first take-profit, e.g. "1:1.50".
    pub risk_reward_ratio: String,
    pub anchor: LevelAnchor,
}

/// Derive all price levels for a decided direction.
pub fn derive(
    snap: &NormalizedSnapshot,
    config: &EngineConfig,
    direction: Direction,
) -> Result<Levels, EngineError> {
    let is_buy = match direction {
        Direction::Buy => true,
        Direction::Sell => false,
        Direction::NoSignal => return Err(EngineError::InsufficientStructure),
    };

    let (entry, stop_edge, anchor) = entry_reference(snap, is_buy)?;
    let stop_loss = stop_loss(snap, config, entry, stop_edge, is_buy);
    let take_profits = take_profits(snap, entry, stop_loss, is_buy);

    let risk = (entry - stop_loss).abs();
    let reward = (take_profits[0] - entry).abs();
    let ratio = (reward / risk).to_string().parse::<f64>().unwrap_or(0.0);
    let risk_reward_ratio = format!("1:{ratio:.2}");

    Ok(Levels {
        entry,
        stop_loss,
        take_profits,
        risk_reward_ratio,
        anchor,
    })
}

/// Entry price plus the structural stop edge that comes with it.
fn entry_reference(
    snap: &NormalizedSnapshot,
    is_buy: bool,
) -> Result<(Decimal, Option<Decimal>, LevelAnchor), EngineError> {
    let blocks = &snap.smc.order_block;
    let block = if is_buy {
        blocks.bullish_ob.as_ref()
    } else {
        blocks.bearish_ob.as_ref()
    };
    if let Some(block) = block.filter(|b| !b.mitigated) {
        let zone = block.zone();
        let entry = near_edge(zone, is_buy);
        return Ok((entry, Some(far_edge(zone, is_buy)), LevelAnchor::OrderBlock));
    }

    if let Some(zone) = nearest_unfilled_gap(snap, is_buy) {
        let entry = near_edge(zone, is_buy);
        return Ok((entry, Some(far_edge(zone, is_buy)), LevelAnchor::FairValueGap));
    }

    if let Some(price) = snap.current_price {
        return Ok((price, None, LevelAnchor::ReferencePrice));
    }

    Err(EngineError::InsufficientStructure)
}

/// The retracement edge a limit entry would rest on.
fn near_edge(zone: PriceZone, is_buy: bool) -> Decimal {
    if is_buy {
        zone.high()
    } else {
        zone.low()
    }
}

fn far_edge(zone: PriceZone, is_buy: bool) -> Decimal {
    if is_buy {
        zone.low()
    } else {
        zone.high()
    }
}

/// Same-side gaps still tracked as unfilled; nearest to the reference
/// price when one is available, otherwise the current event gap.
fn nearest_unfilled_gap(snap: &NormalizedSnapshot, is_buy: bool) -> Option<PriceZone> {
    let fvg = &snap.smc.fvg;
    let side_prefix = if is_buy { "bullish" } else { "bearish" };

    let mut zones: Vec<PriceZone> = Vec::new();
    if let (Some(kind), Some(zone)) = (fvg.kind.as_deref(), fvg.zone) {
        if kind.starts_with(side_prefix) && is_unfilled(zone, &fvg.all_unmitigated_fvg) {
            zones.push(zone);
        }
    }
    for gap in &fvg.all_unmitigated_fvg {
        if gap
            .kind
            .as_deref()
            .is_some_and(|k| k.starts_with(side_prefix))
        {
            zones.push(gap.zone);
        }
    }

    match snap.current_price {
        Some(price) => zones
            .into_iter()
            .min_by_key(|zone| (zone.midpoint() - price).abs()),
        None => zones.into_iter().next(),
    }
}

/// Structural stop first, then the nearest opposing liquidity level, then
/// the percentage fallback. The stop always ends up on the loss side of
/// the entry.
fn stop_loss(
    snap: &NormalizedSnapshot,
    config: &EngineConfig,
    entry: Decimal,
    stop_edge: Option<Decimal>,
    is_buy: bool,
) -> Decimal {
    let buffer = dec(config.stop_buffer_pct);
    let buffered = |edge: Decimal| {
        if is_buy {
            edge * (Decimal::ONE - buffer)
        } else {
            edge * (Decimal::ONE + buffer)
        }
    };

    let candidate = stop_edge.map(buffered).or_else(|| {
        // swing timestamps carry no prices; equal-low/high clusters are the
        // structural floor/ceiling we can actually price
        let eq = &snap.smc.eq_zone;
        let level = if is_buy {
            eq.eq_low.iter().filter(|p| **p < entry).max().copied()
        } else {
            eq.eq_high.iter().filter(|p| **p > entry).min().copied()
        };
        level.map(buffered)
    });

    let fallback = dec(config.fallback_stop_pct);
    let percentage_stop = if is_buy {
        entry * (Decimal::ONE - fallback)
    } else {
        entry * (Decimal::ONE + fallback)
    };

    match candidate {
        Some(stop) if is_buy && stop < entry => stop,
        Some(stop) if !is_buy && stop > entry => stop,
        _ => percentage_stop,
    }
}

/// Up to three structural targets, then deterministic extension.
fn take_profits(
    snap: &NormalizedSnapshot,
    entry: Decimal,
    stop: Decimal,
    is_buy: bool,
) -> [Decimal; 3] {
    let mut candidates: Vec<Decimal> = Vec::new();

    // opposing order block: the edge facing the entry
    let opposing = if is_buy {
        snap.smc.order_block.bearish_ob.as_ref()
    } else {
        snap.smc.order_block.bullish_ob.as_ref()
    };
    if let Some(block) = opposing {
        candidates.push(far_edge(block.zone(), is_buy));
    }

    // nearest equal-high/low boundary on the profit side
    let eq = &snap.smc.eq_zone;
    let eq_target = if is_buy {
        eq.eq_high.iter().filter(|p| **p > entry).min().copied()
    } else {
        eq.eq_low.iter().filter(|p| **p < entry).max().copied()
    };
    candidates.extend(eq_target);

    // opposing liquidity wall, unless the book is spoofed
    if !snap.orderbook.spoofing_detected.unwrap_or(false) {
        let wall = if is_buy {
            snap.orderbook.ask_wall
        } else {
            snap.orderbook.bid_wall
        };
        candidates.extend(wall);
    }

    candidates.retain(|p| if is_buy { *p > entry } else { *p < entry });
    candidates.sort();
    if !is_buy {
        candidates.reverse();
    }
    candidates.dedup();
    candidates.truncate(3);

    let extend = |base: Decimal, steps: i64| {
        let step = base - entry;
        entry + step * Decimal::from(steps)
    };

    match candidates.len() {
        0 => {
            let risk = (entry - stop).abs();
            let step = if is_buy { risk } else { -risk };
            [
                entry + step,
                entry + step * Decimal::TWO,
                entry + step * Decimal::from(3),
            ]
        }
        1 => {
            let tp1 = candidates[0];
            [tp1, extend(tp1, 2), extend(tp1, 3)]
        }
        2 => {
            let (tp1, tp2) = (candidates[0], candidates[1]);
            let extended = extend(tp1, 3);
            let tp3 = if is_buy {
                extended.max(tp2)
            } else {
                extended.min(tp2)
            };
            [tp1, tp2, tp3]
        }
        _ => [candidates[0], candidates[1], candidates[2]],
    }
}

/// Lossless f64 to Decimal conversion for configured fractions.
fn dec(value: f64) -> Decimal {
    Decimal::from_str(&value.to_string()).unwrap_or(Decimal::ZERO)
}
