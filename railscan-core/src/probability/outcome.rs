//! Trade levels and forward replay of a single occurrence.
//!
//! LONG:  target = entry + tp_dist, stop = entry - sl_dist
//! SHORT: target = entry - tp_dist, stop = entry + sl_dist
//!
//! Replay starts the bar after entry and walks at most `horizon` bars, using
//! each bar's high/low to decide which level was reached first.

use serde::{Deserialize, Serialize};

use crate::config::{Distance, TieBreakPolicy};
use crate::domain::PriceBar;
use crate::error::ScanError;
use crate::signal::Direction;

use super::tie_break::resolve_bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    TpFirst,
    SlFirst,
    Unresolved,
}

/// Entry, target and stop for one directional trade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeLevels {
    pub direction: Direction,
    pub entry: f64,
    pub target: f64,
    pub stop: f64,
}

impl TradeLevels {
    /// Levels for a LONG or SHORT entry.
    ///
    /// Fails for HOLD, and when a distance puts the target or stop at or
    /// below zero (a price distance as large as the entry itself).
    pub fn new(
        direction: Direction,
        entry: f64,
        tp: Distance,
        sl: Distance,
    ) -> Result<Self, ScanError> {
        let tp = tp.amount(entry);
        let sl = sl.amount(entry);
        let (target, stop) = match direction {
            Direction::Long => (entry + tp, entry - sl),
            Direction::Short => (entry - tp, entry + sl),
            Direction::Hold => {
                return Err(ScanError::invalid_config("no trade levels for HOLD"));
            }
        };
        for (name, level) in [("target", target), ("stop", stop)] {
            if !(level.is_finite() && level > 0.0) {
                return Err(ScanError::invalid_config(format!(
                    "{direction:?} {name} {level} from entry {entry} is not a positive price"
                )));
            }
        }
        Ok(Self {
            direction,
            entry,
            target,
            stop,
        })
    }

    /// Reward distance over risk distance. `None` when stop == entry.
    pub fn risk_reward_ratio(&self) -> Option<f64> {
        let risk = (self.entry - self.stop).abs();
        if risk == 0.0 || !risk.is_finite() {
            return None;
        }
        Some((self.target - self.entry).abs() / risk)
    }
}

/// Result of replaying one historical occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSample {
    /// Bar the occurrence fired on.
    pub bar_index: usize,
    pub entry_price: f64,
    pub tp_price: f64,
    pub sl_price: f64,
    /// Bars from entry to the resolving bar; `None` when unresolved.
    pub bars_to_resolution: Option<usize>,
    pub outcome: Outcome,
}

impl OutcomeSample {
    /// Percent return realised at the resolving level, from the trade's side.
    pub fn return_pct(&self, direction: Direction) -> Option<f64> {
        let exit = match self.outcome {
            Outcome::TpFirst => self.tp_price,
            Outcome::SlFirst => self.sl_price,
            Outcome::Unresolved => return None,
        };
        match direction {
            Direction::Long => Some((exit / self.entry_price - 1.0) * 100.0),
            Direction::Short => Some((self.entry_price / exit - 1.0) * 100.0),
            Direction::Hold => None,
        }
    }
}

/// Walk bars `t+1 ..= t+horizon` (clamped to the series) and report which
/// level was reached first.
pub fn replay_occurrence(
    bars: &[PriceBar],
    bar_index: usize,
    levels: &TradeLevels,
    horizon: usize,
    policy: TieBreakPolicy,
) -> OutcomeSample {
    let unresolved = OutcomeSample {
        bar_index,
        entry_price: levels.entry,
        tp_price: levels.target,
        sl_price: levels.stop,
        bars_to_resolution: None,
        outcome: Outcome::Unresolved,
    };
    let Some(last) = bars.len().checked_sub(1) else {
        return unresolved;
    };
    let end = bar_index.saturating_add(horizon).min(last);

    for j in (bar_index + 1)..=end {
        if let Some(outcome) = resolve_bar(&bars[j], levels, policy) {
            return OutcomeSample {
                bars_to_resolution: Some(j - bar_index),
                outcome,
                ..unresolved
            };
        }
    }
    unresolved
}
