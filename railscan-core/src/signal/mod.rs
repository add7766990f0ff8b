//! Rail-touch signals.
//!
//! A `Signal` can only be built through `Signal::long`, `Signal::short` or
//! `Signal::hold`, so its direction always matches the rail it touched:
//! LONG ⇔ LOWER, SHORT ⇔ UPPER, HOLD ⇔ NONE. Deserialisation re-checks the
//! pairing. Signals are immutable once emitted.

mod classifier;
mod detector;

pub use classifier::{ChannelClassifier, SignalClassifier};
pub use detector::SignalDetector;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Strength {
    Strong,
    Weak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rail {
    Upper,
    Lower,
    None,
}

/// Directional signal emitted at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "SignalRecord")]
pub struct Signal {
    bar_index: usize,
    direction: Direction,
    strength: Strength,
    touched_rail: Rail,
}

impl Signal {
    /// Price bounced off the lower rail.
    pub fn long(bar_index: usize, strength: Strength) -> Self {
        Self {
            bar_index,
            direction: Direction::Long,
            strength,
            touched_rail: Rail::Lower,
        }
    }

    /// Price pushed into the upper rail.
    pub fn short(bar_index: usize, strength: Strength) -> Self {
        Self {
            bar_index,
            direction: Direction::Short,
            strength,
            touched_rail: Rail::Upper,
        }
    }

    /// No rail interaction. Always WEAK.
    pub fn hold(bar_index: usize) -> Self {
        Self {
            bar_index,
            direction: Direction::Hold,
            strength: Strength::Weak,
            touched_rail: Rail::None,
        }
    }

    pub fn bar_index(&self) -> usize {
        self.bar_index
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn strength(&self) -> Strength {
        self.strength
    }

    pub fn touched_rail(&self) -> Rail {
        self.touched_rail
    }

    pub fn is_actionable(&self) -> bool {
        self.direction != Direction::Hold
    }

    /// Equivalence class used to match historical occurrences.
    pub fn key(&self, condition_on_strength: bool) -> SignalKey {
        SignalKey {
            direction: self.direction,
            strength: condition_on_strength.then_some(self.strength),
        }
    }
}

/// Wire form of `Signal`, validated on the way in.
#[derive(Deserialize)]
struct SignalRecord {
    bar_index: usize,
    direction: Direction,
    strength: Strength,
    touched_rail: Rail,
}

impl TryFrom<SignalRecord> for Signal {
    type Error = String;

    fn try_from(r: SignalRecord) -> Result<Self, Self::Error> {
        let signal = match (r.direction, r.touched_rail) {
            (Direction::Long, Rail::Lower) => Signal::long(r.bar_index, r.strength),
            (Direction::Short, Rail::Upper) => Signal::short(r.bar_index, r.strength),
            (Direction::Hold, Rail::None) if r.strength == Strength::Weak => {
                Signal::hold(r.bar_index)
            }
            (direction, rail) => {
                return Err(format!(
                    "inconsistent signal: direction {direction:?} with rail {rail:?} and strength {:?}",
                    r.strength
                ))
            }
        };
        Ok(signal)
    }
}

/// Which historical signals count as "the same" as the current one.
///
/// Direction fixes the touched rail. Strength is matched only when
/// `strength` is `Some`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignalKey {
    pub direction: Direction,
    pub strength: Option<Strength>,
}

impl SignalKey {
    pub fn matches(&self, signal: &Signal) -> bool {
        signal.direction == self.direction
            && self.strength.map_or(true, |s| s == signal.strength)
    }
}
