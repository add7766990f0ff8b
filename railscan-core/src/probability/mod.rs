//! Historical TP-before-SL probability.
//!
//! For a signal type, the engine finds every past bar where the same signal
//! would have fired, replays each one forward for up to `horizon_bars`, and
//! reports the fraction of resolved occurrences that hit TP first.
//!
//! probability = TP_FIRST / (TP_FIRST + SL_FIRST); UNRESOLVED occurrences are
//! counted separately and excluded from the denominator.

mod engine;
mod incremental;
mod outcome;
mod tally;
mod tie_break;

pub use engine::ProbabilityEngine;
pub use incremental::IncrementalScanner;
pub use outcome::{replay_occurrence, Outcome, OutcomeSample, TradeLevels};
pub use tally::{fold_samples, OutcomeTally};

use serde::{Deserialize, Serialize};

use crate::error::ScanError;
use crate::signal::SignalKey;

/// A probability, or an explicit marker that none could be computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Probability {
    Defined { value: f64 },
    Undefined,
}

impl Probability {
    pub fn value(&self) -> Option<f64> {
        match *self {
            Self::Defined { value } => Some(value),
            Self::Undefined => None,
        }
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined { .. })
    }
}

/// Aggregate evidence for one signal type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityEstimate {
    pub key: SignalKey,
    pub probability: Probability,
    /// TP_FIRST + SL_FIRST.
    pub sample_count: usize,
    pub unresolved_count: usize,
    pub tp_first: usize,
    pub sl_first: usize,
    /// Mean bars from entry to resolution over resolved samples.
    pub avg_bars_to_resolution: Option<f64>,
    /// Mean realised percent return over resolved samples.
    pub avg_return_pct: Option<f64>,
}

impl ProbabilityEstimate {
    /// Estimate with no samples (e.g. for HOLD, or too little history).
    pub fn empty(key: SignalKey) -> Self {
        OutcomeTally::default().into_estimate(key)
    }

    /// `Err(InsufficientSamples)` when fewer than `min` outcomes resolved.
    ///
    /// This is advisory: callers keep the estimate and flag it as low
    /// confidence instead of discarding it.
    pub fn require_min_samples(&self, min: usize) -> Result<(), ScanError> {
        if self.sample_count < min {
            Err(ScanError::InsufficientSamples {
                found: self.sample_count,
                required: min,
            })
        } else {
            Ok(())
        }
    }
}
