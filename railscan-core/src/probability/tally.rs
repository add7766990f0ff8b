//! Folding outcome samples into an estimate.
//!
//! Samples are folded in bar order. Counts are integers and the float
//! sums are accumulated in a fixed order, so the estimate is bit-identical
//! however the samples were produced.

use crate::signal::{Direction, SignalKey};

use super::outcome::{Outcome, OutcomeSample};
use super::{Probability, ProbabilityEstimate};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OutcomeTally {
    pub tp_first: usize,
    pub sl_first: usize,
    pub unresolved: usize,
    bars_to_resolution_sum: u64,
    return_pct_sum: f64,
}

impl OutcomeTally {
    pub fn push(&mut self, sample: &OutcomeSample, direction: Direction) {
        match sample.outcome {
            Outcome::TpFirst => self.tp_first += 1,
            Outcome::SlFirst => self.sl_first += 1,
            Outcome::Unresolved => {
                self.unresolved += 1;
                return;
            }
        }
        if let Some(bars) = sample.bars_to_resolution {
            self.bars_to_resolution_sum += bars as u64;
        }
        if let Some(ret) = sample.return_pct(direction) {
            self.return_pct_sum += ret;
        }
    }

    /// Append `other`, which must cover later bars than `self`.
    pub fn merge(&mut self, other: &OutcomeTally) {
        self.tp_first += other.tp_first;
        self.sl_first += other.sl_first;
        self.unresolved += other.unresolved;
        self.bars_to_resolution_sum += other.bars_to_resolution_sum;
        self.return_pct_sum += other.return_pct_sum;
    }

    pub fn resolved(&self) -> usize {
        self.tp_first + self.sl_first
    }

    pub fn into_estimate(self, key: SignalKey) -> ProbabilityEstimate {
        let resolved = self.resolved();
        let (probability, avg_bars, avg_ret) = if resolved == 0 {
            (Probability::Undefined, None, None)
        } else {
            let n = resolved as f64;
            (
                Probability::Defined {
                    value: self.tp_first as f64 / n,
                },
                Some(self.bars_to_resolution_sum as f64 / n),
                Some(self.return_pct_sum / n),
            )
        };
        ProbabilityEstimate {
            key,
            probability,
            sample_count: resolved,
            unresolved_count: self.unresolved,
            tp_first: self.tp_first,
            sl_first: self.sl_first,
            avg_bars_to_resolution: avg_bars,
            avg_return_pct: avg_ret,
        }
    }
}

/// Fold `samples` (in order) into an estimate for `key`.
pub fn fold_samples<'a>(
    key: SignalKey,
    samples: impl IntoIterator<Item = &'a OutcomeSample>,
) -> ProbabilityEstimate {
    let mut tally = OutcomeTally::default();
    for sample in samples {
        tally.push(sample, key.direction);
    }
    tally.into_estimate(key)
}
