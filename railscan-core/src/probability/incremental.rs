//! Streaming form of the historical scan.
//!
//! Each appended bar is classified once. The occurrence at bar t is
//! replayed exactly when bar t + horizon arrives, which is the first moment
//! a batch scan would consider it, so `estimate` after N pushes matches
//! `ProbabilityEngine::estimate` on the same N bars.

use crate::cancel::CancelToken;
use crate::config::ProbabilityParams;
use crate::domain::{PriceBar, PriceSeries};
use crate::error::ScanError;
use crate::signal::{Direction, Signal, SignalClassifier, SignalKey};

use super::outcome::{replay_occurrence, OutcomeSample, TradeLevels};
use super::tally::OutcomeTally;
use super::ProbabilityEstimate;

pub struct IncrementalScanner<C> {
    classifier: C,
    params: ProbabilityParams,
    series: PriceSeries,
    /// One slot per bar; `None` before warmup.
    signals: Vec<Option<Signal>>,
    /// One slot per bar; filled once the bar's horizon has elapsed.
    samples: Vec<Option<OutcomeSample>>,
}

impl<C: SignalClassifier> IncrementalScanner<C> {
    pub fn new(classifier: C, params: ProbabilityParams) -> Self {
        Self {
            classifier,
            params,
            series: PriceSeries::empty(),
            signals: Vec::new(),
            samples: Vec::new(),
        }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn series(&self) -> &PriceSeries {
        &self.series
    }

    /// Signal of the most recent bar, if it is past warmup.
    pub fn latest_signal(&self) -> Option<Signal> {
        self.signals.last().copied().flatten()
    }

    /// Append one bar. Returns its signal once the classifier is warm.
    ///
    /// A rejected bar (out of order, malformed) leaves the scanner unchanged.
    pub fn push(&mut self, bar: PriceBar) -> Result<Option<Signal>, ScanError> {
        self.series.push(bar)?;
        let bars = self.series.bars();
        let index = bars.len() - 1;

        let signal = if index >= self.classifier.warmup_bars() {
            match self.classifier.classify(bars, index) {
                Ok(signal) => Some(signal),
                Err(e) => {
                    self.series.pop();
                    return Err(e);
                }
            }
        } else {
            None
        };
        self.signals.push(signal);
        self.samples.push(None);

        if let Some(t) = index.checked_sub(self.params.horizon_bars) {
            match self.replay_at(t) {
                Ok(sample) => self.samples[t] = sample,
                Err(e) => {
                    self.signals.pop();
                    self.samples.pop();
                    self.series.pop();
                    return Err(e);
                }
            }
        }
        Ok(signal)
    }

    /// Push every bar in order, polling `cancel` between bars.
    pub fn extend(
        &mut self,
        bars: impl IntoIterator<Item = PriceBar>,
        cancel: &CancelToken,
    ) -> Result<(), ScanError> {
        for bar in bars {
            cancel.check()?;
            self.push(bar)?;
        }
        Ok(())
    }

    fn replay_at(&self, t: usize) -> Result<Option<OutcomeSample>, ScanError> {
        let Some(signal) = self.signals[t] else {
            return Ok(None);
        };
        if signal.direction() == Direction::Hold {
            return Ok(None);
        }
        let bars = self.series.bars();
        let p = &self.params;
        let levels =
            TradeLevels::new(signal.direction(), bars[t].close, p.tp_distance, p.sl_distance)?;
        Ok(Some(replay_occurrence(
            bars,
            t,
            &levels,
            p.horizon_bars,
            p.tie_break_policy,
        )))
    }

    /// Estimate for `key` as of the latest bar.
    pub fn estimate(&self, key: SignalKey) -> Result<ProbabilityEstimate, ScanError> {
        if self.series.is_empty() {
            return Err(ScanError::InsufficientData {
                required: 1,
                available: 0,
            });
        }
        let mut tally = OutcomeTally::default();
        if key.direction == Direction::Hold {
            return Ok(tally.into_estimate(key));
        }
        for (signal, sample) in self.signals.iter().zip(&self.samples) {
            if let (Some(signal), Some(sample)) = (signal, sample) {
                if key.matches(signal) {
                    tally.push(sample, key.direction);
                }
            }
        }
        Ok(tally.into_estimate(key))
    }
}
