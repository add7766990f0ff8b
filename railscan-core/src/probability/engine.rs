//! Batch historical scan.
//!
//! 1. Classify every bar t in `warmup ..= as_of - horizon` with the same
//!    classifier used for the current bar. Only bars whose horizon lies
//!    fully inside `..= as_of` are eligible.
//! 2. Keep the bars whose signal matches the requested `SignalKey`.
//! 3. Replay each occurrence forward into an `OutcomeSample`.
//! 4. Fold the samples, in bar order, into a `ProbabilityEstimate`.
//!
//! Steps 1 and 3 are the O(bars × (window + horizon)) part. With
//! `parallel = true` they run on the rayon pool via order-preserving
//! `collect`, so the fold in step 4 sees the same sequence either way.
//! The cancel token is polled once per bar in both steps.

use rayon::prelude::*;
use tracing::debug;

use crate::cancel::CancelToken;
use crate::config::ProbabilityParams;
use crate::domain::PriceBar;
use crate::error::ScanError;
use crate::signal::{Direction, Signal, SignalClassifier, SignalKey};

use super::outcome::{replay_occurrence, OutcomeSample, TradeLevels};
use super::tally::fold_samples;
use super::ProbabilityEstimate;

pub struct ProbabilityEngine<C> {
    classifier: C,
    params: ProbabilityParams,
}

impl<C: SignalClassifier> ProbabilityEngine<C> {
    pub fn new(classifier: C, params: ProbabilityParams) -> Self {
        Self { classifier, params }
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn params(&self) -> &ProbabilityParams {
        &self.params
    }

    /// Last bar that can be an occurrence when evaluating at `as_of`.
    fn last_occurrence(&self, as_of: usize) -> Option<usize> {
        let last = as_of.checked_sub(self.params.horizon_bars)?;
        (last >= self.classifier.warmup_bars()).then_some(last)
    }

    /// Signals for every eligible historical bar, in bar order.
    pub fn classify_history(
        &self,
        bars: &[PriceBar],
        as_of: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<Signal>, ScanError> {
        check_as_of(bars, as_of)?;
        let Some(last) = self.last_occurrence(as_of) else {
            return Ok(Vec::new());
        };
        let history = &bars[..=as_of];
        let indices: Vec<usize> = (self.classifier.warmup_bars()..=last).collect();
        map_in_order(self.params.parallel, &indices, cancel, |t| {
            self.classifier.classify(history, t)
        })
    }

    /// Replay occurrences at `indices` for `direction`.
    pub fn replay(
        &self,
        bars: &[PriceBar],
        as_of: usize,
        indices: &[usize],
        direction: Direction,
        cancel: &CancelToken,
    ) -> Result<Vec<OutcomeSample>, ScanError> {
        check_as_of(bars, as_of)?;
        if direction == Direction::Hold {
            return Ok(Vec::new());
        }
        let history = &bars[..=as_of];
        let p = &self.params;
        map_in_order(p.parallel, indices, cancel, |t| {
            let entry = history[t].close;
            let levels = TradeLevels::new(direction, entry, p.tp_distance, p.sl_distance)?;
            Ok(replay_occurrence(
                history,
                t,
                &levels,
                p.horizon_bars,
                p.tie_break_policy,
            ))
        })
    }

    /// Probability that a `key` signal reaches TP before SL, judged on the
    /// history up to and including `as_of`.
    pub fn estimate(
        &self,
        bars: &[PriceBar],
        as_of: usize,
        key: SignalKey,
        cancel: &CancelToken,
    ) -> Result<ProbabilityEstimate, ScanError> {
        check_as_of(bars, as_of)?;
        cancel.check()?;
        if key.direction == Direction::Hold {
            return Ok(ProbabilityEstimate::empty(key));
        }

        let signals = self.classify_history(bars, as_of, cancel)?;
        let occurrences: Vec<usize> = signals
            .iter()
            .filter(|s| key.matches(s))
            .map(|s| s.bar_index())
            .collect();
        let samples = self.replay(bars, as_of, &occurrences, key.direction, cancel)?;
        let estimate = fold_samples(key, &samples);

        debug!(
            classifier = self.classifier.name(),
            as_of,
            scanned = signals.len(),
            occurrences = occurrences.len(),
            tp_first = estimate.tp_first,
            sl_first = estimate.sl_first,
            unresolved = estimate.unresolved_count,
            "historical scan complete"
        );
        Ok(estimate)
    }

    /// Estimate for an already-detected signal, honouring
    /// `condition_on_strength`.
    pub fn estimate_for(
        &self,
        bars: &[PriceBar],
        signal: &Signal,
        cancel: &CancelToken,
    ) -> Result<ProbabilityEstimate, ScanError> {
        let key = signal.key(self.params.condition_on_strength);
        self.estimate(bars, signal.bar_index(), key, cancel)
    }
}

fn check_as_of(bars: &[PriceBar], as_of: usize) -> Result<(), ScanError> {
    if as_of >= bars.len() {
        return Err(ScanError::InsufficientData {
            required: as_of + 1,
            available: bars.len(),
        });
    }
    Ok(())
}

/// Map `f` over `indices`, preserving order, optionally on the rayon pool.
fn map_in_order<T, F>(
    parallel: bool,
    indices: &[usize],
    cancel: &CancelToken,
    f: F,
) -> Result<Vec<T>, ScanError>
where
    T: Send,
    F: Fn(usize) -> Result<T, ScanError> + Sync + Send,
{
    let step = |&i: &usize| {
        cancel.check()?;
        f(i)
    };
    if parallel {
        indices.par_iter().map(step).collect()
    } else {
        indices.iter().map(step).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Distance, TieBreakPolicy};
    use crate::domain::test_support::ohlc;
    use crate::probability::{Outcome, Probability};
    use crate::signal::Strength;
    use std::collections::HashSet;

    /// Fires SHORT at a fixed set of bars, HOLD elsewhere.
    struct Scripted {
        shorts: HashSet<usize>,
        warmup: usize,
    }

    impl SignalClassifier for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        fn warmup_bars(&self) -> usize {
            self.warmup
        }
        fn classify(&self, bars: &[PriceBar], index: usize) -> Result<Signal, ScanError> {
            assert!(index < bars.len());
            Ok(if self.shorts.contains(&index) {
                Signal::short(index, Strength::Weak)
            } else {
                Signal::hold(index)
            })
        }
    }

    fn params(horizon: usize, policy: TieBreakPolicy, parallel: bool) -> ProbabilityParams {
        ProbabilityParams {
            tp_distance: Distance::percent(0.02),
            sl_distance: Distance::percent(0.01),
            horizon_bars: horizon,
            min_sample_count: 0,
            tie_break_policy: policy,
            condition_on_strength: false,
            parallel,
        }
    }

    fn short_key() -> SignalKey {
        SignalKey {
            direction: Direction::Short,
            strength: None,
        }
    }

    /// Quiet bar around 100.
    fn quiet(i: usize) -> PriceBar {
        ohlc(i, 100.0, 100.5, 99.5, 100.0)
    }

    #[test]
    fn straddling_bar_resolves_by_policy() {
        let bars = vec![quiet(0), ohlc(1, 100.0, 103.0, 97.0, 100.0), quiet(2)];
        let engine = |policy| {
            ProbabilityEngine::new(
                Scripted {
                    shorts: [0].into_iter().collect(),
                    warmup: 0,
                },
                params(1, policy, false),
            )
        };
        let cancel = CancelToken::new();

        let conservative = engine(TieBreakPolicy::Conservative)
            .replay(&bars, 2, &[0], Direction::Short, &cancel)
            .unwrap();
        assert_eq!(conservative[0].outcome, Outcome::SlFirst);

        let optimistic = engine(TieBreakPolicy::Optimistic)
            .replay(&bars, 2, &[0], Direction::Short, &cancel)
            .unwrap();
        assert_eq!(optimistic[0].outcome, Outcome::TpFirst);
    }

    #[test]
    fn unreachable_levels_fail_the_scan() {
        let bars: Vec<PriceBar> = (0..10).map(quiet).collect();
        let mut p = params(2, TieBreakPolicy::Conservative, true);
        p.tp_distance = Distance::price(150.0);
        let engine = ProbabilityEngine::new(
            Scripted {
                shorts: [1, 4].into_iter().collect(),
                warmup: 0,
            },
            p,
        );
        assert!(matches!(
            engine.estimate(&bars, 9, short_key(), &CancelToken::new()),
            Err(ScanError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn occurrences_need_a_full_horizon() {
        let bars: Vec<PriceBar> = (0..10).map(quiet).collect();
        let engine = ProbabilityEngine::new(
            Scripted {
                shorts: (0..10).collect(),
                warmup: 2,
            },
            params(3, TieBreakPolicy::Conservative, false),
        );
        let signals = engine
            .classify_history(&bars, 9, &CancelToken::new())
            .unwrap();
        let indices: Vec<usize> = signals.iter().map(|s| s.bar_index()).collect();
        assert_eq!(indices, vec![2, 3, 4, 5, 6]);

        let est = engine
            .estimate(&bars, 9, short_key(), &CancelToken::new())
            .unwrap();
        assert_eq!(est.sample_count, 0);
        assert_eq!(est.unresolved_count, 5);
        assert_eq!(est.probability, Probability::Undefined);
    }

    #[test]
    fn short_history_yields_empty_estimate() {
        let bars: Vec<PriceBar> = (0..3).map(quiet).collect();
        let engine = ProbabilityEngine::new(
            Scripted {
                shorts: HashSet::new(),
                warmup: 0,
            },
            params(5, TieBreakPolicy::Conservative, true),
        );
        let est = engine
            .estimate(&bars, 2, short_key(), &CancelToken::new())
            .unwrap();
        assert_eq!(est.sample_count, 0);
        assert_eq!(est.unresolved_count, 0);
        assert!(matches!(
            engine.estimate(&bars, 3, short_key(), &CancelToken::new()),
            Err(ScanError::InsufficientData { .. })
        ));
    }

    #[test]
    fn hold_key_is_never_scanned() {
        let bars: Vec<PriceBar> = (0..30).map(quiet).collect();
        let engine = ProbabilityEngine::new(
            Scripted {
                shorts: (0..30).collect(),
                warmup: 0,
            },
            params(3, TieBreakPolicy::Conservative, true),
        );
        let key = Signal::hold(29).key(false);
        let est = engine.estimate(&bars, 29, key, &CancelToken::new()).unwrap();
        assert_eq!(est.probability, Probability::Undefined);
        assert_eq!(est.unresolved_count, 0);
    }

    #[test]
    fn cancelled_scan_stops() {
        let bars: Vec<PriceBar> = (0..50).map(quiet).collect();
        let engine = ProbabilityEngine::new(
            Scripted {
                shorts: (0..50).collect(),
                warmup: 0,
            },
            params(5, TieBreakPolicy::Conservative, true),
        );
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            engine.estimate(&bars, 49, short_key(), &cancel),
            Err(ScanError::Cancelled)
        );
    }
}
