//! One-shot evaluation of the latest bar.
//!
//! Channel -> Signal -> Probability -> Report, with every stage seeing only
//! bars up to the evaluated one.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cancel::CancelToken;
use crate::channel::RegressionChannel;
use crate::config::ScanConfig;
use crate::domain::{PriceBar, PriceSeries};
use crate::error::ScanError;
use crate::probability::{ProbabilityEngine, ProbabilityEstimate};
use crate::report::{assemble, SignalReport};
use crate::signal::{ChannelClassifier, Signal};

/// Everything produced while evaluating one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub channel: RegressionChannel,
    pub signal: Signal,
    pub estimate: ProbabilityEstimate,
    pub report: SignalReport,
}

/// Evaluate the last bar of `series`.
pub fn evaluate(
    series: &PriceSeries,
    config: &ScanConfig,
    cancel: &CancelToken,
) -> Result<Evaluation, ScanError> {
    let as_of = series.last_index().ok_or(ScanError::InsufficientData {
        required: config.window_length(),
        available: 0,
    })?;
    evaluate_at(series.bars(), as_of, config, cancel)
}

/// Evaluate bar `as_of`, ignoring every later bar.
pub fn evaluate_at(
    bars: &[PriceBar],
    as_of: usize,
    config: &ScanConfig,
    cancel: &CancelToken,
) -> Result<Evaluation, ScanError> {
    if as_of >= bars.len() {
        return Err(ScanError::InsufficientData {
            required: as_of + 1,
            available: bars.len(),
        });
    }
    let history = &bars[..=as_of];

    let classifier = ChannelClassifier::new(config);
    let (channel, signal) = classifier.evaluate(history, as_of)?;
    let engine = ProbabilityEngine::new(classifier, config.probability().clone());
    let estimate = engine.estimate_for(history, &signal, cancel)?;
    let report = assemble(signal, history, &estimate, config)?;

    debug!(
        as_of,
        direction = ?signal.direction(),
        strength = ?signal.strength(),
        samples = estimate.sample_count,
        "bar evaluated"
    );
    Ok(Evaluation {
        channel,
        signal,
        estimate,
        report,
    })
}
