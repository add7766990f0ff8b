//! Bar classification seam used by the historical scan.
//!
//! The probability engine asks a `SignalClassifier` what signal each past bar
//! would have produced. The production implementation refits the channel on
//! the window ending at that bar and runs the detector, so historical
//! occurrences use exactly the rule applied to the current bar.

use crate::channel::{build_channel, RegressionChannel};
use crate::config::{ChannelParams, ScanConfig};
use crate::domain::PriceBar;
use crate::error::ScanError;

use super::{Signal, SignalDetector};

/// Trait for point-in-time bar classifiers.
///
/// # Look-ahead guard
/// `classify(bars, i)` must only read `bars[..=i]`. Classifying a truncated
/// series and the full series must agree on every shared bar.
pub trait SignalClassifier: Send + Sync {
    /// Human-readable name (e.g., "regression_channel").
    fn name(&self) -> &str;

    /// Index of the first bar that can be classified.
    fn warmup_bars(&self) -> usize;

    /// The signal bar `index` produces.
    fn classify(&self, bars: &[PriceBar], index: usize) -> Result<Signal, ScanError>;
}

/// Regression channel + rail-touch detector.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelClassifier {
    channel: ChannelParams,
    detector: SignalDetector,
}

impl ChannelClassifier {
    pub fn new(config: &ScanConfig) -> Self {
        Self {
            channel: config.channel().clone(),
            detector: SignalDetector::new(config.signal().clone()),
        }
    }

    /// The channel ending at `index` and the signal it produces.
    pub fn evaluate(
        &self,
        bars: &[PriceBar],
        index: usize,
    ) -> Result<(RegressionChannel, Signal), ScanError> {
        let channel = build_channel(bars, index, &self.channel)?;
        let signal = self.detector.detect(&channel, bars, index);
        Ok((channel, signal))
    }
}

impl SignalClassifier for ChannelClassifier {
    fn name(&self) -> &str {
        "regression_channel"
    }

    fn warmup_bars(&self) -> usize {
        self.channel.window_length - 1
    }

    fn classify(&self, bars: &[PriceBar], index: usize) -> Result<Signal, ScanError> {
        self.evaluate(bars, index).map(|(_, signal)| signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanParams;
    use crate::domain::test_support::bars_from_closes;

    fn config(window_length: usize) -> ScanConfig {
        let mut params = ScanParams::default();
        params.channel.window_length = window_length;
        ScanConfig::new(params).unwrap()
    }

    fn zigzag(n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| 100.0 + 8.0 * ((i as f64) * 0.7).sin() + 0.1 * i as f64)
            .collect()
    }

    #[test]
    fn warmup_is_window_minus_one() {
        assert_eq!(ChannelClassifier::new(&config(20)).warmup_bars(), 19);
    }

    #[test]
    fn classify_before_warmup_fails() {
        let bars = bars_from_closes(&zigzag(30));
        let classifier = ChannelClassifier::new(&config(20));
        assert!(matches!(
            classifier.classify(&bars, 10),
            Err(ScanError::InsufficientData { .. })
        ));
    }

    #[test]
    fn truncated_series_agrees_with_full_series() {
        let bars = bars_from_closes(&zigzag(120));
        let classifier = ChannelClassifier::new(&config(20));
        for i in classifier.warmup_bars()..bars.len() {
            let full = classifier.classify(&bars, i).unwrap();
            let truncated = classifier.classify(&bars[..=i], i).unwrap();
            assert_eq!(full, truncated, "look-ahead at bar {i}");
        }
    }
}
