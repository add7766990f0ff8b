//! RailScan Core: regression channels, rail-touch signals, historical
//! TP-before-SL probabilities.
//!
//! This crate contains the whole evaluation engine:
//! - Domain types (bars, validated series)
//! - Regression channel builder and rail projection
//! - Rail-touch signal detector with STRONG/WEAK strength
//! - Historical probability engine (batch and incremental)
//! - Report assembly and the one-shot pipeline
//! - Deterministic config/dataset fingerprints

pub mod cancel;
pub mod channel;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod probability;
pub mod report;
pub mod signal;

pub use cancel::CancelToken;
pub use channel::{build_channel, RailHint, RailLevels, RegressionChannel};
pub use config::{
    ChannelParams, DispersionMeasure, Distance, PriceScale, ProbabilityParams, ScanConfig,
    ScanParams, SignalParams, TieBreakPolicy,
};
pub use domain::{PriceBar, PriceSeries};
pub use error::ScanError;
pub use pipeline::{evaluate, evaluate_at, Evaluation};
pub use probability::{
    IncrementalScanner, Outcome, OutcomeSample, Probability, ProbabilityEngine,
    ProbabilityEstimate,
};
pub use report::{assemble, SignalReport};
pub use signal::{
    ChannelClassifier, Direction, Rail, Signal, SignalClassifier, SignalDetector, SignalKey,
    Strength,
};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything handed to rayon workers or across
    /// threads is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PriceBar>();
        require_sync::<PriceBar>();
        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();
        require_send::<RegressionChannel>();
        require_sync::<RegressionChannel>();
        require_send::<Signal>();
        require_sync::<Signal>();
        require_send::<OutcomeSample>();
        require_sync::<OutcomeSample>();
        require_send::<ProbabilityEstimate>();
        require_sync::<ProbabilityEstimate>();
        require_send::<SignalReport>();
        require_sync::<SignalReport>();
        require_send::<ScanConfig>();
        require_sync::<ScanConfig>();
        require_send::<CancelToken>();
        require_sync::<CancelToken>();
        require_send::<ScanError>();
        require_sync::<ScanError>();

        require_send::<ChannelClassifier>();
        require_sync::<ChannelClassifier>();
        require_send::<ProbabilityEngine<ChannelClassifier>>();
        require_sync::<ProbabilityEngine<ChannelClassifier>>();
        require_send::<IncrementalScanner<ChannelClassifier>>();
        require_sync::<IncrementalScanner<ChannelClassifier>>();
    }
}
