//! Error taxonomy for the scan pipeline.
//!
//! Every variant except `OutOfOrderData` is locally recoverable. Out-of-order
//! input is fatal to the current evaluation: the caller must re-supply a
//! corrected series.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("insufficient data: need {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error(
        "out-of-order data at bar {index}: timestamp {current} does not follow {previous}"
    )]
    OutOfOrderData {
        index: usize,
        previous: DateTime<Utc>,
        current: DateTime<Utc>,
    },

    #[error("insufficient samples: {found} resolved outcomes, {required} required")]
    InsufficientSamples { found: usize, required: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("invalid bar at index {index}: {reason}")]
    InvalidBar { index: usize, reason: String },

    #[error("scan cancelled")]
    Cancelled,
}

impl ScanError {
    /// True when the current evaluation cannot continue on this input.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::OutOfOrderData { .. })
    }

    pub(crate) fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}
