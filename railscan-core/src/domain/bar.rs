//! PriceBar: the fundamental market data unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// OHLCV bar. Immutable once ingested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// Returns true if any OHLC field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite())
    }

    /// Describes the first OHLCV sanity violation, if any.
    ///
    /// high >= low, high >= open/close, low <= open/close, all prices > 0,
    /// volume >= 0.
    pub fn sanity_violation(&self) -> Option<&'static str> {
        if self.is_void() {
            return Some("non-finite price");
        }
        if self.low <= 0.0 {
            return Some("non-positive price");
        }
        if self.high < self.low {
            return Some("high below low");
        }
        if self.high < self.open || self.high < self.close {
            return Some("high below open or close");
        }
        if self.low > self.open || self.low > self.close {
            return Some("low above open or close");
        }
        if self.volume.is_nan() || self.volume < 0.0 {
            return Some("negative volume");
        }
        None
    }

    pub fn is_sane(&self) -> bool {
        self.sanity_violation().is_none()
    }
}
