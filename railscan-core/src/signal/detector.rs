//! Rail-touch detection and STRONG/WEAK classification.
//!
//! Touch rule at bar i (threshold th, rails projected from one channel):
//! - LONG:  close_i <= lower_i * (1 + th)  and  close_{i-1} > lower_{i-1} * (1 + th)
//! - SHORT: close_i >= upper_i * (1 - th)  and  close_{i-1} < upper_{i-1} * (1 - th)
//!
//! If both fire (narrow channel) the nearer rail wins; an exact tie is HOLD.
//!
//! Strength: approach velocity over `velocity_lookback` bars,
//! v = (close_{i-k} - close_i) / close_{i-k} / k (sign flipped for SHORT).
//! STRONG iff v >= strong_velocity and no bar in the previous `touch_memory`
//! bars of the window was already within the threshold of the same rail.

use crate::channel::RegressionChannel;
use crate::config::SignalParams;
use crate::domain::PriceBar;

use super::{Rail, Signal, Strength};

#[derive(Debug, Clone, PartialEq)]
pub struct SignalDetector {
    params: SignalParams,
}

impl SignalDetector {
    pub fn new(params: SignalParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SignalParams {
        &self.params
    }

    /// Classify bar `index` against `channel`. Reads only `bars[..=index]`.
    pub fn detect(&self, channel: &RegressionChannel, bars: &[PriceBar], index: usize) -> Signal {
        if index == 0 || index >= bars.len() {
            return Signal::hold(index);
        }
        let close = bars[index].close;
        let prev_close = bars[index - 1].close;

        let lower = channel.lower_at(index);
        let upper = channel.upper_at(index);
        let touches_lower = self.near_lower(close, lower)
            && !self.near_lower(prev_close, channel.lower_at(index - 1));
        let touches_upper = self.near_upper(close, upper)
            && !self.near_upper(prev_close, channel.upper_at(index - 1));

        let rail = match (touches_lower, touches_upper) {
            (true, false) => Rail::Lower,
            (false, true) => Rail::Upper,
            (true, true) => {
                let to_lower = (close - lower).abs();
                let to_upper = (upper - close).abs();
                if to_lower < to_upper {
                    Rail::Lower
                } else if to_upper < to_lower {
                    Rail::Upper
                } else {
                    Rail::None
                }
            }
            (false, false) => Rail::None,
        };

        match rail {
            Rail::Lower => Signal::long(index, self.strength(channel, bars, index, Rail::Lower)),
            Rail::Upper => Signal::short(index, self.strength(channel, bars, index, Rail::Upper)),
            Rail::None => Signal::hold(index),
        }
    }

    fn near_lower(&self, close: f64, lower: f64) -> bool {
        close <= lower * (1.0 + self.params.proximity_threshold)
    }

    fn near_upper(&self, close: f64, upper: f64) -> bool {
        close >= upper * (1.0 - self.params.proximity_threshold)
    }

    fn strength(
        &self,
        channel: &RegressionChannel,
        bars: &[PriceBar],
        index: usize,
        rail: Rail,
    ) -> Strength {
        let fast = self
            .approach_velocity(bars, index, rail)
            .is_some_and(|v| v >= self.params.strong_velocity);
        if fast && self.is_first_touch(channel, bars, index, rail) {
            Strength::Strong
        } else {
            Strength::Weak
        }
    }

    /// Per-bar fractional move toward `rail`; `None` without enough history.
    pub fn approach_velocity(&self, bars: &[PriceBar], index: usize, rail: Rail) -> Option<f64> {
        let k = self.params.velocity_lookback;
        if index < k || index >= bars.len() {
            return None;
        }
        let from = bars[index - k].close;
        let to = bars[index].close;
        let change = (to - from) / from / k as f64;
        match rail {
            Rail::Lower => Some(-change),
            Rail::Upper => Some(change),
            Rail::None => None,
        }
    }

    fn is_first_touch(
        &self,
        channel: &RegressionChannel,
        bars: &[PriceBar],
        index: usize,
        rail: Rail,
    ) -> bool {
        let from = index
            .saturating_sub(self.params.touch_memory)
            .max(channel.window_start_index);
        (from..index).all(|j| {
            let close = bars[j].close;
            match rail {
                Rail::Lower => !self.near_lower(close, channel.lower_at(j)),
                Rail::Upper => !self.near_upper(close, channel.upper_at(j)),
                Rail::None => true,
            }
        })
    }
}

impl Default for SignalDetector {
    fn default() -> Self {
        Self::new(SignalParams::default())
    }
}
