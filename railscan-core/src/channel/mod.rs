//! Regression channel builder.
//!
//! Fits a least-squares line to the closes (or log closes) of a trailing
//! window and offsets two parallel rails from it:
//! - Middle: fitted line
//! - Upper: middle + offset
//! - Lower: middle - offset
//!
//! offset = max(band_multiplier * dispersion, min_dispersion), so a flat
//! window still yields a channel of non-zero width.

mod levels;
mod regression;

pub use levels::{RailHint, RailLevels, SigmaRail, DEFAULT_SIGMA_MULTIPLES};

use serde::{Deserialize, Serialize};

use crate::config::{ChannelParams, PriceScale};
use crate::domain::PriceBar;
use crate::error::ScanError;
use regression::{least_squares, residual_dispersion};

/// A fitted channel, tied to the bar range that produced it.
///
/// `slope`, `intercept`, the offsets and `dispersion` are in fitted units:
/// price for `Linear`, ln(price) for `Log`. The line is parameterised on
/// the window-relative index, so `intercept` is the fitted value at
/// `window_start_index`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionChannel {
    pub window_start_index: usize,
    pub window_end_index: usize,
    pub slope: f64,
    pub intercept: f64,
    pub upper_offset: f64,
    pub lower_offset: f64,
    /// Raw residual dispersion before the multiplier and floor.
    pub dispersion: f64,
    pub price_scale: PriceScale,
}

impl RegressionChannel {
    pub fn window_len(&self) -> usize {
        self.window_end_index - self.window_start_index + 1
    }

    fn fitted_at(&self, bar_index: usize) -> f64 {
        let x = bar_index as f64 - self.window_start_index as f64;
        self.intercept + self.slope * x
    }

    fn to_price(&self, value: f64) -> f64 {
        match self.price_scale {
            PriceScale::Linear => value,
            PriceScale::Log => value.exp(),
        }
    }

    /// Price of the regression line projected to `bar_index`.
    pub fn midline_at(&self, bar_index: usize) -> f64 {
        self.to_price(self.fitted_at(bar_index))
    }

    pub fn upper_at(&self, bar_index: usize) -> f64 {
        self.to_price(self.fitted_at(bar_index) + self.upper_offset)
    }

    pub fn lower_at(&self, bar_index: usize) -> f64 {
        self.to_price(self.fitted_at(bar_index) - self.lower_offset)
    }

    /// Price of the rail `k` dispersions away from the line.
    pub fn sigma_rail_at(&self, bar_index: usize, k: f64) -> f64 {
        self.to_price(self.fitted_at(bar_index) + k * self.dispersion)
    }

    pub fn levels_at(&self, bar_index: usize) -> RailLevels {
        RailLevels {
            bar_index,
            upper: self.upper_at(bar_index),
            mid: self.midline_at(bar_index),
            lower: self.lower_at(bar_index),
        }
    }

    /// Slope as percent of price per bar.
    ///
    /// For a log fit this is the log slope times 100; for a linear fit the
    /// slope is normalised by the line's value at the window centre.
    pub fn slope_pct_per_bar(&self) -> f64 {
        match self.price_scale {
            PriceScale::Log => self.slope * 100.0,
            PriceScale::Linear => {
                let centre = self.intercept + self.slope * (self.window_len() - 1) as f64 / 2.0;
                if centre.abs() < f64::EPSILON {
                    0.0
                } else {
                    self.slope / centre * 100.0
                }
            }
        }
    }
}

/// Fit the channel over the `window_length` bars ending at `end_index`.
///
/// Fails with `InsufficientData` when fewer bars are available; the window
/// is never shrunk to fit.
pub fn build_channel(
    bars: &[PriceBar],
    end_index: usize,
    params: &ChannelParams,
) -> Result<RegressionChannel, ScanError> {
    let window = params.window_length;
    if end_index >= bars.len() {
        return Err(ScanError::InsufficientData {
            required: end_index + 1,
            available: bars.len(),
        });
    }
    if end_index + 1 < window {
        return Err(ScanError::InsufficientData {
            required: window,
            available: end_index + 1,
        });
    }
    let start = end_index + 1 - window;

    let ys: Vec<f64> = bars[start..=end_index]
        .iter()
        .map(|bar| match params.price_scale {
            PriceScale::Linear => bar.close,
            PriceScale::Log => bar.close.ln(),
        })
        .collect();

    let fit = least_squares(&ys);
    let dispersion = residual_dispersion(&ys, &fit, params.dispersion);
    let offset = (params.band_multiplier * dispersion).max(params.min_dispersion);

    Ok(RegressionChannel {
        window_start_index: start,
        window_end_index: end_index,
        slope: fit.slope,
        intercept: fit.intercept,
        upper_offset: offset,
        lower_offset: offset,
        dispersion,
        price_scale: params.price_scale,
    })
}
