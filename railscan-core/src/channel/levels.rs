//! Rail prices projected at a single bar, and nearest support/resistance.

use serde::{Deserialize, Serialize};

use super::RegressionChannel;

/// Dispersion multiples at which sigma rails are drawn.
pub const DEFAULT_SIGMA_MULTIPLES: [f64; 5] = [-2.0, -1.0, 0.0, 1.0, 2.0];

/// Upper/mid/lower rail prices at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RailLevels {
    pub bar_index: usize,
    pub upper: f64,
    pub mid: f64,
    pub lower: f64,
}

impl RailLevels {
    /// Where `price` sits in the channel: 0.0 at the lower rail, 1.0 at the upper.
    pub fn position_of(&self, price: f64) -> f64 {
        let width = self.upper - self.lower;
        if width <= 0.0 {
            return 0.5;
        }
        (price - self.lower) / width
    }
}

/// One rail at `k` dispersions from the regression line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmaRail {
    pub k: f64,
    pub price: f64,
}

/// Nearest support (at or below price) and resistance (at or above price).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RailHint {
    pub support_k: f64,
    pub support: f64,
    pub resist_k: f64,
    pub resist: f64,
    pub mid: f64,
}

impl RailHint {
    /// Pick the closest sigma rails around `price` at `bar_index`.
    ///
    /// If no rail lies below the price the lowest rail is the support, and
    /// symmetrically for resistance. Returns `None` when `multiples` is empty.
    pub fn nearest(
        channel: &RegressionChannel,
        bar_index: usize,
        price: f64,
        multiples: &[f64],
    ) -> Option<Self> {
        let mut rails: Vec<SigmaRail> = multiples
            .iter()
            .map(|&k| SigmaRail {
                k,
                price: channel.sigma_rail_at(bar_index, k),
            })
            .collect();
        rails.sort_by(|a, b| a.k.total_cmp(&b.k));
        let lowest = *rails.first()?;
        let highest = *rails.last()?;

        let support = rails
            .iter()
            .filter(|r| r.price <= price)
            .max_by(|a, b| a.price.total_cmp(&b.price))
            .copied()
            .unwrap_or(lowest);
        let resist = rails
            .iter()
            .filter(|r| r.price >= price)
            .min_by(|a, b| a.price.total_cmp(&b.price))
            .copied()
            .unwrap_or(highest);

        Some(Self {
            support_k: support.k,
            support: support.price,
            resist_k: resist.k,
            resist: resist.price,
            mid: channel.midline_at(bar_index),
        })
    }
}
