//! Scan configuration.
//!
//! `ScanParams` is the raw, serializable form (TOML tables `[channel]`,
//! `[signal]`, `[probability]`). `ScanConfig` is the validated form: it can
//! only be built through `ScanConfig::new`, which rejects invalid
//! combinations up front so nothing deep inside the scan has to.

use serde::{Deserialize, Serialize};

use crate::error::ScanError;

/// Whether the regression runs on raw closes or on ln(close).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceScale {
    #[default]
    Linear,
    Log,
}

/// Residual dispersion measure that sets the channel half-width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispersionMeasure {
    /// Residual standard deviation (sample, ddof=1, when the window has 3+ bars).
    #[default]
    StdDev,
    /// Largest absolute residual in the window.
    MaxResidual,
}

/// Intrabar ambiguity resolution when one bar straddles both TP and SL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TieBreakPolicy {
    /// Assume the stop was hit first.
    #[default]
    Conservative,
    /// Assume the target was hit first.
    Optimistic,
}

/// Distance of a TP or SL level from entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Distance {
    /// Fraction of the entry price (0.02 = 2%).
    Percent { value: f64 },
    /// Absolute price units.
    Price { value: f64 },
}

impl Distance {
    pub fn percent(value: f64) -> Self {
        Self::Percent { value }
    }

    pub fn price(value: f64) -> Self {
        Self::Price { value }
    }

    /// Absolute price distance for a given entry price.
    pub fn amount(&self, entry: f64) -> f64 {
        match *self {
            Self::Percent { value } => entry * value,
            Self::Price { value } => value,
        }
    }

    fn validate(&self, name: &str) -> Result<(), ScanError> {
        match *self {
            Self::Percent { value } => {
                if !(value.is_finite() && value > 0.0 && value < 1.0) {
                    return Err(ScanError::invalid_config(format!(
                        "{name} percent must be in (0, 1), got {value}"
                    )));
                }
            }
            Self::Price { value } => {
                if !(value.is_finite() && value > 0.0) {
                    return Err(ScanError::invalid_config(format!(
                        "{name} price distance must be positive and finite, got {value}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelParams {
    pub window_length: usize,
    pub price_scale: PriceScale,
    pub dispersion: DispersionMeasure,
    /// Rail offset = band_multiplier * dispersion (before the floor).
    pub band_multiplier: f64,
    /// Minimum rail offset, in fitted units (price, or log-price for `Log`).
    pub min_dispersion: f64,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            window_length: 100,
            price_scale: PriceScale::Linear,
            dispersion: DispersionMeasure::StdDev,
            band_multiplier: 2.0,
            min_dispersion: 1e-6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalParams {
    /// Fraction of the rail price within which a close counts as a touch.
    pub proximity_threshold: f64,
    /// Bars over which approach velocity is measured.
    pub velocity_lookback: usize,
    /// Minimum per-bar fractional approach speed for a STRONG signal.
    pub strong_velocity: f64,
    /// A STRONG signal must be the first touch of its rail in this many bars.
    pub touch_memory: usize,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            proximity_threshold: 0.005,
            velocity_lookback: 3,
            strong_velocity: 0.005,
            touch_memory: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbabilityParams {
    pub tp_distance: Distance,
    pub sl_distance: Distance,
    pub horizon_bars: usize,
    pub min_sample_count: usize,
    pub tie_break_policy: TieBreakPolicy,
    /// Match historical occurrences on strength as well as direction.
    pub condition_on_strength: bool,
    /// Replay occurrences on the rayon pool.
    pub parallel: bool,
}

impl Default for ProbabilityParams {
    fn default() -> Self {
        Self {
            tp_distance: Distance::percent(0.02),
            sl_distance: Distance::percent(0.01),
            horizon_bars: 20,
            min_sample_count: 20,
            tie_break_policy: TieBreakPolicy::Conservative,
            condition_on_strength: false,
            parallel: true,
        }
    }
}

/// Raw scan parameters, as read from a config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    pub channel: ChannelParams,
    pub signal: SignalParams,
    pub probability: ProbabilityParams,
}

/// Validated scan configuration, constructed once per evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ScanConfig {
    params: ScanParams,
}

impl ScanConfig {
    pub fn new(params: ScanParams) -> Result<Self, ScanError> {
        validate(&params)?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &ScanParams {
        &self.params
    }

    pub fn channel(&self) -> &ChannelParams {
        &self.params.channel
    }

    pub fn signal(&self) -> &SignalParams {
        &self.params.signal
    }

    pub fn probability(&self) -> &ProbabilityParams {
        &self.params.probability
    }

    pub fn window_length(&self) -> usize {
        self.params.channel.window_length
    }

    pub fn horizon_bars(&self) -> usize {
        self.params.probability.horizon_bars
    }

    /// Copy with parallel replay switched on or off. Parallelism never
    /// changes results, so this needs no re-validation.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.params.probability.parallel = parallel;
        self
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            params: ScanParams::default(),
        }
    }
}

fn validate(p: &ScanParams) -> Result<(), ScanError> {
    let c = &p.channel;
    if c.window_length < 2 {
        return Err(ScanError::invalid_config(format!(
            "window_length must be >= 2, got {}",
            c.window_length
        )));
    }
    if !(c.band_multiplier.is_finite() && c.band_multiplier >= 0.0) {
        return Err(ScanError::invalid_config(format!(
            "band_multiplier must be non-negative and finite, got {}",
            c.band_multiplier
        )));
    }
    if !(c.min_dispersion.is_finite() && c.min_dispersion > 0.0) {
        return Err(ScanError::invalid_config(format!(
            "min_dispersion must be positive and finite, got {}",
            c.min_dispersion
        )));
    }

    let s = &p.signal;
    if !(s.proximity_threshold.is_finite()
        && s.proximity_threshold >= 0.0
        && s.proximity_threshold < 1.0)
    {
        return Err(ScanError::invalid_config(format!(
            "proximity_threshold must be in [0, 1), got {}",
            s.proximity_threshold
        )));
    }
    if s.velocity_lookback == 0 {
        return Err(ScanError::invalid_config("velocity_lookback must be >= 1"));
    }
    if !(s.strong_velocity.is_finite() && s.strong_velocity >= 0.0) {
        return Err(ScanError::invalid_config(format!(
            "strong_velocity must be non-negative and finite, got {}",
            s.strong_velocity
        )));
    }

    let pr = &p.probability;
    pr.tp_distance.validate("tp_distance")?;
    pr.sl_distance.validate("sl_distance")?;
    if pr.horizon_bars == 0 {
        return Err(ScanError::invalid_config("horizon_bars must be >= 1"));
    }
    Ok(())
}
