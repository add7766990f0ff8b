//! SignalReport assembly.
//!
//! Pure: combines the current signal, its bar and the historical estimate
//! into the user-facing report. HOLD carries no trade levels.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::ScanConfig;
use crate::domain::PriceBar;
use crate::error::ScanError;
use crate::probability::{Probability, ProbabilityEstimate, TradeLevels};
use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalReport {
    pub signal: Signal,
    pub entry_price: f64,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
    pub probability: Probability,
    /// Resolved historical occurrences (TP_FIRST + SL_FIRST).
    pub sample_count: usize,
    pub risk_reward_ratio: Option<f64>,
    pub unresolved_count: usize,
    /// True when `sample_count` is below `min_sample_count`.
    pub low_confidence: bool,
}

impl SignalReport {
    pub fn is_actionable(&self) -> bool {
        self.signal.is_actionable()
    }
}

/// Build the report for `signal`, which fired on `bars[signal.bar_index()]`.
pub fn assemble(
    signal: Signal,
    bars: &[PriceBar],
    estimate: &ProbabilityEstimate,
    config: &ScanConfig,
) -> Result<SignalReport, ScanError> {
    let index = signal.bar_index();
    let bar = bars.get(index).ok_or(ScanError::InsufficientData {
        required: index + 1,
        available: bars.len(),
    })?;
    let entry = bar.close;
    let p = config.probability();

    if !signal.is_actionable() {
        return Ok(SignalReport {
            signal,
            entry_price: entry,
            stop_price: None,
            target_price: None,
            probability: Probability::Undefined,
            sample_count: 0,
            risk_reward_ratio: None,
            unresolved_count: 0,
            low_confidence: false,
        });
    }

    let levels = TradeLevels::new(signal.direction(), entry, p.tp_distance, p.sl_distance)?;
    if levels.stop == entry {
        return Err(ScanError::invalid_config(format!(
            "stop equals entry ({entry}); risk-reward is undefined"
        )));
    }
    let risk_reward_ratio = levels.risk_reward_ratio();

    let low_confidence = match estimate.require_min_samples(p.min_sample_count) {
        Ok(()) => false,
        Err(e) => {
            warn!(bar = index, error = %e, "low-confidence estimate");
            true
        }
    };

    Ok(SignalReport {
        signal,
        entry_price: entry,
        stop_price: Some(levels.stop),
        target_price: Some(levels.target),
        probability: estimate.probability,
        sample_count: estimate.sample_count,
        risk_reward_ratio,
        unresolved_count: estimate.unresolved_count,
        low_confidence,
    })
}
