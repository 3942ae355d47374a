//! Model configuration surface
//!
//! A single serde struct supplied by the caller (or read from JSON by the `io`
//! collaborator). Each stage derives its own narrower config from it.

use serde::{Deserialize, Serialize};

use crate::error::{ForecastError, Result};

/// How the curve is carried past the last observed age
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExtrapolationPolicy {
    /// No filling of any kind; missing ages are an error
    Disabled,
    /// Carry the last smoothed rate forward unchanged
    Constant,
    /// rate(t) = rate(last) * exp(-k * (t - last))
    ExponentialDecay { k: f64 },
}

impl ExtrapolationPolicy {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, ExtrapolationPolicy::Disabled)
    }

    /// Multiplier applied to the anchor rate `months_past` months beyond it
    pub fn factor(&self, months_past: u32) -> Option<f64> {
        match self {
            ExtrapolationPolicy::Disabled => None,
            ExtrapolationPolicy::Constant => Some(1.0),
            ExtrapolationPolicy::ExponentialDecay { k } => Some((-k * months_past as f64).exp()),
        }
    }
}

/// How per-segment observations at one age are combined into a rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Weighting {
    /// Σ amount / Σ beginning balance, so large segments dominate
    BalanceWeighted,
    /// Simple mean of per-segment ratios
    EqualWeighted,
}

/// What the segment-specific side of the blend is anchored on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStrategy {
    /// Balance-weighted realized rate over the recent window
    RecentLevel,
    /// Trained curve scaled by the recent actual-to-expected ratio
    ScaledCurve,
}

/// What the pipeline does with records that fail validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusionPolicy {
    /// Any error-severity issue fails the call
    Abort,
    /// Drop the failing records and carry on with the rest
    ExcludeRecords,
}

/// Complete configuration for a training + forecast run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Width of the centered moving average applied to raw rates
    pub smoothing_window: usize,

    /// Segments needed at an age before its rate is considered credible
    pub min_observation_count: usize,

    pub extrapolation: ExtrapolationPolicy,

    pub weighting: Weighting,

    /// Relative variance above which an age is flagged
    pub materiality_threshold: f64,

    /// Months over which the forecast moves from actual to trained rates
    pub ramp_months: u32,

    /// Trailing actual months used for the segment's recent rate level
    pub recent_window: usize,

    pub transfer_strategy: TransferStrategy,

    /// Absolute tolerance on balance arithmetic (currency units)
    pub balance_tolerance: f64,

    /// Relative slack on payment + charge-off against beginning balance
    pub rate_tolerance: f64,

    pub exclusion: ExclusionPolicy,

    /// Requested curve domain; defaults to the oldest observed age
    pub horizon: Option<u32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 3,
            min_observation_count: 2,
            extrapolation: ExtrapolationPolicy::Constant,
            weighting: Weighting::BalanceWeighted,
            materiality_threshold: 0.10,
            ramp_months: 6,
            recent_window: 3,
            transfer_strategy: TransferStrategy::RecentLevel,
            balance_tolerance: 0.01,
            rate_tolerance: 1e-6,
            exclusion: ExclusionPolicy::Abort,
            horizon: None,
        }
    }
}

impl ModelConfig {
    /// Parse a JSON document and validate it
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ModelConfig = serde_json::from_str(json)
            .map_err(|e| ForecastError::configuration(format!("malformed config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every parameter before any computation starts
    pub fn validate(&self) -> Result<()> {
        if self.smoothing_window == 0 {
            return Err(ForecastError::configuration("smoothing_window must be at least 1"));
        }
        if self.ramp_months == 0 {
            return Err(ForecastError::configuration("ramp_months must be at least 1"));
        }
        if self.recent_window == 0 {
            return Err(ForecastError::configuration("recent_window must be at least 1"));
        }
        non_negative("materiality_threshold", self.materiality_threshold)?;
        non_negative("balance_tolerance", self.balance_tolerance)?;
        non_negative("rate_tolerance", self.rate_tolerance)?;
        if let ExtrapolationPolicy::ExponentialDecay { k } = self.extrapolation {
            non_negative("decay k", k)?;
        }
        Ok(())
    }
}

fn non_negative(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ForecastError::configuration(format!(
            "{name} must be a finite non-negative number, got {value}"
        )))
    }
}
