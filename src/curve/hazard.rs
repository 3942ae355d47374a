//! Immutable hazard curve produced by a training run

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{ExtrapolationPolicy, Weighting};
use crate::error::{ForecastError, Result};

static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

/// Identity of one training run's output
///
/// Ids come from a process-wide counter: they are unique and increasing
/// within one process, in creation order. They are not derived from the
/// curve's contents and are not reproducible across runs, so a persisted id
/// only identifies a curve alongside the run that produced it. Compare rates
/// with [`HazardCurve::same_rates_as`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CurveVersion(u64);

impl CurveVersion {
    fn next() -> Self {
        CurveVersion(NEXT_VERSION.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CurveVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Payment and charge-off hazard rates for one month
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HazardRates {
    pub payment: f64,
    pub chargeoff: f64,
}

impl HazardRates {
    pub fn new(payment: f64, chargeoff: f64) -> Self {
        Self { payment, chargeoff }
    }

    pub fn total(&self) -> f64 {
        self.payment + self.chargeoff
    }

    /// Clamp each rate to [0, 1] and scale both down so they sum to at most 1
    pub fn clipped(self) -> Self {
        let clamp = |r: f64| if r.is_nan() { 0.0 } else { r.clamp(0.0, 1.0) };
        let payment = clamp(self.payment);
        let chargeoff = clamp(self.chargeoff);
        let total = payment + chargeoff;
        if total > 1.0 {
            Self::new(payment / total, chargeoff / total)
        } else {
            Self::new(payment, chargeoff)
        }
    }

    pub fn scaled(self, factor: f64) -> Self {
        Self::new(self.payment * factor, self.chargeoff * factor)
    }

    /// `weight * self + (1 - weight) * other`
    pub fn blend(self, other: Self, weight: f64) -> Self {
        Self::new(
            weight * self.payment + (1.0 - weight) * other.payment,
            weight * self.chargeoff + (1.0 - weight) * other.chargeoff,
        )
    }
}

/// Where a curve point's rates came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointSource {
    /// Aggregated (and smoothed) from historical records
    Observed,
    /// Before the first observed age, carries the first observed rate
    Backfilled,
    /// Interior age without observations, linear between neighbours
    Interpolated,
    /// Past the last observed age, per the extrapolation policy
    Extrapolated,
    /// Rates handed in directly rather than trained
    Supplied,
}

/// Curve value at one loan age
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub age: u32,

    /// Smoothed (or filled) payment hazard rate
    pub payment_rate: f64,

    /// Smoothed (or filled) charge-off hazard rate
    pub chargeoff_rate: f64,

    /// Unsmoothed aggregate rates, present only for observed ages
    pub raw_payment_rate: Option<f64>,
    pub raw_chargeoff_rate: Option<f64>,

    /// Distinct segments contributing at this age
    pub observation_count: usize,

    /// Σ beginning balance across contributors
    pub total_balance: f64,

    pub source: PointSource,

    /// Fewer contributors than the configured minimum
    pub low_confidence: bool,
}

impl CurvePoint {
    pub fn rates(&self) -> HazardRates {
        HazardRates::new(self.payment_rate, self.chargeoff_rate)
    }
}

/// Frozen mapping from loan age to hazard rates
///
/// Points are stored densely from age 0 through `max_age()`. Ages past the
/// stored domain are answered from the last observed age using the curve's
/// own extrapolation policy. A curve never changes after training; retraining
/// produces a new instance with a new version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardCurve {
    version: CurveVersion,
    points: Vec<CurvePoint>,
    extrapolation: ExtrapolationPolicy,
    /// Last observed age, the anchor for extrapolation
    anchor_age: u32,
    weighting: Weighting,
    smoothing_window: usize,
    min_observation_count: usize,
}

impl HazardCurve {
    pub(crate) fn new(
        points: Vec<CurvePoint>,
        extrapolation: ExtrapolationPolicy,
        anchor_age: u32,
        weighting: Weighting,
        smoothing_window: usize,
        min_observation_count: usize,
    ) -> Self {
        debug_assert!(points.iter().enumerate().all(|(i, p)| p.age as usize == i));
        Self {
            version: CurveVersion::next(),
            points,
            extrapolation,
            anchor_age,
            weighting,
            smoothing_window,
            min_observation_count,
        }
    }

    /// Build a curve from rates supplied per age (index = age)
    pub fn from_rates(rates: &[HazardRates], extrapolation: ExtrapolationPolicy) -> Result<Self> {
        if rates.is_empty() {
            return Err(ForecastError::InsufficientData { age: 0 });
        }
        let points = rates
            .iter()
            .enumerate()
            .map(|(age, r)| {
                let r = r.clipped();
                CurvePoint {
                    age: age as u32,
                    payment_rate: r.payment,
                    chargeoff_rate: r.chargeoff,
                    raw_payment_rate: None,
                    raw_chargeoff_rate: None,
                    observation_count: 0,
                    total_balance: 0.0,
                    source: PointSource::Supplied,
                    low_confidence: false,
                }
            })
            .collect();
        let anchor_age = (rates.len() - 1) as u32;
        Ok(Self::new(points, extrapolation, anchor_age, Weighting::BalanceWeighted, 1, 0))
    }

    pub fn version(&self) -> CurveVersion {
        self.version
    }

    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    pub fn point(&self, age: u32) -> Option<&CurvePoint> {
        self.points.get(age as usize)
    }

    /// Oldest age stored densely in the curve
    pub fn max_age(&self) -> u32 {
        self.points.len().saturating_sub(1) as u32
    }

    pub fn max_observed_age(&self) -> u32 {
        self.anchor_age
    }

    pub fn extrapolation(&self) -> ExtrapolationPolicy {
        self.extrapolation
    }

    pub fn weighting(&self) -> Weighting {
        self.weighting
    }

    pub fn smoothing_window(&self) -> usize {
        self.smoothing_window
    }

    pub fn min_observation_count(&self) -> usize {
        self.min_observation_count
    }

    /// Whether `age` can be answered, inside the domain or by extrapolation
    pub fn covers(&self, age: u32) -> bool {
        age <= self.max_age() || self.extrapolation.is_enabled()
    }

    /// Hazard rates at `age`
    pub fn rates_at(&self, age: u32) -> Result<HazardRates> {
        if let Some(point) = self.point(age) {
            return Ok(point.rates());
        }

        self.point(self.anchor_age)
            .zip(self.extrapolation.factor(age.saturating_sub(self.anchor_age)))
            .map(|(anchor, factor)| anchor.rates().scaled(factor))
            .ok_or(ForecastError::CurveMismatch {
                age,
                max_age: self.max_age(),
            })
    }

    /// Same rates at every age, ignoring version
    pub fn same_rates_as(&self, other: &HazardCurve) -> bool {
        self.points == other.points
    }
}
