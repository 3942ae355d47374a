//! Hazard rate estimation from ragged historical segment data
//!
//! Training is one pass over the records into an accumulator keyed by age.
//! Segments only contribute at the ages they actually reached, so partially
//! matured cohorts (the right-censored triangle) never need a dense matrix.
//! Within an age, contributions are keyed by segment id in a `BTreeMap`, which
//! fixes the summation order and makes the result independent of input order.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::hazard::{CurvePoint, CurveVersion, HazardCurve, HazardRates, PointSource};
use super::smoothing::centered_moving_average;
use crate::config::{ExtrapolationPolicy, ModelConfig, Weighting};
use crate::error::{ForecastError, Result};
use crate::segment::ObservationRecord;

/// Parameters for one training run
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorConfig {
    /// Width of the centered moving average (1 = no smoothing)
    pub smoothing_window: usize,

    /// Contributors needed before an age is considered credible
    pub min_observation_count: usize,

    pub extrapolation: ExtrapolationPolicy,

    pub weighting: Weighting,

    /// Oldest age the curve must cover; defaults to the oldest observed age
    pub horizon: Option<u32>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for EstimatorConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            smoothing_window: config.smoothing_window,
            min_observation_count: config.min_observation_count,
            extrapolation: config.extrapolation,
            weighting: config.weighting,
            horizon: config.horizon,
        }
    }
}

/// Bookkeeping about what went into a curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub curve_version: CurveVersion,
    pub segments_processed: usize,
    pub records_used: usize,
    pub max_month_observed: u32,
    /// Σ beginning balance over every record used
    pub total_volume: f64,
    pub low_confidence_ages: usize,
}

/// One segment's flows at one age
#[derive(Debug, Default, Clone, Copy)]
struct Contribution {
    payment: f64,
    chargeoff: f64,
    balance: f64,
}

impl Contribution {
    fn ratios(&self) -> HazardRates {
        HazardRates::new(self.payment / self.balance, self.chargeoff / self.balance)
    }
}

/// Per-age accumulator of segment contributions
#[derive(Debug, Default)]
struct AgeAccumulator<'a> {
    by_segment: BTreeMap<&'a str, Contribution>,
}

impl<'a> AgeAccumulator<'a> {
    fn add(&mut self, record: &'a ObservationRecord) {
        let c = self.by_segment.entry(record.segment_id.as_str()).or_default();
        c.payment += record.payment_amount;
        c.chargeoff += record.chargeoff_amount;
        c.balance += record.beginning_balance;
    }

    /// Combined rates, or `None` if no segment carried a balance at this age
    fn aggregate(&self, age: u32, weighting: Weighting) -> Option<AgeAggregate> {
        let contributors: Vec<&Contribution> =
            self.by_segment.values().filter(|c| c.balance > 0.0).collect();
        if contributors.is_empty() {
            return None;
        }

        let n = contributors.len();
        let total_balance: f64 = contributors.iter().map(|c| c.balance).sum();

        let rates = match weighting {
            Weighting::BalanceWeighted => {
                let payments: f64 = contributors.iter().map(|c| c.payment).sum();
                let chargeoffs: f64 = contributors.iter().map(|c| c.chargeoff).sum();
                HazardRates::new(payments / total_balance, chargeoffs / total_balance)
            }
            Weighting::EqualWeighted => {
                let (p, c) = contributors.iter().fold((0.0, 0.0), |(p, c), contrib| {
                    let r = contrib.ratios();
                    (p + r.payment, c + r.chargeoff)
                });
                HazardRates::new(p / n as f64, c / n as f64)
            }
        };

        Some(AgeAggregate {
            age,
            rates,
            observation_count: n,
            total_balance,
        })
    }
}

#[derive(Debug, Clone)]
struct AgeAggregate {
    age: u32,
    rates: HazardRates,
    observation_count: usize,
    total_balance: f64,
}

/// Trains hazard curves from validated historical records
#[derive(Debug, Clone, Default)]
pub struct HazardRateEstimator {
    config: EstimatorConfig,
}

impl HazardRateEstimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(EstimatorConfig::from(config))
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Train a new curve from `is_actual` records
    pub fn train(&self, records: &[ObservationRecord]) -> Result<HazardCurve> {
        self.train_with_summary(records).map(|(curve, _)| curve)
    }

    /// Train a new curve and report what went into it
    pub fn train_with_summary(
        &self,
        records: &[ObservationRecord],
    ) -> Result<(HazardCurve, TrainingSummary)> {
        self.check_config()?;
        let cfg = &self.config;

        let mut ages: BTreeMap<u32, AgeAccumulator> = BTreeMap::new();
        let mut segments = BTreeSet::new();
        let mut records_used = 0usize;
        let mut total_volume = 0.0;

        for record in records.iter().filter(|r| r.is_actual) {
            ages.entry(record.month_on_book).or_default().add(record);
            segments.insert(record.segment_id.as_str());
            records_used += 1;
            total_volume += record.beginning_balance;
        }

        let observed: Vec<AgeAggregate> = ages
            .iter()
            .filter_map(|(&age, acc)| acc.aggregate(age, cfg.weighting))
            .collect();

        let (Some(first), Some(last)) = (observed.first(), observed.last()) else {
            return Err(ForecastError::InsufficientData { age: 0 });
        };
        let (first_age, last_age) = (first.age, last.age);

        let smoothed = smooth(&observed, cfg.smoothing_window);
        let index: BTreeMap<u32, usize> =
            observed.iter().enumerate().map(|(i, agg)| (agg.age, i)).collect();

        let max_age = cfg.horizon.map_or(last_age, |h| h.max(last_age));
        let mut points = Vec::with_capacity(max_age as usize + 1);

        for age in 0..=max_age {
            if let Some(&i) = index.get(&age) {
                let agg = &observed[i];
                points.push(CurvePoint {
                    age,
                    payment_rate: smoothed[i].payment,
                    chargeoff_rate: smoothed[i].chargeoff,
                    raw_payment_rate: Some(agg.rates.payment),
                    raw_chargeoff_rate: Some(agg.rates.chargeoff),
                    observation_count: agg.observation_count,
                    total_balance: agg.total_balance,
                    source: PointSource::Observed,
                    low_confidence: agg.observation_count < cfg.min_observation_count,
                });
                continue;
            }

            if !cfg.extrapolation.is_enabled() {
                return Err(ForecastError::InsufficientData { age });
            }

            let (rates, source) = if age < first_age {
                (smoothed[0], PointSource::Backfilled)
            } else if age < last_age {
                (interpolate(age, &index, &smoothed), PointSource::Interpolated)
            } else {
                let factor = cfg
                    .extrapolation
                    .factor(age - last_age)
                    .ok_or(ForecastError::InsufficientData { age })?;
                (smoothed[smoothed.len() - 1].scaled(factor), PointSource::Extrapolated)
            };

            debug!("age {age} has no observations, filled as {source:?}");
            points.push(filled_point(age, rates, source));
        }

        let low_confidence_ages = points.iter().filter(|p| p.low_confidence).count();

        let curve = HazardCurve::new(
            points,
            cfg.extrapolation,
            last_age,
            cfg.weighting,
            cfg.smoothing_window,
            cfg.min_observation_count,
        );

        info!(
            "trained hazard curve {} from {} segment(s), {} record(s): ages 0..={} ({} observed, {} low-confidence)",
            curve.version(),
            segments.len(),
            records_used,
            max_age,
            observed.len(),
            low_confidence_ages
        );

        let summary = TrainingSummary {
            curve_version: curve.version(),
            segments_processed: segments.len(),
            records_used,
            max_month_observed: last_age,
            total_volume,
            low_confidence_ages,
        };

        Ok((curve, summary))
    }

    fn check_config(&self) -> Result<()> {
        if self.config.smoothing_window == 0 {
            return Err(ForecastError::configuration("smoothing_window must be at least 1"));
        }
        if let ExtrapolationPolicy::ExponentialDecay { k } = self.config.extrapolation {
            if !(k.is_finite() && k >= 0.0) {
                return Err(ForecastError::configuration(format!(
                    "decay k must be finite and non-negative, got {k}"
                )));
            }
        }
        Ok(())
    }
}

/// Smooth payment and charge-off sequences independently, then bound them
fn smooth(observed: &[AgeAggregate], window: usize) -> Vec<HazardRates> {
    let payments: Vec<(u32, f64)> = observed.iter().map(|a| (a.age, a.rates.payment)).collect();
    let chargeoffs: Vec<(u32, f64)> = observed.iter().map(|a| (a.age, a.rates.chargeoff)).collect();

    centered_moving_average(&payments, window)
        .into_iter()
        .zip(centered_moving_average(&chargeoffs, window))
        .map(|(p, c)| HazardRates::new(p, c).clipped())
        .collect()
}

/// Linear interpolation between the nearest observed ages either side
fn interpolate(age: u32, index: &BTreeMap<u32, usize>, smoothed: &[HazardRates]) -> HazardRates {
    let below = index.range(..age).next_back();
    let above = index.range(age..).next();
    match (below, above) {
        (Some((&lo, &i)), Some((&hi, &j))) => {
            let w = (age - lo) as f64 / (hi - lo) as f64;
            smoothed[j].blend(smoothed[i], w)
        }
        (Some((_, &i)), None) => smoothed[i],
        (None, Some((_, &j))) => smoothed[j],
        (None, None) => HazardRates::default(),
    }
}

fn filled_point(age: u32, rates: HazardRates, source: PointSource) -> CurvePoint {
    CurvePoint {
        age,
        payment_rate: rates.payment,
        chargeoff_rate: rates.chargeoff,
        raw_payment_rate: None,
        raw_chargeoff_rate: None,
        observation_count: 0,
        total_balance: 0.0,
        source,
        low_confidence: true,
    }
}
