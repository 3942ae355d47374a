//! Transfer of a trained curve onto one segment's realized performance
//!
//! The engine compares each actual month to the curve, then builds a
//! segment-specific forward curve. Right after the last actual month the
//! segment's own recent experience carries `credibility` weight, which
//! decays linearly over `ramp_months` until the trained curve takes over.

use log::{debug, info, warn};
use std::collections::BTreeMap;

use super::blended::{BlendedCurve, BlendedPoint};
use super::variance::{RateVariance, VarianceReport, VarianceRow};
use crate::config::{ModelConfig, TransferStrategy};
use crate::curve::{HazardCurve, HazardRates};
use crate::error::{ForecastError, Result};
use crate::forecast::Provenance;
use crate::segment::ObservationRecord;

/// Parameters for transferring a curve onto a segment
#[derive(Debug, Clone, PartialEq)]
pub struct TransferConfig {
    /// Relative variance above which an age is flagged
    pub materiality_threshold: f64,

    /// Months for the blend to hand over fully to the trained curve
    pub ramp_months: u32,

    /// Trailing actual months that define the segment's recent level
    pub recent_window: usize,

    pub strategy: TransferStrategy,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for TransferConfig {
    fn from(config: &ModelConfig) -> Self {
        Self {
            materiality_threshold: config.materiality_threshold,
            ramp_months: config.ramp_months,
            recent_window: config.recent_window,
            strategy: config.transfer_strategy,
        }
    }
}

/// Result of one transfer call
#[derive(Debug, Clone, PartialEq)]
pub struct TransferOutcome {
    pub variance_report: VarianceReport,
    pub blended_curve: BlendedCurve,
}

/// Segment-specific rate level derived from the recent window
#[derive(Debug, Clone, Copy)]
enum SegmentLevel {
    /// Balance-weighted realized rates, applied flat
    Recent(HazardRates),
    /// Realized / expected ratios applied to the curve's shape
    Scaled { payment: f64, chargeoff: f64 },
}

impl SegmentLevel {
    fn rates(&self, curve_rates: HazardRates) -> HazardRates {
        match *self {
            SegmentLevel::Recent(rates) => rates,
            SegmentLevel::Scaled { payment, chargeoff } => HazardRates::new(
                curve_rates.payment * payment,
                curve_rates.chargeoff * chargeoff,
            ),
        }
    }
}

/// One month of a segment's actuals, summed over repeated rows for that age
#[derive(Debug, Clone, Copy, PartialEq)]
struct MonthActual {
    age: u32,
    beginning_balance: f64,
    payment_amount: f64,
    chargeoff_amount: f64,
}

impl MonthActual {
    fn rates(&self) -> Option<HazardRates> {
        (self.beginning_balance > 0.0).then(|| {
            HazardRates::new(
                self.payment_amount / self.beginning_balance,
                self.chargeoff_amount / self.beginning_balance,
            )
        })
    }
}

/// Actual rows grouped by age, ascending
fn months_on_book(actuals: &[ObservationRecord]) -> Vec<MonthActual> {
    let mut by_age: BTreeMap<u32, MonthActual> = BTreeMap::new();
    for record in actuals.iter().filter(|r| r.is_actual) {
        let month = by_age.entry(record.month_on_book).or_insert(MonthActual {
            age: record.month_on_book,
            beginning_balance: 0.0,
            payment_amount: 0.0,
            chargeoff_amount: 0.0,
        });
        month.beginning_balance += record.beginning_balance;
        month.payment_amount += record.payment_amount;
        month.chargeoff_amount += record.chargeoff_amount;
    }
    by_age.into_values().collect()
}

/// Reconciles segment actuals against a shared trained curve
#[derive(Debug, Clone, Default)]
pub struct CurveTransferEngine {
    config: TransferConfig,
}

impl CurveTransferEngine {
    pub fn new(config: TransferConfig) -> Self {
        Self { config }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(TransferConfig::from(config))
    }

    pub fn config(&self) -> &TransferConfig {
        &self.config
    }

    /// Compute the variance report and the blended curve through `horizon`.
    ///
    /// `actuals` must belong to a single segment; non-actual rows are ignored.
    /// Rows sharing an age are summed into one month. An empty slice describes
    /// a brand-new segment and yields the pure curve.
    pub fn transfer(
        &self,
        actuals: &[ObservationRecord],
        curve: &HazardCurve,
        horizon: u32,
    ) -> Result<TransferOutcome> {
        self.check_config()?;
        let segment_id = single_segment_id(actuals)?;

        let segment_name = segment_id.unwrap_or_default();
        let observed = months_on_book(actuals);

        let variance_report = self.variance(segment_name, &observed, curve)?;

        let realized: BTreeMap<u32, HazardRates> = observed
            .iter()
            .filter_map(|m| Some((m.age, m.rates()?)))
            .collect();

        let last_actual_age = observed.last().map(|m| m.age);
        let level = self.segment_level(&observed, curve)?;
        let credibility = match level {
            Some(_) => (observed.len() as f64 / self.config.ramp_months as f64).min(1.0),
            None => 0.0,
        };

        let max_age = horizon.max(last_actual_age.unwrap_or(0));
        let mut points = Vec::with_capacity(max_age as usize + 1);

        for age in 0..=max_age {
            let curve_rates = curve.rates_at(age)?;

            let point = match last_actual_age {
                Some(last) if age <= last => match realized.get(&age) {
                    Some(rates) => BlendedPoint {
                        age,
                        payment_rate: rates.clipped().payment,
                        chargeoff_rate: rates.clipped().chargeoff,
                        curve_rates,
                        actual_weight: 1.0,
                        provenance: Provenance::Actual,
                    },
                    // gap or zero-balance month inside the history
                    None => pure_curve(age, curve_rates),
                },
                _ => {
                    let months_after = match last_actual_age {
                        Some(last) => age - last,
                        None => age + 1,
                    };
                    let weight = self.ramp_weight(credibility, months_after);
                    match level {
                        Some(level) if weight > 0.0 => {
                            let rates = level.rates(curve_rates).blend(curve_rates, weight).clipped();
                            BlendedPoint {
                                age,
                                payment_rate: rates.payment,
                                chargeoff_rate: rates.chargeoff,
                                curve_rates,
                                actual_weight: weight,
                                provenance: Provenance::Blended,
                            }
                        }
                        _ => pure_curve(age, curve_rates),
                    }
                }
            };
            points.push(point);
        }

        let blended_curve = BlendedCurve::new(
            segment_name,
            curve.version(),
            credibility,
            last_actual_age,
            points,
        )?;

        info!(
            "transferred curve {} onto segment '{}': {} actual month(s), credibility {:.2}, {} significant variance(s)",
            curve.version(),
            segment_name,
            observed.len(),
            credibility,
            variance_report.significant().count()
        );

        Ok(TransferOutcome {
            variance_report,
            blended_curve,
        })
    }

    /// Weight on segment experience `months_after` months past the last actual (1-based)
    pub fn ramp_weight(&self, credibility: f64, months_after: u32) -> f64 {
        let ramp = self.config.ramp_months as f64;
        let decay = (1.0 - (months_after.saturating_sub(1)) as f64 / ramp).max(0.0);
        credibility * decay
    }

    fn variance(
        &self,
        segment_id: &str,
        observed: &[MonthActual],
        curve: &HazardCurve,
    ) -> Result<VarianceReport> {
        let threshold = self.config.materiality_threshold;
        let mut rows = Vec::with_capacity(observed.len());

        for month in observed {
            let expected = curve.rates_at(month.age)?;
            let Some(actual) = month.rates() else {
                continue;
            };

            let row = VarianceRow {
                age: month.age,
                beginning_balance: month.beginning_balance,
                payment: RateVariance::new(actual.payment, expected.payment, threshold),
                chargeoff: RateVariance::new(actual.chargeoff, expected.chargeoff, threshold),
            };

            if row.is_significant() {
                warn!(
                    "segment '{}' month {}: significant variance (payment {:+.4}, charge-off {:+.4})",
                    segment_id, row.age, row.payment.variance, row.chargeoff.variance
                );
            }
            rows.push(row);
        }

        Ok(VarianceReport {
            segment_id: segment_id.to_string(),
            curve_version: curve.version(),
            materiality_threshold: threshold,
            rows,
        })
    }

    fn segment_level(
        &self,
        observed: &[MonthActual],
        curve: &HazardCurve,
    ) -> Result<Option<SegmentLevel>> {
        let window: Vec<&MonthActual> = observed
            .iter()
            .rev()
            .filter(|m| m.beginning_balance > 0.0)
            .take(self.config.recent_window)
            .collect();
        if window.is_empty() {
            return Ok(None);
        }

        let mut balance = 0.0;
        let mut realized = HazardRates::default();
        let mut expected = HazardRates::default();
        for month in window.iter().rev() {
            let curve_rates = curve.rates_at(month.age)?;
            balance += month.beginning_balance;
            realized.payment += month.payment_amount;
            realized.chargeoff += month.chargeoff_amount;
            expected.payment += curve_rates.payment * month.beginning_balance;
            expected.chargeoff += curve_rates.chargeoff * month.beginning_balance;
        }

        let level = match self.config.strategy {
            TransferStrategy::RecentLevel => SegmentLevel::Recent(realized.scaled(1.0 / balance)),
            TransferStrategy::ScaledCurve => {
                let ratio = |actual: f64, expected: f64| if expected > 0.0 { actual / expected } else { 1.0 };
                SegmentLevel::Scaled {
                    payment: ratio(realized.payment, expected.payment),
                    chargeoff: ratio(realized.chargeoff, expected.chargeoff),
                }
            }
        };
        debug!("recent level over {} month(s): {:?}", window.len(), level);

        Ok(Some(level))
    }

    fn check_config(&self) -> Result<()> {
        let cfg = &self.config;
        if cfg.ramp_months == 0 {
            return Err(ForecastError::configuration("ramp_months must be at least 1"));
        }
        if cfg.recent_window == 0 {
            return Err(ForecastError::configuration("recent_window must be at least 1"));
        }
        if !(cfg.materiality_threshold.is_finite() && cfg.materiality_threshold >= 0.0) {
            return Err(ForecastError::configuration(format!(
                "materiality_threshold must be a finite non-negative number, got {}",
                cfg.materiality_threshold
            )));
        }
        Ok(())
    }
}

fn pure_curve(age: u32, curve_rates: HazardRates) -> BlendedPoint {
    BlendedPoint {
        age,
        payment_rate: curve_rates.payment,
        chargeoff_rate: curve_rates.chargeoff,
        curve_rates,
        actual_weight: 0.0,
        provenance: Provenance::Forecast,
    }
}

/// The one segment id shared by every record, `None` for an empty slice
fn single_segment_id(records: &[ObservationRecord]) -> Result<Option<&str>> {
    let Some(first) = records.first() else {
        return Ok(None);
    };
    match records.iter().find(|r| r.segment_id != first.segment_id) {
        Some(other) => Err(ForecastError::configuration(format!(
            "transfer expects one segment, got '{}' and '{}'",
            first.segment_id, other.segment_id
        ))),
        None => Ok(Some(first.segment_id.as_str())),
    }
}
