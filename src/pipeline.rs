//! End-to-end model: validate, train once, then transfer and forecast per segment
//!
//! Training returns the curve behind an `Arc`. Callers keep it and hand it to
//! every forecast; there is no shared "current" curve, so a retrain never
//! disturbs forecasts already running against an older version.

use log::{info, warn};
use rayon::prelude::*;
use std::sync::Arc;

use crate::config::{ExclusionPolicy, ModelConfig};
use crate::curve::{HazardCurve, HazardRateEstimator, TrainingSummary};
use crate::error::{ForecastError, Result};
use crate::forecast::{ForecastGenerator, ForecastResult};
use crate::segment::{ObservationRecord, Segment};
use crate::transfer::{BlendedCurve, CurveTransferEngine, VarianceReport};
use crate::validation::DataValidator;

/// One segment to forecast
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRequest {
    pub segment_id: String,

    /// Realized history, possibly empty for a brand-new segment
    pub actuals: Vec<ObservationRecord>,

    pub origination_amount: f64,

    /// Last month to forecast
    pub max_month: u32,
}

impl SegmentRequest {
    pub fn new(segment_id: impl Into<String>, origination_amount: f64, max_month: u32) -> Self {
        Self {
            segment_id: segment_id.into(),
            actuals: Vec::new(),
            origination_amount,
            max_month,
        }
    }

    pub fn from_segment(segment: Segment, origination_amount: f64, max_month: u32) -> Self {
        Self {
            segment_id: segment.segment_id,
            actuals: segment.records,
            origination_amount,
            max_month,
        }
    }

    pub fn with_actuals(mut self, actuals: Vec<ObservationRecord>) -> Self {
        self.actuals = actuals;
        self
    }
}

/// Everything produced for one segment
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentForecast {
    pub variance_report: VarianceReport,
    pub blended_curve: BlendedCurve,
    pub forecast: ForecastResult,
}

/// Validator, estimator, transfer engine and generator sharing one config
#[derive(Debug, Clone)]
pub struct SurvivalModel {
    config: ModelConfig,
    validator: DataValidator,
    estimator: HazardRateEstimator,
    transfer: CurveTransferEngine,
    generator: ForecastGenerator,
}

impl SurvivalModel {
    /// Build the model, failing fast on an invalid config
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            validator: DataValidator::from_config(&config),
            estimator: HazardRateEstimator::from_config(&config),
            transfer: CurveTransferEngine::from_config(&config),
            generator: ForecastGenerator::from_config(&config),
            config,
        })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Validate and apply the configured exclusion policy
    pub fn prepare(&self, records: &[ObservationRecord]) -> Result<Vec<ObservationRecord>> {
        let report = self.validator.validate(records);
        match self.config.exclusion {
            ExclusionPolicy::Abort => report.into_records(),
            ExclusionPolicy::ExcludeRecords => {
                let excluded = report.total_records - report.valid_records.len();
                if excluded > 0 {
                    warn!("excluding {excluded} of {} record(s) that failed validation", report.total_records);
                }
                Ok(report.valid_records)
            }
        }
    }

    /// Train a new curve from the historical records
    pub fn train(&self, history: &[ObservationRecord]) -> Result<(Arc<HazardCurve>, TrainingSummary)> {
        let records = self.prepare(history)?;
        let (curve, summary) = self.estimator.train_with_summary(&records)?;
        Ok((Arc::new(curve), summary))
    }

    /// Transfer the curve onto one segment and forecast it.
    ///
    /// A non-positive origination amount is rejected before the actuals or
    /// the curve are looked at.
    pub fn forecast(&self, curve: &HazardCurve, request: &SegmentRequest) -> Result<SegmentForecast> {
        let amount = request.origination_amount;
        if !(amount.is_finite() && amount > 0.0) {
            return Err(ForecastError::NegativeOrigination(amount));
        }
        if let Some(other) = request.actuals.iter().find(|r| r.segment_id != request.segment_id) {
            return Err(ForecastError::configuration(format!(
                "request for segment '{}' carries a record for '{}'",
                request.segment_id, other.segment_id
            )));
        }

        let actuals = self.prepare(&request.actuals)?;
        let outcome = self.transfer.transfer(&actuals, curve, request.max_month)?;

        let mut variance_report = outcome.variance_report;
        variance_report.segment_id = request.segment_id.clone();
        let blended_curve = outcome.blended_curve.with_segment_id(request.segment_id.as_str());

        let forecast = self.generator.forecast(
            &actuals,
            &blended_curve,
            request.origination_amount,
            request.max_month,
        )?;

        Ok(SegmentForecast {
            variance_report,
            blended_curve,
            forecast,
        })
    }

    /// Forecast many segments in parallel against one shared curve.
    ///
    /// Results come back in request order; one segment failing does not stop
    /// the others.
    pub fn forecast_batch(
        &self,
        curve: &Arc<HazardCurve>,
        requests: &[SegmentRequest],
    ) -> Vec<Result<SegmentForecast>> {
        let results: Vec<Result<SegmentForecast>> = requests
            .par_iter()
            .map(|request| self.forecast(curve, request))
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(
            "batch forecast on curve {}: {} segment(s), {} failed",
            curve.version(),
            requests.len(),
            failed
        );

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtrapolationPolicy;
    use crate::curve::HazardRates;
    use crate::forecast::Provenance;

    fn history(id: &str, months: u32, pay: f64) -> Vec<ObservationRecord> {
        let mut balance = 1_000_000.0;
        (0..months)
            .map(|m| {
                let r = ObservationRecord::actual(id, m, balance, balance * pay, balance * 0.004);
                balance = r.ending_balance;
                r
            })
            .collect()
    }

    fn training_set() -> Vec<ObservationRecord> {
        let mut records = history("Prime_2020Q1", 36, 0.06);
        records.extend(history("Prime_2020Q2", 33, 0.065));
        records.extend(history("Prime_2020Q3", 30, 0.07));
        records
    }

    #[test]
    fn test_abort_policy_rejects_bad_history() {
        let mut records = training_set();
        records[5].payment_amount = -1.0;

        let model = SurvivalModel::new(ModelConfig::default()).unwrap();
        assert!(matches!(model.train(&records), Err(ForecastError::Validation { .. })));
    }

    #[test]
    fn test_exclude_policy_drops_bad_records() {
        let mut records = training_set();
        records[5].payment_amount = -1.0;

        let model = SurvivalModel::new(ModelConfig {
            exclusion: ExclusionPolicy::ExcludeRecords,
            ..Default::default()
        })
        .unwrap();
        let (_, summary) = model.train(&records).unwrap();

        assert_eq!(summary.records_used, records.len() - 1);
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let result = SurvivalModel::new(ModelConfig {
            ramp_months: 0,
            ..Default::default()
        });
        assert!(matches!(result, Err(ForecastError::Configuration(_))));
    }

    #[test]
    fn test_forecast_new_segment() {
        let model = SurvivalModel::new(ModelConfig::default()).unwrap();
        let (curve, _) = model.train(&training_set()).unwrap();

        let out = model
            .forecast(&curve, &SegmentRequest::new("Prime_2024Q1", 2_000_000.0, 48))
            .unwrap();

        assert_eq!(out.forecast.segment_id, "Prime_2024Q1");
        assert_eq!(out.blended_curve.segment_id(), "Prime_2024Q1");
        assert_eq!(out.forecast.records.len(), 49);
        assert_eq!(out.forecast.records[0].beginning_balance, 2_000_000.0);
        assert_eq!(out.forecast.curve_version, curve.version());
        assert!(out.forecast.records.iter().all(|r| r.provenance == Provenance::Forecast));
    }

    #[test]
    fn test_request_with_foreign_records() {
        let model = SurvivalModel::new(ModelConfig::default()).unwrap();
        let (curve, _) = model.train(&training_set()).unwrap();
        let request = SegmentRequest::new("A", 1_000.0, 12).with_actuals(history("B", 2, 0.05));

        assert!(matches!(model.forecast(&curve, &request), Err(ForecastError::Configuration(_))));
    }

    #[test]
    fn test_origination_checked_before_curve_and_actuals() {
        let model = SurvivalModel::new(ModelConfig::default()).unwrap();
        let short =
            HazardCurve::from_rates(&[HazardRates::new(0.05, 0.01); 3], ExtrapolationPolicy::Disabled).unwrap();

        // horizon past a disabled curve
        let request = SegmentRequest::new("A", -5.0, 10);
        assert_eq!(
            model.forecast(&short, &request).unwrap_err(),
            ForecastError::NegativeOrigination(-5.0)
        );

        // actuals that fail validation
        let mut bad = history("A", 3, 0.05);
        bad[1].payment_amount = -1.0;
        let request = SegmentRequest::new("A", 0.0, 2).with_actuals(bad);
        assert_eq!(
            model.forecast(&short, &request).unwrap_err(),
            ForecastError::NegativeOrigination(0.0)
        );
    }

    #[test]
    fn test_batch_preserves_order_and_isolates_failures() {
        let model = SurvivalModel::new(ModelConfig::default()).unwrap();
        let (curve, _) = model.train(&training_set()).unwrap();

        let requests = vec![
            SegmentRequest::new("A", 1_000_000.0, 24).with_actuals(history("A", 6, 0.08)),
            SegmentRequest::new("B", -5.0, 24),
            SegmentRequest::new("C", 500_000.0, 24),
        ];
        let results = model.forecast_batch(&curve, &requests);

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().forecast.segment_id, "A");
        assert_eq!(results[1], Err(ForecastError::NegativeOrigination(-5.0)));
        assert_eq!(results[2].as_ref().unwrap().forecast.segment_id, "C");
    }
}
