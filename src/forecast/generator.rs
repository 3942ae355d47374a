//! Month-by-month balance roll-forward for one segment

use log::{debug, info};

use super::records::{ForecastRecord, ForecastResult, Provenance};
use super::state::ForecastState;
use crate::config::ModelConfig;
use crate::error::{ForecastError, Result};
use crate::segment::ObservationRecord;
use crate::transfer::BlendedCurve;

/// Projects a segment forward on its blended curve
#[derive(Debug, Clone)]
pub struct ForecastGenerator {
    /// Balance at or below this is treated as exhausted
    balance_tolerance: f64,
}

impl Default for ForecastGenerator {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

impl ForecastGenerator {
    pub fn new(balance_tolerance: f64) -> Self {
        Self { balance_tolerance }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.balance_tolerance)
    }

    /// Forecast through `max_month`.
    ///
    /// Actual rows up to `max_month` are copied verbatim, and months missing
    /// inside the history are not filled in. Projection starts the month after
    /// the last actual from the total ending balance of that month's rows, or
    /// at age 0 from `origination_amount` when the segment has no actuals.
    pub fn forecast(
        &self,
        known_actuals: &[ObservationRecord],
        curve: &BlendedCurve,
        origination_amount: f64,
        max_month: u32,
    ) -> Result<ForecastResult> {
        if !(origination_amount.is_finite() && origination_amount > 0.0) {
            return Err(ForecastError::NegativeOrigination(origination_amount));
        }
        if !(self.balance_tolerance.is_finite() && self.balance_tolerance >= 0.0) {
            return Err(ForecastError::configuration(format!(
                "balance_tolerance must be a finite non-negative number, got {}",
                self.balance_tolerance
            )));
        }

        let mut actuals: Vec<&ObservationRecord> = known_actuals.iter().filter(|r| r.is_actual).collect();
        actuals.sort_by_key(|r| r.month_on_book);

        let mut state = match actuals.last() {
            Some(last) => {
                let last_age = last.month_on_book;
                let ending: f64 = actuals
                    .iter()
                    .filter(|r| r.month_on_book == last_age)
                    .map(|r| r.ending_balance)
                    .sum();
                ForecastState::after_actual(last_age, ending, self.balance_tolerance)
            }
            None => ForecastState::from_origination(origination_amount),
        };

        if state.age <= max_month && curve.max_age() < max_month {
            return Err(ForecastError::CurveMismatch {
                age: curve.max_age() + 1,
                max_age: curve.max_age(),
            });
        }

        let mut result = ForecastResult::new(curve.segment_id(), curve.curve_version(), origination_amount);
        for record in actuals.iter().filter(|r| r.month_on_book <= max_month) {
            result.add_record(ForecastRecord::from_actual(record));
        }

        let start_age = state.age;
        while state.age <= max_month {
            let point = curve.point(state.age).ok_or(ForecastError::CurveMismatch {
                age: state.age,
                max_age: curve.max_age(),
            })?;
            let provenance = if point.actual_weight > 0.0 {
                Provenance::Blended
            } else {
                Provenance::Forecast
            };

            let was_terminal = state.terminal;
            let row = state.advance(point.rates(), provenance, self.balance_tolerance);
            if state.terminal && !was_terminal {
                debug!(
                    "segment '{}' balance exhausted at month {}",
                    curve.segment_id(),
                    row.month_on_book
                );
            }
            result.add_record(row);
        }

        info!(
            "forecast segment '{}' on curve {}: {} actual month(s), projected months {}..={}",
            curve.segment_id(),
            curve.curve_version(),
            actuals.len(),
            start_age,
            max_month
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtrapolationPolicy;
    use crate::curve::{HazardCurve, HazardRates};
    use crate::transfer::{BlendedPoint, CurveTransferEngine};
    use approx::assert_relative_eq;

    fn flat_blended(segment_id: &str, len: u32, rates: HazardRates) -> BlendedCurve {
        let version = HazardCurve::from_rates(&[rates], ExtrapolationPolicy::Constant)
            .unwrap()
            .version();
        let points = (0..len)
            .map(|age| BlendedPoint {
                age,
                payment_rate: rates.payment,
                chargeoff_rate: rates.chargeoff,
                curve_rates: rates,
                actual_weight: 0.0,
                provenance: Provenance::Forecast,
            })
            .collect();
        BlendedCurve::new(segment_id, version, 0.0, None, points).unwrap()
    }

    /// Ages 0..=12 ending at half of an 8,000,000 origination
    fn half_paid_history() -> Vec<ObservationRecord> {
        let origination = 8_000_000.0;
        let monthly = origination / 2.0 / 13.0;
        (0..=12u32)
            .map(|m| {
                let beginning = origination - monthly * m as f64;
                ObservationRecord::actual("Prime_2023Q1", m, beginning, monthly, 0.0)
            })
            .collect()
    }

    #[test]
    fn test_first_projected_month() {
        let history = half_paid_history();
        assert_relative_eq!(history[12].ending_balance, 4_000_000.0, epsilon = 1e-6);

        let curve = flat_blended("Prime_2023Q1", 25, HazardRates::new(0.07, 0.01));
        let result = ForecastGenerator::default()
            .forecast(&history, &curve, 8_000_000.0, 24)
            .unwrap();

        assert_eq!(result.records.len(), 25);
        assert!(result.records[..13].iter().all(|r| r.provenance == Provenance::Actual));

        let month13 = &result.records[13];
        assert_eq!(month13.month_on_book, 13);
        assert_relative_eq!(month13.payment_amount, 280_000.0, epsilon = 1e-6);
        assert_relative_eq!(month13.chargeoff_amount, 40_000.0, epsilon = 1e-6);
        assert_relative_eq!(month13.ending_balance, 3_680_000.0, epsilon = 1e-6);
        assert_eq!(month13.provenance, Provenance::Forecast);
    }

    #[test]
    fn test_history_with_missing_month() {
        let mut history = half_paid_history();
        history.remove(5);
        let curve = flat_blended("Prime_2023Q1", 25, HazardRates::new(0.07, 0.01));

        let result = ForecastGenerator::default()
            .forecast(&history, &curve, 8_000_000.0, 24)
            .unwrap();

        let months: Vec<u32> = result.records.iter().map(|r| r.month_on_book).collect();
        let expected: Vec<u32> = (0..=24).filter(|m| *m != 5).collect();
        assert_eq!(months, expected);
        assert!(months.windows(2).all(|w| w[0] < w[1]));

        let first = result.records.iter().find(|r| r.provenance != Provenance::Actual).unwrap();
        assert_eq!(first.month_on_book, 13);
        assert_relative_eq!(first.beginning_balance, history[11].ending_balance, epsilon = 1e-6);
        for pair in result.records.windows(2).filter(|w| w[1].month_on_book > 13) {
            assert_relative_eq!(pair[1].beginning_balance, pair[0].ending_balance, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_repeated_last_month_is_summed() {
        let history = vec![
            ObservationRecord::actual("A", 0, 1_000.0, 100.0, 0.0),
            ObservationRecord::actual("A", 1, 600.0, 60.0, 0.0),
            ObservationRecord::actual("A", 1, 300.0, 30.0, 0.0),
        ];
        let curve = flat_blended("A", 4, HazardRates::new(0.1, 0.0));

        let result = ForecastGenerator::default().forecast(&history, &curve, 1_000.0, 3).unwrap();

        assert_eq!(result.records.len(), 5);
        let month2 = &result.records[3];
        assert_eq!(month2.month_on_book, 2);
        assert_relative_eq!(month2.beginning_balance, 810.0, epsilon = 1e-9);
    }

    #[test]
    fn test_new_segment_starts_from_origination() {
        let curve = flat_blended("New", 4, HazardRates::new(0.1, 0.0));
        let result = ForecastGenerator::default().forecast(&[], &curve, 1_000.0, 3).unwrap();

        assert_eq!(result.records.len(), 4);
        assert_eq!(result.records[0].beginning_balance, 1_000.0);
        assert_relative_eq!(result.records[3].ending_balance, 1_000.0 * 0.9f64.powi(4), epsilon = 1e-9);
    }

    #[test]
    fn test_terminal_after_exhaustion() {
        let curve = flat_blended("A", 6, HazardRates::new(0.8, 0.4));
        let result = ForecastGenerator::default().forecast(&[], &curve, 500.0, 5).unwrap();

        assert_eq!(result.records[0].ending_balance, 0.0);
        assert_eq!(result.records[0].provenance, Provenance::Forecast);
        for r in &result.records[1..] {
            assert_eq!(r.provenance, Provenance::Terminal);
            assert_eq!(r.payment_amount, 0.0);
            assert_eq!(r.chargeoff_amount, 0.0);
        }
        assert_eq!(result.summary().terminal_month, Some(0));
    }

    #[test]
    fn test_rejects_non_positive_origination() {
        let curve = flat_blended("A", 3, HazardRates::new(0.1, 0.0));
        let generator = ForecastGenerator::default();

        assert_eq!(
            generator.forecast(&[], &curve, 0.0, 2).unwrap_err(),
            ForecastError::NegativeOrigination(0.0)
        );
        assert!(matches!(
            generator.forecast(&[], &curve, f64::NAN, 2),
            Err(ForecastError::NegativeOrigination(_))
        ));
    }

    #[test]
    fn test_curve_shorter_than_horizon() {
        let curve = flat_blended("A", 10, HazardRates::new(0.1, 0.0));
        let err = ForecastGenerator::default().forecast(&[], &curve, 100.0, 12).unwrap_err();

        assert_eq!(err, ForecastError::CurveMismatch { age: 10, max_age: 9 });
    }

    #[test]
    fn test_blended_months_are_labelled() {
        let rates = vec![HazardRates::new(0.05, 0.01); 24];
        let curve = HazardCurve::from_rates(&rates, ExtrapolationPolicy::Constant).unwrap();
        let mut balance = 1_000.0;
        let history: Vec<ObservationRecord> = (0..3)
            .map(|m| {
                let r = ObservationRecord::actual("A", m, balance, balance * 0.08, balance * 0.02);
                balance = r.ending_balance;
                r
            })
            .collect();

        let blended = CurveTransferEngine::default()
            .transfer(&history, &curve, 20)
            .unwrap()
            .blended_curve;
        let result = ForecastGenerator::default()
            .forecast(&history, &blended, 1_000.0, 20)
            .unwrap();

        let provenance: Vec<Provenance> = result.records.iter().map(|r| r.provenance).collect();
        assert_eq!(&provenance[..3], &[Provenance::Actual; 3]);
        assert!(provenance[3..9].iter().all(|p| *p == Provenance::Blended));
        assert!(provenance[9..].iter().all(|p| *p == Provenance::Forecast));
    }

    #[test]
    fn test_forecast_is_deterministic() {
        let curve = flat_blended("A", 61, HazardRates::new(0.031, 0.0047));
        let generator = ForecastGenerator::default();

        let a = generator.forecast(&[], &curve, 2_500_000.0, 60).unwrap();
        let b = generator.forecast(&[], &curve, 2_500_000.0, 60).unwrap();

        assert_eq!(a, b);
    }
}
