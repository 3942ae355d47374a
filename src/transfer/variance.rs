//! Actual vs expected comparison for one segment

use serde::{Deserialize, Serialize};

use crate::curve::CurveVersion;

/// Realized vs curve rate for one rate type at one age
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RateVariance {
    pub realized: f64,
    pub expected: f64,

    /// realized - expected
    pub variance: f64,

    /// variance / expected, undefined when the curve rate is zero
    pub relative_variance: Option<f64>,

    /// |relative_variance| above the materiality threshold
    pub significant: bool,
}

impl RateVariance {
    pub fn new(realized: f64, expected: f64, materiality_threshold: f64) -> Self {
        let variance = realized - expected;
        let relative_variance = (expected != 0.0).then(|| variance / expected);
        let significant = relative_variance.is_some_and(|rv| rv.abs() > materiality_threshold);
        Self {
            realized,
            expected,
            variance,
            relative_variance,
            significant,
        }
    }
}

/// Variance at one observed age
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceRow {
    pub age: u32,
    pub beginning_balance: f64,
    pub payment: RateVariance,
    pub chargeoff: RateVariance,
}

impl VarianceRow {
    /// Either rate is flagged as a significant variance
    pub fn is_significant(&self) -> bool {
        self.payment.significant || self.chargeoff.significant
    }
}

/// Aggregate variance statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceSummary {
    pub months_compared: usize,
    pub mean_payment_variance: f64,
    pub mean_chargeoff_variance: f64,
    pub payment_rmse: f64,
    pub chargeoff_rmse: f64,
    /// Ages where at least one rate is significant
    pub significant_count: usize,
}

/// Per-age variance of a segment's actuals against a trained curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarianceReport {
    pub segment_id: String,
    pub curve_version: CurveVersion,
    pub materiality_threshold: f64,
    pub rows: Vec<VarianceRow>,
}

impl VarianceReport {
    pub fn significant(&self) -> impl Iterator<Item = &VarianceRow> {
        self.rows.iter().filter(|r| r.is_significant())
    }

    pub fn summary(&self) -> VarianceSummary {
        let n = self.rows.len();
        let mean = |f: fn(&VarianceRow) -> f64| {
            if n == 0 {
                0.0
            } else {
                self.rows.iter().map(f).sum::<f64>() / n as f64
            }
        };

        VarianceSummary {
            months_compared: n,
            mean_payment_variance: mean(|r| r.payment.variance),
            mean_chargeoff_variance: mean(|r| r.chargeoff.variance),
            payment_rmse: mean(|r| r.payment.variance.powi(2)).sqrt(),
            chargeoff_rmse: mean(|r| r.chargeoff.variance.powi(2)).sqrt(),
            significant_count: self.significant().count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(age: u32, pay: (f64, f64), co: (f64, f64)) -> VarianceRow {
        VarianceRow {
            age,
            beginning_balance: 1_000.0,
            payment: RateVariance::new(pay.0, pay.1, 0.10),
            chargeoff: RateVariance::new(co.0, co.1, 0.10),
        }
    }

    #[test]
    fn test_relative_variance_and_flag() {
        let v = RateVariance::new(0.055, 0.05, 0.10);
        assert_relative_eq!(v.variance, 0.005, epsilon = 1e-12);
        assert_relative_eq!(v.relative_variance.unwrap(), 0.1, epsilon = 1e-9);
        assert!(!RateVariance::new(0.054, 0.05, 0.10).significant);
        assert!(RateVariance::new(0.044, 0.05, 0.10).significant);
    }

    #[test]
    fn test_zero_expected_is_never_flagged() {
        let v = RateVariance::new(0.02, 0.0, 0.10);
        assert_eq!(v.relative_variance, None);
        assert!(!v.significant);
    }

    #[test]
    fn test_summary_statistics() {
        let report = VarianceReport {
            segment_id: "A".to_string(),
            curve_version: crate::curve::HazardCurve::from_rates(
                &[crate::curve::HazardRates::new(0.05, 0.01)],
                crate::config::ExtrapolationPolicy::Constant,
            )
            .unwrap()
            .version(),
            materiality_threshold: 0.10,
            rows: vec![
                row(0, (0.06, 0.05), (0.01, 0.01)),
                row(1, (0.04, 0.05), (0.01, 0.01)),
            ],
        };

        let summary = report.summary();
        assert_eq!(summary.months_compared, 2);
        assert_relative_eq!(summary.mean_payment_variance, 0.0, epsilon = 1e-12);
        assert_relative_eq!(summary.payment_rmse, 0.01, epsilon = 1e-12);
        assert_relative_eq!(summary.chargeoff_rmse, 0.0, epsilon = 1e-12);
        assert_eq!(summary.significant_count, 2);
    }
}
