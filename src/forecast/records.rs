//! Forecast output rows and per-segment results

use serde::{Deserialize, Serialize};

use super::output::{format_output, OutputRow};
use crate::curve::CurveVersion;
use crate::error::Result;
use crate::segment::ObservationRecord;

/// Origin label of a forecast row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// Copied from realized history
    Actual,
    /// Segment experience still carries weight in the rate
    Blended,
    /// Pure trained-curve rate
    Forecast,
    /// Balance exhausted earlier; zero-valued
    Terminal,
}

/// One month of a segment's cash flows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    pub month_on_book: u32,
    pub beginning_balance: f64,
    pub payment_amount: f64,
    pub chargeoff_amount: f64,
    pub ending_balance: f64,
    pub provenance: Provenance,
}

impl ForecastRecord {
    /// Row copied verbatim from an actual observation
    pub fn from_actual(record: &ObservationRecord) -> Self {
        Self {
            month_on_book: record.month_on_book,
            beginning_balance: record.beginning_balance,
            payment_amount: record.payment_amount,
            chargeoff_amount: record.chargeoff_amount,
            ending_balance: record.ending_balance,
            provenance: Provenance::Actual,
        }
    }

    /// Zero-valued row after the balance is exhausted
    pub fn terminal(month_on_book: u32) -> Self {
        Self {
            month_on_book,
            beginning_balance: 0.0,
            payment_amount: 0.0,
            chargeoff_amount: 0.0,
            ending_balance: 0.0,
            provenance: Provenance::Terminal,
        }
    }
}

/// Complete forecast for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub segment_id: String,

    /// Trained curve the forecast was built on
    pub curve_version: CurveVersion,

    pub origination_amount: f64,

    /// Rows in age order: actuals first, then projected months
    pub records: Vec<ForecastRecord>,
}

impl ForecastResult {
    pub fn new(segment_id: impl Into<String>, curve_version: CurveVersion, origination_amount: f64) -> Self {
        Self {
            segment_id: segment_id.into(),
            curve_version,
            origination_amount,
            records: Vec::new(),
        }
    }

    pub fn add_record(&mut self, record: ForecastRecord) {
        self.records.push(record);
    }

    /// First month whose ending balance hit zero in the projection
    pub fn terminal_month(&self) -> Option<u32> {
        self.records
            .iter()
            .filter(|r| r.provenance != Provenance::Actual)
            .find(|r| r.provenance != Provenance::Terminal && r.ending_balance == 0.0)
            .map(|r| r.month_on_book)
    }

    /// Ratio/hazard rows for reporting
    pub fn output_rows(&self) -> Result<Vec<OutputRow>> {
        format_output(&self.records, self.origination_amount)
    }

    pub fn summary(&self) -> ForecastSummary {
        let count = |p: Provenance| self.records.iter().filter(|r| r.provenance == p).count();
        let total_payments: f64 = self.records.iter().map(|r| r.payment_amount).sum();
        let total_chargeoffs: f64 = self.records.iter().map(|r| r.chargeoff_amount).sum();

        ForecastSummary {
            total_months: self.records.len(),
            actual_months: count(Provenance::Actual),
            blended_months: count(Provenance::Blended),
            forecast_months: count(Provenance::Forecast),
            terminal_months: count(Provenance::Terminal),
            total_payments,
            total_chargeoffs,
            final_balance: self
                .records
                .last()
                .map_or(self.origination_amount, |r| r.ending_balance),
            cumulative_loss_rate: total_chargeoffs / self.origination_amount,
            terminal_month: self.terminal_month(),
        }
    }
}

/// Totals over a segment's forecast
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastSummary {
    pub total_months: usize,
    pub actual_months: usize,
    pub blended_months: usize,
    pub forecast_months: usize,
    pub terminal_months: usize,
    pub total_payments: f64,
    pub total_chargeoffs: f64,
    pub final_balance: f64,
    /// Cumulative charge-offs / origination amount
    pub cumulative_loss_rate: f64,
    pub terminal_month: Option<u32>,
}
