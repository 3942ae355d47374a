//! Reporting rows: amounts as ratios of origination plus hazard rates

use serde::{Deserialize, Serialize};

use super::records::{ForecastRecord, Provenance};
use crate::error::{ForecastError, Result};

/// One reporting row; currency = ratio × origination amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRow {
    pub month_on_book: u32,
    /// Beginning balance / origination
    pub outstanding_balance_ratio: f64,
    pub payments_ratio: f64,
    pub chargeoffs_ratio: f64,
    pub payment_hazard_rate: f64,
    pub chargeoff_hazard_rate: f64,
    pub provenance: Provenance,
}

/// Convert forecast records into reporting rows
pub fn format_output(records: &[ForecastRecord], origination_amount: f64) -> Result<Vec<OutputRow>> {
    if !(origination_amount.is_finite() && origination_amount > 0.0) {
        return Err(ForecastError::NegativeOrigination(origination_amount));
    }

    let hazard = |amount: f64, balance: f64| if balance > 0.0 { amount / balance } else { 0.0 };

    Ok(records
        .iter()
        .map(|r| OutputRow {
            month_on_book: r.month_on_book,
            outstanding_balance_ratio: r.beginning_balance / origination_amount,
            payments_ratio: r.payment_amount / origination_amount,
            chargeoffs_ratio: r.chargeoff_amount / origination_amount,
            payment_hazard_rate: hazard(r.payment_amount, r.beginning_balance),
            chargeoff_hazard_rate: hazard(r.chargeoff_amount, r.beginning_balance),
            provenance: r.provenance,
        })
        .collect())
}
