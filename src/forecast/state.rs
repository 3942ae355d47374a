//! Roll-forward state for a single segment

use super::records::{ForecastRecord, Provenance};
use crate::curve::HazardRates;

/// Segment state at the start of a projected month
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastState {
    /// Age of the next month to project
    pub age: u32,

    /// Beginning balance of that month
    pub balance: f64,

    /// Balance exhausted; every later month is zero
    pub terminal: bool,
}

impl ForecastState {
    /// Brand-new segment starting at age 0
    pub fn from_origination(origination_amount: f64) -> Self {
        Self {
            age: 0,
            balance: origination_amount,
            terminal: false,
        }
    }

    /// Continue from the segment's last actual month, given its total ending balance
    pub fn after_actual(last_age: u32, ending_balance: f64, balance_tolerance: f64) -> Self {
        let balance = ending_balance.max(0.0);
        let terminal = balance <= balance_tolerance;
        Self {
            age: last_age + 1,
            balance: if terminal { 0.0 } else { balance },
            terminal,
        }
    }

    /// Project one month at `rates` and move to the next age
    pub fn advance(&mut self, rates: HazardRates, provenance: Provenance, balance_tolerance: f64) -> ForecastRecord {
        let age = self.age;
        self.age += 1;

        if self.terminal {
            return ForecastRecord::terminal(age);
        }

        let rates = rates.clipped();
        let beginning_balance = self.balance;
        let payment_amount = beginning_balance * rates.payment;
        let chargeoff_amount = beginning_balance * rates.chargeoff;

        let mut ending_balance = (beginning_balance - payment_amount - chargeoff_amount).max(0.0);
        if ending_balance <= balance_tolerance {
            ending_balance = 0.0;
            self.terminal = true;
        }
        self.balance = ending_balance;

        ForecastRecord {
            month_on_book: age,
            beginning_balance,
            payment_amount,
            chargeoff_amount,
            ending_balance,
            provenance,
        }
    }
}
