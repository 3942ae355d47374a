//! Segment data structures matching the historical performance format

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One month of performance for one segment at one loan age
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    /// Segment/vintage identifier
    pub segment_id: String,

    /// Months since origination (0, 1, 2, ...)
    pub month_on_book: u32,

    /// Balance at the start of the month (rate denominator)
    pub beginning_balance: f64,

    /// Dollar payments received this month
    pub payment_amount: f64,

    /// Dollar charge-offs taken this month
    pub chargeoff_amount: f64,

    /// Balance at the end of the month
    pub ending_balance: f64,

    /// Realized performance (false for externally projected rows)
    pub is_actual: bool,
}

impl ObservationRecord {
    /// Create an actual record, deriving the ending balance from the flows
    pub fn actual(
        segment_id: impl Into<String>,
        month_on_book: u32,
        beginning_balance: f64,
        payment_amount: f64,
        chargeoff_amount: f64,
    ) -> Self {
        Self {
            segment_id: segment_id.into(),
            month_on_book,
            beginning_balance,
            payment_amount,
            chargeoff_amount,
            ending_balance: beginning_balance - payment_amount - chargeoff_amount,
            is_actual: true,
        }
    }

    /// Balance implied by the month's flows
    pub fn implied_ending_balance(&self) -> f64 {
        self.beginning_balance - self.payment_amount - self.chargeoff_amount
    }

    /// Payment hazard rate, undefined on a non-positive balance
    pub fn payment_rate(&self) -> Option<f64> {
        (self.beginning_balance > 0.0).then(|| self.payment_amount / self.beginning_balance)
    }

    /// Charge-off hazard rate, undefined on a non-positive balance
    pub fn chargeoff_rate(&self) -> Option<f64> {
        (self.beginning_balance > 0.0).then(|| self.chargeoff_amount / self.beginning_balance)
    }

    /// Record of a paid-off/charged-off segment carrying no balance
    pub fn is_terminal(&self, tolerance: f64) -> bool {
        self.beginning_balance.abs() <= tolerance
            && self.payment_amount.abs() <= tolerance
            && self.chargeoff_amount.abs() <= tolerance
    }
}

/// All records sharing a segment id, ordered by age
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub segment_id: String,
    pub records: Vec<ObservationRecord>,
}

impl Segment {
    /// Build a segment from records that share an id; records are sorted by age
    pub fn new(segment_id: impl Into<String>, mut records: Vec<ObservationRecord>) -> Self {
        records.sort_by_key(|r| r.month_on_book);
        Self {
            segment_id: segment_id.into(),
            records,
        }
    }

    /// Realized records only, in age order
    pub fn actuals(&self) -> impl Iterator<Item = &ObservationRecord> {
        self.records.iter().filter(|r| r.is_actual)
    }

    /// Most recent realized record
    pub fn last_actual(&self) -> Option<&ObservationRecord> {
        self.actuals().last()
    }

    /// Youngest age present
    pub fn first_age(&self) -> Option<u32> {
        self.records.first().map(|r| r.month_on_book)
    }

    /// Oldest age present
    pub fn last_age(&self) -> Option<u32> {
        self.records.last().map(|r| r.month_on_book)
    }

    /// Beginning balance at month 0, when the history reaches back that far
    pub fn origination_amount(&self) -> Option<f64> {
        self.records
            .first()
            .filter(|r| r.month_on_book == 0)
            .map(|r| r.beginning_balance)
    }

    /// History starts after month 0
    pub fn is_late_start(&self) -> bool {
        self.first_age().is_some_and(|age| age > 0)
    }

    /// Ages missing between the first and last observed age
    pub fn interior_gaps(&self) -> Vec<u32> {
        let mut gaps = Vec::new();
        for pair in self.records.windows(2) {
            let (prev, next) = (pair[0].month_on_book, pair[1].month_on_book);
            if next > prev + 1 {
                gaps.extend(prev + 1..next);
            }
        }
        gaps
    }
}

/// Group records by segment id (segments in id order, records in age order)
pub fn group_segments(records: &[ObservationRecord]) -> Vec<Segment> {
    let mut grouped: BTreeMap<&str, Vec<ObservationRecord>> = BTreeMap::new();
    for record in records {
        grouped
            .entry(record.segment_id.as_str())
            .or_default()
            .push(record.clone());
    }

    grouped
        .into_iter()
        .map(|(id, records)| Segment::new(id, records))
        .collect()
}
