//! Record-level and segment-level validation of observation data
//!
//! The validator never drops anything silently: every finding is reported with
//! the index, segment and age of the offending record. Whether flagged records
//! are excluded or the whole input rejected is left to the caller.

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet};

use super::issues::{IssueCode, Severity, ValidationIssue};
use crate::config::ModelConfig;
use crate::error::{ForecastError, Result};
use crate::segment::ObservationRecord;

/// Outcome of a validation pass
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    /// Records carrying no error-severity issue, in input order
    pub valid_records: Vec<ObservationRecord>,

    /// Every issue found, in record order
    pub issues: Vec<ValidationIssue>,

    /// Number of records inspected
    pub total_records: usize,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(ValidationIssue::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Number of issues carrying the given code
    pub fn count(&self, code: IssueCode) -> usize {
        self.issues.iter().filter(|i| i.code == code).count()
    }

    /// Valid records, or a `Validation` error if anything failed hard
    pub fn into_records(self) -> Result<Vec<ObservationRecord>> {
        if self.has_errors() {
            Err(ForecastError::Validation { issues: self.issues })
        } else {
            Ok(self.valid_records)
        }
    }
}

/// Pure validator over already-parsed records
#[derive(Debug, Clone)]
pub struct DataValidator {
    /// Absolute tolerance on balance arithmetic
    balance_tolerance: f64,

    /// Relative slack allowed on payment + charge-off vs beginning balance
    rate_tolerance: f64,
}

impl Default for DataValidator {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

impl DataValidator {
    pub fn new(balance_tolerance: f64, rate_tolerance: f64) -> Self {
        Self {
            balance_tolerance,
            rate_tolerance,
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        Self::new(config.balance_tolerance, config.rate_tolerance)
    }

    /// Validate records without mutating them
    pub fn validate(&self, records: &[ObservationRecord]) -> ValidationReport {
        let mut issues = Vec::new();

        for (idx, record) in records.iter().enumerate() {
            self.check_record(idx, record, &mut issues);
        }
        self.check_segments(records, &mut issues);

        issues.sort_by_key(|i| i.record_index);

        let failed: BTreeSet<usize> = issues
            .iter()
            .filter(|i| i.is_error())
            .map(|i| i.record_index)
            .collect();

        let valid_records = records
            .iter()
            .enumerate()
            .filter(|(idx, _)| !failed.contains(idx))
            .map(|(_, r)| r.clone())
            .collect();

        if !issues.is_empty() {
            warn!(
                "validation found {} issue(s) across {} record(s); {} record(s) failed",
                issues.len(),
                records.len(),
                failed.len()
            );
            for issue in &issues {
                debug!("{issue}");
            }
        }

        ValidationReport {
            valid_records,
            issues,
            total_records: records.len(),
        }
    }

    fn check_record(&self, idx: usize, record: &ObservationRecord, issues: &mut Vec<ValidationIssue>) {
        let mut push = |code: IssueCode, message: String| {
            issues.push(issue(idx, record, code, Severity::Error, message));
        };

        if record.segment_id.trim().is_empty() {
            push(IssueCode::MissingField, "segment_id is empty".to_string());
            return;
        }

        let fields = [
            ("beginning_balance", record.beginning_balance),
            ("payment_amount", record.payment_amount),
            ("chargeoff_amount", record.chargeoff_amount),
            ("ending_balance", record.ending_balance),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            push(IssueCode::MissingField, format!("missing or non-finite: {}", missing.join(", ")));
            return;
        }

        let tol = self.balance_tolerance;

        if record.beginning_balance <= 0.0 && !record.is_terminal(tol) {
            push(
                IssueCode::NegativeBalance,
                format!("beginning balance {} is not positive", record.beginning_balance),
            );
        }
        if record.ending_balance < -tol {
            push(
                IssueCode::NegativeBalance,
                format!("ending balance {} is negative", record.ending_balance),
            );
        }

        if record.payment_amount < 0.0 {
            push(
                IssueCode::RateOutOfBounds,
                format!("negative payment {}", record.payment_amount),
            );
        }
        if record.chargeoff_amount < 0.0 {
            push(
                IssueCode::RateOutOfBounds,
                format!("negative charge-off {}", record.chargeoff_amount),
            );
        }

        let outflow = record.payment_amount + record.chargeoff_amount;
        if record.beginning_balance > 0.0
            && outflow > record.beginning_balance * (1.0 + self.rate_tolerance)
        {
            push(
                IssueCode::RateOutOfBounds,
                format!(
                    "payment + charge-off {outflow} exceeds beginning balance {}",
                    record.beginning_balance
                ),
            );
        }

        let drift = record.ending_balance - record.implied_ending_balance();
        if drift.abs() > tol {
            push(
                IssueCode::BalanceMismatch,
                format!(
                    "ending balance {} differs from beginning - payment - charge-off by {drift:.4}",
                    record.ending_balance
                ),
            );
        }
    }

    fn check_segments(&self, records: &[ObservationRecord], issues: &mut Vec<ValidationIssue>) {
        // Input order within each segment is what has to be non-decreasing
        let mut by_segment: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (idx, record) in records.iter().enumerate() {
            by_segment.entry(record.segment_id.as_str()).or_default().push(idx);
        }

        for indices in by_segment.values() {
            let ages: Vec<u32> = indices.iter().map(|&i| records[i].month_on_book).collect();
            let ordered = longest_ordered_run(&ages);

            let mut kept = ordered.iter().peekable();
            for (pos, &idx) in indices.iter().enumerate() {
                if kept.next_if(|&&p| p == pos).is_some() {
                    continue;
                }
                let record = &records[idx];
                issues.push(issue(
                    idx,
                    record,
                    IssueCode::NonMonotonicAge,
                    Severity::Error,
                    format!("month {} is out of order within the segment", record.month_on_book),
                ));
            }

            // Repeated ages are sub-pools of one month; continuity is checked on their totals
            let mut months: Vec<MonthTotals> = Vec::new();
            for &pos in &ordered {
                let idx = indices[pos];
                let record = &records[idx];
                match months.last_mut() {
                    Some(m) if m.age == record.month_on_book => {
                        m.beginning += record.beginning_balance;
                        m.ending += record.ending_balance;
                    }
                    _ => months.push(MonthTotals {
                        age: record.month_on_book,
                        first_index: idx,
                        beginning: record.beginning_balance,
                        ending: record.ending_balance,
                    }),
                }
            }

            for pair in months.windows(2) {
                let (last, next) = (&pair[0], &pair[1]);
                let record = &records[next.first_index];

                if next.age == last.age + 1 {
                    let drift = next.beginning - last.ending;
                    if drift.abs() > self.balance_tolerance {
                        issues.push(issue(
                            next.first_index,
                            record,
                            IssueCode::BalanceMismatch,
                            Severity::Warning,
                            format!(
                                "beginning balance {} does not continue prior ending balance {} (drift {drift:.4})",
                                next.beginning, last.ending
                            ),
                        ));
                    }
                } else {
                    issues.push(issue(
                        next.first_index,
                        record,
                        IssueCode::AgeGap,
                        Severity::Warning,
                        format!("months {}..={} missing", last.age + 1, next.age - 1),
                    ));
                }
            }
        }
    }
}

/// Balance totals of one month within a segment
struct MonthTotals {
    age: u32,
    first_index: usize,
    beginning: f64,
    ending: f64,
}

/// Positions of a longest non-decreasing subsequence of `ages`.
///
/// Records outside it are the fewest that must be dropped to restore order,
/// so a single misplaced month is flagged on its own.
fn longest_ordered_run(ages: &[u32]) -> Vec<usize> {
    // tails[k]: position ending the best run of length k + 1 found so far
    let mut tails: Vec<usize> = Vec::new();
    let mut parent: Vec<Option<usize>> = vec![None; ages.len()];

    for (i, &age) in ages.iter().enumerate() {
        let k = tails.partition_point(|&t| ages[t] <= age);
        parent[i] = k.checked_sub(1).map(|p| tails[p]);
        if k == tails.len() {
            tails.push(i);
        } else {
            tails[k] = i;
        }
    }

    let mut run = Vec::with_capacity(tails.len());
    let mut cur = tails.last().copied();
    while let Some(i) = cur {
        run.push(i);
        cur = parent[i];
    }
    run.reverse();
    run
}

fn issue(
    idx: usize,
    record: &ObservationRecord,
    code: IssueCode,
    severity: Severity,
    message: String,
) -> ValidationIssue {
    ValidationIssue {
        record_index: idx,
        segment_id: record.segment_id.clone(),
        month_on_book: record.month_on_book,
        code,
        severity,
        message,
    }
}
