//! Issue types reported by the validator

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueCode {
    /// Balance below zero on a non-terminal record
    NegativeBalance,
    /// Negative flow, or flows exceeding the beginning balance
    RateOutOfBounds,
    /// Ending balance disagrees with the flows or with the next month
    BalanceMismatch,
    /// Age out of order within a segment
    NonMonotonicAge,
    /// Empty identifier or non-finite numeric field
    MissingField,
    /// Interior month missing from a segment's history
    AgeGap,
}

/// Whether an issue excludes the record from `valid_records`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// A single finding, always tied back to the record that caused it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Position of the record in the validated input
    pub record_index: usize,
    pub segment_id: String,
    pub month_on_book: u32,
    pub code: IssueCode,
    pub severity: Severity,
    pub message: String,
}

impl ValidationIssue {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}/{:?}] segment {} month {} (record {}): {}",
            self.severity, self.code, self.segment_id, self.month_on_book, self.record_index, self.message
        )
    }
}
