//! Schema and invariant checks on raw observation records

mod issues;
mod validator;

pub use issues::{IssueCode, Severity, ValidationIssue};
pub use validator::{DataValidator, ValidationReport};
