//! Error taxonomy for the forecasting core

use thiserror::Error;

use crate::validation::ValidationIssue;

/// Errors raised by validation, training, transfer and forecasting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    /// Input records violate schema or balance invariants
    #[error("validation failed with {} issue(s)", issues.len())]
    Validation { issues: Vec<ValidationIssue> },

    /// A required age has no contributing observations and cannot be filled
    #[error("insufficient data: no observations at age {age} and extrapolation is disabled")]
    InsufficientData { age: u32 },

    /// Requested age lies outside the curve domain
    #[error("age {age} is outside the curve domain 0..={max_age}")]
    CurveMismatch { age: u32, max_age: u32 },

    /// Invalid parameter supplied before any computation began
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Origination amount must be strictly positive
    #[error("origination amount must be positive, got {0}")]
    NegativeOrigination(f64),
}

impl ForecastError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        ForecastError::Configuration(msg.into())
    }
}

/// Result alias used throughout the core
pub type Result<T> = std::result::Result<T, ForecastError>;
