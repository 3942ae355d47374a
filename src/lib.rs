//! Survival Forecast - hazard-rate cash flow forecasting for loan segments
//!
//! This library provides:
//! - Validation of per-segment monthly performance records
//! - Balance-weighted hazard curve training over ragged segment histories
//! - Transfer of a trained curve onto a segment's actuals (variance + blending)
//! - Balance roll-forward forecasts with conservation and rate bounds
//! - Parallel batch forecasting against one shared, immutable curve

pub mod config;
pub mod curve;
pub mod error;
pub mod forecast;
pub mod io;
pub mod pipeline;
pub mod segment;
pub mod transfer;
pub mod validation;

// Re-export commonly used types
pub use config::{ExclusionPolicy, ExtrapolationPolicy, ModelConfig, TransferStrategy, Weighting};
pub use curve::{HazardCurve, HazardRateEstimator, HazardRates};
pub use error::{ForecastError, Result};
pub use forecast::{ForecastGenerator, ForecastRecord, ForecastResult, Provenance};
pub use pipeline::{SegmentForecast, SegmentRequest, SurvivalModel};
pub use segment::{ObservationRecord, Segment};
pub use transfer::{BlendedCurve, CurveTransferEngine, VarianceReport};
pub use validation::{DataValidator, ValidationReport};
