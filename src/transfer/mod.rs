//! Curve transfer: variance detection and actual-to-trained blending

mod blended;
mod engine;
mod variance;

pub use blended::{BlendedCurve, BlendedPoint};
pub use engine::{CurveTransferEngine, TransferConfig, TransferOutcome};
pub use variance::{RateVariance, VarianceReport, VarianceRow, VarianceSummary};
