//! Age-indexed hazard curves and their estimation from historical segments

mod hazard;
mod smoothing;
mod estimator;

pub use hazard::{CurvePoint, CurveVersion, HazardCurve, HazardRates, PointSource};
pub use smoothing::centered_moving_average;
pub use estimator::{EstimatorConfig, HazardRateEstimator, TrainingSummary};
