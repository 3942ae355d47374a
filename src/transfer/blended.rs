//! Segment-specific forward curve produced by a transfer

use serde::{Deserialize, Serialize};

use crate::curve::{CurveVersion, HazardRates};
use crate::error::{ForecastError, Result};
use crate::forecast::Provenance;

/// Blended rates at one age
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendedPoint {
    pub age: u32,
    pub payment_rate: f64,
    pub chargeoff_rate: f64,

    /// Trained curve rates at this age before blending
    pub curve_rates: HazardRates,

    /// Weight carried by the segment's own experience (0 = pure curve)
    pub actual_weight: f64,

    pub provenance: Provenance,
}

impl BlendedPoint {
    pub fn rates(&self) -> HazardRates {
        HazardRates::new(self.payment_rate, self.chargeoff_rate)
    }
}

/// Gap-free rates from age 0 through the forecast horizon for one segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlendedCurve {
    segment_id: String,
    curve_version: CurveVersion,
    /// min(1, observed_months / ramp_months)
    credibility: f64,
    last_actual_age: Option<u32>,
    points: Vec<BlendedPoint>,
}

impl BlendedCurve {
    /// Assemble a blended curve; points must run 0, 1, 2, ... without gaps
    pub fn new(
        segment_id: impl Into<String>,
        curve_version: CurveVersion,
        credibility: f64,
        last_actual_age: Option<u32>,
        points: Vec<BlendedPoint>,
    ) -> Result<Self> {
        if points.is_empty() {
            return Err(ForecastError::configuration("blended curve has no points"));
        }
        if let Some((i, p)) = points.iter().enumerate().find(|(i, p)| p.age as usize != *i) {
            return Err(ForecastError::configuration(format!(
                "blended curve point {i} is for age {}, expected {i}",
                p.age
            )));
        }
        Ok(Self {
            segment_id: segment_id.into(),
            curve_version,
            credibility,
            last_actual_age,
            points,
        })
    }

    /// Same curve labelled for a segment that had no actuals to name it
    pub fn with_segment_id(mut self, segment_id: impl Into<String>) -> Self {
        self.segment_id = segment_id.into();
        self
    }

    pub fn segment_id(&self) -> &str {
        &self.segment_id
    }

    /// Version of the trained curve this was blended from
    pub fn curve_version(&self) -> CurveVersion {
        self.curve_version
    }

    /// Actual weight at the first forecast month
    pub fn credibility(&self) -> f64 {
        self.credibility
    }

    pub fn last_actual_age(&self) -> Option<u32> {
        self.last_actual_age
    }

    pub fn points(&self) -> &[BlendedPoint] {
        &self.points
    }

    pub fn point(&self, age: u32) -> Option<&BlendedPoint> {
        self.points.get(age as usize)
    }

    pub fn max_age(&self) -> u32 {
        self.points.len().saturating_sub(1) as u32
    }

    pub fn rates_at(&self, age: u32) -> Result<HazardRates> {
        self.point(age)
            .map(BlendedPoint::rates)
            .ok_or(ForecastError::CurveMismatch {
                age,
                max_age: self.max_age(),
            })
    }
}
