//! Forecast generation from a blended curve

mod generator;
mod output;
mod records;
mod state;

pub use generator::ForecastGenerator;
pub use output::{format_output, OutputRow};
pub use records::{ForecastRecord, ForecastResult, ForecastSummary, Provenance};
pub use state::ForecastState;
