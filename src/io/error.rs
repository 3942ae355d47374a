use thiserror::Error;

use crate::error::ForecastError;

/// Errors raised while reading inputs or writing outputs
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config parsed but failed validation
    #[error("invalid config: {0}")]
    Config(ForecastError),

    #[error(transparent)]
    Forecast(#[from] ForecastError),
}
