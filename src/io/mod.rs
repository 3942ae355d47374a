//! File collaborators: CSV/JSON in, CSV out. The core never calls these.

mod error;
mod reader;
mod writer;

pub use error::LoadError;
pub use reader::{load_config, load_observations, read_observations};
pub use writer::{write_curve_csv, write_forecast_csv};
