//! Observation records and segment grouping

mod data;

pub use data::{ObservationRecord, Segment, group_segments};
