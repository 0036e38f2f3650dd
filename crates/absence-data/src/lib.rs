//! Data layer of the absence dashboard.
//!
//! Loads per-person record files, turns corrected fragments into
//! cumulative timelines, counts overlaps with the reporting periods, ranks
//! absence reasons and runs the top-level analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod analyzer;
pub mod reader;
pub mod reasons;

pub use absence_core as core;
