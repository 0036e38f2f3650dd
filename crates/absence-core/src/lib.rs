//! Core domain of the absence dashboard.
//!
//! Typed absence records, weekly timetables, the correction engine that
//! clips reported absences to instructional time, and the duration
//! calculator that turns clipped intervals into missed periods.

pub mod calculations;
pub mod config;
pub mod correction;
pub mod diagnostics;
pub mod error;
pub mod models;
pub mod schedule;
pub mod settings;
pub mod time_utils;

pub use error::{AbsenceError, Result};
