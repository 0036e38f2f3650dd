//! Per-person cumulative missed-time series.
//!
//! Fragments arrive in the order the correction engine emits them: all
//! fragments of one record are contiguous and date-ordered. Merging relies
//! on that order and only folds a delta into the *immediately preceding*
//! entry when the dates match; it is not a group-by over the whole input.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use absence_core::models::{DailyDelta, TimeSeriesPoint};

// ── Timeline ──────────────────────────────────────────────────────────────────

/// Merged per-day deltas and their running sum for one person.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    /// One entry per run of equal dates.
    pub daily: Vec<DailyDelta>,
    /// Running sum over `daily`, same length unless extended.
    pub points: Vec<TimeSeriesPoint>,
    /// Final cumulative value (0 when empty).
    pub total: f64,
}

impl Timeline {
    pub fn is_empty(&self) -> bool {
        self.daily.is_empty()
    }

    /// Append a flat point at `date` repeating the final value.
    ///
    /// Returns `false`, leaving the timeline as is, when it is empty or
    /// `date` is not after the last point.
    pub fn extend_to(&mut self, date: NaiveDate) -> bool {
        match self.points.last().copied() {
            Some(last) if date > last.date => {
                self.points.push(TimeSeriesPoint {
                    date,
                    cumulative: last.cumulative,
                });
                true
            }
            _ => false,
        }
    }
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Stateless helper turning daily deltas into cumulative timelines.
pub struct Aggregator;

impl Aggregator {
    /// Merge each delta into the previous output entry when their dates are
    /// equal; otherwise start a new entry.
    pub fn merge_adjacent(deltas: &[DailyDelta]) -> Vec<DailyDelta> {
        let mut merged: Vec<DailyDelta> = Vec::with_capacity(deltas.len());

        for delta in deltas {
            match merged.last_mut() {
                Some(last) if last.date == delta.date => last.missed += delta.missed,
                _ => merged.push(*delta),
            }
        }

        merged
    }

    /// Running sum over `daily`.
    pub fn cumulative(daily: &[DailyDelta]) -> Vec<TimeSeriesPoint> {
        daily
            .iter()
            .scan(0.0, |total, delta| {
                *total += delta.missed;
                Some(TimeSeriesPoint {
                    date: delta.date,
                    cumulative: *total,
                })
            })
            .collect()
    }

    /// Merge, accumulate and total `deltas` for one person.
    pub fn aggregate(deltas: &[DailyDelta]) -> Timeline {
        let daily = Self::merge_adjacent(deltas);
        let points = Self::cumulative(&daily);
        let total = points.last().map(|p| p.cumulative).unwrap_or(0.0);

        Timeline {
            daily,
            points,
            total,
        }
    }

    /// Mean of the given per-person totals, `None` when there are none.
    pub fn average(totals: &[f64]) -> Option<f64> {
        if totals.is_empty() {
            return None;
        }
        Some(totals.iter().sum::<f64>() / totals.len() as f64)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
