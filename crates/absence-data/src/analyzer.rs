//! Weekday × reporting-period overlap counts (heatmap data).

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use absence_core::diagnostics::Diagnostic;
use absence_core::models::AbsenceInterval;
use absence_core::schedule::ReportingPeriod;
use absence_core::time_utils::{school_day_index, SCHOOL_DAYS, SCHOOL_DAY_LABELS};

// ── PeriodOverlapTable ────────────────────────────────────────────────────────

/// Count of absences overlapping each `(weekday, reporting period)` cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodOverlapTable {
    /// Reporting periods, column order of `counts`.
    pub periods: Vec<ReportingPeriod>,
    /// `counts[weekday][period]`, Monday = 0.
    pub counts: Vec<Vec<u32>>,
}

impl PeriodOverlapTable {
    /// All-zero table for `periods`.
    pub fn new(periods: Vec<ReportingPeriod>) -> Self {
        let counts = vec![vec![0; periods.len()]; SCHOOL_DAYS];
        Self { periods, counts }
    }

    /// Count for one cell, `None` when out of range.
    pub fn count(&self, weekday: usize, period: usize) -> Option<u32> {
        self.counts.get(weekday).and_then(|row| row.get(period)).copied()
    }

    /// Largest cell value (0 for an empty table), used for colour scaling.
    pub fn max_count(&self) -> u32 {
        self.counts
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(0)
    }

    /// Sum over all cells.
    pub fn total(&self) -> u32 {
        self.counts.iter().flatten().sum()
    }

    /// Weekday labels matching the row order.
    pub fn weekday_labels(&self) -> [&'static str; SCHOOL_DAYS] {
        SCHOOL_DAY_LABELS
    }
}

// ── PeriodOverlapAnalyzer ─────────────────────────────────────────────────────

/// Fills a [`PeriodOverlapTable`] from absence records.
pub struct PeriodOverlapAnalyzer {
    periods: Vec<ReportingPeriod>,
}

impl PeriodOverlapAnalyzer {
    pub fn new(periods: Vec<ReportingPeriod>) -> Self {
        Self { periods }
    }

    /// Count every absence once per reporting period it overlaps, on the
    /// weekday of its start.
    ///
    /// Overlap uses the clock times of start and end with the strict test
    /// `max(starts) < min(ends)`. Absences starting on a weekend are skipped
    /// and reported as [`Diagnostic::UnclassifiableWeekday`].
    pub fn analyze<'a, A, I>(&self, absences: I) -> (PeriodOverlapTable, Vec<Diagnostic>)
    where
        A: AbsenceInterval + 'a,
        I: IntoIterator<Item = &'a A>,
    {
        let mut table = PeriodOverlapTable::new(self.periods.clone());
        let mut diagnostics = Vec::new();
        let mut counted = 0usize;

        for absence in absences {
            let start = absence.start();
            let Some(weekday) = school_day_index(start.weekday()) else {
                warn!(
                    "Invalid absence: {}",
                    start.format("%A, %b %d, %Y, %I:%M %p")
                );
                diagnostics.push(Diagnostic::UnclassifiableWeekday { start });
                continue;
            };

            let (start_time, end_time) = (start.time(), absence.end().time());
            for (idx, period) in self.periods.iter().enumerate() {
                if period.overlaps(start_time, end_time) {
                    table.counts[weekday][idx] += 1;
                }
            }
            counted += 1;
        }

        debug!(
            "PeriodOverlapAnalyzer: {} absences counted, {} skipped",
            counted,
            diagnostics.len()
        );
        (table, diagnostics)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
