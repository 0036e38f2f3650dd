//! Clipping of reported absences to instructional time.
//!
//! Exports sometimes report absences that exceed the school day (a sick day
//! entered as 00:00–23:59, or a week-long absence as one interval). The
//! [`CorrectionEngine`] splits such records per calendar date and keeps only
//! the parts that fall inside the class's instructional periods.

use chrono::{Datelike, NaiveDateTime};
use tracing::{debug, warn};

use crate::diagnostics::Diagnostic;
use crate::models::{AbsenceRecord, CorrectedFragment};
use crate::schedule::Schedule;
use crate::time_utils::{format_clock, split_into_days};

/// Output of correcting one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correction {
    /// Single-day, period-clipped fragments in chronological order.
    pub fragments: Vec<CorrectedFragment>,
    /// `true` when any part of the record was trimmed or split across periods.
    pub was_corrected: bool,
    /// Sub-intervals or records that had to be skipped.
    pub diagnostics: Vec<Diagnostic>,
}

/// Splits and clips absence records against one weekly [`Schedule`].
#[derive(Debug, Clone, Copy)]
pub struct CorrectionEngine<'a> {
    schedule: &'a Schedule,
}

impl<'a> CorrectionEngine<'a> {
    pub fn new(schedule: &'a Schedule) -> Self {
        Self { schedule }
    }

    /// Correct a single record. Never mutates `record`.
    ///
    /// 1. Records ending before they start yield a
    ///    [`Diagnostic::MalformedInterval`] and no fragments.
    /// 2. Multi-day records are split per calendar date.
    /// 3. Each sub-interval is clipped against every period of its weekday;
    ///    every non-empty overlap becomes one fragment.
    /// 4. Sub-intervals on weekdays without a schedule entry are dropped with
    ///    a [`Diagnostic::UnmappedWeekday`]; this alone does not count as a
    ///    correction.
    ///
    /// The record counts as corrected when an emitted fragment differs from
    /// its sub-interval, or when a non-empty sub-interval on a scheduled
    /// weekday overlaps no period at all.
    pub fn correct(&self, record: &AbsenceRecord) -> Correction {
        let mut correction = Correction::default();

        if record.end < record.start {
            warn!(
                "malformed absence for {}: ends {} before it starts {}",
                record.person_name(),
                record.end,
                record.start
            );
            correction.diagnostics.push(Diagnostic::MalformedInterval {
                start: record.start,
                end: record.end,
            });
            return correction;
        }

        let sub_intervals = split_into_days(record.start, record.end);
        if record.is_multi_day() {
            debug!(
                "multi-day: {} - {} split into {} days",
                record.start.format("%Y-%m-%d, %H:%M, %A"),
                record.end.format("%Y-%m-%d, %H:%M, %A"),
                sub_intervals.len()
            );
        }

        for (sub_start, sub_end) in sub_intervals {
            self.clip_sub_interval(record, sub_start, sub_end, &mut correction);
        }

        correction
    }

    fn clip_sub_interval(
        &self,
        record: &AbsenceRecord,
        sub_start: NaiveDateTime,
        sub_end: NaiveDateTime,
        correction: &mut Correction,
    ) {
        let date = sub_start.date();
        let weekday = date.weekday();

        let Some(day) = self.schedule.day(weekday) else {
            warn!("invalid absence: ({}, {})", date, sub_start.format("%A"));
            correction
                .diagnostics
                .push(Diagnostic::UnmappedWeekday { date, weekday });
            return;
        };

        let (abs_start, abs_end) = (sub_start.time(), sub_end.time());
        let first_new = correction.fragments.len();
        let mut trimmed = false;

        for period in day.periods() {
            let Some((clipped_start, clipped_end)) = period.clip(abs_start, abs_end) else {
                continue;
            };
            if (clipped_start, clipped_end) != (abs_start, abs_end) {
                trimmed = true;
            }
            correction.fragments.push(CorrectedFragment::new(
                record,
                date.and_time(clipped_start),
                date.and_time(clipped_end),
            ));
        }

        let emitted = &correction.fragments[first_new..];
        if emitted.is_empty() && abs_start < abs_end {
            trimmed = true;
        }

        if trimmed {
            correction.was_corrected = true;
            debug!(
                "corrected ({}, {}): {} - {} -> {}",
                date,
                sub_start.format("%A"),
                format_clock(abs_start),
                format_clock(abs_end),
                emitted
                    .iter()
                    .map(|f| format!(
                        "{}-{}",
                        format_clock(f.record.start.time()),
                        format_clock(f.record.end.time())
                    ))
                    .collect::<Vec<_>>()
                    .join("; ")
            );
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
