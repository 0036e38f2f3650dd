//! Weekly instructional timetables, break calendar and reporting periods.
//!
//! All types here are immutable once constructed. Constructors validate the
//! structure and return [`AbsenceError`] for anything a timetable must never
//! contain (empty or reversed periods, overlaps, more than five school days,
//! negative break deductions).

use std::collections::HashMap;

use chrono::{NaiveTime, TimeDelta, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::{AbsenceError, Result};
use crate::models::AbsenceRecord;
use crate::time_utils::{self, format_clock, hhmm, parse_clock, school_day_index, SCHOOL_DAYS};

// ── Overlap ───────────────────────────────────────────────────────────────────

/// Overlap of `[a_start, a_end)` and `[b_start, b_end)`.
///
/// Returns `None` unless `max(starts) < min(ends)`, so intervals that only
/// touch at a boundary do not overlap.
pub fn overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> Option<(NaiveTime, NaiveTime)> {
    let start = a_start.max(b_start);
    let end = a_end.min(b_end);
    (start < end).then_some((start, end))
}

// ── Period ────────────────────────────────────────────────────────────────────

/// A half-open `[start, end)` block of instructional time.
///
/// Serialized as a `["HH:MM", "HH:MM"]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(String, String)", into = "(String, String)")]
pub struct Period {
    start: NaiveTime,
    end: NaiveTime,
}

impl Period {
    /// Create a period, rejecting `start >= end`.
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(AbsenceError::InvalidPeriod(format!(
                "{} - {} is empty or reversed",
                format_clock(start),
                format_clock(end)
            )));
        }
        Ok(Self { start, end })
    }

    pub(crate) fn hm(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> Self {
        Self {
            start: clock(start_h, start_m),
            end: clock(end_h, end_m),
        }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Clip `[start, end)` to this period, `None` when they do not overlap.
    pub fn clip(&self, start: NaiveTime, end: NaiveTime) -> Option<(NaiveTime, NaiveTime)> {
        overlap(start, end, self.start, self.end)
    }
}

impl TryFrom<(String, String)> for Period {
    type Error = AbsenceError;

    fn try_from((start, end): (String, String)) -> Result<Self> {
        let parse = |s: &str| {
            parse_clock(s)
                .ok_or_else(|| AbsenceError::InvalidPeriod(format!("invalid clock time \"{}\"", s)))
        };
        Period::new(parse(&start)?, parse(&end)?)
    }
}

impl From<Period> for (String, String) {
    fn from(p: Period) -> Self {
        (format_clock(p.start), format_clock(p.end))
    }
}

fn clock(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

// ── ScheduleDay ───────────────────────────────────────────────────────────────

/// Ordered, non-overlapping instructional periods of one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<Period>", into = "Vec<Period>")]
pub struct ScheduleDay {
    periods: Vec<Period>,
}

impl ScheduleDay {
    /// Create a day, rejecting unsorted or overlapping periods.
    ///
    /// Adjacent periods (`a.end == b.start`) are allowed.
    pub fn new(periods: Vec<Period>) -> Result<Self> {
        let day = Self { periods };
        day.validate()?;
        Ok(day)
    }

    pub(crate) fn from_periods_unchecked(periods: Vec<Period>) -> Self {
        Self { periods }
    }

    fn validate(&self) -> Result<()> {
        for p in &self.periods {
            Period::new(p.start, p.end)?;
        }
        for pair in self.periods.windows(2) {
            if pair[1].start < pair[0].end {
                return Err(AbsenceError::InvalidSchedule(format!(
                    "period {} - {} overlaps or precedes {} - {}",
                    format_clock(pair[1].start),
                    format_clock(pair[1].end),
                    format_clock(pair[0].start),
                    format_clock(pair[0].end)
                )));
            }
        }
        Ok(())
    }

    pub fn periods(&self) -> &[Period] {
        &self.periods
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }
}

impl TryFrom<Vec<Period>> for ScheduleDay {
    type Error = AbsenceError;

    fn try_from(periods: Vec<Period>) -> Result<Self> {
        ScheduleDay::new(periods)
    }
}

impl From<ScheduleDay> for Vec<Period> {
    fn from(day: ScheduleDay) -> Self {
        day.periods
    }
}

// ── Schedule ──────────────────────────────────────────────────────────────────

/// Weekly timetable: one [`ScheduleDay`] per school day, Monday first.
///
/// Fewer than five days may be given; the missing trailing weekdays and the
/// weekend have no schedule entry at all (which is different from a day
/// with zero periods).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ScheduleDay>", into = "Vec<ScheduleDay>")]
pub struct Schedule {
    days: Vec<ScheduleDay>,
}

impl Schedule {
    /// Create a schedule from Monday-first days.
    pub fn new(days: Vec<ScheduleDay>) -> Result<Self> {
        let schedule = Self { days };
        schedule.validate()?;
        Ok(schedule)
    }

    pub(crate) fn from_days_unchecked(days: Vec<ScheduleDay>) -> Self {
        Self { days }
    }

    /// Re-check every structural invariant.
    pub fn validate(&self) -> Result<()> {
        if self.days.len() > SCHOOL_DAYS {
            return Err(AbsenceError::InvalidSchedule(format!(
                "{} weekdays given, at most {} allowed",
                self.days.len(),
                SCHOOL_DAYS
            )));
        }
        for (idx, day) in self.days.iter().enumerate() {
            day.validate().map_err(|e| {
                AbsenceError::InvalidSchedule(format!("{}: {}", time_utils::SCHOOL_DAY_LABELS[idx], e))
            })?;
        }
        Ok(())
    }

    /// Timetable for `weekday`, `None` when the weekday is unmapped.
    pub fn day(&self, weekday: Weekday) -> Option<&ScheduleDay> {
        school_day_index(weekday).and_then(|idx| self.days.get(idx))
    }

    pub fn days(&self) -> &[ScheduleDay] {
        &self.days
    }
}

impl TryFrom<Vec<ScheduleDay>> for Schedule {
    type Error = AbsenceError;

    fn try_from(days: Vec<ScheduleDay>) -> Result<Self> {
        Schedule::new(days)
    }
}

impl From<Schedule> for Vec<ScheduleDay> {
    fn from(schedule: Schedule) -> Self {
        schedule.days
    }
}

// ── ScheduleRegistry ──────────────────────────────────────────────────────────

/// Schedules keyed by `(academic year, class)`.
#[derive(Debug, Clone, Default)]
pub struct ScheduleRegistry {
    schedules: HashMap<(i32, String), Schedule>,
}

impl ScheduleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schedule`; a second registration for the same key is an error.
    pub fn insert(&mut self, academic_year: i32, class: &str, schedule: Schedule) -> Result<()> {
        let key = (academic_year, class.to_string());
        if self.schedules.contains_key(&key) {
            return Err(AbsenceError::InvalidSchedule(format!(
                "duplicate schedule for class {} in academic year {}",
                class, academic_year
            )));
        }
        self.schedules.insert(key, schedule);
        Ok(())
    }

    pub fn get(&self, academic_year: i32, class: &str) -> Option<&Schedule> {
        self.schedules.get(&(academic_year, class.to_string()))
    }

    /// Schedule applicable to `record` (academic year of its start, its class).
    pub fn for_record(&self, record: &AbsenceRecord) -> Option<&Schedule> {
        self.get(record.academic_year(), &record.class)
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }
}

// ── Breaks ────────────────────────────────────────────────────────────────────

/// A recess inside instructional time, deducted when computing durations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BreakSpec", into = "BreakSpec")]
pub struct BreakInterval {
    start: NaiveTime,
    end: NaiveTime,
    deduction: TimeDelta,
}

/// Serialized form of a [`BreakInterval`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakSpec {
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
    pub minutes: i64,
}

impl BreakInterval {
    /// Create a break, rejecting negative deductions and `end < start`.
    pub fn new(start: NaiveTime, end: NaiveTime, deduction: TimeDelta) -> Result<Self> {
        if deduction < TimeDelta::zero() {
            return Err(AbsenceError::InvalidBreak(format!(
                "break at {} has a negative deduction of {} minutes",
                format_clock(start),
                deduction.num_minutes()
            )));
        }
        if end < start {
            return Err(AbsenceError::InvalidBreak(format!(
                "break ends at {} before it starts at {}",
                format_clock(end),
                format_clock(start)
            )));
        }
        Ok(Self {
            start,
            end,
            deduction,
        })
    }

    pub(crate) fn hm(start_h: u32, start_m: u32, end_h: u32, end_m: u32, minutes: i64) -> Self {
        Self {
            start: clock(start_h, start_m),
            end: clock(end_h, end_m),
            deduction: TimeDelta::minutes(minutes),
        }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    pub fn deduction(&self) -> TimeDelta {
        self.deduction
    }

    /// Whether an absence from `start` to `end` spans the start of this break.
    ///
    /// The break must begin strictly after `start` and no later than `end`.
    pub fn falls_within(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start < self.start && self.start <= end
    }
}

impl TryFrom<BreakSpec> for BreakInterval {
    type Error = AbsenceError;

    fn try_from(spec: BreakSpec) -> Result<Self> {
        BreakInterval::new(spec.start, spec.end, TimeDelta::minutes(spec.minutes))
    }
}

impl From<BreakInterval> for BreakSpec {
    fn from(b: BreakInterval) -> Self {
        BreakSpec {
            start: b.start,
            end: b.end,
            minutes: b.deduction.num_minutes(),
        }
    }
}

/// The fixed set of daily breaks, applied identically to every weekday.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakCalendar {
    breaks: Vec<BreakInterval>,
}

impl BreakCalendar {
    pub fn new(breaks: Vec<BreakInterval>) -> Self {
        Self { breaks }
    }

    pub fn breaks(&self) -> &[BreakInterval] {
        &self.breaks
    }

    /// Total deduction for an absence from `start` to `end`.
    pub fn deduction_within(&self, start: NaiveTime, end: NaiveTime) -> TimeDelta {
        self.breaks
            .iter()
            .filter(|b| b.falls_within(start, end))
            .fold(TimeDelta::zero(), |acc, b| acc + b.deduction)
    }
}

// ── Reporting periods ─────────────────────────────────────────────────────────

/// A named heatmap bucket. Independent of any class timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ReportingPeriodSpec", into = "ReportingPeriodSpec")]
pub struct ReportingPeriod {
    label: String,
    period: Period,
}

/// Serialized form of a [`ReportingPeriod`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingPeriodSpec {
    #[serde(default)]
    pub label: String,
    #[serde(with = "hhmm")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    pub end: NaiveTime,
}

impl ReportingPeriod {
    /// Create a bucket, rejecting `start >= end`.
    pub fn new(label: impl Into<String>, start: NaiveTime, end: NaiveTime) -> Result<Self> {
        let label = label.into();
        if start >= end {
            return Err(AbsenceError::InvalidPeriod(format!(
                "reporting period \"{}\": {} - {} is empty or reversed",
                label,
                format_clock(start),
                format_clock(end)
            )));
        }
        Ok(Self {
            label,
            period: Period { start, end },
        })
    }

    pub(crate) fn hm(label: &str, start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> Self {
        Self {
            label: label.to_string(),
            period: Period::hm(start_h, start_m, end_h, end_m),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start(&self) -> NaiveTime {
        self.period.start()
    }

    pub fn end(&self) -> NaiveTime {
        self.period.end()
    }

    /// Whether `[start, end)` overlaps this bucket.
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.period.clip(start, end).is_some()
    }
}

impl TryFrom<ReportingPeriodSpec> for ReportingPeriod {
    type Error = AbsenceError;

    fn try_from(spec: ReportingPeriodSpec) -> Result<Self> {
        ReportingPeriod::new(spec.label, spec.start, spec.end)
    }
}

impl From<ReportingPeriod> for ReportingPeriodSpec {
    fn from(rp: ReportingPeriod) -> Self {
        ReportingPeriodSpec {
            start: rp.start(),
            end: rp.end(),
            label: rp.label,
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
