use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

// ── Day boundaries ────────────────────────────────────────────────────────────

/// Time used as the start of a full day when splitting multi-day absences.
pub fn start_of_day() -> NaiveTime {
    NaiveTime::MIN
}

/// Time used as the end of a full day when splitting multi-day absences.
///
/// Exports never carry seconds, so the last representable minute is used.
pub fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 59, 0).unwrap_or(NaiveTime::MIN)
}

/// Split `[start, end]` into one sub-interval per calendar date.
///
/// * Same date → a single `(start, end)` pair.
/// * First day runs from the original start time to [`end_of_day`].
/// * Last day runs from [`start_of_day`] to the original end time.
/// * Days strictly in between cover the full day.
///
/// Returns an empty vector when `end` lies on an earlier date than `start`.
pub fn split_into_days(
    start: NaiveDateTime,
    end: NaiveDateTime,
) -> Vec<(NaiveDateTime, NaiveDateTime)> {
    let start_date = start.date();
    let end_date = end.date();

    if start_date == end_date {
        return vec![(start, end)];
    }

    start_date
        .iter_days()
        .take_while(|d| *d <= end_date)
        .map(|date| {
            let day_start = if date == start_date {
                start.time()
            } else {
                start_of_day()
            };
            let day_end = if date == end_date {
                end.time()
            } else {
                end_of_day()
            };
            (date.and_time(day_start), date.and_time(day_end))
        })
        .collect()
}

// ── Weekday helpers ───────────────────────────────────────────────────────────

/// Number of school days in a week (Monday through Friday).
pub const SCHOOL_DAYS: usize = 5;

/// Short labels for the school days, Monday first.
pub const SCHOOL_DAY_LABELS: [&str; SCHOOL_DAYS] = ["Mon", "Tue", "Wed", "Thu", "Fri"];

/// Index of a school day (Monday = 0 … Friday = 4), `None` on weekends.
pub fn school_day_index(weekday: Weekday) -> Option<usize> {
    let idx = weekday.num_days_from_monday() as usize;
    (idx < SCHOOL_DAYS).then_some(idx)
}

// ── Academic years ────────────────────────────────────────────────────────────

/// First month (1-based) of an academic year.
pub const ACADEMIC_YEAR_START_MONTH: u32 = 8;

/// Academic year a date belongs to, identified by its starting calendar year.
///
/// August–December belong to the year itself, January–July to the previous
/// one (`2025-03-10` → `2024`).
pub fn academic_year(date: NaiveDate) -> i32 {
    if date.month() >= ACADEMIC_YEAR_START_MONTH {
        date.year()
    } else {
        date.year() - 1
    }
}

/// Project `date` onto the academic year starting in `reference_year`.
///
/// August–December map to `reference_year`, January–July to
/// `reference_year + 1`. Month and day are kept; 29 February is clamped to
/// the 28th when the target year is not a leap year.
pub fn project_onto_academic_year(date: NaiveDate, reference_year: i32) -> NaiveDate {
    let target_year = if date.month() >= ACADEMIC_YEAR_START_MONTH {
        reference_year
    } else {
        reference_year + 1
    };

    if date.year() == target_year {
        return date;
    }

    date.with_year(target_year)
        .or_else(|| NaiveDate::from_ymd_opt(target_year, date.month(), 28))
        .unwrap_or(date)
}

// ── Formatting ────────────────────────────────────────────────────────────────

/// Format a clock time as `HH:MM`.
pub fn format_clock(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Parse `HH:MM` or `HH:MM:SS`.
pub fn parse_clock(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

/// Serde adapter serializing [`NaiveTime`] as `HH:MM`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_clock(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_clock(&s)
            .ok_or_else(|| de::Error::custom(format!("invalid clock time \"{}\"", s)))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
