use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::time_utils::academic_year;

/// Excuse state of a reported absence.
///
/// Deserialized from the raw status literal. The export spellings
/// `entsch.` / `nicht entsch.` are accepted next to the canonical
/// `excused` / `not_excused`; anything else is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AbsenceStatus {
    Excused,
    NotExcused,
    Other(String),
}

impl From<String> for AbsenceStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "excused" | "entsch." => AbsenceStatus::Excused,
            "not_excused" | "not excused" | "nicht entsch." => AbsenceStatus::NotExcused,
            _ => AbsenceStatus::Other(raw),
        }
    }
}

impl From<&str> for AbsenceStatus {
    fn from(raw: &str) -> Self {
        AbsenceStatus::from(raw.to_string())
    }
}

impl From<AbsenceStatus> for String {
    fn from(status: AbsenceStatus) -> Self {
        match status {
            AbsenceStatus::Excused => "excused".to_string(),
            AbsenceStatus::NotExcused => "not_excused".to_string(),
            AbsenceStatus::Other(raw) => raw,
        }
    }
}

/// Which absences enter the analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    /// Only excused absences.
    Excused,
    /// Only unexcused absences.
    NotExcused,
    /// Every absence regardless of status.
    #[default]
    Both,
}

impl StatusFilter {
    /// Whether a record with `status` passes this filter.
    ///
    /// `Other` statuses only pass [`StatusFilter::Both`].
    pub fn matches(self, status: &AbsenceStatus) -> bool {
        match self {
            StatusFilter::Both => true,
            StatusFilter::Excused => *status == AbsenceStatus::Excused,
            StatusFilter::NotExcused => *status == AbsenceStatus::NotExcused,
        }
    }

    /// Chart title used for the cumulative view.
    pub fn title(self) -> &'static str {
        match self {
            StatusFilter::Both => "Total absences",
            StatusFilter::Excused => "Excused absences",
            StatusFilter::NotExcused => "Unexcused absences",
        }
    }
}

/// Common read access to anything carrying an absence interval.
///
/// Implemented by raw records and corrected fragments so the overlap
/// analyzer and the reason tally accept either record set.
pub trait AbsenceInterval {
    /// Start of the absence.
    fn start(&self) -> NaiveDateTime;
    /// End of the absence.
    fn end(&self) -> NaiveDateTime;
    /// Reason string as exported.
    fn reason(&self) -> &str;
    /// Excuse state.
    fn status(&self) -> &AbsenceStatus;
}

/// One reported absence interval for one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsenceRecord {
    /// Family name as exported ("Full name" column).
    pub full_name: String,
    /// Given name.
    pub first_name: String,
    /// Class identifier, e.g. `"5AHEL"`.
    pub class: String,
    /// Start of the absence (local wall-clock time).
    pub start: NaiveDateTime,
    /// End of the absence; may fall on a later date than `start`.
    pub end: NaiveDateTime,
    /// Excuse state.
    pub status: AbsenceStatus,
    /// Reason of absence.
    #[serde(default)]
    pub reason: String,
    /// Free-text note.
    #[serde(default)]
    pub note: String,
}

impl AbsenceRecord {
    /// `"<full name> <first name>"`.
    pub fn person_name(&self) -> String {
        format!("{} {}", self.full_name, self.first_name)
    }

    /// Academic year of the start date (see [`academic_year`]).
    pub fn academic_year(&self) -> i32 {
        academic_year(self.start.date())
    }

    /// Copy of this record restricted to `[start, end]`.
    pub fn with_interval(&self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end,
            ..self.clone()
        }
    }

    /// Whether the interval spans more than one calendar date.
    pub fn is_multi_day(&self) -> bool {
        self.start.date() != self.end.date()
    }
}

impl AbsenceInterval for AbsenceRecord {
    fn start(&self) -> NaiveDateTime {
        self.start
    }

    fn end(&self) -> NaiveDateTime {
        self.end
    }

    fn reason(&self) -> &str {
        &self.reason
    }

    fn status(&self) -> &AbsenceStatus {
        &self.status
    }
}

/// A single-day, schedule-clipped slice of an [`AbsenceRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedFragment {
    /// The originating record with `start`/`end` replaced by the clipped
    /// interval. Identity fields (person, class, status, reason) are kept.
    pub record: AbsenceRecord,
    /// Start of the originating record before correction.
    pub original_start: NaiveDateTime,
    /// End of the originating record before correction.
    pub original_end: NaiveDateTime,
}

impl CorrectedFragment {
    /// Build a fragment of `source` covering `[start, end]`.
    pub fn new(source: &AbsenceRecord, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            record: source.with_interval(start, end),
            original_start: source.start,
            original_end: source.end,
        }
    }

    /// Wrap an uncorrected record (used when no schedule applies).
    pub fn passthrough(record: AbsenceRecord) -> Self {
        Self {
            original_start: record.start,
            original_end: record.end,
            record,
        }
    }

    /// Calendar date of the fragment.
    pub fn date(&self) -> NaiveDate {
        self.record.start.date()
    }

    /// Whether the fragment's interval differs from the originating record.
    pub fn differs_from_original(&self) -> bool {
        self.record.start != self.original_start || self.record.end != self.original_end
    }
}

impl AbsenceInterval for CorrectedFragment {
    fn start(&self) -> NaiveDateTime {
        self.record.start
    }

    fn end(&self) -> NaiveDateTime {
        self.record.end
    }

    fn reason(&self) -> &str {
        &self.record.reason
    }

    fn status(&self) -> &AbsenceStatus {
        &self.record.status
    }
}

/// Missed time on one calendar date for one person.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyDelta {
    pub date: NaiveDate,
    /// Missed time in the requested unit (periods or clock hours).
    pub missed: f64,
}

/// One point of a cumulative missed-time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub cumulative: f64,
}
