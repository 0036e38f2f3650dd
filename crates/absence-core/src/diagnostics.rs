use chrono::{NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

/// A recoverable data-quality issue found while processing records.
///
/// Diagnostics never abort processing; the affected sub-interval or record
/// is skipped (or passed through) and the issue is collected for the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A sub-interval fell on a weekday the schedule has no entry for.
    UnmappedWeekday { date: NaiveDate, weekday: Weekday },
    /// No schedule is registered for the record's class and academic year.
    UnscheduledClass { academic_year: i32, class: String },
    /// The record ends before it starts.
    MalformedInterval {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    /// A record could not be placed into the Monday–Friday overlap table.
    UnclassifiableWeekday { start: NaiveDateTime },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::UnmappedWeekday { date, weekday } => {
                write!(f, "invalid absence: ({}, {}) has no schedule entry", date, weekday)
            }
            Diagnostic::UnscheduledClass {
                academic_year,
                class,
            } => write!(
                f,
                "no schedule for class {} in academic year {}",
                class, academic_year
            ),
            Diagnostic::MalformedInterval { start, end } => {
                write!(f, "absence ends ({}) before it starts ({})", end, start)
            }
            Diagnostic::UnclassifiableWeekday { start } => {
                write!(f, "invalid absence: {} is not a school day", start.format("%A, %b %d, %Y, %H:%M"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_unmapped_weekday() {
        let d = Diagnostic::UnmappedWeekday {
            date: NaiveDate::from_ymd_opt(2024, 9, 7).unwrap(),
            weekday: Weekday::Sat,
        };
        assert_eq!(d.to_string(), "invalid absence: (2024-09-07, Sat) has no schedule entry");
    }

    #[test]
    fn test_display_unscheduled_class() {
        let d = Diagnostic::UnscheduledClass {
            academic_year: 2023,
            class: "3AHEL".to_string(),
        };
        assert_eq!(d.to_string(), "no schedule for class 3AHEL in academic year 2023");
    }

    #[test]
    fn test_serialize_tagged() {
        let d = Diagnostic::UnscheduledClass {
            academic_year: 2024,
            class: "5XHEL".to_string(),
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["kind"], "unscheduled_class");
        assert_eq!(json["class"], "5XHEL");
    }
}
