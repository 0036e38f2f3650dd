//! Institution configuration: timetables, breaks and heatmap buckets.
//!
//! Everything the correction and aggregation steps need about the school is
//! carried in an [`InstitutionConfig`] value and handed to them explicitly.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculations::DurationCalculator;
use crate::error::{AbsenceError, Result};
use crate::schedule::{
    BreakCalendar, BreakInterval, Period, ReportingPeriod, Schedule, ScheduleDay, ScheduleRegistry,
};

/// Academic year the built-in timetables and the chart projection refer to.
pub const DEFAULT_REFERENCE_YEAR: i32 = 2024;

/// One class timetable for one academic year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Starting calendar year of the academic year (2024 for 2024/25).
    pub academic_year: i32,
    pub class: String,
    /// Monday-first list of per-day periods.
    pub days: Schedule,
}

/// Complete description of an institution's weekly instructional time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstitutionConfig {
    #[serde(default)]
    pub schedules: Vec<ScheduleEntry>,
    #[serde(default)]
    pub breaks: Vec<BreakInterval>,
    #[serde(default)]
    pub reporting_periods: Vec<ReportingPeriod>,
    /// Academic year all series are projected onto for display.
    #[serde(default = "default_reference_year")]
    pub reference_year: i32,
}

fn default_reference_year() -> i32 {
    DEFAULT_REFERENCE_YEAR
}

impl InstitutionConfig {
    /// Load and validate a JSON configuration file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AbsenceError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        debug!(
            "Loaded institution config from {}: {} schedules, {} breaks, {} reporting periods",
            path.display(),
            config.schedules.len(),
            config.breaks.len(),
            config.reporting_periods.len()
        );
        Ok(config)
    }

    /// Write the configuration as pretty JSON.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Check timetables and duplicate `(academic year, class)` entries.
    ///
    /// Periods, breaks and reporting periods are validated when deserialized.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.schedules {
            entry.days.validate()?;
        }
        self.registry()?;
        Ok(())
    }

    /// Build the `(academic year, class)` lookup table.
    pub fn registry(&self) -> Result<ScheduleRegistry> {
        let mut registry = ScheduleRegistry::new();
        for entry in &self.schedules {
            registry.insert(entry.academic_year, &entry.class, entry.days.clone())?;
        }
        Ok(registry)
    }

    pub fn break_calendar(&self) -> BreakCalendar {
        BreakCalendar::new(self.breaks.clone())
    }

    pub fn duration_calculator(&self) -> DurationCalculator {
        DurationCalculator::new(self.break_calendar())
    }

    /// The school's own timetables, breaks and ten 50-minute heatmap slots.
    pub fn builtin() -> Self {
        let day = |periods: &[(u32, u32, u32, u32)]| {
            ScheduleDay::from_periods_unchecked(
                periods
                    .iter()
                    .map(|&(sh, sm, eh, em)| Period::hm(sh, sm, eh, em))
                    .collect(),
            )
        };
        let entry = |class: &str, days: Vec<ScheduleDay>| ScheduleEntry {
            academic_year: DEFAULT_REFERENCE_YEAR,
            class: class.to_string(),
            days: Schedule::from_days_unchecked(days),
        };

        let schedules = vec![
            entry(
                "5AHEL",
                vec![
                    day(&[(8, 0, 13, 20), (14, 10, 16, 55)]),
                    day(&[(8, 0, 12, 30), (13, 20, 16, 55)]),
                    day(&[(8, 0, 13, 20)]),
                    day(&[(8, 0, 13, 20)]),
                    day(&[(8, 0, 8, 50), (9, 55, 13, 20)]),
                ],
            ),
            entry(
                "5CHEL",
                vec![
                    day(&[(8, 0, 12, 30), (13, 20, 16, 55)]),
                    day(&[(8, 0, 13, 20), (14, 10, 16, 55)]),
                    day(&[(8, 0, 11, 35), (12, 30, 14, 10)]),
                    day(&[(8, 0, 11, 35), (12, 30, 16, 55)]),
                    day(&[(8, 0, 12, 30)]),
                ],
            ),
            entry(
                "4BHEL",
                vec![
                    day(&[(8, 0, 12, 30), (13, 20, 16, 5)]),
                    day(&[(8, 0, 12, 30), (13, 20, 16, 55)]),
                    day(&[(8, 0, 12, 30), (13, 20, 16, 55)]),
                    day(&[(8, 0, 13, 20)]),
                    day(&[(8, 0, 13, 20), (14, 10, 16, 55)]),
                ],
            ),
        ];

        let breaks = vec![
            BreakInterval::hm(9, 40, 9, 55, 15),
            BreakInterval::hm(11, 35, 11, 40, 5),
            BreakInterval::hm(15, 0, 15, 15, 15),
        ];

        let reporting_periods = vec![
            ReportingPeriod::hm("1", 8, 0, 8, 50),
            ReportingPeriod::hm("2", 8, 50, 9, 40),
            ReportingPeriod::hm("3", 9, 55, 10, 45),
            ReportingPeriod::hm("4", 10, 45, 11, 35),
            ReportingPeriod::hm("5", 11, 40, 12, 30),
            ReportingPeriod::hm("6", 12, 30, 13, 20),
            ReportingPeriod::hm("7", 13, 20, 14, 10),
            ReportingPeriod::hm("8", 14, 10, 15, 0),
            ReportingPeriod::hm("9", 15, 15, 16, 5),
            ReportingPeriod::hm("10", 16, 5, 16, 55),
        ];

        Self {
            schedules,
            breaks,
            reporting_periods,
            reference_year: DEFAULT_REFERENCE_YEAR,
        }
    }
}

impl Default for InstitutionConfig {
    fn default() -> Self {
        Self::builtin()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use tempfile::TempDir;

    #[test]
    fn test_builtin_is_valid() {
        let config = InstitutionConfig::builtin();
        config.validate().expect("builtin config must validate");
        assert_eq!(config.schedules.len(), 3);
        assert_eq!(config.breaks.len(), 3);
        assert_eq!(config.reporting_periods.len(), 10);
    }

    #[test]
    fn test_builtin_registry_lookup() {
        let registry = InstitutionConfig::builtin().registry().unwrap();
        let schedule = registry.get(2024, "5AHEL").expect("5AHEL registered");
        let monday = schedule.day(Weekday::Mon).unwrap();
        assert_eq!(monday.periods().len(), 2);
        assert!(registry.get(2025, "5AHEL").is_none());
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("institution.json");
        let config = InstitutionConfig::builtin();

        config.save_to(&path).expect("save");
        let loaded = InstitutionConfig::load_from(&path).expect("load");
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_minimal_json_uses_defaults() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("institution.json");
        std::fs::write(
            &path,
            r#"{"schedules":[{"academic_year":2023,"class":"3AHEL","days":[[["08:00","12:30"]]]}]}"#,
        )
        .unwrap();

        let loaded = InstitutionConfig::load_from(&path).expect("load");
        assert_eq!(loaded.reference_year, DEFAULT_REFERENCE_YEAR);
        assert!(loaded.breaks.is_empty());
        assert!(loaded.registry().unwrap().get(2023, "3AHEL").is_some());
    }

    #[test]
    fn test_load_rejects_overlapping_periods() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("institution.json");
        std::fs::write(
            &path,
            r#"{"schedules":[{"academic_year":2024,"class":"X","days":[[["08:00","12:30"],["12:00","13:00"]]]}]}"#,
        )
        .unwrap();

        assert!(InstitutionConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_load_rejects_duplicate_schedule() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("institution.json");
        std::fs::write(
            &path,
            r#"{"schedules":[
                {"academic_year":2024,"class":"X","days":[]},
                {"academic_year":2024,"class":"X","days":[]}
            ]}"#,
        )
        .unwrap();

        let err = InstitutionConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, AbsenceError::InvalidSchedule(_)));
    }

    #[test]
    fn test_load_rejects_inverted_reporting_period() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("institution.json");
        std::fs::write(
            &path,
            r#"{"schedules":[],"reporting_periods":[{"label":"1","start":"08:50","end":"08:00"}]}"#,
        )
        .unwrap();

        let err = InstitutionConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, AbsenceError::JsonParse(_)));
        assert!(err.to_string().contains("reporting period"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = InstitutionConfig::load_from(Path::new("/nonexistent/institution.json"))
            .unwrap_err();
        assert!(matches!(err, AbsenceError::FileRead { .. }));
    }
}
