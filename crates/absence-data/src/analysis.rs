//! End-to-end analysis pipeline.
//!
//! Corrects every person's records against the matching timetable, filters
//! by excuse status, builds the cumulative timelines and computes the
//! heatmap and reason ranking over all persons, returning an
//! [`AnalysisResult`] of plain data.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use absence_core::calculations::{DurationCalculator, DurationUnit};
use absence_core::config::{InstitutionConfig, DEFAULT_REFERENCE_YEAR};
use absence_core::correction::CorrectionEngine;
use absence_core::diagnostics::Diagnostic;
use absence_core::error::Result;
use absence_core::models::{CorrectedFragment, DailyDelta, StatusFilter};
use absence_core::schedule::{ReportingPeriod, ScheduleRegistry};
use absence_core::settings::RecordSource;
use absence_core::time_utils::project_onto_academic_year;

use crate::aggregator::{Aggregator, Timeline};
use crate::analyzer::{PeriodOverlapAnalyzer, PeriodOverlapTable};
use crate::reader::PersonRecords;
use crate::reasons::{ReasonCount, ReasonTally};

// ── Options ───────────────────────────────────────────────────────────────────

/// Knobs of one analysis run.
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub status: StatusFilter,
    /// Record set for the heatmap and reason tally.
    pub source: RecordSource,
    /// When `false`, records bypass the correction engine.
    pub correct: bool,
    /// Academic year timelines are projected onto.
    pub reference_year: i32,
    pub unit: DurationUnit,
    /// Extend every timeline with a flat point at this date.
    pub extend_to: Option<NaiveDate>,
}

impl AnalysisOptions {
    /// Trailing point dated the day after `today`.
    ///
    /// The date is the real calendar date, not projected onto the reference
    /// academic year, so it lies after every projected point as long as the
    /// reference year is not in the future.
    pub fn with_trailing_point_after(mut self, today: NaiveDate) -> Self {
        self.extend_to = today.succ_opt();
        self
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            status: StatusFilter::Both,
            source: RecordSource::Corrected,
            correct: true,
            reference_year: DEFAULT_REFERENCE_YEAR,
            unit: DurationUnit::SchoolPeriods,
            extend_to: None,
        }
    }
}

// ── Result types ──────────────────────────────────────────────────────────────

/// Correction output for one person, before status filtering.
#[derive(Debug, Clone, Default)]
pub struct PersonCorrection {
    pub fragments: Vec<CorrectedFragment>,
    pub was_corrected: bool,
    pub diagnostics: Vec<Diagnostic>,
}

/// Everything computed for one person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonAnalysis {
    /// `"<full name> <first name>"`, or the file stem for empty files.
    pub name: String,
    pub class: String,
    /// Legend text: `"<name> (<class>, <ceil(total)> h)"`.
    pub label: String,
    pub source: PathBuf,
    pub timeline: Timeline,
    pub was_corrected: bool,
    pub records_in: usize,
    /// Status-filtered fragments feeding the timeline.
    pub fragments: Vec<CorrectedFragment>,
}

/// Metadata produced alongside the analysis result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// ISO-8601 timestamp when this result was generated.
    pub generated_at: String,
    pub persons_loaded: usize,
    pub records_processed: usize,
    pub fragments_emitted: usize,
    /// Persons with at least one corrected record.
    pub persons_corrected: usize,
    pub status_filter: StatusFilter,
    pub source: RecordSource,
    pub reference_year: i32,
}

/// The complete output of [`AbsencePipeline::analyze`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Persons ordered by total descending (stable).
    pub people: Vec<PersonAnalysis>,
    pub heatmap: PeriodOverlapTable,
    pub reasons: Vec<ReasonCount>,
    pub diagnostics: Vec<Diagnostic>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    /// Per-person totals, leaving out persons without any missed time.
    pub fn totals(&self) -> Vec<f64> {
        self.people
            .iter()
            .map(|p| p.timeline.total)
            .filter(|&t| t > 0.0)
            .collect()
    }

    /// Average over [`totals`](Self::totals); `None` when nobody contributed.
    pub fn average_total(&self) -> Option<f64> {
        Aggregator::average(&self.totals())
    }

    /// Chart title including the average when there is one.
    pub fn title(&self) -> String {
        let title = self.metadata.status_filter.title();
        match self.average_total() {
            Some(avg) => format!("{} (AVG: {:.2})", title, avg),
            None => title.to_string(),
        }
    }
}

// ── AbsencePipeline ───────────────────────────────────────────────────────────

/// Validated institution data ready to process records.
pub struct AbsencePipeline {
    registry: ScheduleRegistry,
    calculator: DurationCalculator,
    reporting_periods: Vec<ReportingPeriod>,
}

impl AbsencePipeline {
    /// Build from a configuration, failing on invalid timetables.
    pub fn from_config(config: &InstitutionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: config.registry()?,
            calculator: config.duration_calculator(),
            reporting_periods: config.reporting_periods.clone(),
        })
    }

    pub fn registry(&self) -> &ScheduleRegistry {
        &self.registry
    }

    /// Correct all records of one person.
    ///
    /// Records without a registered timetable pass through unchanged (one
    /// `UnscheduledClass` diagnostic per class and year). Records ending
    /// before they start are dropped in either case.
    pub fn correct_person(&self, person: &PersonRecords, correct: bool) -> PersonCorrection {
        let mut out = PersonCorrection::default();
        let mut reported: HashSet<(i32, String)> = HashSet::new();

        for record in &person.records {
            let schedule = if correct {
                self.registry.for_record(record)
            } else {
                None
            };

            if let Some(schedule) = schedule {
                let c = CorrectionEngine::new(schedule).correct(record);
                out.was_corrected |= c.was_corrected;
                out.fragments.extend(c.fragments);
                out.diagnostics.extend(c.diagnostics);
                continue;
            }

            if record.end < record.start {
                warn!(
                    "malformed absence for {}: ends {} before it starts {}",
                    record.person_name(),
                    record.end,
                    record.start
                );
                out.diagnostics.push(Diagnostic::MalformedInterval {
                    start: record.start,
                    end: record.end,
                });
                continue;
            }

            if correct {
                let key = (record.academic_year(), record.class.clone());
                if reported.insert(key.clone()) {
                    warn!(
                        "No schedule for class {} in academic year {}, records pass through uncorrected",
                        key.1, key.0
                    );
                    out.diagnostics.push(Diagnostic::UnscheduledClass {
                        academic_year: key.0,
                        class: key.1,
                    });
                }
            }
            out.fragments.push(CorrectedFragment::passthrough(record.clone()));
        }

        out
    }

    /// Daily deltas of `fragments`, dated on the reference academic year.
    ///
    /// Each delta is projected on its own and the emission order is kept.
    /// Fragments from different academic years therefore interleave on the
    /// projected axis: the dates are not re-sorted, and two deltas whose
    /// projected dates coincide are merged by the aggregator only when they
    /// end up adjacent.
    pub fn daily_deltas(
        &self,
        fragments: &[CorrectedFragment],
        unit: DurationUnit,
        reference_year: i32,
    ) -> Vec<DailyDelta> {
        fragments
            .iter()
            .map(|fragment| {
                let delta = self.calculator.delta(fragment, unit);
                DailyDelta {
                    date: project_onto_academic_year(delta.date, reference_year),
                    missed: delta.missed,
                }
            })
            .collect()
    }

    /// Run the full pipeline over all persons.
    pub fn analyze(&self, people: &[PersonRecords], options: &AnalysisOptions) -> AnalysisResult {
        let mut analyses: Vec<PersonAnalysis> = Vec::with_capacity(people.len());
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut raw_selected = Vec::new();
        let mut fragments_emitted = 0usize;

        for person in people {
            let correction = self.correct_person(person, options.correct);
            fragments_emitted += correction.fragments.len();
            diagnostics.extend(correction.diagnostics);

            let fragments: Vec<CorrectedFragment> = correction
                .fragments
                .into_iter()
                .filter(|f| options.status.matches(&f.record.status))
                .collect();

            raw_selected.extend(
                person
                    .records
                    .iter()
                    .filter(|r| options.status.matches(&r.status)),
            );

            let deltas = self.daily_deltas(&fragments, options.unit, options.reference_year);
            let mut timeline = Aggregator::aggregate(&deltas);
            if let Some(date) = options.extend_to {
                if !timeline.extend_to(date) && !timeline.is_empty() {
                    warn!(
                        "Trailing point {} is not after the last absence of {}, series left as is",
                        date,
                        person.source.display()
                    );
                }
            }

            let name = person.person_name().unwrap_or_else(|| {
                person
                    .source
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default()
            });
            let class = person.class().unwrap_or_default().to_string();

            if timeline.is_empty() {
                info!("No \"{}\" absences for {} ({})", options.status.title(), name, class);
            }
            if correction.was_corrected {
                debug!("Corrected records for {} from {}", name, person.source.display());
            }

            analyses.push(PersonAnalysis {
                label: format!("{} ({}, {:.0} h)", name, class, timeline.total.ceil()),
                name,
                class,
                source: person.source.clone(),
                timeline,
                was_corrected: correction.was_corrected,
                records_in: person.records.len(),
                fragments,
            });
        }

        let overlap = PeriodOverlapAnalyzer::new(self.reporting_periods.clone());
        let (heatmap, reasons, overlap_diagnostics) = match options.source {
            RecordSource::Corrected => {
                let selected = analyses.iter().flat_map(|p| p.fragments.iter());
                let (heatmap, diags) = overlap.analyze(selected.clone());
                (heatmap, ReasonTally::tally(selected), diags)
            }
            RecordSource::Raw => {
                let (heatmap, diags) = overlap.analyze(raw_selected.iter().copied());
                (heatmap, ReasonTally::tally(raw_selected.iter().copied()), diags)
            }
        };
        diagnostics.extend(overlap_diagnostics);

        analyses.sort_by(|a, b| b.timeline.total.total_cmp(&a.timeline.total));

        let metadata = AnalysisMetadata {
            generated_at: Utc::now().to_rfc3339(),
            persons_loaded: people.len(),
            records_processed: people.iter().map(|p| p.records.len()).sum(),
            fragments_emitted,
            persons_corrected: analyses.iter().filter(|p| p.was_corrected).count(),
            status_filter: options.status,
            source: options.source,
            reference_year: options.reference_year,
        };

        info!(
            "Analyzed {} records of {} persons: {} fragments, {} corrected files, {} diagnostics",
            metadata.records_processed,
            metadata.persons_loaded,
            metadata.fragments_emitted,
            metadata.persons_corrected,
            diagnostics.len()
        );

        AnalysisResult {
            people: analyses,
            heatmap,
            reasons,
            diagnostics,
            metadata,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use absence_core::models::{AbsenceRecord, AbsenceStatus};
    use chrono::NaiveDateTime;

    const EPS: f64 = 1e-9;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn record(
        name: &str,
        class: &str,
        start: &str,
        end: &str,
        status: AbsenceStatus,
        reason: &str,
    ) -> AbsenceRecord {
        AbsenceRecord {
            full_name: name.to_string(),
            first_name: "Test".to_string(),
            class: class.to_string(),
            start: dt(start),
            end: dt(end),
            status,
            reason: reason.to_string(),
            note: String::new(),
        }
    }

    fn pipeline() -> AbsencePipeline {
        AbsencePipeline::from_config(&InstitutionConfig::builtin()).unwrap()
    }

    // ── correct_person ────────────────────────────────────────────────────────

    #[test]
    fn test_correct_person_clips_full_day() {
        let person = PersonRecords::new(
            "a.json",
            vec![record(
                "Alpha",
                "5AHEL",
                "2024-09-02 00:00",
                "2024-09-02 23:59",
                AbsenceStatus::Excused,
                "sick",
            )],
        );
        let c = pipeline().correct_person(&person, true);

        assert!(c.was_corrected);
        assert_eq!(c.fragments.len(), 2);
        assert!(c.diagnostics.is_empty());
    }

    #[test]
    fn test_unscheduled_class_passes_through_once_reported() {
        let person = PersonRecords::new(
            "b.json",
            vec![
                record("Beta", "1XYZ", "2024-09-02 00:00", "2024-09-02 23:59", AbsenceStatus::Excused, "sick"),
                record("Beta", "1XYZ", "2024-09-03 00:00", "2024-09-03 23:59", AbsenceStatus::Excused, "sick"),
            ],
        );
        let c = pipeline().correct_person(&person, true);

        assert!(!c.was_corrected);
        assert_eq!(c.fragments.len(), 2);
        assert!(c.fragments.iter().all(|f| !f.differs_from_original()));
        assert_eq!(
            c.diagnostics,
            vec![Diagnostic::UnscheduledClass {
                academic_year: 2024,
                class: "1XYZ".to_string()
            }]
        );
    }

    #[test]
    fn test_correction_disabled_passes_through_silently() {
        let person = PersonRecords::new(
            "a.json",
            vec![record("Alpha", "5AHEL", "2024-09-02 00:00", "2024-09-02 23:59", AbsenceStatus::Excused, "sick")],
        );
        let c = pipeline().correct_person(&person, false);
        assert_eq!(c.fragments.len(), 1);
        assert!(!c.was_corrected);
        assert!(c.diagnostics.is_empty());
    }

    #[test]
    fn test_malformed_passthrough_is_dropped() {
        let person = PersonRecords::new(
            "b.json",
            vec![record("Beta", "1XYZ", "2024-09-02 12:00", "2024-09-02 08:00", AbsenceStatus::Excused, "sick")],
        );
        let c = pipeline().correct_person(&person, false);
        assert!(c.fragments.is_empty());
        assert!(matches!(
            c.diagnostics.as_slice(),
            [Diagnostic::MalformedInterval { .. }]
        ));
    }

    // ── analyze ───────────────────────────────────────────────────────────────

    #[test]
    fn test_analyze_builds_timeline() {
        let person = PersonRecords::new(
            "a.json",
            vec![
                // Monday: 08:30–12:00 inside period → 3.5h - 0.25h - 5min break
                record("Alpha", "5AHEL", "2024-09-02 08:30", "2024-09-02 12:00", AbsenceStatus::Excused, "sick"),
                // Tuesday first period 08:00–08:50 → 1 period
                record("Alpha", "5AHEL", "2024-09-03 08:00", "2024-09-03 08:50", AbsenceStatus::Excused, "sick"),
            ],
        );
        let result = pipeline().analyze(&[person], &AnalysisOptions::default());
        let alpha = &result.people[0];

        // 210 min - 15 - 5 = 190 min → 3.8 periods, plus 1.0
        assert!((alpha.timeline.total - 4.8).abs() < EPS);
        assert_eq!(alpha.timeline.points.len(), 2);
        assert_eq!(alpha.label, "Alpha Test (5AHEL, 5 h)");
        assert!(!alpha.was_corrected);
    }

    #[test]
    fn test_analyze_merges_fragments_of_same_day() {
        let person = PersonRecords::new(
            "a.json",
            vec![record("Alpha", "5AHEL", "2024-09-02 00:00", "2024-09-02 23:59", AbsenceStatus::Excused, "sick")],
        );
        let result = pipeline().analyze(&[person], &AnalysisOptions::default());
        let timeline = &result.people[0].timeline;

        assert_eq!(timeline.daily.len(), 1);
        let sum: f64 = timeline.daily.iter().map(|d| d.missed).sum();
        assert!((timeline.total - sum).abs() < EPS);
    }

    #[test]
    fn test_analyze_status_filter() {
        let person = PersonRecords::new(
            "a.json",
            vec![
                record("Alpha", "5AHEL", "2024-09-02 08:00", "2024-09-02 08:50", AbsenceStatus::Excused, "sick"),
                record("Alpha", "5AHEL", "2024-09-03 08:00", "2024-09-03 08:50", AbsenceStatus::NotExcused, "late"),
            ],
        );
        let options = AnalysisOptions {
            status: StatusFilter::NotExcused,
            ..Default::default()
        };
        let result = pipeline().analyze(&[person], &options);

        assert!((result.people[0].timeline.total - 1.0).abs() < EPS);
        assert_eq!(result.reasons.len(), 1);
        assert_eq!(result.reasons[0].reason, "late");
        assert_eq!(result.title(), "Unexcused absences (AVG: 1.00)");
    }

    #[test]
    fn test_analyze_projects_onto_reference_year() {
        let person = PersonRecords::new(
            "a.json",
            vec![record("Alpha", "X", "2022-10-03 08:00", "2022-10-03 08:50", AbsenceStatus::Excused, "sick")],
        );
        let result = pipeline().analyze(&[person], &AnalysisOptions::default());
        let point = result.people[0].timeline.points[0];

        assert_eq!(point.date, NaiveDate::from_ymd_opt(2024, 10, 3).unwrap());
        assert!((point.cumulative - 1.0).abs() < EPS);
    }

    #[test]
    fn test_analyze_people_sorted_by_total() {
        let low = PersonRecords::new(
            "low.json",
            vec![record("Low", "5AHEL", "2024-09-02 08:00", "2024-09-02 08:50", AbsenceStatus::Excused, "sick")],
        );
        let high = PersonRecords::new(
            "high.json",
            vec![record("High", "5AHEL", "2024-09-02 08:00", "2024-09-02 13:20", AbsenceStatus::Excused, "sick")],
        );
        let result = pipeline().analyze(&[low, high], &AnalysisOptions::default());

        assert_eq!(result.people[0].name, "High Test");
        assert_eq!(result.people[1].name, "Low Test");
        assert_eq!(result.totals().len(), 2);
    }

    #[test]
    fn test_analyze_heatmap_source_raw_vs_corrected() {
        let person = PersonRecords::new(
            "a.json",
            vec![record("Alpha", "5AHEL", "2024-09-02 07:00", "2024-09-02 08:50", AbsenceStatus::Excused, "sick")],
        );

        let corrected = pipeline().analyze(std::slice::from_ref(&person), &AnalysisOptions::default());
        assert_eq!(corrected.heatmap.count(0, 0), Some(1));
        assert_eq!(corrected.heatmap.total(), 1);

        let raw_options = AnalysisOptions {
            source: RecordSource::Raw,
            ..Default::default()
        };
        let raw = pipeline().analyze(&[person], &raw_options);
        assert_eq!(raw.heatmap.total(), 1);
        assert_eq!(raw.reasons[0].count, 1);
    }

    #[test]
    fn test_analyze_empty_input() {
        let result = pipeline().analyze(&[], &AnalysisOptions::default());

        assert!(result.people.is_empty());
        assert!(result.totals().is_empty());
        assert_eq!(result.average_total(), None);
        assert_eq!(result.title(), "Total absences");
        assert_eq!(result.heatmap.max_count(), 0);
        assert!(result.reasons.is_empty());
    }

    #[test]
    fn test_analyze_person_without_absences_has_zero_total() {
        let person = PersonRecords::new("empty.json", Vec::new());
        let result = pipeline().analyze(&[person], &AnalysisOptions::default());

        assert_eq!(result.people.len(), 1);
        assert_eq!(result.people[0].name, "empty");
        assert_eq!(result.people[0].timeline.total, 0.0);
        assert!(result.people[0].timeline.points.is_empty());
        assert_eq!(result.average_total(), None);
    }

    #[test]
    fn test_analyze_extend_to() {
        let person = PersonRecords::new(
            "a.json",
            vec![record("Alpha", "5AHEL", "2024-09-02 08:00", "2024-09-02 08:50", AbsenceStatus::Excused, "sick")],
        );
        let options = AnalysisOptions {
            extend_to: NaiveDate::from_ymd_opt(2025, 6, 30),
            ..Default::default()
        };
        let result = pipeline().analyze(&[person], &options);
        let timeline = &result.people[0].timeline;

        assert_eq!(timeline.points.len(), 2);
        assert_eq!(timeline.points[1].cumulative, timeline.points[0].cumulative);
    }

    #[test]
    fn test_trailing_point_after_today_outside_reference_year() {
        // Last absence projects onto 2025-03-10; the run happens in 2026.
        let person = PersonRecords::new(
            "a.json",
            vec![record("Alpha", "X", "2025-03-10 08:00", "2025-03-10 09:40", AbsenceStatus::Excused, "sick")],
        );
        let today = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let options = AnalysisOptions::default().with_trailing_point_after(today);
        let result = pipeline().analyze(&[person], &options);
        let points = &result.people[0].timeline.points;

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2026, 10, 20).unwrap());
        assert_eq!(points[1].cumulative, points[0].cumulative);
    }

    #[test]
    fn test_trailing_point_date_is_tomorrow() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let options = AnalysisOptions::default().with_trailing_point_after(today);
        assert_eq!(options.extend_to, NaiveDate::from_ymd_opt(2025, 1, 1));
    }

    // ── Projection across academic years ──────────────────────────────────────

    #[test]
    fn test_projection_keeps_emission_order_across_years() {
        let person = PersonRecords::new(
            "a.json",
            vec![
                record("Alpha", "X", "2023-09-04 08:00", "2023-09-04 08:50", AbsenceStatus::Excused, "sick"),
                record("Alpha", "X", "2024-09-02 08:00", "2024-09-02 08:50", AbsenceStatus::Excused, "sick"),
            ],
        );
        let result = pipeline().analyze(&[person], &AnalysisOptions::default());
        let points = &result.people[0].timeline.points;

        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 9, 4).unwrap());
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2024, 9, 2).unwrap());
        assert!((points[1].cumulative - 2.0).abs() < EPS);
    }

    #[test]
    fn test_projection_merges_coinciding_adjacent_dates() {
        let person = PersonRecords::new(
            "a.json",
            vec![
                record("Alpha", "X", "2023-09-02 08:00", "2023-09-02 08:50", AbsenceStatus::Excused, "sick"),
                record("Alpha", "X", "2024-09-02 08:00", "2024-09-02 08:50", AbsenceStatus::Excused, "sick"),
            ],
        );
        let result = pipeline().analyze(&[person], &AnalysisOptions::default());
        let timeline = &result.people[0].timeline;

        assert_eq!(timeline.daily.len(), 1);
        assert_eq!(timeline.daily[0].date, NaiveDate::from_ymd_opt(2024, 9, 2).unwrap());
        assert!((timeline.total - 2.0).abs() < EPS);
    }
}
