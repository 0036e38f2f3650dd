//! JSON report written by the binary.
//!
//! Borrowed views over an [`AnalysisResult`]; nothing is recomputed here
//! except the cross-person summary.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use absence_core::diagnostics::Diagnostic;
use absence_core::models::{CorrectedFragment, DailyDelta, TimeSeriesPoint};
use absence_core::schedule::ReportingPeriod;
use absence_core::time_utils::SCHOOL_DAYS;
use absence_data::analysis::{AnalysisMetadata, AnalysisResult, PersonAnalysis};
use absence_data::reasons::ReasonCount;

#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub title: String,
    pub average_total: Option<f64>,
    pub totals: Vec<f64>,
    pub metadata: &'a AnalysisMetadata,
    pub people: Vec<PersonReport<'a>>,
    pub heatmap: HeatmapReport<'a>,
    pub reasons: &'a [ReasonCount],
    pub diagnostics: &'a [Diagnostic],
}

#[derive(Debug, Serialize)]
pub struct PersonReport<'a> {
    pub name: &'a str,
    pub class: &'a str,
    pub label: &'a str,
    pub source: &'a Path,
    pub total: f64,
    pub was_corrected: bool,
    pub records_in: usize,
    pub fragments_out: usize,
    pub daily: &'a [DailyDelta],
    pub points: &'a [TimeSeriesPoint],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fragments: Option<&'a [CorrectedFragment]>,
}

#[derive(Debug, Serialize)]
pub struct HeatmapReport<'a> {
    pub weekdays: [&'static str; SCHOOL_DAYS],
    pub periods: &'a [ReportingPeriod],
    pub counts: &'a [Vec<u32>],
    pub max_count: u32,
}

impl<'a> PersonReport<'a> {
    fn from_analysis(person: &'a PersonAnalysis, include_fragments: bool) -> Self {
        Self {
            name: &person.name,
            class: &person.class,
            label: &person.label,
            source: &person.source,
            total: person.timeline.total,
            was_corrected: person.was_corrected,
            records_in: person.records_in,
            fragments_out: person.fragments.len(),
            daily: &person.timeline.daily,
            points: &person.timeline.points,
            fragments: include_fragments.then_some(person.fragments.as_slice()),
        }
    }
}

impl<'a> Report<'a> {
    /// Build the report; `include_fragments` embeds each person's fragments.
    pub fn new(result: &'a AnalysisResult, include_fragments: bool) -> Self {
        Self {
            title: result.title(),
            average_total: result.average_total(),
            totals: result.totals(),
            metadata: &result.metadata,
            people: result
                .people
                .iter()
                .map(|p| PersonReport::from_analysis(p, include_fragments))
                .collect(),
            heatmap: HeatmapReport {
                weekdays: result.heatmap.weekday_labels(),
                periods: &result.heatmap.periods,
                counts: &result.heatmap.counts,
                max_count: result.heatmap.max_count(),
            },
            reasons: &result.reasons,
            diagnostics: &result.diagnostics,
        }
    }

    /// Pretty-printed JSON to `output`, or stdout when `None`.
    pub fn write(&self, output: Option<&Path>) -> anyhow::Result<()> {
        match output {
            Some(path) => {
                let mut writer = BufWriter::new(File::create(path)?);
                serde_json::to_writer_pretty(&mut writer, self)?;
                writer.write_all(b"\n")?;
                writer.flush()?;
            }
            None => {
                let stdout = std::io::stdout();
                let mut writer = stdout.lock();
                serde_json::to_writer_pretty(&mut writer, self)?;
                writer.write_all(b"\n")?;
            }
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
