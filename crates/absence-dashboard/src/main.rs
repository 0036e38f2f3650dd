mod bootstrap;
mod report;

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{info, warn};

use absence_core::calculations::DurationUnit;
use absence_core::config::InstitutionConfig;
use absence_core::error::AbsenceError;
use absence_core::settings::Settings;
use absence_data::analysis::{AbsencePipeline, AnalysisOptions};
use absence_data::reader::load_data_dir;

use crate::report::Report;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    bootstrap::ensure_directories()?;
    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    info!("Absence Dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        "Data: {}, Status: {:?}, Source: {:?}",
        settings.data_dir.display(),
        settings.status,
        settings.source
    );

    let config = match &settings.config {
        Some(path) => InstitutionConfig::load_from(path)
            .with_context(|| format!("loading institution config {}", path.display()))?,
        None => InstitutionConfig::builtin(),
    };
    let reference_year = settings.reference_year.unwrap_or(config.reference_year);

    if !settings.data_dir.exists() {
        return Err(AbsenceError::DataPathNotFound(settings.data_dir.clone()).into());
    }

    let people = load_data_dir(&settings.data_dir);
    if people.is_empty() {
        warn!("{}", AbsenceError::NoDataFiles(settings.data_dir.clone()));
    }

    let pipeline = AbsencePipeline::from_config(&config)?;
    info!("{} timetables registered", pipeline.registry().len());

    let mut options = AnalysisOptions {
        status: settings.status,
        source: settings.source,
        correct: !settings.no_correction,
        reference_year,
        unit: DurationUnit::SchoolPeriods,
        extend_to: None,
    };
    if settings.extend_to_today {
        options = options.with_trailing_point_after(Local::now().date_naive());
    }

    let result = pipeline.analyze(&people, &options);
    for diagnostic in &result.diagnostics {
        tracing::debug!("diagnostic: {}", diagnostic);
    }
    if result.metadata.persons_corrected > 0 {
        info!(
            "Corrected absences in {} of {} files",
            result.metadata.persons_corrected, result.metadata.persons_loaded
        );
    }

    Report::new(&result, settings.include_corrected).write(settings.output.as_deref())?;
    if let Some(path) = &settings.output {
        info!("Report written to {}", path.display());
    }

    Ok(())
}
