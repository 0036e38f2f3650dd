//! Record-file discovery and loading.
//!
//! Each `*.json` file under the data directory holds one person's absence
//! export as a JSON array of already-normalized [`AbsenceRecord`]s.

use std::path::{Path, PathBuf};

use absence_core::error::{AbsenceError, Result};
use absence_core::models::AbsenceRecord;
use tracing::{debug, warn};

/// File extension of record files.
pub const RECORD_FILE_EXTENSION: &str = "json";

// ── PersonRecords ─────────────────────────────────────────────────────────────

/// All records of one person, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonRecords {
    /// File the records were loaded from (empty for in-memory data).
    pub source: PathBuf,
    pub records: Vec<AbsenceRecord>,
}

impl PersonRecords {
    pub fn new(source: impl Into<PathBuf>, records: Vec<AbsenceRecord>) -> Self {
        Self {
            source: source.into(),
            records,
        }
    }

    /// `"<full name> <first name>"` taken from the first record.
    pub fn person_name(&self) -> Option<String> {
        self.records.first().map(|r| r.person_name())
    }

    /// Class of the first record.
    pub fn class(&self) -> Option<&str> {
        self.records.first().map(|r| r.class.as_str())
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Find all record files recursively under `data_path`, sorted by path.
pub fn find_record_files(data_path: &Path) -> Vec<PathBuf> {
    if !data_path.exists() {
        warn!("Data path does not exist: {}", data_path.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(data_path)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == RECORD_FILE_EXTENSION)
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Load one person's record file.
pub fn load_person_file(path: &Path) -> Result<PersonRecords> {
    let content = std::fs::read_to_string(path).map_err(|source| AbsenceError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let records: Vec<AbsenceRecord> = serde_json::from_str(&content)?;
    Ok(PersonRecords::new(path, records))
}

/// Load every record file under `data_path`.
///
/// Files that cannot be read or parsed are skipped with a warning. Files
/// without records are kept so callers can report them.
pub fn load_data_dir(data_path: &Path) -> Vec<PersonRecords> {
    let files = find_record_files(data_path);
    if files.is_empty() {
        warn!("No record files found in {}", data_path.display());
        return Vec::new();
    }

    let people: Vec<PersonRecords> = files
        .iter()
        .filter_map(|path| match load_person_file(path) {
            Ok(person) => Some(person),
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                None
            }
        })
        .collect();

    debug!(
        "Loaded {} records from {} of {} files",
        people.iter().map(|p| p.records.len()).sum::<usize>(),
        people.len(),
        files.len()
    );
    people
}

// ── Tests ─────────────────────────────────────────────────────────────────────
