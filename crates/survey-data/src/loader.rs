//! Survey file discovery and loading.
//!
//! Reads one `survey_results_<year>.csv` export per year, applies the
//! year-specific header offset, drops export-tool index columns and returns a
//! rectangular [`SurveyYear`] whose cells are already classified as present
//! or missing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use regex::Regex;
use survey_core::error::{Result, SurveyError};
use survey_core::models::{Cell, SurveyColumn, SurveyYear};
use thiserror::Error;
use tracing::{debug, info, warn};

// ── Year quirks ───────────────────────────────────────────────────────────────

/// A structural parsing override for one survey year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearQuirk {
    pub year: u16,
    /// Zero-based record index of the header row.
    pub header_row: usize,
}

/// Every year whose export deviates from "header on the first row".
pub const YEAR_QUIRKS: &[YearQuirk] = &[YearQuirk {
    year: 2015,
    header_row: 1,
}];

/// Header row index for `year`.
pub fn header_row_for(year: u16) -> usize {
    YEAR_QUIRKS
        .iter()
        .find(|q| q.year == year)
        .map(|q| q.header_row)
        .unwrap_or(0)
}

// ── LoadError ─────────────────────────────────────────────────────────────────

/// A failure to load one year's export. Fatal for that year only.
#[derive(Debug, Error)]
#[error("{year} survey could not be loaded: {source}")]
pub struct LoadError {
    pub year: u16,
    #[source]
    pub source: SurveyError,
}

/// Result of loading several years: the years that loaded and the ones that
/// did not.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub loaded: Vec<SurveyYear>,
    pub failed: Vec<LoadError>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Path of the export for `year` under `data_dir`.
pub fn survey_file_path(data_dir: &Path, year: u16) -> PathBuf {
    data_dir.join(format!("survey_results_{}.csv", year))
}

/// Find `survey_results_<YYYY>.csv` files directly under `data_dir`, keyed
/// by year.
pub fn find_survey_files(data_dir: &Path) -> BTreeMap<u16, PathBuf> {
    if !data_dir.exists() {
        warn!("Data path does not exist: {}", data_dir.display());
        return BTreeMap::new();
    }

    let pattern = Regex::new(r"^survey_results_(\d{4})\.csv$").expect("regex is valid");

    walkdir::WalkDir::new(data_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?;
            let year = pattern.captures(name)?[1].parse::<u16>().ok()?;
            Some((year, entry.into_path()))
        })
        .collect()
}

/// Load the export for `year` from `data_dir`, applying its quirks.
pub fn load_year(data_dir: &Path, year: u16) -> std::result::Result<SurveyYear, LoadError> {
    let path = survey_file_path(data_dir, year);
    load_survey_file(&path, year, header_row_for(year)).map_err(|source| LoadError { year, source })
}

/// Load each of `years`, isolating failures per year.
pub fn load_years(data_dir: &Path, years: &[u16]) -> LoadOutcome {
    let mut outcome = LoadOutcome::default();
    for &year in years {
        match load_year(data_dir, year) {
            Ok(survey) => {
                info!(
                    "Loaded {} survey: {} rows, {} columns",
                    year,
                    survey.row_count(),
                    survey.columns().len()
                );
                outcome.loaded.push(survey);
            }
            Err(err) => {
                warn!("Skipping {}: {}", year, err.source);
                outcome.failed.push(err);
            }
        }
    }
    outcome
}

/// Read and parse one export file.
pub fn load_survey_file(path: &Path, year: u16, header_row: usize) -> Result<SurveyYear> {
    let bytes = std::fs::read(path).map_err(|source| SurveyError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let content = decode_survey_bytes(bytes);
    parse_survey_text(&content, year, header_row, path)
}

/// Decode an export as UTF-8 when valid, otherwise as Windows-1252.
///
/// Windows-1252 agrees with ISO-8859-1 everywhere except 0x80..=0x9F, where
/// it yields typographic characters (0x92 is `’`) instead of C1 control
/// codes. The legacy exports were written on Windows, so those bytes are
/// smart quotes and dashes in practice.
pub fn decode_survey_bytes(bytes: Vec<u8>) -> String {
    let text = match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => {
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            decoded.into_owned()
        }
    };
    match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Parse decoded CSV text into a [`SurveyYear`].
///
/// `path` is used for error context only.
pub fn parse_survey_text(
    content: &str,
    year: u16,
    header_row: usize,
    path: &Path,
) -> Result<SurveyYear> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let csv_err = |source: csv::Error| SurveyError::CsvParse {
        path: path.to_path_buf(),
        source,
    };

    for _ in 0..header_row {
        if records.next().transpose().map_err(csv_err)?.is_none() {
            return Err(SurveyError::MissingHeader(path.to_path_buf()));
        }
    }
    let header = records
        .next()
        .transpose()
        .map_err(csv_err)?
        .ok_or_else(|| SurveyError::MissingHeader(path.to_path_buf()))?;

    // Positions of the columns that survive the artifact filter.
    let kept: Vec<usize> = header
        .iter()
        .enumerate()
        .filter(|(_, name)| !is_export_artifact(name))
        .map(|(i, _)| i)
        .collect();
    if kept.len() < header.len() {
        debug!(
            "{}: dropped {} unnamed column(s)",
            path.display(),
            header.len() - kept.len()
        );
    }

    let mut columns: Vec<SurveyColumn> = kept
        .iter()
        .map(|&i| SurveyColumn::new(&header[i], Vec::new()))
        .collect();

    for (offset, record) in records.enumerate() {
        let record = record.map_err(csv_err)?;
        if record.len() > header.len() {
            return Err(SurveyError::RaggedRecord {
                path: path.to_path_buf(),
                record: header_row + 1 + offset,
                expected: header.len(),
                found: record.len(),
            });
        }
        for (column, &i) in columns.iter_mut().zip(&kept) {
            column
                .cells
                .push(record.get(i).map(Cell::from_raw).unwrap_or(Cell::Missing));
        }
    }

    Ok(SurveyYear::new(year, columns))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Blank headers and `Unnamed: N` headers are index columns written by
/// dataframe exporters, not survey questions.
fn is_export_artifact(name: &str) -> bool {
    name.trim().is_empty() || name.starts_with("Unnamed")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
