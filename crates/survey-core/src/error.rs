use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the survey pipeline.
#[derive(Error, Debug)]
pub enum SurveyError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file was read but is not parseable as delimited text.
    #[error("Failed to parse CSV in {path}: {source}")]
    CsvParse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A record has more fields than the header declares.
    #[error("Record {record} in {path} has {found} fields, header declares {expected}")]
    RaggedRecord {
        path: PathBuf,
        record: usize,
        expected: usize,
        found: usize,
    },

    /// The file contains no header row at the expected offset.
    #[error("No header row found in {0}")]
    MissingHeader(PathBuf),

    /// A column the report cannot do without is not present in a year's data.
    #[error("Column '{column}' not found in {year} data")]
    MissingColumn { year: u16, column: String },

    /// None of the input files for a report could be loaded.
    ///
    /// `reason` carries the first per-year failure.
    #[error("No survey input could be loaded from {path}: {reason}")]
    NoInputs { path: PathBuf, reason: String },

    /// An output table could not be written.
    #[error("Failed to write {path}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A cell in a persisted aggregate table is not a number.
    #[error("Invalid numeric value '{value}' in row '{row}', column '{column}'")]
    InvalidNumber {
        row: String,
        column: String,
        value: String,
    },

    /// A reconciliation rule file could not be parsed.
    #[error("Failed to parse rule file: {0}")]
    RuleParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the survey crates.
pub type Result<T> = std::result::Result<T, SurveyError>;
