//! Flat-table persistence for aggregate tables.
//!
//! A table is written as comma-delimited text: a header row whose first field
//! is the index name, then one record per row label. Values are written with
//! `f64`'s shortest round-trip formatting and unobserved cells as empty
//! fields, so reading the file back reproduces the matrix bit for bit.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use survey_core::error::{Result, SurveyError};
use survey_core::models::AggregateTable;
use tracing::{debug, info};

/// Write `table` to `path`, replacing any existing file.
pub fn write_table(path: &Path, table: &AggregateTable) -> Result<()> {
    let write_err = |source: std::io::Error| SurveyError::OutputWrite {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(|e| write_err(e.into()))?;

    let mut header = Vec::with_capacity(table.columns().len() + 1);
    header.push(table.index_name().to_string());
    header.extend(table.columns().iter().cloned());
    writer.write_record(&header).map_err(|e| write_err(e.into()))?;

    for (r, row) in table.rows().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(row.clone());
        for c in 0..table.columns().len() {
            record.push(format_value(table.get_at(r, c)));
        }
        writer.write_record(&record).map_err(|e| write_err(e.into()))?;
    }
    writer.flush().map_err(write_err)?;

    info!(
        "Wrote {} ({} rows x {} columns)",
        path.display(),
        table.rows().len(),
        table.columns().len()
    );
    Ok(())
}

/// Read a table previously written by [`write_table`].
pub fn read_table(path: &Path) -> Result<AggregateTable> {
    let content = fs::read_to_string(path).map_err(|source| SurveyError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let table = parse_table(&content, path)?;
    debug!(
        "Read {} ({} rows x {} columns)",
        path.display(),
        table.rows().len(),
        table.columns().len()
    );
    Ok(table)
}

/// Parse table text; `path` is used for error context only.
pub fn parse_table(content: &str, path: &Path) -> Result<AggregateTable> {
    let csv_err = |source: csv::Error| SurveyError::CsvParse {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut records = reader.records();

    let header = records
        .next()
        .transpose()
        .map_err(csv_err)?
        .ok_or_else(|| SurveyError::MissingHeader(path.to_path_buf()))?;
    let mut fields = header.iter();
    let index_name = fields.next().unwrap_or_default();
    let columns: Vec<String> = fields.map(str::to_string).collect();

    let mut table = AggregateTable::new(index_name);
    for column in &columns {
        table.ensure_column(column);
    }

    for (offset, record) in records.enumerate() {
        let record = record.map_err(csv_err)?;
        if record.len() > header.len() {
            return Err(SurveyError::RaggedRecord {
                path: path.to_path_buf(),
                record: offset + 2,
                expected: header.len(),
                found: record.len(),
            });
        }
        let row = record.get(0).unwrap_or_default();
        table.ensure_row(row);
        for (column, raw) in columns.iter().zip(record.iter().skip(1)) {
            let value = parse_value(raw).ok_or_else(|| SurveyError::InvalidNumber {
                row: row.to_string(),
                column: column.clone(),
                value: raw.to_string(),
            })?;
            table.set(row, column, value);
        }
    }

    Ok(table)
}

fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => String::new(),
    }
}

/// `Some(None)` for an empty field, `None` when the field is not a number.
fn parse_value(raw: &str) -> Option<Option<f64>> {
    if raw.is_empty() {
        return Some(None);
    }
    raw.parse::<f64>().ok().map(Some)
}

// ── Metadata sidecar ──────────────────────────────────────────────────────────

/// `OpSys.csv` → `OpSys.meta.json`.
pub fn metadata_path(table_path: &Path) -> PathBuf {
    table_path.with_extension("meta.json")
}

/// Write `metadata` as pretty JSON next to the table at `table_path`.
///
/// Written to a temporary file then renamed so a reader never sees a
/// partial sidecar.
pub fn write_metadata<T: Serialize>(table_path: &Path, metadata: &T) -> Result<PathBuf> {
    let path = metadata_path(table_path);
    let json = serde_json::to_string_pretty(metadata).map_err(|e| SurveyError::Other(e.into()))?;
    let tmp = path.with_extension("json.tmp");
    let write_err = |source: std::io::Error| SurveyError::OutputWrite {
        path: path.clone(),
        source,
    };
    fs::write(&tmp, json).map_err(write_err)?;
    fs::rename(&tmp, &path).map_err(write_err)?;
    debug!("Wrote metadata {}", path.display());
    Ok(path)
}

pub fn read_metadata<T: DeserializeOwned>(table_path: &Path) -> Result<T> {
    let path = metadata_path(table_path);
    let content = fs::read_to_string(&path).map_err(|source| SurveyError::FileRead {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| SurveyError::Other(e.into()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    fn sample_table() -> AggregateTable {
        let mut table = AggregateTable::new("Year");
        table.set("2020", "Percent", Some(0.9123456789012345));
        table.set("2020", "macOS", Some(1234.0));
        table.set("2020", "Windows", Some(0.1 + 0.2));
        table.set("2021", "macOS", Some(1e-300));
        table.set("2021", "Mac, OS \"X\"", Some(-0.0));
        table.set("2021", "Windows", None);
        table
    }

    // ── round trip ────────────────────────────────────────────────────────────

    #[test]
    fn test_round_trip_is_bit_exact() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("OpSys.csv");
        let table = sample_table();

        write_table(&path, &table).expect("write");
        let loaded = read_table(&path).expect("read");

        assert_eq!(loaded.index_name(), table.index_name());
        assert_eq!(loaded.rows(), table.rows());
        assert_eq!(loaded.columns(), table.columns());
        for r in 0..table.rows().len() {
            for c in 0..table.columns().len() {
                let original = table.get_at(r, c).map(f64::to_bits);
                let reloaded = loaded.get_at(r, c).map(f64::to_bits);
                assert_eq!(original, reloaded, "cell ({r}, {c})");
            }
        }
    }

    #[test]
    fn test_unobserved_cells_stay_unobserved() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("t.csv");
        write_table(&path, &sample_table()).expect("write");

        let loaded = read_table(&path).expect("read");
        assert_eq!(loaded.get("2021", "Windows"), None);
        assert_eq!(loaded.get("2020", "Mac, OS \"X\""), None);
    }

    #[test]
    fn test_written_layout() {
        let mut table = AggregateTable::new("Age");
        table.set("18-24", "Rust", Some(3.0));
        table.set("18-24", "Go", Some(0.5));
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("AgesLangs.csv");
        write_table(&path, &table).expect("write");

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "Age,Rust,Go\n18-24,3,0.5\n");
    }

    // ── read errors ───────────────────────────────────────────────────────────

    #[test]
    fn test_read_invalid_number() {
        let err = parse_table("Year,macOS\n2020,lots\n", Path::new("t.csv")).unwrap_err();
        match err {
            SurveyError::InvalidNumber { row, column, value } => {
                assert_eq!(row, "2020");
                assert_eq!(column, "macOS");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_empty_file_is_missing_header() {
        let err = parse_table("", Path::new("t.csv")).unwrap_err();
        assert!(matches!(err, SurveyError::MissingHeader(_)));
    }

    #[test]
    fn test_read_ragged_record() {
        let err = parse_table("Year,A\n2020,1,2\n", Path::new("t.csv")).unwrap_err();
        assert!(matches!(err, SurveyError::RaggedRecord { found: 3, .. }));
    }

    #[test]
    fn test_read_short_record_padded() {
        let table = parse_table("Year,A,B\n2020,1\n", Path::new("t.csv")).unwrap();
        assert_eq!(table.get("2020", "A"), Some(1.0));
        assert_eq!(table.get("2020", "B"), None);
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_table(Path::new("/nonexistent/OpSys.csv")).unwrap_err();
        assert!(matches!(err, SurveyError::FileRead { .. }));
    }

    #[test]
    fn test_write_to_missing_directory_is_output_error() {
        let err = write_table(Path::new("/nonexistent/dir/OpSys.csv"), &sample_table()).unwrap_err();
        assert!(matches!(err, SurveyError::OutputWrite { .. }));
    }

    // ── metadata ──────────────────────────────────────────────────────────────

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Meta {
        report: String,
        years: Vec<u16>,
    }

    #[test]
    fn test_metadata_path() {
        assert_eq!(
            metadata_path(Path::new("/out/OpSys.csv")),
            PathBuf::from("/out/OpSys.meta.json")
        );
    }

    #[test]
    fn test_metadata_round_trip() {
        let tmp = TempDir::new().expect("tempdir");
        let table_path = tmp.path().join("OpSys.csv");
        let meta = Meta {
            report: "os-adoption".to_string(),
            years: vec![2020, 2021],
        };

        let written = write_metadata(&table_path, &meta).expect("write");
        assert!(written.exists());
        assert!(!written.with_extension("json.tmp").exists());

        let loaded: Meta = read_metadata(&table_path).expect("read");
        assert_eq!(loaded, meta);
    }
}
