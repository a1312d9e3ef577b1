//! Report pipelines.
//!
//! Each report loads its inputs, runs the relevant stages and returns a
//! [`ReportOutput`]: the finished table plus metadata describing coverage.
//! Per-year problems end up in the metadata; only a report with no usable
//! input at all is an error.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use survey_core::error::{Result, SurveyError};
use survey_core::models::{AggregateTable, SurveyYear};
use survey_core::rules::{
    ReconciliationRules, SemanticField, AGE_FIELD, LANGUAGE_FIELD, NO_RESPONSE, PREFER_NOT_TO_SAY,
    RESPONSE_RATE_COLUMN,
};
use tracing::{debug, info, warn};

use crate::aggregator::MultiValueAggregator;
use crate::crosstab::{cross_tabulate, fold_row};
use crate::export::{read_metadata, read_table, write_metadata, write_table};
use crate::loader::{load_years, LoadOutcome};
use crate::numeric::{compensation_by_country, experience_vs_compensation};
use crate::reconciler::CategoryReconciler;
use crate::resolver::{resolve_field, FieldResolution};
use crate::shares::{cohort_shares, os_shares};

// ── Report ────────────────────────────────────────────────────────────────────

/// The reports this pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Report {
    OsAdoption,
    LanguagesByAge,
    CompensationByCountry,
    ExperienceVsCompensation,
}

impl Report {
    pub const ALL: [Report; 4] = [
        Report::OsAdoption,
        Report::LanguagesByAge,
        Report::CompensationByCountry,
        Report::ExperienceVsCompensation,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Report::OsAdoption => "os-adoption",
            Report::LanguagesByAge => "languages-by-age",
            Report::CompensationByCountry => "compensation-by-country",
            Report::ExperienceVsCompensation => "experience-vs-compensation",
        }
    }

    /// File name of the exported table.
    pub fn output_file(&self) -> &'static str {
        match self {
            Report::OsAdoption => "OpSys.csv",
            Report::LanguagesByAge => "AgesLangs.csv",
            Report::CompensationByCountry => "CompByCountry.csv",
            Report::ExperienceVsCompensation => "ExperienceComp.csv",
        }
    }

    /// Whether the report spans every requested year or only the latest one.
    pub fn is_multi_year(&self) -> bool {
        matches!(self, Report::OsAdoption)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Report {
    type Err = SurveyError;

    fn from_str(s: &str) -> Result<Self> {
        Report::ALL
            .into_iter()
            .find(|r| r.name() == s)
            .ok_or_else(|| SurveyError::Config(format!("Unknown report: {s}")))
    }
}

// ── Public types ──────────────────────────────────────────────────────────────

/// A year that contributed nothing because its export could not be loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedYear {
    pub year: u16,
    pub reason: String,
}

/// Metadata written next to every exported table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// ISO-8601 timestamp when the table was generated.
    pub generated_at: String,
    pub report: Report,
    /// Name of the table's index axis.
    pub index: String,
    pub years_loaded: Vec<u16>,
    pub years_failed: Vec<FailedYear>,
    /// Absent fields, reconciliation gaps and similar coverage notes.
    pub warnings: Vec<String>,
    pub rows: usize,
    pub columns: usize,
    /// Wall-clock seconds spent reading the survey exports.
    pub load_time_seconds: f64,
    /// Wall-clock seconds spent building the table.
    pub transform_time_seconds: f64,
}

/// The complete output of [`collect`].
#[derive(Debug, Clone)]
pub struct ReportOutput {
    pub table: AggregateTable,
    pub metadata: ReportMetadata,
}

/// Inputs shared by every report.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub data_dir: PathBuf,
    /// Years read by multi-year reports.
    pub years: Vec<u16>,
    /// The year read by single-year reports.
    pub latest_year: u16,
    pub rules: ReconciliationRules,
}

// ── Collection ────────────────────────────────────────────────────────────────

/// Run the collection stage of `report`.
pub fn collect(report: Report, request: &ReportRequest) -> Result<ReportOutput> {
    let years = if report.is_multi_year() {
        request.years.clone()
    } else {
        vec![request.latest_year]
    };

    // ── Step 1: Load ──────────────────────────────────────────────────────────
    let load_start = Instant::now();
    let LoadOutcome { loaded, failed } = load_years(&request.data_dir, &years);
    let load_time = load_start.elapsed().as_secs_f64();

    let years_failed: Vec<FailedYear> = failed
        .iter()
        .map(|e| FailedYear {
            year: e.year,
            reason: e.source.to_string(),
        })
        .collect();
    if loaded.is_empty() {
        let reason = years_failed
            .first()
            .map(|f| format!("{}: {}", f.year, f.reason))
            .unwrap_or_else(|| "no years requested".to_string());
        return Err(SurveyError::NoInputs {
            path: request.data_dir.clone(),
            reason,
        });
    }

    // ── Step 2: Transform ─────────────────────────────────────────────────────
    let transform_start = Instant::now();
    let mut warnings: Vec<String> = years_failed
        .iter()
        .map(|f| format!("{}: not loaded ({})", f.year, f.reason))
        .collect();
    let table = match report {
        Report::OsAdoption => os_adoption_table(&loaded, &request.rules, &mut warnings),
        Report::LanguagesByAge => languages_by_age_table(&loaded[0], &mut warnings)?,
        Report::CompensationByCountry => compensation_by_country(&loaded[0])?,
        Report::ExperienceVsCompensation => experience_vs_compensation(&loaded[0])?,
    };
    let transform_time = transform_start.elapsed().as_secs_f64();

    let metadata = ReportMetadata {
        generated_at: Utc::now().to_rfc3339(),
        report,
        index: table.index_name().to_string(),
        years_loaded: loaded.iter().map(SurveyYear::year).collect(),
        years_failed,
        warnings,
        rows: table.rows().len(),
        columns: table.columns().len(),
        load_time_seconds: load_time,
        transform_time_seconds: transform_time,
    };
    info!(
        "Collected {}: {} rows x {} columns from {} year(s)",
        report,
        metadata.rows,
        metadata.columns,
        metadata.years_loaded.len()
    );

    Ok(ReportOutput { table, metadata })
}

/// Operating-system adoption by year, reconciled.
pub fn os_adoption_table(
    surveys: &[SurveyYear],
    rules: &ReconciliationRules,
    warnings: &mut Vec<String>,
) -> AggregateTable {
    let field = SemanticField::operating_system();
    let mut tallies = Vec::with_capacity(surveys.len());
    for survey in surveys {
        match resolve_field(survey, &field) {
            FieldResolution::Found(column) => {
                let tally = MultiValueAggregator::tally(survey.year(), &field.name, column);
                debug!(
                    "{}: {} respondents, {} selections, {:.1}% missing",
                    tally.year,
                    tally.respondents(),
                    tally.selections(),
                    tally.missing_rate() * 100.0
                );
                tallies.push(tally);
            }
            FieldResolution::Absent => {
                warnings.push(format!("{}: field {} absent", survey.year(), field.name));
            }
        }
    }
    tallies.sort_by_key(|t| t.year);

    let raw = MultiValueAggregator::to_table(&tallies, Some(RESPONSE_RATE_COLUMN));
    let (table, report) = CategoryReconciler::new(rules.clone()).reconcile(&raw);
    warnings.extend(report.gaps.iter().map(|g| g.to_string()));
    if report.filled_cells > 0 {
        warnings.push(format!(
            "{} unobserved cells filled with zero",
            report.filled_cells
        ));
    }
    table
}

/// Age bracket × language counts for one year.
pub fn languages_by_age_table(
    survey: &SurveyYear,
    warnings: &mut Vec<String>,
) -> Result<AggregateTable> {
    let column = |name: &str| {
        survey.column(name).ok_or_else(|| SurveyError::MissingColumn {
            year: survey.year(),
            column: name.to_string(),
        })
    };
    let ages = column(AGE_FIELD)?;
    let languages = column(LANGUAGE_FIELD)?;

    let (table, diagnostics) = cross_tabulate(AGE_FIELD, &ages.cells, &languages.responses());
    if diagnostics.both_missing > 0 {
        warnings.push(format!(
            "{}: {} records answered neither {} nor {}",
            survey.year(),
            diagnostics.both_missing,
            AGE_FIELD,
            LANGUAGE_FIELD
        ));
    }
    Ok(fold_row(&table, NO_RESPONSE, PREFER_NOT_TO_SAY))
}

// ── Persistence ───────────────────────────────────────────────────────────────

/// Path of `report`'s exported table under `output_dir`.
pub fn report_path(output_dir: &Path, report: Report) -> PathBuf {
    output_dir.join(report.output_file())
}

/// Export the table and its metadata sidecar; returns the table path.
pub fn write_report(output_dir: &Path, output: &ReportOutput) -> Result<PathBuf> {
    let path = report_path(output_dir, output.metadata.report);
    write_table(&path, &output.table)?;
    write_metadata(&path, &output.metadata)?;
    Ok(path)
}

/// Reload a previously exported table.
pub fn read_report(output_dir: &Path, report: Report) -> Result<AggregateTable> {
    read_table(&report_path(output_dir, report))
}

/// Reload the metadata sidecar of a previously exported table.
pub fn read_report_metadata(output_dir: &Path, report: Report) -> Result<ReportMetadata> {
    read_metadata(&report_path(output_dir, report))
}

// ── Presentation ──────────────────────────────────────────────────────────────

/// Titled tables ready for the renderer, derived from an exported table.
pub fn presentation_tables(report: Report, table: &AggregateTable) -> Vec<(String, AggregateTable)> {
    let tables = match report {
        Report::OsAdoption => {
            let shares = os_shares(table);
            vec![
                (
                    "Share of respondents using each operating system, by year".to_string(),
                    shares.headline,
                ),
                (
                    "Share of Linux users on each distribution, by year".to_string(),
                    shares.linux,
                ),
            ]
        }
        Report::LanguagesByAge => vec![(
            "Share of each age group using each language".to_string(),
            cohort_shares(table),
        )],
        Report::CompensationByCountry => vec![(
            "Yearly compensation by country".to_string(),
            table.clone(),
        )],
        Report::ExperienceVsCompensation => vec![(
            "Yearly compensation by years of coding".to_string(),
            table.clone(),
        )],
    };
    for (title, t) in &tables {
        if t.is_empty() {
            warn!("'{}' has nothing to show", title);
        }
    }
    tables
}

// ── Tests ─────────────────────────────────────────────────────────────────────
