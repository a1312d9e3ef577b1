//! Reports over numeric answers: compensation by country and compensation by
//! years of coding experience.

use std::collections::BTreeMap;

use survey_core::error::{Result, SurveyError};
use survey_core::models::{AggregateTable, Cell, SurveyColumn, SurveyYear};
use survey_core::rules::{
    COMPENSATION_FIELD, COUNTRY_FIELD, COUNTRY_MIN_MEAN_COMPENSATION, COUNTRY_MIN_RESPONDENTS,
    EXPERIENCE_REQUIRED_FIELDS, YEARS_CODE_FIELD, YEARS_CODE_SUBSTITUTIONS,
};
use survey_core::stats::Summary;
use tracing::debug;

/// Columns of the experience table, a subset of [`Summary::COLUMNS`].
pub const EXPERIENCE_COLUMNS: &[&str] = &["count", "mean", "q1", "median", "q3"];

/// Parse a present cell as a finite number.
pub fn parse_number(cell: &Cell) -> Option<f64> {
    cell.as_str()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Years-of-coding answer as a number, applying the text substitutions.
pub fn parse_years_code(cell: &Cell) -> Option<f64> {
    let raw = cell.as_str()?;
    YEARS_CODE_SUBSTITUTIONS
        .iter()
        .find(|(text, _)| *text == raw)
        .map(|(_, value)| *value)
        .or_else(|| parse_number(cell))
}

fn require<'a>(survey: &'a SurveyYear, name: &str) -> Result<&'a SurveyColumn> {
    survey
        .column(name)
        .ok_or_else(|| SurveyError::MissingColumn {
            year: survey.year(),
            column: name.to_string(),
        })
}

// ── Compensation by country ───────────────────────────────────────────────────

/// Box-plot statistics of yearly compensation per country.
///
/// Rows with no country or a non-numeric compensation are dropped. Only
/// countries averaging above the compensation threshold with more than the
/// minimum number of respondents are kept.
pub fn compensation_by_country(survey: &SurveyYear) -> Result<AggregateTable> {
    let countries = require(survey, COUNTRY_FIELD)?;
    let compensation = require(survey, COMPENSATION_FIELD)?;

    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let mut dropped = 0usize;
    for (country, comp) in countries.cells.iter().zip(&compensation.cells) {
        match (country.as_str(), parse_number(comp)) {
            (Some(country), Some(value)) => groups.entry(country).or_default().push(value),
            _ => dropped += 1,
        }
    }
    debug!(
        "{}: {} rows without country or compensation dropped",
        survey.year(),
        dropped
    );

    let mut table = AggregateTable::new(COUNTRY_FIELD);
    let mut filtered = 0usize;
    for (country, values) in &groups {
        let Some(summary) = Summary::from_values(values) else {
            continue;
        };
        if summary.mean <= COUNTRY_MIN_MEAN_COMPENSATION || summary.count <= COUNTRY_MIN_RESPONDENTS
        {
            filtered += 1;
            continue;
        }
        for (column, value) in Summary::COLUMNS.iter().zip(summary.values()) {
            table.set(country, column, Some(value));
        }
    }
    debug!(
        "{}: kept {} countries, filtered {}",
        survey.year(),
        table.rows().len(),
        filtered
    );
    Ok(table)
}

// ── Experience vs compensation ────────────────────────────────────────────────

/// Compensation statistics per years-of-coding value, ascending.
///
/// Only records answering every one of the required fields are used.
pub fn experience_vs_compensation(survey: &SurveyYear) -> Result<AggregateTable> {
    let required: Vec<&SurveyColumn> = EXPERIENCE_REQUIRED_FIELDS
        .iter()
        .map(|name| require(survey, name))
        .collect::<Result<_>>()?;
    let years_code = require(survey, YEARS_CODE_FIELD)?;
    let compensation = require(survey, COMPENSATION_FIELD)?;

    let mut points: Vec<(f64, f64)> = Vec::new();
    for row in 0..survey.row_count() {
        if required.iter().any(|c| c.cells[row].is_missing()) {
            continue;
        }
        if let (Some(years), Some(comp)) = (
            parse_years_code(&years_code.cells[row]),
            parse_number(&compensation.cells[row]),
        ) {
            points.push((years, comp));
        }
    }
    debug!(
        "{}: {} of {} records complete for the experience report",
        survey.year(),
        points.len(),
        survey.row_count()
    );

    points.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut groups: Vec<(f64, Vec<f64>)> = Vec::new();
    for (years, comp) in points {
        match groups.last_mut() {
            Some((last, values)) if *last == years => values.push(comp),
            _ => groups.push((years, vec![comp])),
        }
    }

    let mut table = AggregateTable::new(YEARS_CODE_FIELD);
    for (years, values) in &groups {
        let Some(summary) = Summary::from_values(values) else {
            continue;
        };
        let row = years.to_string();
        let stats = [
            summary.count as f64,
            summary.mean,
            summary.q1,
            summary.median,
            summary.q3,
        ];
        for (column, value) in EXPERIENCE_COLUMNS.iter().zip(stats) {
            table.set(&row, column, Some(value));
        }
    }
    Ok(table)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
