//! Heuristic column resolution.
//!
//! Survey instruments rename their questions from year to year, so a
//! [`SemanticField`] is located by the answers a column contains rather than
//! by its header. The first column (in file order) whose distinct values
//! satisfy the field's positive vocabulary and contain none of its negative
//! vocabulary wins. This is deterministic but not semantically validated: two
//! questions offering the same answer set cannot be told apart.

use survey_core::models::{SurveyColumn, SurveyYear};
use survey_core::rules::{MatchMode, SemanticField};
use tracing::{debug, info};

/// Outcome of looking for a semantic field in one year's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldResolution<'a> {
    Found(&'a SurveyColumn),
    /// The year's instrument did not ask the question; not an error.
    Absent,
}

impl<'a> FieldResolution<'a> {
    pub fn column(self) -> Option<&'a SurveyColumn> {
        match self {
            FieldResolution::Found(column) => Some(column),
            FieldResolution::Absent => None,
        }
    }
}

/// Find the column of `survey` that carries `field`.
pub fn resolve_field<'a>(survey: &'a SurveyYear, field: &SemanticField) -> FieldResolution<'a> {
    match survey.columns().iter().find(|c| column_matches(c, field)) {
        Some(column) => {
            debug!(
                "{}: field {} resolved to column '{}'",
                survey.year(),
                field.name,
                column.name
            );
            FieldResolution::Found(column)
        }
        None => {
            info!(
                "{}: no column matches field {}; skipping it for this year",
                survey.year(),
                field.name
            );
            debug!(
                "{}: searched columns {:?}",
                survey.year(),
                survey.column_names().collect::<Vec<_>>()
            );
            FieldResolution::Absent
        }
    }
}

/// Whether `column`'s distinct whole-cell values satisfy `field`.
pub fn column_matches(column: &SurveyColumn, field: &SemanticField) -> bool {
    let distinct = column.distinct_values();
    let has = |value: &String| distinct.contains(value.as_str());

    if field.negative.iter().any(has) {
        return false;
    }
    match field.mode {
        MatchMode::Any => field.positive.iter().any(has),
        MatchMode::All => !field.positive.is_empty() && field.positive.iter().all(has),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
