//! Cohort × category cross-tabulation.
//!
//! Rows are the distinct values of a single-valued cohort field, columns the
//! labels of a multi-select field. A record missing either axis lands in the
//! [`NO_RESPONSE`] bucket on that axis, so every record contributes at least
//! one cell.

use std::collections::BTreeSet;

use survey_core::models::{AggregateTable, Cell, Response};
use survey_core::rules::NO_RESPONSE;
use tracing::{debug, warn};

/// Counts of records that needed a sentinel bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrossTabDiagnostics {
    pub records: usize,
    /// Cohort missing, categories present.
    pub cohort_missing: usize,
    /// Categories missing, cohort present.
    pub category_missing: usize,
    /// Both axes missing; recorded in the sentinel/sentinel cell.
    pub both_missing: usize,
}

/// Build a cohort × category count table.
///
/// `cohort` and `categories` are parallel columns of the same record set,
/// the latter already split into labels by the loader. A respondent
/// contributes +1 to each distinct label they selected.
pub fn cross_tabulate(
    index_name: &str,
    cohort: &[Cell],
    categories: &[Response],
) -> (AggregateTable, CrossTabDiagnostics) {
    let mut table = AggregateTable::new(index_name);
    let records = cohort.len().max(categories.len());
    let mut diagnostics = CrossTabDiagnostics {
        records,
        ..Default::default()
    };

    for i in 0..records {
        let cohort_cell = cohort.get(i).unwrap_or(&Cell::Missing);
        let response = categories.get(i).unwrap_or(&Response::Missing);

        let row = match cohort_cell.as_str() {
            Some(value) => value,
            None => NO_RESPONSE,
        };
        let labels: BTreeSet<&str> = response.labels().iter().map(String::as_str).collect();

        match (cohort_cell.is_missing(), labels.is_empty()) {
            (true, true) => diagnostics.both_missing += 1,
            (true, false) => diagnostics.cohort_missing += 1,
            (false, true) => diagnostics.category_missing += 1,
            (false, false) => {}
        }

        if labels.is_empty() {
            table.increment(row, NO_RESPONSE, 1.0);
        } else {
            for label in labels {
                table.increment(row, label, 1.0);
            }
        }
    }

    table.fill_missing(0.0);

    if diagnostics.both_missing > 0 {
        warn!(
            "{} records missing both {} and its category; kept in the {}/{} cell",
            diagnostics.both_missing, index_name, NO_RESPONSE, NO_RESPONSE
        );
    }
    debug!(
        "Cross-tabulated {} records into {} rows x {} columns",
        records,
        table.rows().len(),
        table.columns().len()
    );

    (table, diagnostics)
}

/// Merge row `from` into row `into` and remove `from`.
///
/// When `into` does not exist, `from` is renamed to it. A table without
/// `from` is returned unchanged.
pub fn fold_row(table: &AggregateTable, from: &str, into: &str) -> AggregateTable {
    let mut out = table.clone();
    if from == into || out.row_position(from).is_none() {
        return out;
    }
    if out.row_position(into).is_none() {
        out.rename_row(from, into);
        return out;
    }
    if let Some(values) = out.remove_row(from) {
        let columns: Vec<String> = out.columns().to_vec();
        for (column, value) in columns.iter().zip(values) {
            if let Some(v) = value {
                out.increment(into, column, v);
            }
        }
    }
    debug!("Folded row '{}' into '{}'", from, into);
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
