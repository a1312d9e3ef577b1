//! Category reconciliation across survey years.
//!
//! Applied to a tallied [`AggregateTable`] in a fixed order: drop, merge
//! aliases, detect gaps, fill unobserved cells with zero, then derive the
//! total and cumulative columns from canonical categories only.

use std::collections::HashSet;

use survey_core::models::AggregateTable;
use survey_core::rules::{AliasRule, ReconciliationRules};
use tracing::{debug, info, warn};

/// A cumulative rule's constituent that was not observed for one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationGap {
    /// Row label (the year).
    pub row: String,
    /// Name of the cumulative rule.
    pub rule: String,
    pub category: String,
}

impl std::fmt::Display for ReconciliationGap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: '{}' has no observations; counted as zero in {}",
            self.row, self.category, self.rule
        )
    }
}

/// What reconciliation changed and which coverage holes it papered over.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconciliationReport {
    /// Columns removed by the drop list.
    pub dropped: Vec<String>,
    /// Alias columns folded into their canonical column.
    pub merged: Vec<String>,
    pub gaps: Vec<ReconciliationGap>,
    /// Constituents that no row observed; treated as zero and not created.
    pub unobserved: Vec<(String, String)>,
    /// Cells replaced with zero.
    pub filled_cells: usize,
}

/// Applies a [`ReconciliationRules`] table.
#[derive(Debug, Clone)]
pub struct CategoryReconciler {
    rules: ReconciliationRules,
}

impl CategoryReconciler {
    pub fn new(rules: ReconciliationRules) -> Self {
        Self { rules }
    }

    /// Reconcile `table`, returning a new table and a report.
    ///
    /// Idempotent for tables that pass [`ReconciliationRules::validate`]:
    /// reconciling the output again yields the same table.
    pub fn reconcile(&self, table: &AggregateTable) -> (AggregateTable, ReconciliationReport) {
        let mut out = table.clone();
        let mut report = ReconciliationReport::default();

        for label in &self.rules.drop {
            if out.remove_column(label).is_some() {
                debug!("Dropped column '{}'", label);
                report.dropped.push(label.clone());
            }
        }

        for rule in &self.rules.aliases {
            report.merged.extend(merge_aliases(&mut out, rule));
        }

        self.detect_gaps(&out, &mut report);

        report.filled_cells = out.fill_missing(0.0);
        if report.filled_cells > 0 {
            warn!(
                "Filled {} unobserved cells with zero; 'not asked' and 'no respondents' are no longer distinguishable",
                report.filled_cells
            );
        }

        if let Some(total) = &self.rules.total {
            let derived: HashSet<&str> = self.rules.derived_columns().into_iter().collect();
            let summed: Vec<String> = out
                .columns()
                .iter()
                .filter(|c| !derived.contains(c.as_str()) && !total.exclude.contains(*c))
                .cloned()
                .collect();
            let values = sum_columns(&out, &summed);
            out.put_column(&total.name, values);
        }

        for rule in &self.rules.cumulative {
            let values = sum_columns(&out, &rule.constituents);
            out.put_column(&rule.name, values);
        }

        info!(
            "Reconciled {} rows x {} columns ({} merged, {} dropped, {} gaps)",
            out.rows().len(),
            out.columns().len(),
            report.merged.len(),
            report.dropped.len(),
            report.gaps.len()
        );

        (out, report)
    }

    fn detect_gaps(&self, table: &AggregateTable, report: &mut ReconciliationReport) {
        for rule in &self.rules.cumulative {
            for category in &rule.constituents {
                let Some(values) = table.column_values(category) else {
                    debug!("{}: constituent '{}' never observed", rule.name, category);
                    report.unobserved.push((rule.name.clone(), category.clone()));
                    continue;
                };
                for (row, value) in table.rows().iter().zip(values) {
                    if value.is_none() {
                        let gap = ReconciliationGap {
                            row: row.clone(),
                            rule: rule.name.clone(),
                            category: category.clone(),
                        };
                        warn!("{}", gap);
                        report.gaps.push(gap);
                    }
                }
            }
        }
    }
}

/// Fold every alias column of `rule` into its canonical column.
///
/// When the canonical column does not exist yet, the first alias found is
/// renamed in place. Returns the alias labels that were merged.
fn merge_aliases(table: &mut AggregateTable, rule: &AliasRule) -> Vec<String> {
    let mut merged = Vec::new();
    for alias in &rule.aliases {
        if alias == &rule.canonical || !table.has_column(alias) {
            continue;
        }
        if !table.has_column(&rule.canonical) {
            table.rename_column(alias, &rule.canonical);
            merged.push(alias.clone());
            continue;
        }
        let Some(alias_values) = table.remove_column(alias) else {
            continue;
        };
        let canonical_values = table.column_values(&rule.canonical).unwrap_or_default();
        let combined = canonical_values
            .into_iter()
            .zip(alias_values)
            .map(|pair| match pair {
                (None, None) => None,
                (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
            })
            .collect();
        table.put_column(&rule.canonical, combined);
        merged.push(alias.clone());
    }
    if !merged.is_empty() {
        debug!("Merged {:?} into '{}'", merged, rule.canonical);
    }
    merged
}

/// Row-wise sum of `columns`; absent columns and unobserved cells count as zero.
fn sum_columns<S: AsRef<str>>(table: &AggregateTable, columns: &[S]) -> Vec<Option<f64>> {
    let positions: Vec<usize> = columns
        .iter()
        .filter_map(|c| table.column_position(c.as_ref()))
        .collect();
    (0..table.rows().len())
        .map(|r| {
            Some(
                positions
                    .iter()
                    .map(|&c| table.get_at(r, c).unwrap_or(0.0))
                    .sum(),
            )
        })
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
