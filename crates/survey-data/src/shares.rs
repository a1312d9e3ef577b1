//! Percentage tables handed to the renderer.
//!
//! A zero or unobserved denominator always yields an unobserved cell.

use survey_core::models::AggregateTable;
use survey_core::rules::{
    AGE_BRACKETS, CUMULATIVE_LINUX, LANGUAGE_COLUMNS, LINUX_DISTRIBUTIONS, OS_HEADLINE_COLUMNS,
    OS_TOTAL,
};
use tracing::{debug, info};

/// The two OS views: headline categories over all answers, and each Linux
/// distribution over all Linux answers.
#[derive(Debug, Clone, PartialEq)]
pub struct OsShares {
    pub headline: AggregateTable,
    pub linux: AggregateTable,
}

/// Divide each of `columns` by `denominator`, row by row.
///
/// Columns not present in `table` are skipped and logged.
pub fn share_of(table: &AggregateTable, columns: &[&str], denominator: &str) -> AggregateTable {
    let (selected, skipped) = table.select_columns(columns);
    if !skipped.is_empty() {
        info!("Share table over '{}' skips absent columns {:?}", denominator, skipped);
    }

    let mut out = AggregateTable::new(table.index_name());
    for row in selected.rows() {
        out.ensure_row(row);
    }
    for column in selected.columns() {
        out.ensure_column(column);
    }

    let divisors = table
        .column_values(denominator)
        .unwrap_or_else(|| vec![None; table.rows().len()]);
    for (r, row) in selected.rows().iter().enumerate() {
        let divisor = divisors[r].filter(|d| *d != 0.0);
        for (c, column) in selected.columns().iter().enumerate() {
            let share = match (selected.get_at(r, c), divisor) {
                (Some(value), Some(d)) => Some(value / d),
                _ => None,
            };
            out.set(row, column, share);
        }
    }
    out
}

/// Both OS share tables from a reconciled OS table.
pub fn os_shares(table: &AggregateTable) -> OsShares {
    OsShares {
        headline: share_of(table, OS_HEADLINE_COLUMNS, OS_TOTAL),
        linux: share_of(table, LINUX_DISTRIBUTIONS, CUMULATIVE_LINUX),
    }
}

/// Restrict to `rows` × `columns` (in that order) and normalise each row to
/// sum to 1.
pub fn normalize_rows(table: &AggregateTable, rows: &[&str], columns: &[&str]) -> AggregateTable {
    let (by_row, skipped_rows) = table.select_rows(rows);
    let (selected, skipped_columns) = by_row.select_columns(columns);
    if !skipped_rows.is_empty() {
        info!("Skipping absent cohorts {:?}", skipped_rows);
    }
    if !skipped_columns.is_empty() {
        debug!("Skipping absent categories {:?}", skipped_columns);
    }

    let mut out = selected.clone();
    for row in selected.rows() {
        let sum = selected.row_sum(row).filter(|s| *s != 0.0);
        for column in selected.columns() {
            let share = match (selected.get(row, column), sum) {
                (Some(value), Some(s)) => Some(value / s),
                _ => None,
            };
            out.set(row, column, share);
        }
    }
    out
}

/// Share of each age bracket using each language.
pub fn cohort_shares(table: &AggregateTable) -> AggregateTable {
    normalize_rows(table, AGE_BRACKETS, LANGUAGE_COLUMNS)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::rules::CUMULATIVE_WINDOWS;

    fn reconciled_os() -> AggregateTable {
        let mut table = AggregateTable::new("Year");
        for (row, mac, win, linux, ubuntu, total) in [
            ("2020", 20.0, 50.0, 30.0, 0.0, 100.0),
            ("2021", 0.0, 0.0, 0.0, 0.0, 0.0),
        ] {
            table.set(row, "macOS", Some(mac));
            table.set(row, CUMULATIVE_WINDOWS, Some(win));
            table.set(row, "Linux", Some(linux));
            table.set(row, "Ubuntu", Some(ubuntu));
            table.set(row, CUMULATIVE_LINUX, Some(linux + ubuntu));
            table.set(row, OS_TOTAL, Some(total));
        }
        table
    }

    // ── os_shares ─────────────────────────────────────────────────────────────

    #[test]
    fn test_headline_shares_divide_by_total() {
        let shares = os_shares(&reconciled_os());
        assert_eq!(shares.headline.get("2020", "macOS"), Some(0.2));
        assert_eq!(shares.headline.get("2020", CUMULATIVE_LINUX), Some(0.3));
        // BSD and Other were never observed.
        assert!(!shares.headline.has_column("BSD"));
    }

    #[test]
    fn test_zero_denominator_is_unobserved() {
        let shares = os_shares(&reconciled_os());
        assert_eq!(shares.headline.get("2021", "macOS"), None);
        assert_eq!(shares.linux.get("2021", "Linux"), None);
    }

    #[test]
    fn test_linux_shares_divide_by_cumulative() {
        let shares = os_shares(&reconciled_os());
        assert_eq!(shares.linux.get("2020", "Linux"), Some(1.0));
        assert_eq!(shares.linux.get("2020", "Ubuntu"), Some(0.0));
    }

    #[test]
    fn test_missing_denominator_column() {
        let mut table = AggregateTable::new("Year");
        table.set("2020", "macOS", Some(3.0));
        let out = share_of(&table, &["macOS"], OS_TOTAL);
        assert_eq!(out.get("2020", "macOS"), None);
        assert_eq!(out.rows(), ["2020".to_string()]);
    }

    // ── cohort_shares ─────────────────────────────────────────────────────────

    #[test]
    fn test_rows_normalised_to_one() {
        let mut table = AggregateTable::new("Age");
        table.set("25-34 years old", "Rust", Some(1.0));
        table.set("25-34 years old", "Go", Some(3.0));
        table.set("25-34 years old", "NotRespond", Some(100.0));
        table.set("18-24 years old", "Rust", Some(2.0));
        table.set("18-24 years old", "Go", Some(0.0));

        let shares = cohort_shares(&table);

        assert_eq!(shares.rows()[0], "18-24 years old");
        assert!(!shares.has_column("NotRespond"));
        assert_eq!(shares.get("25-34 years old", "Rust"), Some(0.25));
        assert_eq!(shares.get("25-34 years old", "Go"), Some(0.75));
        assert_eq!(shares.get("18-24 years old", "Rust"), Some(1.0));
        for row in shares.rows() {
            let sum = shares.row_sum(row).unwrap();
            assert!((sum - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_language_order_follows_display_list() {
        let mut table = AggregateTable::new("Age");
        table.set("18-24 years old", "Rust", Some(1.0));
        table.set("18-24 years old", "Swift", Some(1.0));
        let shares = cohort_shares(&table);
        assert_eq!(shares.columns(), ["Swift".to_string(), "Rust".to_string()]);
    }

    #[test]
    fn test_all_zero_row_is_unobserved() {
        let mut table = AggregateTable::new("Age");
        table.set("65 years or older", "Rust", Some(0.0));
        let shares = cohort_shares(&table);
        assert_eq!(shares.get("65 years or older", "Rust"), None);
    }
}
