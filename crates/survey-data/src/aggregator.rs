//! Per-year tallies of multi-select answers.
//!
//! Replaces the nested `category → year → count` accumulator with one
//! [`YearTally`] per year, assembled into an [`AggregateTable`] only once
//! every year has been tallied.

use std::collections::{BTreeMap, BTreeSet};

use survey_core::models::{AggregateTable, Response, SurveyColumn};

// ── YearTally ─────────────────────────────────────────────────────────────────

/// Label counts for one semantic field in one survey year.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct YearTally {
    pub year: u16,
    pub field: String,
    /// Respondents selecting each label. Labels are exact, untrimmed strings.
    pub counts: BTreeMap<String, u64>,
    /// Number of cells examined.
    pub total: usize,
    /// Number of missing cells.
    pub missing: usize,
}

impl YearTally {
    /// Count for `label`, zero if never selected.
    pub fn count(&self, label: &str) -> u64 {
        self.counts.get(label).copied().unwrap_or(0)
    }

    /// Respondents who answered at all.
    pub fn respondents(&self) -> usize {
        self.total - self.missing
    }

    /// Sum of all label counts; exceeds `respondents` for multi-select answers.
    pub fn selections(&self) -> u64 {
        self.counts.values().sum()
    }

    /// `1 - missing / total`; zero for an empty column.
    pub fn response_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        1.0 - (self.missing as f64 / self.total as f64)
    }

    pub fn missing_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.missing as f64 / self.total as f64
    }
}

// ── MultiValueAggregator ──────────────────────────────────────────────────────

/// Stateless helper that tallies delimited answers.
pub struct MultiValueAggregator;

impl MultiValueAggregator {
    /// Tally the responses of a resolved survey column.
    pub fn tally(year: u16, field: &str, column: &SurveyColumn) -> YearTally {
        Self::tally_responses(year, field, &column.responses())
    }

    /// Tally already-split responses.
    ///
    /// A respondent contributes at most +1 to each label they selected.
    pub fn tally_responses(year: u16, field: &str, responses: &[Response]) -> YearTally {
        let mut tally = YearTally {
            year,
            field: field.to_string(),
            total: responses.len(),
            ..Default::default()
        };

        for response in responses {
            match response {
                Response::Missing => tally.missing += 1,
                Response::Present(labels) => {
                    let unique: BTreeSet<&str> = labels.iter().map(String::as_str).collect();
                    for label in unique {
                        *tally.counts.entry(label.to_string()).or_insert(0) += 1;
                    }
                }
            }
        }

        tally
    }

    /// Assemble per-year tallies into a table indexed by year.
    ///
    /// When `rate_column` is given it becomes the first column and holds each
    /// year's response rate. A label never selected in a year is left
    /// unobserved (`None`), not zero.
    pub fn to_table(tallies: &[YearTally], rate_column: Option<&str>) -> AggregateTable {
        let mut table = AggregateTable::new("Year");
        for tally in tallies {
            let row = tally.year.to_string();
            table.ensure_row(&row);
            if let Some(rate) = rate_column {
                table.set(&row, rate, Some(tally.response_rate()));
            }
            for (label, &count) in &tally.counts {
                table.set(&row, label, Some(count as f64));
            }
        }
        table
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
