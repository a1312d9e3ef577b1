use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Separator used inside multi-select answers (`"Windows;Linux"`).
pub const MULTI_VALUE_DELIMITER: char = ';';

/// Cell contents treated as "no answer" in addition to the empty string.
pub const NA_MARKERS: &[&str] = &[
    "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "-nan", "null", "NULL", "#N/A", "#NA", "<NA>",
    "None",
];

// ── Cell / Response ───────────────────────────────────────────────────────────

/// One raw cell as read from a survey export.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cell {
    /// The respondent left the question blank (or the export wrote an NA marker).
    Missing,
    /// The raw, untrimmed answer text.
    Present(String),
}

impl Cell {
    /// Classify a raw field from the CSV reader.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() || NA_MARKERS.contains(&raw) {
            Cell::Missing
        } else {
            Cell::Present(raw.to_string())
        }
    }

    /// The answer text, or `None` when missing.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Missing => None,
            Cell::Present(s) => Some(s.as_str()),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    /// Interpret the cell as a multi-select answer.
    ///
    /// Any present cell is a valid list, even a list of one. Labels are not
    /// trimmed or case-folded.
    pub fn to_response(&self) -> Response {
        match self {
            Cell::Missing => Response::Missing,
            Cell::Present(s) => Response::Present(
                s.split(MULTI_VALUE_DELIMITER).map(str::to_string).collect(),
            ),
        }
    }
}

/// A multi-select answer split into its labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Missing,
    Present(Vec<String>),
}

impl Response {
    /// Labels selected by the respondent; empty for a missing response.
    pub fn labels(&self) -> &[String] {
        match self {
            Response::Missing => &[],
            Response::Present(labels) => labels,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Response::Missing)
    }
}

// ── SurveyYear ────────────────────────────────────────────────────────────────

/// A named column of raw cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyColumn {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl SurveyColumn {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Distinct whole-cell values, missing cells excluded.
    pub fn distinct_values(&self) -> HashSet<&str> {
        self.cells.iter().filter_map(Cell::as_str).collect()
    }

    /// Every cell interpreted as a multi-select answer.
    pub fn responses(&self) -> Vec<Response> {
        self.cells.iter().map(Cell::to_response).collect()
    }
}

/// One year's raw survey export.
///
/// Stored column-major; every column has exactly `row_count` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurveyYear {
    year: u16,
    columns: Vec<SurveyColumn>,
    row_count: usize,
}

impl SurveyYear {
    /// Build from columns. Short columns are padded with [`Cell::Missing`]
    /// so the table stays rectangular.
    pub fn new(year: u16, mut columns: Vec<SurveyColumn>) -> Self {
        let row_count = columns.iter().map(|c| c.cells.len()).max().unwrap_or(0);
        for column in columns.iter_mut() {
            column.cells.resize(row_count, Cell::Missing);
        }
        Self {
            year,
            columns,
            row_count,
        }
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn columns(&self) -> &[SurveyColumn] {
        &self.columns
    }

    /// Column names in original file order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// First column with the exact name `name`.
    pub fn column(&self, name: &str) -> Option<&SurveyColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

// ── AggregateTable ────────────────────────────────────────────────────────────

/// A labelled numeric matrix: rows indexed by year or cohort, columns by
/// category name.
///
/// A `None` cell means "not observed", which is distinct from a zero count
/// until the reconciler fills it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTable {
    index_name: String,
    rows: Vec<String>,
    columns: Vec<String>,
    cells: Vec<Vec<Option<f64>>>,
}

impl AggregateTable {
    /// An empty table whose index axis is called `index_name`.
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            rows: Vec::new(),
            columns: Vec::new(),
            cells: Vec::new(),
        }
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn row_position(&self, row: &str) -> Option<usize> {
        self.rows.iter().position(|r| r == row)
    }

    pub fn column_position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_position(column).is_some()
    }

    /// Row position for `row`, appending an all-`None` row if absent.
    pub fn ensure_row(&mut self, row: &str) -> usize {
        if let Some(pos) = self.row_position(row) {
            return pos;
        }
        self.rows.push(row.to_string());
        self.cells.push(vec![None; self.columns.len()]);
        self.rows.len() - 1
    }

    /// Column position for `column`, appending an all-`None` column if absent.
    pub fn ensure_column(&mut self, column: &str) -> usize {
        if let Some(pos) = self.column_position(column) {
            return pos;
        }
        self.columns.push(column.to_string());
        for row in self.cells.iter_mut() {
            row.push(None);
        }
        self.columns.len() - 1
    }

    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let r = self.row_position(row)?;
        let c = self.column_position(column)?;
        self.cells[r][c]
    }

    /// Cell by position; panics on out-of-range positions.
    pub fn get_at(&self, row: usize, column: usize) -> Option<f64> {
        self.cells[row][column]
    }

    /// Set a cell, creating the row and column as needed.
    pub fn set(&mut self, row: &str, column: &str, value: Option<f64>) {
        let r = self.ensure_row(row);
        let c = self.ensure_column(column);
        self.cells[r][c] = value;
    }

    /// Add `by` to a cell, treating an unobserved cell as zero.
    pub fn increment(&mut self, row: &str, column: &str, by: f64) {
        let r = self.ensure_row(row);
        let c = self.ensure_column(column);
        let cell = &mut self.cells[r][c];
        *cell = Some(cell.unwrap_or(0.0) + by);
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, column: &str) -> Option<Vec<Option<f64>>> {
        let c = self.column_position(column)?;
        Some(self.cells.iter().map(|row| row[c]).collect())
    }

    /// All values of one row, in column order.
    pub fn row_values(&self, row: &str) -> Option<&[Option<f64>]> {
        let r = self.row_position(row)?;
        Some(&self.cells[r])
    }

    /// Replace (or append) a whole column. `values` must have one entry per row.
    pub fn put_column(&mut self, column: &str, values: Vec<Option<f64>>) {
        debug_assert_eq!(values.len(), self.rows.len());
        let c = self.ensure_column(column);
        for (row, value) in self.cells.iter_mut().zip(values) {
            row[c] = value;
        }
    }

    /// Rename a column in place, keeping its position.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_position(from) {
            Some(c) if !self.has_column(to) => {
                self.columns[c] = to.to_string();
                true
            }
            _ => false,
        }
    }

    /// Rename a row in place, keeping its position.
    pub fn rename_row(&mut self, from: &str, to: &str) -> bool {
        match self.row_position(from) {
            Some(r) if self.row_position(to).is_none() => {
                self.rows[r] = to.to_string();
                true
            }
            _ => false,
        }
    }

    /// Remove a column, returning its values.
    pub fn remove_column(&mut self, column: &str) -> Option<Vec<Option<f64>>> {
        let c = self.column_position(column)?;
        self.columns.remove(c);
        Some(self.cells.iter_mut().map(|row| row.remove(c)).collect())
    }

    /// Remove a row, returning its values.
    pub fn remove_row(&mut self, row: &str) -> Option<Vec<Option<f64>>> {
        let r = self.row_position(row)?;
        self.rows.remove(r);
        Some(self.cells.remove(r))
    }

    /// Sum of the observed cells in a row.
    pub fn row_sum(&self, row: &str) -> Option<f64> {
        self.row_values(row)
            .map(|values| values.iter().flatten().sum())
    }

    /// `(row, column)` labels of every unobserved cell.
    pub fn missing_cells(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (r, row) in self.cells.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_none() {
                    out.push((self.rows[r].clone(), self.columns[c].clone()));
                }
            }
        }
        out
    }

    /// Replace every unobserved cell with `value`; returns how many were filled.
    pub fn fill_missing(&mut self, value: f64) -> usize {
        let mut filled = 0;
        for cell in self.cells.iter_mut().flatten() {
            if cell.is_none() {
                *cell = Some(value);
                filled += 1;
            }
        }
        filled
    }

    /// Copy of the table restricted to `rows`, in the given order.
    ///
    /// Returns the new table and the requested labels that were not present.
    pub fn select_rows(&self, rows: &[&str]) -> (AggregateTable, Vec<String>) {
        let mut out = AggregateTable::new(self.index_name.clone());
        out.columns = self.columns.clone();
        let mut skipped = Vec::new();
        for &label in rows {
            match self.row_position(label) {
                Some(r) => {
                    out.rows.push(label.to_string());
                    out.cells.push(self.cells[r].clone());
                }
                None => skipped.push(label.to_string()),
            }
        }
        (out, skipped)
    }

    /// Copy of the table restricted to `columns`, in the given order.
    ///
    /// Returns the new table and the requested labels that were not present.
    pub fn select_columns(&self, columns: &[&str]) -> (AggregateTable, Vec<String>) {
        let mut positions = Vec::new();
        let mut skipped = Vec::new();
        for &label in columns {
            match self.column_position(label) {
                Some(c) => positions.push((label, c)),
                None => skipped.push(label.to_string()),
            }
        }
        let out = AggregateTable {
            index_name: self.index_name.clone(),
            rows: self.rows.clone(),
            columns: positions.iter().map(|(l, _)| l.to_string()).collect(),
            cells: self
                .cells
                .iter()
                .map(|row| positions.iter().map(|&(_, c)| row[c]).collect())
                .collect(),
        };
        (out, skipped)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
