use std::io::Write;

use survey_core::formatting::{format_currency, format_number, format_share, percentage};
use survey_core::models::AggregateTable;
use survey_data::analysis::Report;

/// How numeric cells of a rendered table are displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellFormat {
    /// `0.0..=1.0` shares shown as percentages.
    Share,
    /// Dollar amounts; a `count` column is still shown as a plain number.
    Currency,
}

impl CellFormat {
    pub fn for_report(report: Report) -> Self {
        match report {
            Report::OsAdoption | Report::LanguagesByAge => CellFormat::Share,
            Report::CompensationByCountry | Report::ExperienceVsCompensation => {
                CellFormat::Currency
            }
        }
    }

    fn cell(self, column: &str, value: Option<f64>) -> String {
        let Some(v) = value else {
            return "-".to_string();
        };
        match self {
            _ if column == "count" => format_number(v, 0),
            CellFormat::Share => format_share(v),
            CellFormat::Currency => format_currency(v),
        }
    }
}

/// Consumes finished tables. Charts are produced elsewhere; this crate only
/// ships a plain-text implementation.
pub trait Renderer {
    fn render(&mut self, table: &AggregateTable, title: &str, format: CellFormat)
        -> anyhow::Result<()>;
}

/// Writes tables as aligned text columns.
pub struct TextRenderer<W: Write> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(
        &mut self,
        table: &AggregateTable,
        title: &str,
        format: CellFormat,
    ) -> anyhow::Result<()> {
        writeln!(self.out, "{title}")?;
        writeln!(self.out, "{}", "=".repeat(title.chars().count()))?;
        self.out.write_all(layout(table, format).as_bytes())?;

        let cells = table.rows().len() * table.columns().len();
        let observed = cells - table.missing_cells().len();
        writeln!(
            self.out,
            "{} rows, {} columns, {}% of cells observed\n",
            table.rows().len(),
            table.columns().len(),
            percentage(observed as f64, cells as f64, 1)
        )?;
        Ok(())
    }
}

/// The table body: header, separator and one line per row.
fn layout(table: &AggregateTable, format: CellFormat) -> String {
    let mut grid: Vec<Vec<String>> = Vec::with_capacity(table.rows().len() + 1);
    let mut header = vec![table.index_name().to_string()];
    header.extend(table.columns().iter().cloned());
    grid.push(header);
    for (r, row) in table.rows().iter().enumerate() {
        let mut line = vec![row.clone()];
        for (c, column) in table.columns().iter().enumerate() {
            line.push(format.cell(column, table.get_at(r, c)));
        }
        grid.push(line);
    }

    let widths: Vec<usize> = (0..grid[0].len())
        .map(|c| grid.iter().map(|line| line[c].chars().count()).max().unwrap_or(0))
        .collect();

    let mut out = String::new();
    for (i, line) in grid.iter().enumerate() {
        let cells: Vec<String> = line
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(c, (cell, &w))| {
                // Labels left-aligned, numbers right-aligned.
                if c == 0 {
                    format!("{cell:<w$}")
                } else {
                    format!("{cell:>w$}")
                }
            })
            .collect();
        out.push_str(cells.join("  ").trim_end());
        out.push('\n');
        if i == 0 {
            let total = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
            out.push_str(&"-".repeat(total));
            out.push('\n');
        }
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
