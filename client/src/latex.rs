//! LaTeX `tabular` export for row/column tables.
//!
//! DESIGN
//! ======
//! Cells arrive as display markup (see [`crate::sanitize`]). Export runs four
//! steps left to right:
//! 1. undo the display markup (`<code>` → `\texttt`, entities, `<br />`),
//! 2. turn multi-line cells into `\multirow` blocks sized by their widest line,
//! 3. pad each row holding a multirow cell with blank rows so the columns
//!    below it stay aligned,
//! 4. emit the `tabular` environment.
//!
//! A row may hold at most one multirow cell; two would need different padding
//! and the export fails instead of emitting misaligned LaTeX.

#[cfg(test)]
#[path = "latex_test.rs"]
mod latex_test;

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorCode;
use crate::sanitize::{LINE_BREAK_TAG, pattern, unescape_brackets};

static CODE_TAG: LazyLock<Regex> = LazyLock::new(|| pattern(r"<code>(.*?)</code>"));

#[derive(Debug, thiserror::Error)]
pub enum LatexError {
    #[error("table has no headers")]
    EmptyHeaders,
    #[error("row {row} has {found} cells, expected {expected}")]
    RowLengthMismatch { row: usize, expected: usize, found: usize },
    #[error("row {row} has more than one multi-line cell")]
    MultipleMultirowCells { row: usize },
    #[error("invalid table payload: {0}")]
    InvalidTable(#[from] serde_json::Error),
}

impl ErrorCode for LatexError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyHeaders => "E_EMPTY_HEADERS",
            Self::RowLengthMismatch { .. } => "E_ROW_LENGTH_MISMATCH",
            Self::MultipleMultirowCells { .. } => "E_MULTIPLE_MULTIROW_CELLS",
            Self::InvalidTable(_) => "E_INVALID_TABLE",
        }
    }
}

/// A table as the `connected_tables` element carries it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableModel {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableModel {
    #[must_use]
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { title: None, headers, rows }
    }

    /// Check the header/row shape the formatter relies on.
    ///
    /// # Errors
    ///
    /// [`LatexError::EmptyHeaders`] or [`LatexError::RowLengthMismatch`].
    pub fn validate(&self) -> Result<(), LatexError> {
        if self.headers.is_empty() {
            return Err(LatexError::EmptyHeaders);
        }
        let expected = self.headers.len();
        for (row, cells) in self.rows.iter().enumerate() {
            if cells.len() != expected {
                return Err(LatexError::RowLengthMismatch { row, expected, found: cells.len() });
            }
        }
        Ok(())
    }
}

/// One cell after multiline resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Cell {
    Plain(String),
    Multirow { lines: usize, markup: String },
}

impl Cell {
    fn into_markup(self) -> String {
        match self {
            Self::Plain(text) => text,
            Self::Multirow { markup, .. } => markup,
        }
    }
}

/// Undo display markup for one cell.
#[must_use]
pub fn sanitize_cell(value: &str) -> String {
    let value = CODE_TAG.replace_all(value, r"\texttt{${1}}");
    unescape_brackets(&value).replace(LINE_BREAK_TAG, "\n")
}

fn resolve_multiline(value: String) -> Cell {
    if !value.contains('\n') {
        return Cell::Plain(value);
    }
    let lines: Vec<&str> = value.split('\n').collect();
    let widest = lines.iter().map(|line| line.encode_utf16().count()).max().unwrap_or(0);
    let width = half_width(widest);
    let body = lines.join("\\\\");
    Cell::Multirow {
        lines: lines.len(),
        markup: format!("\\multirow{{{}}}{{*}}{{\\parbox{{{width}em}}{{\\centering {body}}}}}", lines.len()),
    }
}

/// Half of `units`, printed without a trailing `.0`.
///
/// Line width is measured in UTF-16 code units, so a character outside the
/// Basic Multilingual Plane counts twice.
fn half_width(units: usize) -> String {
    if units % 2 == 0 {
        format!("{}", units / 2)
    } else {
        format!("{}.5", units / 2)
    }
}

/// Rows as they will be emitted, including blank padding rows.
///
/// # Errors
///
/// Shape errors from [`TableModel::validate`] and
/// [`LatexError::MultipleMultirowCells`].
pub fn expand_rows(table: &TableModel) -> Result<Vec<Vec<String>>, LatexError> {
    table.validate()?;
    let columns = table.headers.len();
    let mut expanded = Vec::with_capacity(table.rows.len());

    for (row, cells) in table.rows.iter().enumerate() {
        let cells: Vec<Cell> = cells
            .iter()
            .map(|value| resolve_multiline(sanitize_cell(value)))
            .collect();
        let spans: Vec<usize> = cells
            .iter()
            .filter_map(|cell| match cell {
                Cell::Multirow { lines, .. } => Some(*lines),
                Cell::Plain(_) => None,
            })
            .collect();
        if spans.len() > 1 {
            return Err(LatexError::MultipleMultirowCells { row });
        }

        expanded.push(cells.into_iter().map(Cell::into_markup).collect());
        let span = spans.first().copied().unwrap_or(1);
        for _ in 1..span {
            expanded.push(vec![String::new(); columns]);
        }
    }
    Ok(expanded)
}

/// Render `table` as a centered LaTeX `tabular`.
///
/// # Errors
///
/// Any error from [`expand_rows`].
pub fn to_latex(table: &TableModel) -> Result<String, LatexError> {
    let rows = expand_rows(table)?;
    let columns = vec!["c"; table.headers.len()].join(" ");
    let header = table.headers.join(" & ");
    let body = rows
        .iter()
        .map(|cells| cells.join(" & "))
        .collect::<Vec<_>>()
        .join(" \\\\\n");
    Ok(format!(
        "\\begin{{center}}\n\\begin{{tabular}}{{{columns}}}\n{header} \\\\\n\\hline\n{body}\n\\end{{tabular}}\n\\end{{center}}\n"
    ))
}

/// Parse the `tables` field of a `connected_tables` element.
///
/// # Errors
///
/// [`LatexError::InvalidTable`] when the value is not a list of tables.
pub fn tables_from_value(value: &Value) -> Result<Vec<TableModel>, LatexError> {
    Ok(Vec::<TableModel>::deserialize(value)?)
}
