//! Turns table-shaped OCR output into markdown.
//!
//! LaTeX `tabular` environments are read by [latex], anything else goes
//! through the heuristic reader in [plain]. Text with no recognisable table
//! comes back untouched.

use crate::api::payloads::ConvertTableResponse;

pub mod latex;
pub mod plain;

/// A header row plus data rows, every row padded to the same width
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// First row becomes the header. Rows are right-padded with empty cells to
    /// the widest row
    pub fn from_rows(mut rows: Vec<Vec<String>>) -> Option<Table> {
        if rows.is_empty() {
            return None;
        }

        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in rows.iter_mut() {
            row.resize(width, String::new());
        }
        let header = rows.remove(0);

        Some(Table { header, rows })
    }

    pub fn width(&self) -> usize {
        self.header.len()
    }

    pub fn to_markdown(&self) -> String {
        let separator = vec!["---"; self.width()];

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(markdown_row(self.header.as_slice()));
        lines.push(markdown_row(separator.as_slice()));
        lines.extend(self.rows.iter().map(|row| markdown_row(row.as_slice())));
        lines.join("\n")
    }
}

fn markdown_row<S: AsRef<str>>(cells: &[S]) -> String {
    let cells: Vec<&str> = cells.iter().map(AsRef::as_ref).collect();
    format!("| {} |", cells.join(" | "))
}

/// Reads a table out of `text`, picking the reader by content
pub fn infer(text: &str) -> Option<Table> {
    if latex::is_latex(text) {
        latex::parse(text)
    } else {
        plain::parse(text)
    }
}

pub fn convert(text: &str) -> ConvertTableResponse {
    match infer(text) {
        Some(table) => ConvertTableResponse { markdown: table.to_markdown(), converted: true },
        None => ConvertTableResponse { markdown: text.to_owned(), converted: false },
    }
}
