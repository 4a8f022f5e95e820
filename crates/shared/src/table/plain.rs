//! Heuristic reader for tables in plain OCR text.
//!
//! Two shapes are recognised. Delimited tables draw cell borders with `|` and
//! `+` and separate the header with a rule line such as `---|---` or
//! `+-----+-----+`. Undelimited tables only line their columns up, so cells are
//! split on runs of two or more spaces or on tabs.

use std::sync::OnceLock;

use regex::Regex;
use tracing::trace;

use super::Table;

static COLUMN_GAP: OnceLock<Regex> = OnceLock::new();

fn column_gap() -> &'static Regex {
    COLUMN_GAP.get_or_init(|| Regex::new(r"\s{2,}|\t").expect("column gap pattern is valid"))
}

/// A line drawn only with `-`, `|`, `+` and whitespace
pub fn is_rule(line: &str) -> bool {
    line.chars().all(|c| matches!(c, '-' | '|' | '+') || c.is_whitespace())
}

/// Cells of one bordered line. `+` counts as a border, one border is dropped
/// from each end before splitting so interior empty cells survive
pub fn split_delimited(line: &str) -> Vec<String> {
    let line = line.trim().replace('+', "|");
    let line = line.strip_prefix('|').unwrap_or(&line);
    let line = line.strip_suffix('|').unwrap_or(line);

    line.split('|').map(|cell| cell.trim().to_owned()).collect()
}

pub fn split_aligned(line: &str) -> Vec<String> {
    column_gap()
        .split(line.trim())
        .map(|cell| cell.trim().to_owned())
        .collect()
}

/// Fewer than two non-blank lines, or nothing but rule lines, is not a table
pub fn parse(text: &str) -> Option<Table> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() < 2 {
        return None;
    }

    let delimited = lines.iter().skip(1).any(|line| is_rule(line));
    trace!(lines = lines.len(), delimited, "reading plain table");

    if delimited {
        parse_delimited(&lines)
    } else {
        Table::from_rows(lines.iter().map(|line| split_aligned(line)).collect())
    }
}

fn parse_delimited(lines: &[&str]) -> Option<Table> {
    // Box tables open with a rule line, the header starts at the first line
    // with content
    let first = lines.iter().position(|line| !is_rule(line))?;
    let header_end = lines[first..]
        .iter()
        .position(|line| is_rule(line))
        .map(|offset| first + offset)
        .unwrap_or(lines.len());

    // Extra header block lines are kept as leading data rows. The original
    // converter dropped them and rendered only the first header line
    let rows = lines[first..header_end]
        .iter()
        .chain(lines[header_end..].iter().filter(|line| !is_rule(line)))
        .map(|line| split_delimited(line))
        .collect();

    Table::from_rows(rows)
}
