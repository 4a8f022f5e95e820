//! Reader for LaTeX `tabular` environments.
//!
//! Every physical line inside the outermost `tabular` that holds an `&` is one
//! row and `&` separates its cells. A `tabular` nested inside a cell is
//! flattened into that cell, its own cells joined with a full-width comma.

use tracing::trace;

use super::Table;

pub const BEGIN: &str = "\\begin{tabular}";
pub const END: &str = "\\end{tabular}";
const HLINE: &str = "\\hline";
const ROW_END: &str = "\\\\";
const NESTED_SEPARATOR: &str = "，";

pub fn is_latex(text: &str) -> bool {
    text.contains(BEGIN)
}

/// Drops the `[pos]{cols}` arguments that follow `\begin{tabular}`
fn skip_column_spec(s: &str) -> &str {
    let mut rest = s.trim_start();
    if rest.starts_with('[') {
        rest = match rest.find(']') {
            Some(i) => rest[i + 1..].trim_start(),
            None => "",
        };
    }
    if rest.starts_with('{') {
        let mut depth = 0usize;
        for (i, c) in rest.char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return &rest[i + 1..];
                    }
                }
                _ => {}
            }
        }
        return "";
    }
    rest
}

/// Offset of the `\end{tabular}` that closes the block `depth` levels up.
/// `depth` tracks nested blocks opened and closed along the way and carries
/// over between lines
fn find_closing_end(s: &str, depth: &mut usize) -> Option<usize> {
    let mut pos = 0;
    loop {
        let begin = s[pos..].find(BEGIN).map(|i| pos + i);
        let end = s[pos..].find(END).map(|i| pos + i);
        match (begin, end) {
            (Some(b), Some(e)) if b < e => {
                *depth += 1;
                pos = b + BEGIN.len();
            }
            (Some(b), None) => {
                *depth += 1;
                pos = b + BEGIN.len();
            }
            (_, Some(e)) => {
                if *depth == 0 {
                    return Some(e);
                }
                *depth -= 1;
                pos = e + END.len();
            }
            (None, None) => return None,
        }
    }
}

/// Cell text of a nested block body, already stripped of its opening marker
fn flatten_body(body: &str) -> String {
    let body = flatten_nested(body);
    body.replace(HLINE, " ")
        .replace(ROW_END, " ")
        .split('&')
        .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(NESTED_SEPARATOR)
}

/// Replaces every `tabular` block in `s` with its flattened text
fn flatten_nested(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find(BEGIN) {
        out.push_str(&rest[..i]);
        let body = skip_column_spec(&rest[i + BEGIN.len()..]);
        let mut depth = 0;
        match find_closing_end(body, &mut depth) {
            Some(e) => {
                out.push_str(&flatten_body(&body[..e]));
                rest = &body[e + END.len()..];
            }
            None => {
                out.push_str(&flatten_body(body));
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Cells of one row. `None` for lines without a top level `&`, which covers
/// rule commands such as `\toprule` or `\cline{1-2}`, and for rows that hold
/// nothing but markup
fn split_row(raw: &str) -> Option<Vec<String>> {
    let row = flatten_nested(raw).replace(HLINE, " ");
    if !row.contains('&') {
        return None;
    }

    let mut cells: Vec<String> = row.split('&').map(|cell| cell.trim().to_owned()).collect();
    if let Some(last) = cells.last_mut() {
        let mut trimmed = last.as_str();
        while let Some(stripped) = trimmed.strip_suffix(ROW_END) {
            trimmed = stripped.trim_end();
        }
        *last = trimmed.to_owned();
    }

    if cells.iter().all(String::is_empty) {
        return None;
    }
    Some(cells)
}

/// Reads every outermost `tabular` in `text` into one table. `None` when no
/// row could be extracted
pub fn parse(text: &str) -> Option<Table> {
    let mut rows = Vec::new();
    let mut inside = false;
    let mut depth = 0usize;
    let mut row = String::new();

    for line in text.lines() {
        let mut rest = line;
        loop {
            if !inside {
                let Some(i) = rest.find(BEGIN) else { break };
                rest = skip_column_spec(&rest[i + BEGIN.len()..]);
                inside = true;
                continue;
            }

            let closed_at = find_closing_end(rest, &mut depth);
            row.push_str(closed_at.map_or(rest, |e| &rest[..e]));

            if depth > 0 && closed_at.is_none() {
                // A nested block continues on the next line
                row.push(' ');
            } else {
                rows.extend(split_row(&row));
                row.clear();
            }

            match closed_at {
                Some(e) => {
                    inside = false;
                    rest = &rest[e + END.len()..];
                }
                None => break,
            }
        }
    }
    // Unterminated input
    rows.extend(split_row(&row));

    trace!(rows = rows.len(), "read latex table");
    Table::from_rows(rows)
}

#[cfg(test)]
mod test {
    use super::*;

    fn cells(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_single_line_table() {
        let table = parse(r"\begin{tabular}{|c|c|}\hline A & B \\ \hline\end{tabular}").unwrap();
        assert_eq!(table.header, cells(&["A", "B"]));
        assert!(table.rows.is_empty());
    }

    #[test]
    fn test_rows_per_line() {
        let text = r"
Results:
\begin{tabular}[t]{l|r}
\hline
Name & Score \\
\hline
Ann & 90 \\
Ben & 85 \\ \\
\hline
\end{tabular}
trailing prose";
        let table = parse(text).unwrap();
        assert_eq!(table.header, cells(&["Name", "Score"]));
        assert_eq!(table.rows, vec![cells(&["Ann", "90"]), cells(&["Ben", "85"])]);
    }

    #[test]
    fn test_row_without_separator_is_dropped() {
        let text = "\\begin{tabular}{cc}\nTitle \\\\\na & b \\\\\nc & d \\\\\n\\end{tabular}";
        let table = parse(text).unwrap();
        assert_eq!(table.header, cells(&["a", "b"]));
        assert_eq!(table.rows, vec![cells(&["c", "d"])]);
    }

    #[test]
    fn test_booktabs_rules_are_skipped() {
        let text = r"\begin{tabular}{cc}
\toprule
A & B \\
\midrule
1 & 2 \\
\bottomrule
\end{tabular}";
        let table = parse(text).unwrap();
        assert_eq!(table.header, cells(&["A", "B"]));
        assert_eq!(table.rows, vec![cells(&["1", "2"])]);
    }

    #[test]
    fn test_cline_is_skipped() {
        let text = "\\begin{tabular}{cc}\nA & B \\\\\n\\cline{1-2}\n1 & 2 \\\\\n\\end{tabular}";
        let table = parse(text).unwrap();
        assert_eq!(table.header, cells(&["A", "B"]));
        assert_eq!(table.rows, vec![cells(&["1", "2"])]);
    }

    #[test]
    fn test_nested_block_alone_is_not_a_row() {
        let text = r"\begin{tabular}{cc}
Item & Parts \\
\begin{tabular}{c} bolt & nut \end{tabular} \\
Kit & box \\
\end{tabular}";
        let table = parse(text).unwrap();
        assert_eq!(table.rows, vec![cells(&["Kit", "box"])]);
    }

    #[test]
    fn test_nested_block_is_flattened() {
        let text = r"\begin{tabular}{cc}
Item & Parts \\
Kit & \begin{tabular}{c} bolt \\ nut & washer \end{tabular} \\
\end{tabular}";
        let table = parse(text).unwrap();
        assert_eq!(table.rows, vec![cells(&["Kit", "bolt nut，washer"])]);
    }

    #[test]
    fn test_nested_block_across_lines() {
        let text = r"\begin{tabular}{cc}
Item & Parts \\
Kit & \begin{tabular}{c}
bolt \\
nut
\end{tabular} \\
Bag & none \\
\end{tabular}";
        let table = parse(text).unwrap();
        assert_eq!(
            table.rows,
            vec![cells(&["Kit", "bolt nut"]), cells(&["Bag", "none"])]
        );
    }

    #[test]
    fn test_column_spec_with_nested_braces() {
        assert_eq!(skip_column_spec("{p{2cm}|c} x & y"), " x & y");
        assert_eq!(skip_column_spec("[b] {cc}rest"), "rest");
    }

    #[test]
    fn test_no_rows() {
        assert!(parse("\\begin{tabular}{c}\n\\hline\n\\end{tabular}").is_none());
    }
}
