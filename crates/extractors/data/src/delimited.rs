//! Delimiter-separated text tables (CSV, TSV, semicolon and pipe variants).

use std::collections::HashSet;

use casefile_extract_types::records::TabularMeta;

const CANDIDATES: [char; 4] = [',', ';', '\t', '|'];
const SNIFF_LINES: usize = 20;
const PREVIEW_ROWS: usize = 5;

pub(crate) struct Table {
    pub(crate) meta: TabularMeta,
    pub(crate) columns: Vec<String>,
    pub(crate) preview: Vec<Vec<String>>,
}

/// Splits one record, honouring double-quoted fields and `""` escapes.
///
/// Records spanning several lines are not reassembled.
pub fn split_record(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' if quoted => quoted = false,
            '"' if field.is_empty() => quoted = true,
            c if c == delimiter && !quoted => fields.push(std::mem::take(&mut field)),
            c => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Delimiter whose per-line count is the most consistent over the first
/// lines; `fallback` when no candidate appears at all.
pub fn sniff_delimiter(text: &str, fallback: char) -> char {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).take(SNIFF_LINES).collect();
    let mut best: Option<(char, usize, usize)> = None;
    for candidate in CANDIDATES {
        let counts: Vec<usize> = lines.iter().map(|l| split_record(l, candidate).len() - 1).collect();
        let Some(&first) = counts.first() else { continue };
        if first == 0 {
            continue;
        }
        let consistent = counts.iter().filter(|&&n| n == first).count();
        let better = match best {
            None => true,
            Some((_, c, f)) => consistent > c || (consistent == c && first > f),
        };
        if better {
            best = Some((candidate, consistent, first));
        }
    }
    best.map(|(c, _, _)| c).unwrap_or(fallback)
}

fn is_numeric(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && v.replace([' ', '_'], "").parse::<f64>().is_ok()
}

fn is_missing(value: &str) -> bool {
    let v = value.trim();
    v.is_empty() || matches!(v.to_ascii_lowercase().as_str(), "na" | "n/a" | "null" | "nan" | "none")
}

/// A first row of distinct, non-empty, non-numeric cells is a header.
fn looks_like_header(row: &[String]) -> bool {
    let mut seen = HashSet::new();
    !row.is_empty()
        && row
            .iter()
            .all(|cell| !is_missing(cell) && !is_numeric(cell) && seen.insert(cell.trim().to_lowercase()))
}

pub(crate) fn analyze(text: &str, fallback: char) -> Table {
    let delimiter = sniff_delimiter(text, fallback);
    let mut rows: Vec<Vec<String>> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| split_record(l, delimiter))
        .collect();

    let has_header = rows.first().map(|r| looks_like_header(r)).unwrap_or(false);
    let header = if has_header { Some(rows.remove(0)) } else { None };
    let width = header
        .as_ref()
        .map(Vec::len)
        .or_else(|| rows.first().map(Vec::len))
        .unwrap_or(0);
    let columns: Vec<String> = match &header {
        Some(h) => h.iter().map(|c| c.trim().to_string()).collect(),
        None => (1..=width).map(|k| format!("Col_{k}")).collect(),
    };

    let mut numeric = vec![true; width];
    let mut filled = vec![false; width];
    let mut missing = 0usize;
    let mut distinct = HashSet::new();
    let mut duplicates = false;
    for row in &rows {
        for col in 0..width {
            match row.get(col) {
                Some(cell) if !is_missing(cell) => {
                    filled[col] = true;
                    numeric[col] &= is_numeric(cell);
                }
                _ => missing += 1,
            }
        }
        if !distinct.insert(row.clone()) {
            duplicates = true;
        }
    }
    let numeric_cols = (0..width).filter(|&c| filled[c] && numeric[c]).count();
    let text_cols = (0..width).filter(|&c| filled[c] && !numeric[c]).count();
    let cells = rows.len() * width;
    let ratio = if cells == 0 {
        0.0
    } else {
        (missing as f64 / cells as f64 * 10_000.0).round() / 10_000.0
    };

    let meta = TabularMeta {
        delimiter: Some(delimiter_name(delimiter).to_string()),
        has_header: Some(has_header),
        row_count: Some(rows.len() as u64),
        column_count: Some(width as u32),
        numeric_col_count: Some(numeric_cols as u32),
        text_col_count: Some(text_cols as u32),
        has_missing_values: Some(missing > 0),
        missing_value_ratio: Some(ratio),
        has_duplicate_rows: Some(duplicates),
        column_names: (!columns.is_empty()).then(|| columns.join(", ")),
        ..Default::default()
    };
    rows.truncate(PREVIEW_ROWS);
    Table { meta, columns, preview: rows }
}

fn delimiter_name(c: char) -> &'static str {
    match c {
        ',' => ",",
        ';' => ";",
        '\t' => "\\t",
        '|' => "|",
        _ => "?",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_record_quotes() {
        assert_eq!(split_record(r#"a,"b,c",d"#, ','), vec!["a", "b,c", "d"]);
        assert_eq!(split_record(r#""say ""hi""",x"#, ','), vec![r#"say "hi""#, "x"]);
        assert_eq!(split_record("a;;b", ';'), vec!["a", "", "b"]);
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c\n1;2;3\n4;5;6\n", ','), ';');
        assert_eq!(sniff_delimiter("a\tb\n1\t2\n", ','), '\t');
        assert_eq!(sniff_delimiter("name, note\nbob, \"x; y\"\n", ';'), ',');
        assert_eq!(sniff_delimiter("single column\nrow\n", '\t'), '\t');
    }

    #[test]
    fn test_analyze_with_header() {
        let text = "id,name,score\n1,alice,9.5\n2,bob,\n3,carol,7\n2,bob,\n";
        let t = analyze(text, ',');
        let m = &t.meta;
        assert_eq!(m.has_header, Some(true));
        assert_eq!(m.row_count, Some(4));
        assert_eq!(m.column_count, Some(3));
        assert_eq!(m.numeric_col_count, Some(2));
        assert_eq!(m.text_col_count, Some(1));
        assert_eq!(m.has_missing_values, Some(true));
        assert_eq!(m.missing_value_ratio, Some(0.1667));
        assert_eq!(m.has_duplicate_rows, Some(true));
        assert_eq!(m.column_names.as_deref(), Some("id, name, score"));
        assert_eq!(t.preview.len(), 4);
    }

    #[test]
    fn test_analyze_without_header() {
        let t = analyze("1|2\n3|4\n", ',');
        assert_eq!(t.meta.has_header, Some(false));
        assert_eq!(t.meta.delimiter.as_deref(), Some("|"));
        assert_eq!(t.meta.row_count, Some(2));
        assert_eq!(t.columns, vec!["Col_1", "Col_2"]);
        assert_eq!(t.meta.has_duplicate_rows, Some(false));
    }

    #[test]
    fn test_empty_input() {
        let t = analyze("", ',');
        assert_eq!(t.meta.row_count, Some(0));
        assert_eq!(t.meta.column_count, Some(0));
        assert_eq!(t.meta.missing_value_ratio, Some(0.0));
        assert_eq!(t.meta.column_names, None);
    }
}
