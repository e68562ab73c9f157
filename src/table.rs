//! Parsing of the engine's terminal table output.
//!
//! The engine prints results as an ASCII table: a `| ... |` header line, a
//! `+---+` separator, then one `| ... |` line per row with an optional border
//! underneath. [`parse_table`] turns that text into a [`TableResult`] and
//! [`normalize_value`] cleans each cell so it can be embedded as a quoted
//! label in a DOT-style graph description.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{LogicadError, Result};

/// Columns and rows extracted from one query's table output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl TableResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

lazy_static! {
    // an inner "..." pair whose content holds neither a quote nor a backslash
    static ref INNER_QUOTED: Regex = Regex::new(r#""([^"\\]*)""#).unwrap();
}

/// Extract `(columns, rows)` from raw engine stdout.
///
/// The header is the first line starting with `|`; the separator is the first
/// `+`-line after it. Header cells are trimmed and empty cells discarded; row
/// cells are trimmed but kept when empty, so they stay aligned with the
/// columns. Lines after the separator that are blank, border lines, or carry
/// no delimiter are footer decoration and skipped.
///
/// A missing header is a defect (the output was not a table at all). A
/// missing separator is read as "no table", yielding an empty result, since
/// some engine builds print bare diagnostics above an otherwise empty run.
pub fn parse_table(output: &str) -> Result<TableResult> {
    let lines: Vec<&str> = output.lines().map(|line| line.trim_end()).collect();

    let header_idx = lines
        .iter()
        .position(|line| line.trim().starts_with('|'))
        .ok_or_else(|| LogicadError::Table("no table header found".into()))?;

    let separator_idx = match lines[header_idx + 1..]
        .iter()
        .position(|line| line.trim().starts_with('+'))
    {
        Some(offset) => header_idx + 1 + offset,
        None => return Ok(TableResult::default()),
    };

    let columns: Vec<String> = lines[header_idx]
        .trim()
        .trim_matches('|')
        .split('|')
        .map(str::trim)
        .filter(|col| !col.is_empty())
        .map(str::to_owned)
        .collect();

    let mut rows = Vec::new();
    for line in &lines[separator_idx + 1..] {
        let row = line.trim();
        if row.is_empty() || row.starts_with('+') || !row.contains('|') {
            continue;
        }
        let values: Vec<String> = row
            .trim_matches('|')
            .split('|')
            .map(|val| normalize_value(val.trim()))
            .collect();
        if values.len() != columns.len() {
            return Err(LogicadError::Table(format!(
                "row has {} cells but the header has {} columns",
                values.len(),
                columns.len()
            )));
        }
        rows.push(values);
    }

    Ok(TableResult { columns, rows })
}

/// Clean one raw cell for use as a quoted graph label.
///
/// One layer of enclosing quotes is stripped, inner `"x"` pairs collapse to
/// `x` (so `"A"-2` becomes `A-2`), and whatever backslashes and double quotes
/// remain are escaped.
pub fn normalize_value(raw: &str) -> String {
    let stripped = strip_outer_quotes(raw);
    let collapsed = INNER_QUOTED.replace_all(stripped, "$1");
    collapsed.replace('\\', r"\\").replace('"', "\\\"")
}

// exactly one layer, never recursive
fn strip_outer_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && ((bytes[0] == b'"' && bytes[bytes.len() - 1] == b'"')
            || (bytes[0] == b'\'' && bytes[bytes.len() - 1] == b'\''))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
