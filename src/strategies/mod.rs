//! Built-in comparison strategies

pub mod column;
pub mod hash;
pub mod row;
pub mod schema;

pub use column::ColumnCompare;
pub use hash::HashCompare;
pub use row::RowCompare;
pub use schema::SchemaCompare;

use crate::strategy::ComparisonStrategy;
use crate::table::{Table, Value};
use std::sync::Arc;

/// All strategies compiled into the crate, in registration order
pub fn builtin() -> Vec<Arc<dyn ComparisonStrategy>> {
    vec![
        Arc::new(SchemaCompare),
        Arc::new(RowCompare),
        Arc::new(ColumnCompare),
        Arc::new(HashCompare),
    ]
}

/// Outcome of one section of a details report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Check {
    Pass,
    Fail,
    Skipped,
}

/// One titled section of the human-readable details text
#[derive(Debug, Clone)]
pub(crate) struct Section {
    title: String,
    check: Check,
    lines: Vec<String>,
}

impl Section {
    pub(crate) fn checked(title: &str, ok: bool, lines: Vec<String>) -> Self {
        Self {
            title: title.to_string(),
            check: if ok { Check::Pass } else { Check::Fail },
            lines,
        }
    }

    pub(crate) fn skipped(title: &str, reason: &str) -> Self {
        Self {
            title: title.to_string(),
            check: Check::Skipped,
            lines: vec![reason.to_string()],
        }
    }
}

pub(crate) fn render_details(heading: &str, is_equal: bool, sections: &[Section]) -> String {
    let mut out = format!("{}: {}\n", heading, if is_equal { "EQUAL" } else { "DIFFERENT" });
    for section in sections {
        let mark = match section.check {
            Check::Pass => "PASS",
            Check::Fail => "FAIL",
            Check::Skipped => "SKIPPED",
        };
        out.push_str(&format!("[{}] {}\n", mark, section.title));
        for line in &section.lines {
            out.push_str(&format!("  - {}\n", line));
        }
    }
    out.trim_end().to_string()
}

/// Resolve named key columns to (index in A, index in B)
pub(crate) fn key_positions(a: &Table, b: &Table, keys: &[String]) -> crate::Result<Vec<(usize, usize)>> {
    keys.iter()
        .map(|key| match (a.column_index(key), b.column_index(key)) {
            (Some(ia), Some(ib)) => Ok((ia, ib)),
            (None, _) => Err(crate::TabcompareError::execution(format!(
                "Key column '{}' not found in DF1",
                key
            ))),
            (_, None) => Err(crate::TabcompareError::execution(format!(
                "Key column '{}' not found in DF2",
                key
            ))),
        })
        .collect()
}

/// Canonical token for matching key values across tables.
///
/// Integers and integral floats share a token so `2` and `2.0` match.
pub(crate) fn key_token(value: &Value) -> String {
    match value {
        v if v.is_null() => "n:".to_string(),
        Value::Bool(b) => format!("b:{}", b),
        Value::Int(i) => format!("i:{}", i),
        Value::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => format!("i:{}", *f as i64),
        Value::Float(f) => format!("f:{}", f),
        Value::Text(s) => format!("s:{}", s),
        Value::Timestamp(ts) => format!("t:{}", ts),
        Value::Null => "n:".to_string(),
    }
}

/// Composite key of a row over the given columns, one token per column.
///
/// Text folds to lowercase unless `case_sensitive`.
pub(crate) fn row_key(table: &Table, row: usize, columns: impl IntoIterator<Item = usize>, case_sensitive: bool) -> Vec<String> {
    columns
        .into_iter()
        .map(|col| match table.cell(row, col) {
            Value::Text(s) if !case_sensitive => format!("s:{}", s.to_lowercase()),
            value => key_token(value),
        })
        .collect()
}

/// Human-readable `col=value` rendering of selected cells of a row
pub(crate) fn render_cells(table: &Table, row: usize, columns: &[(String, usize)]) -> String {
    columns
        .iter()
        .map(|(name, col)| format!("{}={}", name, table.cell(row, *col)))
        .collect::<Vec<_>>()
        .join(", ")
}
