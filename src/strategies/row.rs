//! Row-level comparison aligned by key columns or by position

use crate::error::Result;
use crate::params::{ParameterSchema, Parameters};
use crate::result::{ComparisonResult, DiffClassification, Highlight};
use crate::strategy::{CancellationToken, ComparisonStrategy};
use crate::table::Table;
use indexmap::IndexMap;
use serde_json::json;
use std::collections::VecDeque;

use super::{key_positions, render_cells, render_details, row_key, Section};

pub const NAME: &str = "row_compare";

const KEY_COLUMNS: &str = "key_columns";
const IGNORE_COLUMNS: &str = "ignore_columns";
const CASE_SENSITIVE: &str = "case_sensitive";
const INCLUDE_SAME: &str = "include_same";

/// A row of A paired with a row of B; either side may be missing
#[derive(Debug, Clone, Copy)]
struct AlignedRow {
    a: Option<usize>,
    b: Option<usize>,
}

/// Compares rows cell by cell after aligning them
#[derive(Debug, Default)]
pub struct RowCompare;

impl ComparisonStrategy for RowCompare {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Aligns rows by key columns or position and compares them cell by cell"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
            .string(
                KEY_COLUMNS,
                "",
                "Comma-separated key columns; empty aligns rows by position",
            )
            .string(IGNORE_COLUMNS, "", "Comma-separated columns excluded from comparison")
            .bool(CASE_SENSITIVE, true, "Compare text case-sensitively")
            .bool(INCLUDE_SAME, false, "Report matching rows as highlights too")
    }

    fn compare(
        &self,
        a: &Table,
        b: &Table,
        params: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<ComparisonResult> {
        let keys = params.list(KEY_COLUMNS);
        let ignored = params.list(IGNORE_COLUMNS);
        let case_sensitive = params.bool_or(CASE_SENSITIVE, true);
        let include_same = params.bool_or(INCLUDE_SAME, false);

        let key_cols = key_positions(a, b, &keys)?;

        // (name, index in A, index in B)
        let compared: Vec<(String, usize, usize)> = a
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, name)| !keys.contains(*name) && !ignored.contains(*name))
            .filter_map(|(ia, name)| b.column_index(name).map(|ib| (name.clone(), ia, ib)))
            .collect();

        let alignment = if keys.is_empty() {
            align_by_position(a, b)
        } else {
            align_by_key(a, b, &key_cols, case_sensitive, cancel)?
        };

        let key_cols_a: Vec<(String, usize)> = keys.iter().cloned().zip(key_cols.iter().map(|k| k.0)).collect();
        let key_cols_b: Vec<(String, usize)> = keys.iter().cloned().zip(key_cols.iter().map(|k| k.1)).collect();
        let all_a: Vec<(String, usize)> = a.columns().iter().cloned().zip(0..).collect();
        let all_b: Vec<(String, usize)> = b.columns().iter().cloned().zip(0..).collect();

        let mut counts: IndexMap<DiffClassification, usize> = [
            DiffClassification::Same,
            DiffClassification::Different,
            DiffClassification::OnlyInA,
            DiffClassification::OnlyInB,
        ]
        .into_iter()
        .map(|c| (c, 0))
        .collect();
        let mut highlights = Vec::new();

        for pair in alignment {
            cancel.check()?;
            let label = match (keys.is_empty(), pair.a, pair.b) {
                (true, Some(i), _) | (true, None, Some(i)) => format!("row {}", i),
                (false, Some(i), _) => render_cells(a, i, &key_cols_a),
                (false, None, Some(i)) => render_cells(b, i, &key_cols_b),
                (_, None, None) => continue,
            };

            let (classification, highlight) = match (pair.a, pair.b) {
                (Some(ia), Some(ib)) => {
                    let differing: Vec<&(String, usize, usize)> = compared
                        .iter()
                        .filter(|(_, ca, cb)| !a.cell(ia, *ca).matches(b.cell(ib, *cb), case_sensitive))
                        .collect();
                    if differing.is_empty() {
                        let same = include_same.then(|| {
                            Highlight::new(
                                "Row",
                                label,
                                render_cells(a, ia, &all_a),
                                render_cells(b, ib, &all_b),
                                "Match",
                                DiffClassification::Same,
                            )
                        });
                        (DiffClassification::Same, same)
                    } else {
                        let cols_a: Vec<(String, usize)> = differing.iter().map(|(n, ca, _)| (n.clone(), *ca)).collect();
                        let cols_b: Vec<(String, usize)> = differing.iter().map(|(n, _, cb)| (n.clone(), *cb)).collect();
                        let names: Vec<&str> = differing.iter().map(|(n, _, _)| n.as_str()).collect();
                        let different = Highlight::new(
                            "Row",
                            label,
                            render_cells(a, ia, &cols_a),
                            render_cells(b, ib, &cols_b),
                            format!("Different ({})", names.join(", ")),
                            DiffClassification::Different,
                        );
                        (DiffClassification::Different, Some(different))
                    }
                }
                (Some(ia), None) => {
                    let only_a = Highlight::new(
                        "Row",
                        label,
                        render_cells(a, ia, &all_a),
                        "",
                        "Only in DF1",
                        DiffClassification::OnlyInA,
                    );
                    (DiffClassification::OnlyInA, Some(only_a))
                }
                (None, Some(ib)) => {
                    let only_b = Highlight::new(
                        "Row",
                        label,
                        "",
                        render_cells(b, ib, &all_b),
                        "Only in DF2",
                        DiffClassification::OnlyInB,
                    );
                    (DiffClassification::OnlyInB, Some(only_b))
                }
                (None, None) => continue,
            };

            *counts.entry(classification).or_insert(0) += 1;
            highlights.extend(highlight);
        }

        let same = counts[&DiffClassification::Same];
        let different = counts[&DiffClassification::Different];
        let only_a = counts[&DiffClassification::OnlyInA];
        let only_b = counts[&DiffClassification::OnlyInB];
        let is_equal = different == 0 && only_a == 0 && only_b == 0;

        let alignment_desc = if keys.is_empty() {
            "position".to_string()
        } else {
            format!("key ({})", keys.join(", "))
        };
        let compared_names: Vec<&str> = compared.iter().map(|(n, _, _)| n.as_str()).collect();
        let sections = vec![
            Section::checked(
                "Alignment",
                true,
                vec![
                    format!("aligned by {}", alignment_desc),
                    format!("compared columns: {}", compared_names.join(", ")),
                ],
            ),
            Section::checked(
                "Rows",
                is_equal,
                vec![format!(
                    "same: {}, different: {}, only in DF1: {}, only in DF2: {}",
                    same, different, only_a, only_b
                )],
            ),
        ];

        Ok(ComparisonResult::new(is_equal, render_details("Row comparison", is_equal, &sections))
            .with_highlights(highlights)
            .with_meta("alignment", if keys.is_empty() { "position" } else { "key" })
            .with_meta("key_columns", json!(keys))
            .with_meta("compared_columns", json!(compared_names))
            .with_meta("rows_same", same)
            .with_meta("rows_different", different)
            .with_meta("rows_only_in_a", only_a)
            .with_meta("rows_only_in_b", only_b))
    }
}

fn align_by_position(a: &Table, b: &Table) -> Vec<AlignedRow> {
    (0..a.row_count().max(b.row_count()))
        .map(|i| AlignedRow {
            a: (i < a.row_count()).then_some(i),
            b: (i < b.row_count()).then_some(i),
        })
        .collect()
}

/// Pair rows sharing a key; repeated keys pair up in order of appearance
fn align_by_key(
    a: &Table,
    b: &Table,
    key_cols: &[(usize, usize)],
    case_sensitive: bool,
    cancel: &CancellationToken,
) -> Result<Vec<AlignedRow>> {
    let cols_a: Vec<usize> = key_cols.iter().map(|(ca, _)| *ca).collect();
    let cols_b: Vec<usize> = key_cols.iter().map(|(_, cb)| *cb).collect();

    let mut pending_b: IndexMap<Vec<String>, VecDeque<usize>> = IndexMap::new();
    for row in 0..b.row_count() {
        pending_b
            .entry(row_key(b, row, cols_b.iter().copied(), case_sensitive))
            .or_default()
            .push_back(row);
    }

    let mut aligned = Vec::with_capacity(a.row_count().max(b.row_count()));
    for row in 0..a.row_count() {
        cancel.check()?;
        let matched = pending_b
            .get_mut(&row_key(a, row, cols_a.iter().copied(), case_sensitive))
            .and_then(VecDeque::pop_front);
        aligned.push(AlignedRow { a: Some(row), b: matched });
    }

    let mut leftover: Vec<usize> = pending_b.into_values().flatten().collect();
    leftover.sort_unstable();
    aligned.extend(leftover.into_iter().map(|row| AlignedRow { a: None, b: Some(row) }));
    Ok(aligned)
}
