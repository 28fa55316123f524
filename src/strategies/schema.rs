//! Schema comparison: column names, order, types, null patterns, index and shape

use crate::error::Result;
use crate::params::{ParameterSchema, Parameters};
use crate::result::{ComparisonResult, DiffClassification, Highlight};
use crate::strategy::{CancellationToken, ComparisonStrategy};
use crate::table::{DataType, Table, TypeFamily};
use indexmap::IndexMap;
use serde_json::json;
use std::collections::HashSet;

use super::{render_details, Section};

pub const NAME: &str = "schema_compare";

const CHECK_COLUMN_ORDER: &str = "check_column_order";
const CHECK_DATA_TYPES: &str = "check_data_types";
const CHECK_NULLABLE: &str = "check_nullable";
const CHECK_INDEX: &str = "check_index";
const TYPE_COMPATIBILITY: &str = "type_compatibility";

/// How strictly column data types must agree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCompatibility {
    /// Types must be identical
    Strict,
    /// Types must share a family (numeric, text, temporal, bool)
    Compatible,
    /// Anything goes except a short list of incompatible pairs
    Loose,
}

impl TypeCompatibility {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "compatible" => Self::Compatible,
            "loose" => Self::Loose,
            _ => Self::Strict,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Compatible => "compatible",
            Self::Loose => "loose",
        }
    }

    pub fn allows(self, a: DataType, b: DataType) -> bool {
        match self {
            Self::Strict => a == b,
            Self::Compatible => a == b || a.family() == b.family(),
            Self::Loose => !loosely_incompatible(a, b) && !loosely_incompatible(b, a),
        }
    }
}

fn loosely_incompatible(a: DataType, b: DataType) -> bool {
    match a.family() {
        TypeFamily::Temporal => matches!(b.family(), TypeFamily::Numeric | TypeFamily::Text | TypeFamily::Bool),
        _ if a == DataType::Complex => matches!(b.family(), TypeFamily::Temporal | TypeFamily::Bool),
        _ => false,
    }
}

/// Compares table structure without looking at cell contents beyond null presence
#[derive(Debug, Default)]
pub struct SchemaCompare;

impl ComparisonStrategy for SchemaCompare {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Compares column names, order, data types, null patterns, index and shape"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
            .bool(CHECK_COLUMN_ORDER, true, "Require columns to appear in the same order")
            .bool(CHECK_DATA_TYPES, true, "Compare column data types")
            .bool(CHECK_NULLABLE, true, "Compare presence of null values per column")
            .bool(CHECK_INDEX, false, "Compare index label, kind and length")
            .choice(
                TYPE_COMPATIBILITY,
                "strict",
                &["strict", "compatible", "loose"],
                "How strictly data types must match",
            )
    }

    fn compare(
        &self,
        a: &Table,
        b: &Table,
        params: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<ComparisonResult> {
        let check_order = params.bool_or(CHECK_COLUMN_ORDER, true);
        let check_types = params.bool_or(CHECK_DATA_TYPES, true);
        let check_nullable = params.bool_or(CHECK_NULLABLE, true);
        let check_index = params.bool_or(CHECK_INDEX, false);
        let compatibility = TypeCompatibility::parse(params.str_or(TYPE_COMPATIBILITY, "strict"));

        let mut highlights = Vec::new();
        let mut sections = Vec::new();

        // Shape
        let shape_a = format!("{} x {}", a.row_count(), a.column_count());
        let shape_b = format!("{} x {}", b.row_count(), b.column_count());
        let shape_matches = shape_a == shape_b;
        highlights.push(Highlight::new(
            "Shape",
            "rows x columns",
            shape_a.clone(),
            shape_b.clone(),
            if shape_matches { "Match" } else { "Mismatch" },
            if shape_matches {
                DiffClassification::Same
            } else {
                DiffClassification::Different
            },
        ));
        sections.push(Section::checked(
            "Shape",
            shape_matches,
            vec![format!("DF1: {} (rows x columns), DF2: {}", shape_a, shape_b)],
        ));

        // Column names
        let names_a: HashSet<&str> = a.columns().iter().map(String::as_str).collect();
        let names_b: HashSet<&str> = b.columns().iter().map(String::as_str).collect();
        let only_a: Vec<&str> = a.columns().iter().map(String::as_str).filter(|c| !names_b.contains(c)).collect();
        let only_b: Vec<&str> = b.columns().iter().map(String::as_str).filter(|c| !names_a.contains(c)).collect();
        let common: Vec<&str> = a.columns().iter().map(String::as_str).filter(|c| names_b.contains(c)).collect();
        let names_match = only_a.is_empty() && only_b.is_empty();

        let mut name_lines = Vec::new();
        for column in &only_a {
            let dtype = lookup_dtype(a, column);
            highlights.push(Highlight::new("Columns", *column, dtype, "", "Only in DF1", DiffClassification::OnlyInA));
        }
        for column in &only_b {
            let dtype = lookup_dtype(b, column);
            highlights.push(Highlight::new("Columns", *column, "", dtype, "Only in DF2", DiffClassification::OnlyInB));
        }
        if !only_a.is_empty() {
            name_lines.push(format!("Only in DF1: {}", only_a.join(", ")));
        }
        if !only_b.is_empty() {
            name_lines.push(format!("Only in DF2: {}", only_b.join(", ")));
        }
        name_lines.push(format!("{} common column(s)", common.len()));
        sections.push(Section::checked("Column Names", names_match, name_lines));

        // Column order, only meaningful when both sides have the same columns
        let order_matches = if names_match {
            Some(a.columns() == b.columns())
        } else {
            None
        };
        match (check_order, order_matches) {
            (false, _) => sections.push(Section::skipped("Column Order", "disabled")),
            (true, None) => sections.push(Section::skipped("Column Order", "column sets differ")),
            (true, Some(true)) => sections.push(Section::checked("Column Order", true, Vec::new())),
            (true, Some(false)) => {
                highlights.push(Highlight::new(
                    "Column Order",
                    "order",
                    a.columns().join(", "),
                    b.columns().join(", "),
                    "Order differs",
                    DiffClassification::Different,
                ));
                sections.push(Section::checked(
                    "Column Order",
                    false,
                    vec![
                        format!("DF1: {}", a.columns().join(", ")),
                        format!("DF2: {}", b.columns().join(", ")),
                    ],
                ));
            }
        }
        let order_ok = !check_order || order_matches.unwrap_or(true);

        // Data types
        let mut type_mismatches = Vec::new();
        let types_ok = if check_types {
            let mut lines = Vec::new();
            for column in &common {
                cancel.check()?;
                let (type_a, type_b) = (dtype_of(a, column), dtype_of(b, column));
                if let (Some(type_a), Some(type_b)) = (type_a, type_b) {
                    if !compatibility.allows(type_a, type_b) {
                        highlights.push(Highlight::new(
                            "Data Types",
                            *column,
                            type_a.as_str(),
                            type_b.as_str(),
                            format!("Incompatible ({})", compatibility.as_str()),
                            DiffClassification::Different,
                        ));
                        lines.push(format!("{}: {} vs {}", column, type_a, type_b));
                        type_mismatches.push(json!({"column": column, "a": type_a, "b": type_b}));
                    }
                }
            }
            lines.push(format!("mode: {}", compatibility.as_str()));
            let ok = type_mismatches.is_empty();
            sections.push(Section::checked("Data Types", ok, lines));
            ok
        } else {
            sections.push(Section::skipped("Data Types", "disabled"));
            true
        };

        // Null presence
        let mut null_counts = IndexMap::new();
        let nullable_ok = if check_nullable {
            let mut lines = Vec::new();
            let mut ok = true;
            for column in &common {
                cancel.check()?;
                let nulls_a = lookup_nulls(a, column);
                let nulls_b = lookup_nulls(b, column);
                null_counts.insert(column.to_string(), json!({"a": nulls_a, "b": nulls_b}));
                if (nulls_a > 0) != (nulls_b > 0) {
                    ok = false;
                    highlights.push(Highlight::new(
                        "Nullable",
                        *column,
                        describe_nulls(nulls_a),
                        describe_nulls(nulls_b),
                        "Null presence differs",
                        DiffClassification::Different,
                    ));
                    lines.push(format!("{}: {} vs {}", column, describe_nulls(nulls_a), describe_nulls(nulls_b)));
                }
            }
            sections.push(Section::checked("Nullable", ok, lines));
            ok
        } else {
            sections.push(Section::skipped("Nullable", "disabled"));
            true
        };

        // Index
        let index_ok = if check_index {
            let (index_a, index_b) = (a.index(), b.index());
            let attributes = [
                (
                    "label",
                    index_a.label.clone().unwrap_or_default(),
                    index_b.label.clone().unwrap_or_default(),
                ),
                ("kind", index_a.kind.to_string(), index_b.kind.to_string()),
                ("length", index_a.len.to_string(), index_b.len.to_string()),
            ];
            let mut lines = Vec::new();
            for (attribute, value_a, value_b) in attributes {
                if value_a != value_b {
                    lines.push(format!("{}: {:?} vs {:?}", attribute, value_a, value_b));
                    highlights.push(Highlight::new(
                        "Index",
                        attribute,
                        value_a,
                        value_b,
                        "Index differs",
                        DiffClassification::Different,
                    ));
                }
            }
            let ok = lines.is_empty();
            sections.push(Section::checked("Index", ok, lines));
            ok
        } else {
            sections.push(Section::skipped("Index", "disabled"));
            true
        };

        let is_equal = names_match && order_ok && types_ok && nullable_ok && index_ok && shape_matches;
        let details = render_details("Schema comparison", is_equal, &sections);

        Ok(ComparisonResult::new(is_equal, details)
            .with_highlights(highlights)
            .with_meta("columns_only_in_a", json!(only_a))
            .with_meta("columns_only_in_b", json!(only_b))
            .with_meta("order_matches", json!(order_matches))
            .with_meta("type_mismatches", type_mismatches)
            .with_meta("null_counts", json!(null_counts)))
    }
}

fn dtype_of(table: &Table, column: &str) -> Option<DataType> {
    table.column_index(column).and_then(|i| table.dtype(i))
}

fn lookup_dtype(table: &Table, column: &str) -> String {
    dtype_of(table, column).map(|t| t.to_string()).unwrap_or_default()
}

fn lookup_nulls(table: &Table, column: &str) -> usize {
    table.column_index(column).map(|i| table.null_count(i)).unwrap_or(0)
}

fn describe_nulls(count: usize) -> String {
    if count == 0 {
        "no nulls".to_string()
    } else {
        format!("has nulls ({})", count)
    }
}
