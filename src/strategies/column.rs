//! Column statistical comparison

use crate::error::Result;
use crate::params::{ParameterSchema, Parameters};
use crate::result::{ComparisonResult, DiffClassification, Highlight};
use crate::strategy::{CancellationToken, ComparisonStrategy};
use crate::table::{Table, Value};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::json;
use std::collections::{HashMap, HashSet};

use super::{key_token, render_details, Section};

pub const NAME: &str = "column_compare";

const TOLERANCE: &str = "tolerance";
const COMPARE_DISTRIBUTIONS: &str = "compare_distributions";
const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Summary statistics of a numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericStats {
    pub count: usize,
    pub null_count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl NumericStats {
    pub fn compute<'a>(values: impl Iterator<Item = &'a Value>) -> Self {
        let mut numbers = Vec::new();
        let mut null_count = 0;
        for value in values {
            if value.is_null() {
                null_count += 1;
            } else if let Some(n) = value.as_f64() {
                numbers.push(n);
            }
        }

        let count = numbers.len();
        let (mean, std) = if count == 0 {
            (None, None)
        } else if numbers.iter().any(|x| x.is_infinite()) {
            // Finite values cannot move an infinite mean; +inf with -inf is NaN
            let mean = numbers.iter().filter(|x| x.is_infinite()).sum::<f64>();
            (Some(mean), (count > 1).then_some(f64::NAN))
        } else {
            let (mean, std) = moments(&numbers, 1.0);
            if mean.is_finite() && std.map_or(true, f64::is_finite) {
                (Some(mean), std)
            } else {
                // Rescale into [-1, 1] when the plain sums overflow
                let scale = numbers.iter().fold(0.0_f64, |m, x| m.max(x.abs()));
                let (mean, std) = moments(&numbers, scale);
                (Some(mean), std)
            }
        };
        let min = numbers.iter().copied().reduce(f64::min);
        let max = numbers.iter().copied().reduce(f64::max);

        Self {
            count,
            null_count,
            mean,
            std,
            min,
            max,
        }
    }

    /// Names of statistics that disagree beyond `tolerance`
    fn differences(&self, other: &Self, tolerance: f64) -> Vec<&'static str> {
        let mut diffs = Vec::new();
        if self.count != other.count {
            diffs.push("count");
        }
        if self.null_count != other.null_count {
            diffs.push("null_count");
        }
        for (name, a, b) in [
            ("mean", self.mean, other.mean),
            ("std", self.std, other.std),
            ("min", self.min, other.min),
            ("max", self.max, other.max),
        ] {
            if !within(a, b, tolerance) {
                diffs.push(name);
            }
        }
        diffs
    }

    fn summary(&self) -> String {
        format!(
            "count={}, mean={}, std={}, min={}, max={}, nulls={}",
            self.count,
            fmt_stat(self.mean),
            fmt_stat(self.std),
            fmt_stat(self.min),
            fmt_stat(self.max),
            self.null_count
        )
    }
}

/// Mean and sample std of `numbers`, accumulated on values divided by `scale`
fn moments(numbers: &[f64], scale: f64) -> (f64, Option<f64>) {
    let count = numbers.len() as f64;
    let mean = numbers.iter().map(|x| x / scale).sum::<f64>() / count;
    let std = (numbers.len() > 1).then(|| {
        let sq: f64 = numbers.iter().map(|x| (x / scale - mean).powi(2)).sum();
        (sq / (count - 1.0)).sqrt() * scale
    });
    (mean * scale, std)
}

fn within(a: Option<f64>, b: Option<f64>, tolerance: f64) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b || (a.is_nan() && b.is_nan()) || (a - b).abs() <= tolerance,
        _ => false,
    }
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map(|v| format!("{:.6}", v)).unwrap_or_else(|| "n/a".to_string())
}

/// Distribution summary of a non-numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoricalStats {
    pub count: usize,
    pub null_count: usize,
    pub distinct: usize,
    pub top: Option<String>,
}

impl CategoricalStats {
    pub fn compute<'a>(values: impl Iterator<Item = &'a Value>) -> Self {
        let mut frequencies: HashMap<String, (usize, String)> = HashMap::new();
        let mut null_count = 0;
        let mut count = 0;
        for value in values {
            if value.is_null() {
                null_count += 1;
                continue;
            }
            count += 1;
            frequencies
                .entry(key_token(value))
                .or_insert_with(|| (0, value.to_string()))
                .0 += 1;
        }

        // Most frequent value; ties go to the smallest rendering so the
        // result does not depend on row order
        let top = frequencies
            .values()
            .max_by(|(ca, ra), (cb, rb)| ca.cmp(cb).then_with(|| rb.cmp(ra)))
            .map(|(_, rendered)| rendered.clone());

        Self {
            count,
            null_count,
            distinct: frequencies.len(),
            top,
        }
    }

    fn differences(&self, other: &Self, compare_distributions: bool) -> Vec<&'static str> {
        let mut diffs = Vec::new();
        if self.count != other.count {
            diffs.push("count");
        }
        if self.null_count != other.null_count {
            diffs.push("null_count");
        }
        if compare_distributions {
            if self.distinct != other.distinct {
                diffs.push("distinct");
            }
            if self.top != other.top {
                diffs.push("top");
            }
        }
        diffs
    }

    fn summary(&self) -> String {
        format!(
            "count={}, distinct={}, top={}, nulls={}",
            self.count,
            self.distinct,
            self.top.as_deref().unwrap_or("n/a"),
            self.null_count
        )
    }
}

/// Statistics of one column, by column kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ColumnStats {
    Numeric(NumericStats),
    Categorical(CategoricalStats),
}

impl ColumnStats {
    pub fn of(table: &Table, col: usize) -> Self {
        let numeric = table.dtype(col).map(|t| t.is_statistical()).unwrap_or(false);
        if numeric {
            ColumnStats::Numeric(NumericStats::compute(table.column_values(col)))
        } else {
            ColumnStats::Categorical(CategoricalStats::compute(table.column_values(col)))
        }
    }

    fn summary(&self) -> String {
        match self {
            ColumnStats::Numeric(s) => s.summary(),
            ColumnStats::Categorical(s) => s.summary(),
        }
    }
}

/// Compares per-column summary statistics rather than individual cells
#[derive(Debug, Default)]
pub struct ColumnCompare;

impl ComparisonStrategy for ColumnCompare {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Compares per-column statistics (numeric summaries, distinct values, most frequent value)"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
            .float(TOLERANCE, DEFAULT_TOLERANCE, "Absolute tolerance for numeric statistics")
            .bool(
                COMPARE_DISTRIBUTIONS,
                true,
                "Compare distinct count and most frequent value of non-numeric columns",
            )
    }

    fn compare(
        &self,
        a: &Table,
        b: &Table,
        params: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<ComparisonResult> {
        let tolerance = params.float_or(TOLERANCE, DEFAULT_TOLERANCE).abs();
        let compare_distributions = params.bool_or(COMPARE_DISTRIBUTIONS, true);

        let names_a: HashSet<&str> = a.columns().iter().map(String::as_str).collect();
        let names_b: HashSet<&str> = b.columns().iter().map(String::as_str).collect();
        let common: Vec<(usize, usize, &str)> = a
            .columns()
            .iter()
            .enumerate()
            .filter_map(|(ia, name)| b.column_index(name).map(|ib| (ia, ib, name.as_str())))
            .collect();

        let stats: Vec<(ColumnStats, ColumnStats)> = common
            .par_iter()
            .map(|(ia, ib, _)| -> Result<(ColumnStats, ColumnStats)> {
                cancel.check()?;
                Ok((ColumnStats::of(a, *ia), ColumnStats::of(b, *ib)))
            })
            .collect::<Result<_>>()?;

        let mut highlights = Vec::new();
        let mut stat_lines = Vec::new();
        let mut statistics = IndexMap::new();
        let mut all_same = true;

        for ((_, _, name), (stats_a, stats_b)) in common.iter().zip(&stats) {
            let diffs = match (stats_a, stats_b) {
                (ColumnStats::Numeric(sa), ColumnStats::Numeric(sb)) => sa.differences(sb, tolerance),
                (ColumnStats::Categorical(sa), ColumnStats::Categorical(sb)) => {
                    sa.differences(sb, compare_distributions)
                }
                _ => vec!["type"],
            };
            let status = if diffs.is_empty() {
                "Match".to_string()
            } else if diffs == ["type"] {
                "Type mismatch".to_string()
            } else {
                format!("Different ({})", diffs.join(", "))
            };
            let diff_type = if diffs.is_empty() {
                DiffClassification::Same
            } else {
                all_same = false;
                stat_lines.push(format!("{}: {}", name, diffs.join(", ")));
                DiffClassification::Different
            };

            highlights.push(Highlight::new(
                "Column",
                *name,
                stats_a.summary(),
                stats_b.summary(),
                status,
                diff_type,
            ));
            statistics.insert(name.to_string(), json!({"a": stats_a, "b": stats_b}));
        }

        let only_a: Vec<&str> = a.columns().iter().map(String::as_str).filter(|c| !names_b.contains(c)).collect();
        let only_b: Vec<&str> = b.columns().iter().map(String::as_str).filter(|c| !names_a.contains(c)).collect();
        for column in &only_a {
            highlights.push(Highlight::new("Column", *column, "present", "", "Only in DF1", DiffClassification::OnlyInA));
        }
        for column in &only_b {
            highlights.push(Highlight::new("Column", *column, "", "present", "Only in DF2", DiffClassification::OnlyInB));
        }

        let sets_equal = only_a.is_empty() && only_b.is_empty();
        let is_equal = all_same && sets_equal;

        let mut set_lines = Vec::new();
        if !only_a.is_empty() {
            set_lines.push(format!("Only in DF1: {}", only_a.join(", ")));
        }
        if !only_b.is_empty() {
            set_lines.push(format!("Only in DF2: {}", only_b.join(", ")));
        }
        stat_lines.push(format!("{} column(s) compared, tolerance {:e}", common.len(), tolerance));
        let sections = vec![
            Section::checked("Column Sets", sets_equal, set_lines),
            Section::checked("Statistics", all_same, stat_lines),
        ];

        Ok(ComparisonResult::new(is_equal, render_details("Column comparison", is_equal, &sections))
            .with_highlights(highlights)
            .with_meta("columns_only_in_a", json!(only_a))
            .with_meta("columns_only_in_b", json!(only_b))
            .with_meta("statistics", json!(statistics)))
    }
}
