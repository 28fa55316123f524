//! Content-hash comparison of whole tables and, on mismatch, of individual rows

use crate::error::Result;
use crate::params::{ParameterSchema, Parameters};
use crate::result::{ComparisonResult, DiffClassification, Highlight};
use crate::strategy::{CancellationToken, ComparisonStrategy};
use crate::table::{Table, Value};
use indexmap::IndexMap;
use rayon::prelude::*;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet, VecDeque};

use super::{key_positions, key_token, render_cells, render_details, row_key, Section};

pub const NAME: &str = "hash_compare";

const ROW_ORDER_SENSITIVE: &str = "row_order_sensitive";
const HASH_ALGORITHM: &str = "hash_algorithm";
const PER_ROW_HASHES: &str = "per_row_hashes";
const KEY_COLUMNS: &str = "key_columns";

/// A hash value represented as a hex string
pub type HashValue = String;

/// Digest function used for row and table hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Blake3,
    Sha256,
}

impl HashAlgorithm {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "sha256" => Self::Sha256,
            _ => Self::Blake3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blake3 => "blake3",
            Self::Sha256 => "sha256",
        }
    }
}

/// Row hash with index
#[derive(Debug, Clone)]
pub struct RowHash {
    pub row_index: usize,
    pub hash: HashValue,
}

/// Hash computer for canonical table encodings
pub struct HashComputer {
    algorithm: HashAlgorithm,
}

impl HashComputer {
    pub fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Compute the hex digest of raw bytes
    pub fn hash_bytes(&self, bytes: &[u8]) -> HashValue {
        match self.algorithm {
            HashAlgorithm::Blake3 => blake3::hash(bytes).to_hex().to_string(),
            HashAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
        }
    }

    /// Compute the hash of one row's canonical encoding
    pub fn hash_row(&self, row: &[Value]) -> HashValue {
        let mut buf = Vec::with_capacity(row.len() * 16);
        for value in row {
            encode_value(value, &mut buf);
        }
        self.hash_bytes(&buf)
    }

    /// Compute row hashes in parallel, checking for cancellation per row
    pub fn hash_rows(&self, table: &Table, cancel: &CancellationToken) -> Result<Vec<RowHash>> {
        (0..table.row_count())
            .into_par_iter()
            .map(|idx| -> Result<RowHash> {
                cancel.check()?;
                Ok(RowHash {
                    row_index: idx,
                    hash: self.hash_row(table.row(idx).unwrap_or(&[])),
                })
            })
            .collect()
    }

    /// Combine the column header and row hashes into one table hash.
    ///
    /// When `row_order_sensitive` is false the row hashes are sorted first,
    /// so any permutation of the same rows hashes identically.
    pub fn hash_table(&self, columns: &[String], rows: &[RowHash], row_order_sensitive: bool) -> HashValue {
        let mut buf = Vec::new();
        buf.extend_from_slice(&(columns.len() as u64).to_le_bytes());
        for column in columns {
            encode_str(column, &mut buf);
        }
        buf.extend_from_slice(&(rows.len() as u64).to_le_bytes());

        let mut row_hashes: Vec<&str> = rows.iter().map(|r| r.hash.as_str()).collect();
        if !row_order_sensitive {
            row_hashes.sort_unstable();
        }
        for hash in row_hashes {
            buf.extend_from_slice(hash.as_bytes());
        }
        self.hash_bytes(&buf)
    }

    /// Compare two sets of row hashes by content, ignoring position
    pub fn compare_row_hashes(&self, base_hashes: &[RowHash], compare_hashes: &[RowHash]) -> RowHashComparison {
        let mut base_content_to_indices: HashMap<&str, Vec<usize>> = HashMap::new();
        for rh in base_hashes {
            base_content_to_indices.entry(rh.hash.as_str()).or_default().push(rh.row_index);
        }

        let mut compare_content_to_indices: HashMap<&str, Vec<usize>> = HashMap::new();
        for rh in compare_hashes {
            compare_content_to_indices.entry(rh.hash.as_str()).or_default().push(rh.row_index);
        }

        let mut added_rows = Vec::new();
        let mut removed_rows = Vec::new();

        // Content present on one side only, or present more often on one side
        for (content_hash, base_indices) in &base_content_to_indices {
            let compare_count = compare_content_to_indices.get(content_hash).map_or(0, Vec::len);
            removed_rows.extend(base_indices.iter().skip(compare_count));
        }
        for (content_hash, compare_indices) in &compare_content_to_indices {
            let base_count = base_content_to_indices.get(content_hash).map_or(0, Vec::len);
            added_rows.extend(compare_indices.iter().skip(base_count));
        }

        added_rows.sort_unstable();
        removed_rows.sort_unstable();

        RowHashComparison {
            added_rows,
            removed_rows,
            duplicate_base: base_hashes.len() - base_content_to_indices.len(),
            duplicate_compare: compare_hashes.len() - compare_content_to_indices.len(),
        }
    }
}

/// Result of comparing row hashes by content
#[derive(Debug, Clone)]
pub struct RowHashComparison {
    pub added_rows: Vec<usize>,
    pub removed_rows: Vec<usize>,
    /// Rows whose content repeats an earlier row of the same side
    pub duplicate_base: usize,
    pub duplicate_compare: usize,
}

fn encode_str(s: &str, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&(s.len() as u64).to_le_bytes());
    buf.extend_from_slice(s.as_bytes());
}

/// Type-tagged, length-prefixed cell encoding
fn encode_value(value: &Value, buf: &mut Vec<u8>) {
    match value {
        v if v.is_null() => buf.push(b'n'),
        Value::Bool(b) => {
            buf.push(b'b');
            buf.push(u8::from(*b));
        }
        Value::Int(i) => {
            buf.push(b'i');
            buf.extend_from_slice(&i.to_le_bytes());
        }
        Value::Float(f) => {
            // -0.0 and 0.0 encode identically
            let normalized = if *f == 0.0 { 0.0f64 } else { *f };
            buf.push(b'f');
            buf.extend_from_slice(&normalized.to_bits().to_le_bytes());
        }
        Value::Text(s) => {
            buf.push(b's');
            encode_str(s, buf);
        }
        Value::Timestamp(ts) => {
            buf.push(b't');
            encode_str(&ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string(), buf);
        }
        Value::Null => buf.push(b'n'),
    }
}

/// Compares tables by a digest of their canonical content
#[derive(Debug, Default)]
pub struct HashCompare;

impl ComparisonStrategy for HashCompare {
    fn name(&self) -> &str {
        NAME
    }

    fn description(&self) -> &str {
        "Compares content hashes of whole tables, then of individual rows on mismatch"
    }

    fn version(&self) -> &str {
        "1.0.0"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new()
            .bool(ROW_ORDER_SENSITIVE, true, "Row order participates in the table hash")
            .choice(HASH_ALGORITHM, "blake3", &["blake3", "sha256"], "Digest function")
            .bool(PER_ROW_HASHES, true, "On mismatch, hash and match individual rows")
            .string(
                KEY_COLUMNS,
                "",
                "Comma-separated key columns for row matching; empty infers a unique column",
            )
    }

    fn compare(
        &self,
        a: &Table,
        b: &Table,
        params: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<ComparisonResult> {
        let order_sensitive = params.bool_or(ROW_ORDER_SENSITIVE, true);
        let algorithm = HashAlgorithm::parse(params.str_or(HASH_ALGORITHM, "blake3"));
        let per_row = params.bool_or(PER_ROW_HASHES, true);

        let computer = HashComputer::new(algorithm);
        let rows_a = computer.hash_rows(a, cancel)?;
        let rows_b = computer.hash_rows(b, cancel)?;
        let hash_a = computer.hash_table(a.columns(), &rows_a, order_sensitive);
        let hash_b = computer.hash_table(b.columns(), &rows_b, order_sensitive);
        let is_equal = hash_a == hash_b;
        log::debug!("Table hashes ({}): {} vs {}", algorithm.as_str(), hash_a, hash_b);

        let mut highlights = vec![Highlight::new(
            "Table Hash",
            "table",
            hash_a.clone(),
            hash_b.clone(),
            if is_equal { "Match" } else { "Hash differs" },
            if is_equal {
                DiffClassification::Same
            } else {
                DiffClassification::Different
            },
        )];
        let mut sections = vec![Section::checked(
            "Table Hash",
            is_equal,
            vec![
                format!("algorithm: {}, row order sensitive: {}", algorithm.as_str(), order_sensitive),
                format!("DF1: {}", hash_a),
                format!("DF2: {}", hash_b),
            ],
        )];

        let mut result_meta = IndexMap::new();
        if !is_equal && per_row {
            let supplied = params.list(KEY_COLUMNS);
            let keys = if supplied.is_empty() {
                infer_key(a, b).into_iter().collect()
            } else {
                supplied
            };
            let row_highlights = if keys.is_empty() {
                if order_sensitive {
                    match_by_position(&rows_a, &rows_b)
                } else {
                    match_by_content(&computer, &rows_a, &rows_b)
                }
            } else {
                match_by_key(a, b, &keys, &rows_a, &rows_b, cancel)?
            };

            let matching = if keys.is_empty() {
                let by = if order_sensitive { "position" } else { "content" };
                by.to_string()
            } else {
                format!("key ({})", keys.join(", "))
            };
            sections.push(Section::checked(
                "Row Hashes",
                row_highlights.is_empty(),
                vec![
                    format!("matched by {}", matching),
                    format!("{} row(s) differ", row_highlights.len()),
                ],
            ));
            result_meta.insert("key_columns".to_string(), json!(keys));
            result_meta.insert("rows_reported".to_string(), json!(row_highlights.len()));
            highlights.extend(row_highlights);
        }

        let mut result = ComparisonResult::new(is_equal, render_details("Hash comparison", is_equal, &sections))
            .with_highlights(highlights)
            .with_meta("hash_a", hash_a)
            .with_meta("hash_b", hash_b)
            .with_meta("algorithm", algorithm.as_str())
            .with_meta("row_order_sensitive", order_sensitive);
        result.metadata.extend(result_meta);
        Ok(result)
    }
}

/// First common column whose values are present and unique on both sides
fn infer_key(a: &Table, b: &Table) -> Option<String> {
    let unique = |table: &Table, col: usize| -> bool {
        let mut seen = HashSet::new();
        table
            .column_values(col)
            .all(|v| !v.is_null() && seen.insert(key_token(v)))
    };

    a.columns().iter().enumerate().find_map(|(ia, name)| {
        let ib = b.column_index(name)?;
        (unique(a, ia) && unique(b, ib)).then(|| name.clone())
    })
}

fn short(hash: &str) -> String {
    hash.chars().take(16).collect()
}

fn row_highlight(item: String, hash_a: &str, hash_b: &str, diff_type: DiffClassification) -> Highlight {
    let status = match diff_type {
        DiffClassification::OnlyInA => "Only in DF1",
        DiffClassification::OnlyInB => "Only in DF2",
        DiffClassification::Different => "Hash differs",
        DiffClassification::Same => "Match",
    };
    Highlight::new("Row Hash", item, short(hash_a), short(hash_b), status, diff_type)
}

fn match_by_position(rows_a: &[RowHash], rows_b: &[RowHash]) -> Vec<Highlight> {
    let mut highlights = Vec::new();
    for i in 0..rows_a.len().max(rows_b.len()) {
        let item = format!("row {}", i);
        match (rows_a.get(i), rows_b.get(i)) {
            (Some(ra), Some(rb)) if ra.hash != rb.hash => {
                highlights.push(row_highlight(item, &ra.hash, &rb.hash, DiffClassification::Different));
            }
            (Some(ra), None) => highlights.push(row_highlight(item, &ra.hash, "", DiffClassification::OnlyInA)),
            (None, Some(rb)) => highlights.push(row_highlight(item, "", &rb.hash, DiffClassification::OnlyInB)),
            _ => {}
        }
    }
    highlights
}

fn match_by_content(computer: &HashComputer, rows_a: &[RowHash], rows_b: &[RowHash]) -> Vec<Highlight> {
    let comparison = computer.compare_row_hashes(rows_a, rows_b);
    log::debug!(
        "Content matching: {} duplicate row(s) in DF1, {} in DF2",
        comparison.duplicate_base,
        comparison.duplicate_compare
    );

    let removed = comparison.removed_rows.iter().map(|&i| {
        row_highlight(format!("row {}", i), &rows_a[i].hash, "", DiffClassification::OnlyInA)
    });
    let added = comparison.added_rows.iter().map(|&i| {
        row_highlight(format!("row {}", i), "", &rows_b[i].hash, DiffClassification::OnlyInB)
    });
    removed.chain(added).collect()
}

fn match_by_key(
    a: &Table,
    b: &Table,
    keys: &[String],
    rows_a: &[RowHash],
    rows_b: &[RowHash],
    cancel: &CancellationToken,
) -> Result<Vec<Highlight>> {
    let positions = key_positions(a, b, keys)?;
    let key_cols_a: Vec<(String, usize)> = keys.iter().cloned().zip(positions.iter().map(|p| p.0)).collect();
    let key_cols_b: Vec<(String, usize)> = keys.iter().cloned().zip(positions.iter().map(|p| p.1)).collect();
    let token = |table: &Table, row: usize, cols: &[(String, usize)]| -> Vec<String> {
        row_key(table, row, cols.iter().map(|(_, col)| *col), true)
    };

    let mut pending_b: IndexMap<Vec<String>, VecDeque<usize>> = IndexMap::new();
    for row in 0..b.row_count() {
        pending_b.entry(token(b, row, &key_cols_b)).or_default().push_back(row);
    }

    let mut highlights = Vec::new();
    for row in 0..a.row_count() {
        cancel.check()?;
        let item = render_cells(a, row, &key_cols_a);
        match pending_b.get_mut(&token(a, row, &key_cols_a)).and_then(VecDeque::pop_front) {
            Some(row_b) if rows_a[row].hash != rows_b[row_b].hash => {
                highlights.push(row_highlight(item, &rows_a[row].hash, &rows_b[row_b].hash, DiffClassification::Different));
            }
            Some(_) => {}
            None => highlights.push(row_highlight(item, &rows_a[row].hash, "", DiffClassification::OnlyInA)),
        }
    }

    let mut leftover: Vec<usize> = pending_b.into_values().flatten().collect();
    leftover.sort_unstable();
    for row in leftover {
        let item = render_cells(b, row, &key_cols_b);
        highlights.push(row_highlight(item, "", &rows_b[row].hash, DiffClassification::OnlyInB));
    }
    Ok(highlights)
}
