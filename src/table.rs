//! Immutable in-memory tables handed to comparison strategies

use crate::error::{Result, TabcompareError};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// NaN floats count as missing, same as an explicit null.
    pub fn is_null(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// The data type this value would infer to, `None` for missing values
    pub fn kind(&self) -> Option<DataType> {
        match self {
            _ if self.is_null() => None,
            Value::Bool(_) => Some(DataType::Bool),
            Value::Int(_) => Some(DataType::Int),
            Value::Float(_) => Some(DataType::Float),
            Value::Text(_) => Some(DataType::Text),
            Value::Timestamp(_) => Some(DataType::Timestamp),
            Value::Null => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) if !f.is_nan() => Some(*f),
            _ => None,
        }
    }

    /// Cell equality used by row-level comparison.
    ///
    /// Missing values match each other, integers and floats compare
    /// numerically, and text honours `case_sensitive`.
    pub fn matches(&self, other: &Value, case_sensitive: bool) -> bool {
        match (self, other) {
            (a, b) if a.is_null() || b.is_null() => a.is_null() && b.is_null(),
            (Value::Text(a), Value::Text(b)) => {
                if case_sensitive {
                    a == b
                } else {
                    a.to_lowercase() == b.to_lowercase()
                }
            }
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) | (Value::Float(_), Value::Float(_)) => {
                self.as_f64() == other.as_f64()
            }
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(v) if v.is_nan() => write!(f, "NaN"),
            Value::Float(v) => write!(f, "{}", v),
            Value::Text(s) => write!(f, "{}", s),
            Value::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.f")),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// Declared column data type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Bool,
    Int,
    Float,
    Complex,
    Text,
    Categorical,
    Object,
    Timestamp,
    Duration,
}

/// Compatibility family of a data type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeFamily {
    Numeric,
    Text,
    Temporal,
    Bool,
}

impl DataType {
    pub fn family(self) -> TypeFamily {
        match self {
            DataType::Int | DataType::Float | DataType::Complex => TypeFamily::Numeric,
            DataType::Text | DataType::Categorical | DataType::Object => TypeFamily::Text,
            DataType::Timestamp | DataType::Duration => TypeFamily::Temporal,
            DataType::Bool => TypeFamily::Bool,
        }
    }

    /// Whether column statistics (mean, std, ...) apply to values of this type
    pub fn is_statistical(self) -> bool {
        matches!(self, DataType::Int | DataType::Float)
    }

    /// Infer a column type from its values
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> DataType {
        let mut inferred: Option<DataType> = None;
        for kind in values.into_iter().filter_map(Value::kind) {
            inferred = match (inferred, kind) {
                (None, k) => Some(k),
                (Some(a), b) if a == b => Some(a),
                (Some(DataType::Int), DataType::Float) | (Some(DataType::Float), DataType::Int) => {
                    Some(DataType::Float)
                }
                _ => return DataType::Object,
            };
        }
        inferred.unwrap_or(DataType::Object)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Bool => "bool",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Complex => "complex",
            DataType::Text => "text",
            DataType::Categorical => "categorical",
            DataType::Object => "object",
            DataType::Timestamp => "timestamp",
            DataType::Duration => "duration",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = TabcompareError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bool" | "boolean" => Ok(DataType::Bool),
            "int" | "integer" | "int64" | "int32" => Ok(DataType::Int),
            "float" | "double" | "float64" | "float32" => Ok(DataType::Float),
            "complex" | "complex128" => Ok(DataType::Complex),
            "text" | "string" | "str" => Ok(DataType::Text),
            "categorical" | "category" => Ok(DataType::Categorical),
            "object" => Ok(DataType::Object),
            "timestamp" | "datetime" => Ok(DataType::Timestamp),
            "duration" | "timedelta" => Ok(DataType::Duration),
            other => Err(TabcompareError::table(format!("Unknown data type: {}", other))),
        }
    }
}

/// Description of a table's row index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableIndex {
    #[serde(default)]
    pub label: Option<String>,
    pub kind: DataType,
    pub len: usize,
}

/// Immutable tabular snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    dtypes: Vec<DataType>,
    rows: Vec<Vec<Value>>,
    index: Option<TableIndex>,
}

impl Table {
    /// Create a table, inferring column types from the data
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        Self::check_rows(&columns, &rows)?;
        let dtypes = (0..columns.len())
            .map(|col| DataType::infer(rows.iter().map(|row| &row[col])))
            .collect();

        Ok(Self {
            columns,
            dtypes,
            rows,
            index: None,
        })
    }

    /// Create a table with declared column types
    pub fn with_dtypes(
        columns: Vec<String>,
        dtypes: Vec<DataType>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self> {
        if dtypes.len() != columns.len() {
            return Err(TabcompareError::table(format!(
                "{} data types declared for {} columns",
                dtypes.len(),
                columns.len()
            )));
        }
        Self::check_rows(&columns, &rows)?;

        Ok(Self {
            columns,
            dtypes,
            rows,
            index: None,
        })
    }

    /// Table with no columns and no rows
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            dtypes: Vec::new(),
            rows: Vec::new(),
            index: None,
        }
    }

    /// Attach an explicit index description
    pub fn with_index(mut self, index: TableIndex) -> Self {
        self.index = Some(index);
        self
    }

    fn check_rows(columns: &[String], rows: &[Vec<Value>]) -> Result<()> {
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(TabcompareError::table(format!(
                    "Row {} has {} cells, expected {}",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn dtypes(&self) -> &[DataType] {
        &self.dtypes
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// A table is empty when it has no rows or no columns
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    /// Cell at (row, col); out-of-range positions read as `Null`
    pub fn cell(&self, row: usize, col: usize) -> &Value {
        static NULL: Value = Value::Null;
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&NULL)
    }

    pub fn row(&self, row: usize) -> Option<&[Value]> {
        self.rows.get(row).map(Vec::as_slice)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn dtype(&self, col: usize) -> Option<DataType> {
        self.dtypes.get(col).copied()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |row| row.get(col))
    }

    pub fn null_count(&self, col: usize) -> usize {
        self.column_values(col).filter(|v| v.is_null()).count()
    }

    /// The explicit index, or a default unlabeled integer index
    pub fn index(&self) -> TableIndex {
        self.index.clone().unwrap_or(TableIndex {
            label: None,
            kind: DataType::Int,
            len: self.rows.len(),
        })
    }

    /// Build a table from its JSON document form
    pub fn from_document(doc: TableDocument) -> Result<Self> {
        let names: Vec<String> = doc.columns.iter().map(|c| c.name().to_string()).collect();
        let declared: Vec<Option<DataType>> = doc
            .columns
            .iter()
            .map(|c| c.dtype().map(|d| d.parse::<DataType>()).transpose())
            .collect::<Result<_>>()?;

        let mut rows = Vec::with_capacity(doc.rows.len());
        for (i, raw_row) in doc.rows.iter().enumerate() {
            if raw_row.len() != names.len() {
                return Err(TabcompareError::table(format!(
                    "Row {} has {} cells, expected {}",
                    i,
                    raw_row.len(),
                    names.len()
                )));
            }
            let row = raw_row
                .iter()
                .zip(&declared)
                .map(|(raw, dtype)| json_to_value(raw, *dtype))
                .collect::<Result<Vec<_>>>()
                .map_err(|e| TabcompareError::table(format!("Row {}: {}", i, e)))?;
            rows.push(row);
        }

        let dtypes = declared
            .iter()
            .enumerate()
            .map(|(col, dtype)| dtype.unwrap_or_else(|| DataType::infer(rows.iter().map(|r| &r[col]))))
            .collect();

        let mut table = Self::with_dtypes(names, dtypes, rows)?;
        table.index = doc.index;
        Ok(table)
    }

    /// Load a table from a JSON document file
    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TabcompareError::invalid_input(format!(
                "File not found: {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let doc: TableDocument = serde_json::from_str(&content)?;
        Self::from_document(doc)
    }
}

/// JSON form of a table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableDocument {
    pub columns: Vec<ColumnDocument>,
    #[serde(default)]
    pub rows: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    pub index: Option<TableIndex>,
}

/// A column given either as a bare name or as `{name, dtype}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnDocument {
    Name(String),
    Typed {
        name: String,
        #[serde(default)]
        dtype: Option<String>,
    },
}

impl ColumnDocument {
    pub fn name(&self) -> &str {
        match self {
            ColumnDocument::Name(name) => name,
            ColumnDocument::Typed { name, .. } => name,
        }
    }

    pub fn dtype(&self) -> Option<&str> {
        match self {
            ColumnDocument::Name(_) => None,
            ColumnDocument::Typed { dtype, .. } => dtype.as_deref(),
        }
    }
}

fn json_to_value(raw: &serde_json::Value, dtype: Option<DataType>) -> Result<Value> {
    use serde_json::Value as Json;

    Ok(match (raw, dtype) {
        (Json::Null, _) => Value::Null,
        (Json::Bool(b), _) => Value::Bool(*b),
        (Json::Number(n), Some(DataType::Float)) => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        (Json::Number(n), _) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        (Json::String(s), Some(DataType::Timestamp)) => Value::Timestamp(parse_timestamp(s)?),
        (Json::String(s), Some(DataType::Duration)) => {
            return Err(TabcompareError::table(format!(
                "Duration cells must be integer nanoseconds, got '{}'",
                s
            )))
        }
        (Json::String(s), _) => Value::Text(s.clone()),
        (other, _) => Value::Text(other.to_string()),
    })
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.fZ"];

    for format in FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TabcompareError::table(format!("Invalid timestamp: '{}'", s)))
}

/// Build a table from string-literal rows, for tests and fixtures
#[cfg(test)]
pub(crate) fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
    Table::new(columns.iter().map(|c| c.to_string()).collect(), rows).expect("valid table")
}
