//! The unified comparison result contract

use crate::params::Parameters;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::fmt;

/// Column headers matching [`Highlight::to_record`]
pub const HIGHLIGHT_HEADER: [&str; 6] = ["category", "item", "valueA", "valueB", "status", "diff_type"];

/// Four-way classification of a highlighted item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiffClassification {
    #[serde(rename = "same")]
    Same,
    #[serde(rename = "different")]
    Different,
    #[serde(rename = "only_a")]
    OnlyInA,
    #[serde(rename = "only_b")]
    OnlyInB,
}

impl DiffClassification {
    pub fn as_str(self) -> &'static str {
        match self {
            DiffClassification::Same => "same",
            DiffClassification::Different => "different",
            DiffClassification::OnlyInA => "only_a",
            DiffClassification::OnlyInB => "only_b",
        }
    }

    pub fn is_same(self) -> bool {
        self == DiffClassification::Same
    }
}

impl fmt::Display for DiffClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported unit of agreement or discrepancy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub category: String,
    pub item: String,
    #[serde(rename = "valueA")]
    pub value_a: String,
    #[serde(rename = "valueB")]
    pub value_b: String,
    pub status: String,
    pub diff_type: DiffClassification,
}

impl Highlight {
    pub fn new(
        category: impl Into<String>,
        item: impl Into<String>,
        value_a: impl Into<String>,
        value_b: impl Into<String>,
        status: impl Into<String>,
        diff_type: DiffClassification,
    ) -> Self {
        Self {
            category: category.into(),
            item: item.into(),
            value_a: value_a.into(),
            value_b: value_b.into(),
            status: status.into(),
            diff_type,
        }
    }

    /// Flat string row for tabular export, in [`HIGHLIGHT_HEADER`] order
    pub fn to_record(&self) -> [String; 6] {
        [
            self.category.clone(),
            self.item.clone(),
            self.value_a.clone(),
            self.value_b.clone(),
            self.status.clone(),
            self.diff_type.as_str().to_string(),
        ]
    }
}

/// Output of one comparison call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub is_equal: bool,
    pub details: String,
    pub highlights: Vec<Highlight>,
    pub metadata: IndexMap<String, Json>,
}

impl ComparisonResult {
    pub fn new(is_equal: bool, details: impl Into<String>) -> Self {
        Self {
            is_equal,
            details: details.into(),
            highlights: Vec::new(),
            metadata: IndexMap::new(),
        }
    }

    /// A failed run: never equal, with the message under `metadata.error`
    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut result = Self::new(false, message.clone());
        result.metadata.insert("error".to_string(), Json::String(message));
        result
            .metadata
            .insert("error_kind".to_string(), Json::String(kind.as_str().to_string()));
        result
    }

    pub fn with_highlights(mut self, highlights: Vec<Highlight>) -> Self {
        self.highlights = highlights;
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<Json>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn set_parameters(&mut self, params: &Parameters) {
        self.metadata.insert("parameters".to_string(), params.to_json());
    }

    /// Whether the engine failed, as opposed to the data differing
    pub fn is_failure(&self) -> bool {
        self.metadata.contains_key("error")
    }

    pub fn error(&self) -> Option<&str> {
        self.metadata.get("error").and_then(Json::as_str)
    }

    pub fn error_kind(&self) -> Option<&str> {
        self.metadata.get("error_kind").and_then(Json::as_str)
    }

    /// Highlights of a given classification
    pub fn highlights_of(&self, diff_type: DiffClassification) -> impl Iterator<Item = &Highlight> {
        self.highlights.iter().filter(move |h| h.diff_type == diff_type)
    }

    /// Highlights flattened to string rows, header first
    pub fn to_records(&self) -> Vec<Vec<String>> {
        let mut records = vec![HIGHLIGHT_HEADER.iter().map(|h| h.to_string()).collect()];
        records.extend(self.highlights.iter().map(|h| h.to_record().to_vec()));
        records
    }
}

/// Why a comparison run failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Discovery,
    Validation,
    Execution,
    Cancelled,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Discovery => "discovery",
            ErrorKind::Validation => "validation",
            ErrorKind::Execution => "execution",
            ErrorKind::Cancelled => "cancelled",
        }
    }
}
