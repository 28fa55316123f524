//! Declarative strategy manifests: named presets over registered strategies

use crate::error::{Result, TabcompareError};
use crate::params::{ParameterSchema, Parameters, RawParams};
use crate::result::ComparisonResult;
use crate::strategy::{CancellationToken, ComparisonStrategy};
use crate::table::Table;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Manifest format understood by this version
pub const MANIFEST_FORMAT_VERSION: &str = "1";

/// On-disk definition of a strategy derived from a registered base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyManifest {
    pub format_version: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Registered strategy this manifest derives from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    /// Overridden parameter defaults, coerced against the base schema
    #[serde(default)]
    pub parameters: RawParams,
    #[serde(default, rename = "abstract")]
    pub is_abstract: bool,
}

impl StrategyManifest {
    /// Read and parse a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&content)
            .map_err(|e| TabcompareError::invalid_manifest(path, e.to_string()))?;

        if manifest.format_version != MANIFEST_FORMAT_VERSION {
            return Err(TabcompareError::invalid_manifest(
                path,
                format!(
                    "unsupported format version '{}' (expected '{}')",
                    manifest.format_version, MANIFEST_FORMAT_VERSION
                ),
            ));
        }
        if manifest.name.trim().is_empty() {
            return Err(TabcompareError::invalid_manifest(path, "name must not be empty"));
        }
        Ok(manifest)
    }

    /// Abstract manifests and manifests without a base cannot be instantiated
    pub fn is_complete(&self) -> bool {
        !self.is_abstract && self.base.is_some()
    }

    /// Build the preset strategy over `base`, coercing every override
    pub fn instantiate(&self, base: Arc<dyn ComparisonStrategy>, path: &Path) -> Result<PresetStrategy> {
        let mut schema = base.parameters();
        for (param, raw) in &self.parameters {
            let spec = schema.get_mut(param).ok_or_else(|| {
                TabcompareError::invalid_manifest(
                    path,
                    format!("'{}' has no parameter '{}'", base.name(), param),
                )
            })?;
            spec.default = spec.coerce(raw).ok_or_else(|| {
                TabcompareError::invalid_manifest(
                    path,
                    format!("cannot use {} as {:?} for parameter '{}'", raw, spec.kind, param),
                )
            })?;
        }

        Ok(PresetStrategy {
            name: self.name.clone(),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| format!("{} with custom defaults", base.name())),
            version: self.version.clone().unwrap_or_else(|| base.version().to_string()),
            schema,
            base,
        })
    }
}

/// Find manifest files under `dir`, recursively, ordered by file name
pub fn manifest_paths(dir: &Path) -> Vec<std::result::Result<PathBuf, walkdir::Error>> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_file() && is_json(entry.path()) => Some(Ok(entry.into_path())),
            Ok(_) => None,
            Err(e) => Some(Err(e)),
        })
        .collect()
}

fn is_json(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("json")
}

/// A registered strategy under a new name with different parameter defaults
pub struct PresetStrategy {
    name: String,
    description: String,
    version: String,
    schema: ParameterSchema,
    base: Arc<dyn ComparisonStrategy>,
}

impl PresetStrategy {
    pub fn base_name(&self) -> &str {
        self.base.name()
    }
}

impl ComparisonStrategy for PresetStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn parameters(&self) -> ParameterSchema {
        self.schema.clone()
    }

    fn validate(&self, a: Option<&Table>, b: Option<&Table>) -> Option<String> {
        self.base.validate(a, b)
    }

    fn compare(
        &self,
        a: &Table,
        b: &Table,
        params: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<ComparisonResult> {
        self.base.compare(a, b, params, cancel)
    }
}
