//! Engine configuration loaded by the CLI

use crate::error::{Result, TabcompareError};
use crate::params::RawParams;
use crate::strategies::schema;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "tabcompare.json";

/// Environment variable overriding the strategy manifest directory
pub const STRATEGIES_DIR_ENV: &str = "TABCOMPARE_STRATEGIES_DIR";

/// Output format for CLI reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory scanned for strategy manifests
    pub strategies_dir: Option<PathBuf>,
    pub default_strategy: String,
    /// Raw parameter defaults per strategy name
    pub parameters: IndexMap<String, RawParams>,
    pub format: OutputFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strategies_dir: None,
            default_strategy: schema::NAME.to_string(),
            parameters: IndexMap::new(),
            format: OutputFormat::Pretty,
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| TabcompareError::config(format!("{}: {}", path.display(), e)))
    }

    /// Load `explicit` if given, else `tabcompare.json` in `dir` when present,
    /// else defaults. The environment override is applied last.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load(path)?,
            None => {
                let candidate = dir.join(CONFIG_FILE_NAME);
                if candidate.is_file() {
                    log::debug!("Using configuration {}", candidate.display());
                    Self::load(&candidate)?
                } else {
                    Self::default()
                }
            }
        };

        if let Some(dir) = std::env::var_os(STRATEGIES_DIR_ENV).filter(|v| !v.is_empty()) {
            config.strategies_dir = Some(PathBuf::from(dir));
        }
        Ok(config)
    }

    /// Configured defaults for `strategy` overlaid with `overrides`
    pub fn parameters_for(&self, strategy: &str, overrides: &RawParams) -> RawParams {
        let mut merged = self.parameters.get(strategy).cloned().unwrap_or_default();
        for (name, value) in overrides {
            merged.insert(name.clone(), value.clone());
        }
        merged
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
