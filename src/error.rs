//! Error types for tabcompare operations

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TabcompareError>;

#[derive(Error, Debug)]
pub enum TabcompareError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Strategy not found: {name}")]
    StrategyNotFound { name: String },

    #[error("Invalid strategy manifest: {path}: {message}")]
    InvalidManifest { path: PathBuf, message: String },

    #[error("Discovery error: {message}")]
    Discovery { message: String },

    #[error("Invalid table: {message}")]
    Table { message: String },

    #[error("Invalid parameter schema: {message}")]
    ParameterSchema { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Comparison failed: {message}")]
    Execution { message: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Walkdir error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl TabcompareError {
    pub fn invalid_manifest(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::InvalidManifest {
            path: path.into(),
            message: msg.into(),
        }
    }

    pub fn discovery(msg: impl Into<String>) -> Self {
        Self::Discovery {
            message: msg.into(),
        }
    }

    pub fn table(msg: impl Into<String>) -> Self {
        Self::Table {
            message: msg.into(),
        }
    }

    pub fn parameter_schema(msg: impl Into<String>) -> Self {
        Self::ParameterSchema {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
