//! Command-line interface for tabcompare

use crate::config::OutputFormat;
use clap::{Parser, Subcommand};
use serde_json::Value as Json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tabcompare")]
#[command(about = "Compare two tables with pluggable comparison strategies")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to ./tabcompare.json when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory scanned for strategy manifests
    #[arg(long, global = true)]
    pub strategies_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare two JSON table documents
    Compare {
        /// First table (DF1)
        table_a: PathBuf,

        /// Second table (DF2)
        table_b: PathBuf,

        /// Strategy name (defaults to the configured default strategy)
        #[arg(long, short)]
        strategy: Option<String>,

        /// Strategy parameter as NAME=VALUE; repeatable
        #[arg(long = "param", short = 'p', value_name = "NAME=VALUE", value_parser = parse_param)]
        params: Vec<(String, Json)>,

        /// Output format
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Cancel the comparison after this many seconds
        #[arg(long, value_parser = validate_timeout)]
        timeout_secs: Option<u64>,

        /// Also write the result as JSON to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// List registered strategies and discovery errors
    List {
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Show a strategy's descriptor and parameter schema
    Describe {
        /// Strategy name
        name: String,

        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Run discovery over a directory and report what loads
    Scan {
        /// Directory of strategy manifests
        dir: PathBuf,

        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },
}

/// Parse `NAME=VALUE`. The value is read as JSON when it parses as JSON,
/// otherwise kept as a plain string.
pub fn parse_param(s: &str) -> Result<(String, Json), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Invalid parameter '{}'. Use NAME=VALUE", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Invalid parameter '{}': empty name", s));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Json::String(value.to_string()));
    Ok((name.to_string(), value))
}

/// Validate that the timeout is greater than 0
fn validate_timeout(s: &str) -> Result<u64, String> {
    let secs: u64 = s
        .parse()
        .map_err(|_| format!("Invalid timeout: '{}'. Must be a positive integer.", s))?;

    if secs == 0 {
        return Err("Timeout must be greater than 0".to_string());
    }

    Ok(secs)
}
