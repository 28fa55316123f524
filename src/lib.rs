//! # tabcompare
//!
//! A pluggable comparison engine for in-memory tables. Strategies compare
//! schemas, rows, column statistics or content hashes and report a uniform
//! result with classified highlights.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod params;
pub mod progress;
pub mod registry;
pub mod result;
pub mod strategies;
pub mod strategy;
pub mod table;

pub use error::{Result, TabcompareError};
pub use orchestrator::{ComparisonRun, Orchestrator, RunState};
pub use params::{ParameterSchema, Parameters, RawParams};
pub use registry::StrategyRegistry;
pub use result::{ComparisonResult, DiffClassification, Highlight};
pub use strategy::{CancellationToken, ComparisonStrategy, StrategyDescriptor};
pub use table::{DataType, Table, Value};

pub use manifest::MANIFEST_FORMAT_VERSION;
