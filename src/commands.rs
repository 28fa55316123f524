//! Command implementations for tabcompare CLI

use crate::cli::Commands;
use crate::config::{EngineConfig, OutputFormat};
use crate::error::{Result, TabcompareError};
use crate::orchestrator::{ComparisonRun, Orchestrator};
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::params::RawParams;
use crate::progress::ProgressReporter;
use crate::registry::{self, ScanReport};
use crate::table::Table;
use serde_json::Value as Json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// How a successful command ended, mapped to the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Success,
    /// The comparison ran and the tables differ
    Differences,
    /// The command ran but reported a failure (failed comparison, discovery errors)
    Failed,
}

impl CommandOutcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Failed => 1,
            Self::Differences => 2,
        }
    }
}

/// Configuration shared by all commands
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: EngineConfig,
}

impl CommandContext {
    /// Load configuration; a command-line strategies directory wins over
    /// both the environment and the file
    pub fn load(config_path: Option<&Path>, strategies_dir: Option<PathBuf>) -> Result<Self> {
        let current_dir = std::env::current_dir()?;
        let mut config = EngineConfig::discover(config_path, &current_dir)?;
        if strategies_dir.is_some() {
            config.strategies_dir = strategies_dir;
        }
        Ok(Self { config })
    }

    fn format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        requested.unwrap_or(self.config.format)
    }

    fn orchestrator(&self) -> Orchestrator {
        Orchestrator::new(registry::init(self.config.strategies_dir.clone()))
    }
}

/// Execute a command
pub fn execute_command(command: Commands, context: &CommandContext) -> Result<CommandOutcome> {
    match command {
        Commands::Compare {
            table_a,
            table_b,
            strategy,
            params,
            format,
            timeout_secs,
            output,
        } => compare_command(
            context,
            &table_a,
            &table_b,
            strategy.as_deref(),
            params,
            context.format(format),
            timeout_secs,
            output.as_deref(),
        ),
        Commands::List { format } => list_command(context, context.format(format)),
        Commands::Describe { name, format } => describe_command(context, &name, context.format(format)),
        Commands::Scan { dir, format } => scan_command(&dir, context.format(format)),
    }
}

/// Compare two table documents
#[allow(clippy::too_many_arguments)]
fn compare_command(
    context: &CommandContext,
    table_a: &Path,
    table_b: &Path,
    strategy: Option<&str>,
    params: Vec<(String, Json)>,
    format: OutputFormat,
    timeout_secs: Option<u64>,
    output: Option<&Path>,
) -> Result<CommandOutcome> {
    let a = Arc::new(Table::load_json(table_a)?);
    let b = Arc::new(Table::load_json(table_b)?);
    log::debug!(
        "Loaded DF1 ({} x {}) and DF2 ({} x {})",
        a.row_count(),
        a.column_count(),
        b.row_count(),
        b.column_count()
    );

    let strategy = strategy.unwrap_or(&context.config.default_strategy);
    let overrides: RawParams = params.into_iter().collect();
    let raw_params = context.config.parameters_for(strategy, &overrides);

    let mut progress = match format {
        OutputFormat::Pretty => ProgressReporter::new_for_comparison(strategy),
        OutputFormat::Json => ProgressReporter::new_minimal(),
    };

    let handle = context.orchestrator().spawn(a, b, strategy, raw_params);
    let timeout = timeout_secs.map(Duration::from_secs);
    let mut cancelled = false;
    while !handle.is_finished() {
        if !cancelled && timeout.is_some_and(|t| progress.elapsed() >= t) {
            log::warn!("Comparison exceeded {:?}, cancelling", timeout);
            progress.update("Cancelling...");
            handle.cancel();
            cancelled = true;
        }
        thread::sleep(Duration::from_millis(50));
    }
    let run = handle.join();
    progress.finish();

    if let Some(path) = output {
        fs::write(path, JsonFormatter::format_run(&run)?)?;
        log::info!("Wrote comparison result to {}", path.display());
    }

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_comparison(&run),
        OutputFormat::Json => println!("{}", JsonFormatter::format_run(&run)?),
    }

    Ok(comparison_outcome(&run))
}

fn comparison_outcome(run: &ComparisonRun) -> CommandOutcome {
    if run.result.is_failure() {
        CommandOutcome::Failed
    } else if run.result.is_equal {
        CommandOutcome::Success
    } else {
        CommandOutcome::Differences
    }
}

/// List registered strategies
fn list_command(context: &CommandContext, format: OutputFormat) -> Result<CommandOutcome> {
    let report = context.orchestrator().registry().snapshot();
    print_report(&report, format)?;
    Ok(CommandOutcome::Success)
}

/// Show one strategy's descriptor
fn describe_command(context: &CommandContext, name: &str, format: OutputFormat) -> Result<CommandOutcome> {
    let strategy = context
        .orchestrator()
        .registry()
        .get_by_name(name)
        .ok_or_else(|| TabcompareError::StrategyNotFound { name: name.to_string() })?;
    let descriptor = strategy.descriptor();

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_descriptor(&descriptor),
        OutputFormat::Json => println!("{}", JsonFormatter::format_descriptor(&descriptor)?),
    }
    Ok(CommandOutcome::Success)
}

/// Run discovery over a directory without touching the process registry
fn scan_command(dir: &Path, format: OutputFormat) -> Result<CommandOutcome> {
    let report = registry::scan(Some(dir));
    print_report(&report, format)?;
    if report.errors.is_empty() {
        Ok(CommandOutcome::Success)
    } else {
        Ok(CommandOutcome::Failed)
    }
}

fn print_report(report: &ScanReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Pretty => PrettyPrinter::print_strategy_list(report),
        OutputFormat::Json => println!("{}", JsonFormatter::format_strategy_list(report)?),
    }
    Ok(())
}
