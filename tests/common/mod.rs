//! Common test utilities and helpers

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabcompare::commands::{execute_command, CommandContext, CommandOutcome};
use tabcompare::config::EngineConfig;
use tabcompare::{Orchestrator, Result, StrategyRegistry, Table, Value};
use tempfile::TempDir;

/// All built-in strategy names
pub const BUILTIN_STRATEGIES: [&str; 4] = ["schema_compare", "row_compare", "column_compare", "hash_compare"];

/// Test fixture manager for creating temporary test environments
pub struct TestFixture {
    pub temp_dir: TempDir,
}

impl TestFixture {
    pub fn new() -> Result<Self> {
        Ok(Self {
            temp_dir: TempDir::new()?,
        })
    }

    /// Get the root path of the test fixture
    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Manifest directory under the fixture root, created on first use
    pub fn strategies_dir(&self) -> Result<PathBuf> {
        let dir = self.root().join("strategies");
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    /// Write a JSON table document
    pub fn create_table(&self, name: &str, doc: &serde_json::Value) -> Result<PathBuf> {
        let path = self.root().join(name);
        fs::write(&path, serde_json::to_string_pretty(doc)?)?;
        Ok(path)
    }

    /// Write a strategy manifest into the manifest directory
    pub fn create_manifest(&self, name: &str, manifest: &serde_json::Value) -> Result<PathBuf> {
        self.create_manifest_raw(name, &serde_json::to_string_pretty(manifest)?)
    }

    /// Write raw (possibly broken) manifest content
    pub fn create_manifest_raw(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.strategies_dir()?.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
        Ok(path)
    }

    /// Registry over this fixture's manifest directory
    pub fn registry(&self) -> Result<Arc<StrategyRegistry>> {
        Ok(Arc::new(StrategyRegistry::new(Some(self.strategies_dir()?))))
    }
}

/// Orchestrator over the built-in strategies only
pub fn builtin_orchestrator() -> Orchestrator {
    Orchestrator::new(Arc::new(StrategyRegistry::builtin()))
}

/// Build a table, inferring column types
pub fn table(columns: &[&str], rows: Vec<Vec<Value>>) -> Table {
    Table::new(columns.iter().map(|c| c.to_string()).collect(), rows).expect("valid table")
}

/// Helper for running CLI commands in tests
pub struct CliTestRunner {
    fixture: TestFixture,
    config: EngineConfig,
}

impl CliTestRunner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fixture: TestFixture::new()?,
            config: EngineConfig::default(),
        })
    }

    pub fn fixture(&self) -> &TestFixture {
        &self.fixture
    }

    /// Run a tabcompare command with default configuration
    pub fn run_command(&self, args: &[&str]) -> Result<CommandOutcome> {
        use clap::Parser;
        use tabcompare::cli::Cli;

        let mut cmd_args = vec!["tabcompare"];
        cmd_args.extend(args);

        let cli = Cli::try_parse_from(cmd_args)
            .map_err(|e| tabcompare::TabcompareError::invalid_input(e.to_string()))?;

        let context = CommandContext {
            config: self.config.clone(),
        };
        execute_command(cli.command, &context)
    }

    /// Run a command and expect the given outcome
    pub fn expect_outcome(&self, args: &[&str], expected: CommandOutcome) {
        let outcome = self.run_command(args).expect("Command should succeed");
        assert_eq!(outcome, expected, "unexpected outcome for {:?}", args);
    }

    /// Run a command and expect it to fail
    pub fn expect_failure(&self, args: &[&str]) -> tabcompare::TabcompareError {
        self.run_command(args).expect_err("Command should fail")
    }
}

/// Sample data generators for testing
pub mod sample_data {
    use super::table;
    use serde_json::json;
    use tabcompare::{Table, Value};

    /// id/name/value table used by the schema examples
    pub fn people() -> Table {
        table(
            &["id", "name", "value"],
            vec![
                vec![1.into(), "alice".into(), 10.5.into()],
                vec![2.into(), "bob".into(), 20.0.into()],
                vec![3.into(), "carol".into(), Value::Null],
            ],
        )
    }

    /// `people` with an extra column
    pub fn people_with_extra() -> Table {
        table(
            &["id", "name", "value", "extra"],
            vec![
                vec![1.into(), "alice".into(), 10.5.into(), true.into()],
                vec![2.into(), "bob".into(), 20.0.into(), false.into()],
                vec![3.into(), "carol".into(), Value::Null, true.into()],
            ],
        )
    }

    /// Mixed-type table covering every cell kind
    pub fn mixed() -> Table {
        let ts = chrono::NaiveDate::from_ymd_opt(2024, 3, 1)
            .and_then(|d| d.and_hms_opt(12, 30, 0))
            .expect("valid date");
        table(
            &["id", "flag", "score", "label", "seen"],
            vec![
                vec![1.into(), true.into(), 0.5.into(), "x".into(), ts.into()],
                vec![2.into(), false.into(), Value::Null, "y".into(), Value::Null],
                vec![3.into(), true.into(), (-1.25).into(), Value::Null, ts.into()],
            ],
        )
    }

    pub fn rows_doc() -> serde_json::Value {
        json!({
            "columns": ["id", "v"],
            "rows": [[1, "a"], [2, "b"], [3, "c"]]
        })
    }

    pub fn rows_changed_doc() -> serde_json::Value {
        json!({
            "columns": ["id", "v"],
            "rows": [[1, "a"], [2, "x"], [3, "c"]]
        })
    }
}
