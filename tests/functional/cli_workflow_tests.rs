//! End-to-end command workflows run in-process

use crate::common::{sample_data, CliTestRunner};
use serde_json::json;
use std::fs;
use tabcompare::commands::CommandOutcome;
use tabcompare::TabcompareError;

#[test]
fn test_compare_equal_tables() {
    let runner = CliTestRunner::new().unwrap();
    let a = runner.fixture().create_table("a.json", &sample_data::rows_doc()).unwrap();
    let b = runner.fixture().create_table("b.json", &sample_data::rows_doc()).unwrap();

    for strategy in crate::common::BUILTIN_STRATEGIES {
        runner.expect_outcome(
            &["compare", a.to_str().unwrap(), b.to_str().unwrap(), "--strategy", strategy],
            CommandOutcome::Success,
        );
    }
}

#[test]
fn test_compare_reports_differences() {
    let runner = CliTestRunner::new().unwrap();
    let a = runner.fixture().create_table("a.json", &sample_data::rows_doc()).unwrap();
    let b = runner.fixture().create_table("b.json", &sample_data::rows_changed_doc()).unwrap();

    // Same schema, different content
    runner.expect_outcome(&["compare", a.to_str().unwrap(), b.to_str().unwrap()], CommandOutcome::Success);
    runner.expect_outcome(
        &[
            "compare",
            a.to_str().unwrap(),
            b.to_str().unwrap(),
            "--strategy",
            "row_compare",
            "--param",
            "key_columns=id",
        ],
        CommandOutcome::Differences,
    );
}

#[test]
fn test_compare_writes_json_output() {
    let runner = CliTestRunner::new().unwrap();
    let a = runner.fixture().create_table("a.json", &sample_data::rows_doc()).unwrap();
    let b = runner.fixture().create_table("b.json", &sample_data::rows_changed_doc()).unwrap();
    let out = runner.fixture().root().join("result.json");

    runner.expect_outcome(
        &[
            "compare",
            a.to_str().unwrap(),
            b.to_str().unwrap(),
            "-s",
            "hash_compare",
            "--format",
            "json",
            "--output",
            out.to_str().unwrap(),
        ],
        CommandOutcome::Differences,
    );

    let written: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["state"], json!("completed"));
    assert_eq!(written["strategy"], json!("hash_compare"));
    assert_eq!(written["result"]["is_equal"], json!(false));
    assert_eq!(written["result"]["metadata"]["key_columns"], json!(["id"]));

    let highlights = written["result"]["highlights"].as_array().unwrap();
    let row = highlights.iter().find(|h| h["item"] == json!("id=2")).unwrap();
    assert_eq!(row["diff_type"], json!("different"));
    assert!(row.get("valueA").is_some());
}

#[test]
fn test_compare_engine_failure_exits_with_failure() {
    let runner = CliTestRunner::new().unwrap();
    let empty = json!({"columns": ["id"], "rows": []});
    let a = runner.fixture().create_table("a.json", &empty).unwrap();
    let b = runner.fixture().create_table("b.json", &empty).unwrap();

    runner.expect_outcome(&["compare", a.to_str().unwrap(), b.to_str().unwrap()], CommandOutcome::Failed);
    runner.expect_outcome(
        &["compare", a.to_str().unwrap(), b.to_str().unwrap(), "-s", "no_such_strategy"],
        CommandOutcome::Failed,
    );
}

#[test]
fn test_compare_missing_file_is_error() {
    let runner = CliTestRunner::new().unwrap();
    let a = runner.fixture().create_table("a.json", &sample_data::rows_doc()).unwrap();
    let missing = runner.fixture().root().join("missing.json");

    let err = runner.expect_failure(&["compare", a.to_str().unwrap(), missing.to_str().unwrap()]);
    assert!(matches!(err, TabcompareError::InvalidInput { .. }));
}

#[test]
fn test_list_and_describe() {
    let runner = CliTestRunner::new().unwrap();
    runner.expect_outcome(&["list"], CommandOutcome::Success);
    runner.expect_outcome(&["list", "--format", "json"], CommandOutcome::Success);
    runner.expect_outcome(&["describe", "column_compare"], CommandOutcome::Success);
    runner.expect_outcome(&["describe", "schema_compare", "--format", "json"], CommandOutcome::Success);

    let err = runner.expect_failure(&["describe", "nonexistent"]);
    assert!(matches!(err, TabcompareError::StrategyNotFound { .. }));
}

#[test]
fn test_scan_reports_broken_manifests() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    let dir = fixture.strategies_dir().unwrap();

    fixture
        .create_manifest(
            "good.json",
            &json!({"format_version": "1", "name": "strict_rows", "base": "row_compare",
                    "parameters": {"case_sensitive": true}}),
        )
        .unwrap();
    runner.expect_outcome(&["scan", dir.to_str().unwrap()], CommandOutcome::Success);

    fixture.create_manifest_raw("broken.json", "{ \"name\": ").unwrap();
    runner.expect_outcome(&["scan", dir.to_str().unwrap(), "--format", "json"], CommandOutcome::Failed);
}
