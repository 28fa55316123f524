//! Edge cases in cell values, types and row alignment

use crate::common::{builtin_orchestrator, table};
use serde_json::json;
use tabcompare::{DataType, DiffClassification, RawParams, Table, Value};

fn params(pairs: &[(&str, serde_json::Value)]) -> RawParams {
    pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

fn typed(columns: &[&str], dtypes: Vec<DataType>, rows: Vec<Vec<Value>>) -> Table {
    Table::with_dtypes(columns.iter().map(|c| c.to_string()).collect(), dtypes, rows).unwrap()
}

#[test]
fn test_nan_and_null_are_equivalent() {
    let a = table(&["x"], vec![vec![Value::Null], vec![1.5.into()]]);
    let b = table(&["x"], vec![vec![f64::NAN.into()], vec![1.5.into()]]);
    let orchestrator = builtin_orchestrator();

    for strategy in ["row_compare", "hash_compare", "column_compare"] {
        let result = orchestrator.compare(Some(&a), Some(&b), strategy, &RawParams::new());
        assert!(result.is_equal, "{}:\n{}", strategy, result.details);
    }
}

#[test]
fn test_negative_zero_hashes_like_zero() {
    let a = table(&["x"], vec![vec![0.0.into()]]);
    let b = table(&["x"], vec![vec![(-0.0).into()]]);
    let result = builtin_orchestrator().compare(Some(&a), Some(&b), "hash_compare", &RawParams::new());
    assert!(result.is_equal);
}

#[test]
fn test_integer_and_float_keys_align() {
    let a = table(&["id", "v"], vec![vec![1.into(), "a".into()], vec![2.into(), "b".into()]]);
    let b = table(&["id", "v"], vec![vec![2.0.into(), "b".into()], vec![1.0.into(), "a".into()]]);

    let result = builtin_orchestrator().compare(
        Some(&a),
        Some(&b),
        "row_compare",
        &params(&[("key_columns", json!("id"))]),
    );
    assert!(result.is_equal, "{}", result.details);
}

#[test]
fn test_duplicate_keys_pair_in_order() {
    let a = table(
        &["k", "v"],
        vec![vec!["x".into(), 1.into()], vec!["x".into(), 2.into()], vec!["y".into(), 3.into()]],
    );
    let b = table(
        &["k", "v"],
        vec![vec!["x".into(), 1.into()], vec!["x".into(), 5.into()], vec!["x".into(), 9.into()]],
    );

    let result = builtin_orchestrator().compare(Some(&a), Some(&b), "row_compare", &params(&[("key_columns", json!("k"))]));
    assert!(!result.is_equal);
    assert_eq!(result.metadata["rows_same"], json!(1));
    assert_eq!(result.metadata["rows_different"], json!(1));
    assert_eq!(result.metadata["rows_only_in_a"], json!(1));
    assert_eq!(result.metadata["rows_only_in_b"], json!(1));
}

#[test]
fn test_case_insensitive_and_ignored_columns() {
    let a = table(&["id", "name", "note"], vec![vec![1.into(), "Ünïcødé".into(), "first".into()]]);
    let b = table(&["id", "name", "note"], vec![vec![1.into(), "üNÏCØDÉ".into(), "changed".into()]]);
    let orchestrator = builtin_orchestrator();

    let strict = orchestrator.compare(Some(&a), Some(&b), "row_compare", &RawParams::new());
    assert!(!strict.is_equal);
    assert!(strict.highlights[0].status.contains("name"));

    let relaxed = orchestrator.compare(
        Some(&a),
        Some(&b),
        "row_compare",
        &params(&[("case_sensitive", json!("false")), ("ignore_columns", json!("note"))]),
    );
    assert!(relaxed.is_equal, "{}", relaxed.details);
    assert_eq!(relaxed.metadata["compared_columns"], json!(["id", "name"]));
}

#[test]
fn test_include_same_reports_matching_rows() {
    let a = table(&["id"], vec![vec![1.into()], vec![2.into()]]);
    let result = builtin_orchestrator().compare(Some(&a), Some(&a), "row_compare", &params(&[("include_same", json!(true))]));
    assert!(result.is_equal);
    assert_eq!(result.highlights_of(DiffClassification::Same).count(), 2);
}

#[test]
fn test_missing_key_column_is_execution_failure() {
    let a = table(&["id"], vec![vec![1.into()]]);
    let b = table(&["other"], vec![vec![1.into()]]);
    let result = builtin_orchestrator().compare(Some(&a), Some(&b), "row_compare", &params(&[("key_columns", json!("id"))]));
    assert_eq!(result.error_kind(), Some("execution"));
    assert!(result.error().unwrap().contains("DF2"));
}

#[test]
fn test_type_compatibility_modes() {
    let ints = typed(&["v"], vec![DataType::Int], vec![vec![1.into()]]);
    let floats = typed(&["v"], vec![DataType::Float], vec![vec![1.0.into()]]);
    let texts = typed(&["v"], vec![DataType::Text], vec![vec!["1".into()]]);
    let times = typed(&["v"], vec![DataType::Timestamp], vec![vec![Value::Null]]);
    let orchestrator = builtin_orchestrator();
    let mode = |m: &str| params(&[("type_compatibility", json!(m))]);

    let check = |a: &Table, b: &Table, m: &str| {
        orchestrator
            .compare(Some(a), Some(b), "schema_compare", &params(&[("type_compatibility", json!(m)), ("check_nullable", json!(false))]))
            .is_equal
    };

    assert!(!check(&ints, &floats, "strict"));
    assert!(check(&ints, &floats, "compatible"));
    assert!(!check(&ints, &texts, "compatible"));
    assert!(check(&ints, &texts, "loose"));
    assert!(!check(&ints, &times, "loose"));
    assert!(!check(&texts, &times, "loose"));

    let result = orchestrator.compare(Some(&ints), Some(&floats), "schema_compare", &mode("strict"));
    let mismatch = result.highlights.iter().find(|h| h.category == "Data Types").unwrap();
    assert_eq!(mismatch.item, "v");
    assert_eq!(mismatch.value_a, "int");
    assert_eq!(mismatch.value_b, "float");
}

#[test]
fn test_column_order_check_can_be_disabled() {
    let a = table(&["x", "y"], vec![vec![1.into(), 2.into()]]);
    let b = table(&["y", "x"], vec![vec![2.into(), 1.into()]]);
    let orchestrator = builtin_orchestrator();

    assert!(!orchestrator.compare(Some(&a), Some(&b), "schema_compare", &RawParams::new()).is_equal);
    assert!(orchestrator
        .compare(Some(&a), Some(&b), "schema_compare", &params(&[("check_column_order", json!(false))]))
        .is_equal);
}

#[test]
fn test_numeric_vs_text_column_is_type_mismatch() {
    let a = table(&["v"], vec![vec![1.into()], vec![2.into()]]);
    let b = table(&["v"], vec![vec!["1".into()], vec!["2".into()]]);
    let result = builtin_orchestrator().compare(Some(&a), Some(&b), "column_compare", &RawParams::new());
    assert!(!result.is_equal);
    assert_eq!(result.highlights[0].status, "Type mismatch");
}

#[test]
fn test_single_value_std_absent_on_both_sides() {
    let a = table(&["v"], vec![vec![4.0.into()]]);
    let b = table(&["v"], vec![vec![4.into()]]);
    let result = builtin_orchestrator().compare(Some(&a), Some(&b), "column_compare", &RawParams::new());
    assert!(result.is_equal, "{}", result.details);
}

#[test]
fn test_sha256_and_blake3_digests_differ() {
    let a = table(&["v"], vec![vec!["payload".into()]]);
    let orchestrator = builtin_orchestrator();
    let blake = orchestrator.compare(Some(&a), Some(&a), "hash_compare", &RawParams::new());
    let sha = orchestrator.compare(Some(&a), Some(&a), "hash_compare", &params(&[("hash_algorithm", json!("sha256"))]));

    assert!(blake.is_equal && sha.is_equal);
    assert_ne!(blake.metadata["hash_a"], sha.metadata["hash_a"]);
    assert_eq!(sha.metadata["algorithm"], json!("sha256"));
}

#[test]
fn test_hash_header_participates() {
    let a = table(&["x"], vec![vec![1.into()]]);
    let b = table(&["y"], vec![vec![1.into()]]);
    let result = builtin_orchestrator().compare(Some(&a), Some(&b), "hash_compare", &RawParams::new());
    assert!(!result.is_equal);
}

#[test]
fn test_large_table_comparison() {
    let rows: Vec<Vec<Value>> = (0..5_000)
        .map(|i| vec![Value::Int(i), Value::Text(format!("name_{}", i)), Value::Float(i as f64 * 0.5)])
        .collect();
    let mut changed = rows.clone();
    changed[4_321][2] = Value::Float(-1.0);

    let a = table(&["id", "name", "score"], rows);
    let b = table(&["id", "name", "score"], changed);
    let orchestrator = builtin_orchestrator();

    let hash = orchestrator.compare(Some(&a), Some(&b), "hash_compare", &RawParams::new());
    assert!(!hash.is_equal);
    let different: Vec<_> = hash
        .highlights_of(DiffClassification::Different)
        .filter(|h| h.category == "Row Hash")
        .collect();
    assert_eq!(different.len(), 1);
    assert_eq!(different[0].item, "id=4321");

    let rows = orchestrator.compare(Some(&a), Some(&b), "row_compare", &params(&[("key_columns", json!("id"))]));
    assert_eq!(rows.metadata["rows_different"], json!(1));
}
