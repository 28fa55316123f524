//! Unit tests for table loading and accessors

use crate::common::TestFixture;
use serde_json::json;
use tabcompare::table::TableIndex;
use tabcompare::{DataType, Table, TabcompareError, Value};

#[test]
fn test_load_json_document() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_table(
            "orders.json",
            &json!({
                "columns": [
                    "order_id",
                    {"name": "placed", "dtype": "timestamp"},
                    {"name": "wait", "dtype": "duration"},
                    {"name": "status", "dtype": "categorical"}
                ],
                "rows": [
                    [100, "2024-05-01T08:00:00", 1500000000, "open"],
                    [101, "2024-05-02T09:30:00.250", null, "closed"]
                ],
                "index": {"label": "order_id", "kind": "int", "len": 2}
            }),
        )
        .unwrap();

    let table = Table::load_json(&path).unwrap();
    assert_eq!(table.row_count(), 2);
    assert_eq!(table.column_count(), 4);
    assert_eq!(
        table.dtypes(),
        &[DataType::Int, DataType::Timestamp, DataType::Duration, DataType::Categorical]
    );
    assert_eq!(table.cell(0, 2), &Value::Int(1_500_000_000));
    assert_eq!(table.cell(1, 3), &Value::Text("closed".into()));
    assert_eq!(
        table.index(),
        TableIndex {
            label: Some("order_id".into()),
            kind: DataType::Int,
            len: 2
        }
    );
}

#[test]
fn test_load_json_missing_file() {
    let fixture = TestFixture::new().unwrap();
    let err = Table::load_json(&fixture.root().join("absent.json")).unwrap_err();
    assert!(matches!(err, TabcompareError::InvalidInput { .. }));
}

#[test]
fn test_load_json_ragged_rows() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_table("ragged.json", &json!({"columns": ["a", "b"], "rows": [[1, 2], [3]]}))
        .unwrap();
    let err = Table::load_json(&path).unwrap_err();
    assert!(err.to_string().contains("Row 1"));
}

#[test]
fn test_duration_strings_are_rejected() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_table(
            "durations.json",
            &json!({"columns": [{"name": "d", "dtype": "timedelta"}], "rows": [["1 day"]]}),
        )
        .unwrap();
    assert!(Table::load_json(&path).is_err());
}

#[test]
fn test_empty_tables() {
    assert!(Table::empty().is_empty());

    let no_rows = Table::new(vec!["a".into()], Vec::new()).unwrap();
    assert!(no_rows.is_empty());
    assert_eq!(no_rows.dtype(0), Some(DataType::Object));

    let one_row = Table::new(vec!["a".into()], vec![vec![Value::Null]]).unwrap();
    assert!(!one_row.is_empty());
    assert_eq!(one_row.null_count(0), 1);
}

#[test]
fn test_column_lookup() {
    let table = crate::common::sample_data::people();
    assert_eq!(table.column_index("name"), Some(1));
    assert_eq!(table.column_index("missing"), None);
    assert_eq!(table.dtype(2), Some(DataType::Float));
    assert_eq!(
        table.column_values(1).map(|v| v.to_string()).collect::<Vec<_>>(),
        vec!["alice", "bob", "carol"]
    );
}
