//! Discovery resilience, duplicate names and reload behaviour

use crate::common::TestFixture;
use serde_json::json;
use std::sync::Arc;
use std::thread;
use tabcompare::registry::{scan, scan_with};
use tabcompare::strategies::RowCompare;
use tabcompare::{ComparisonStrategy, StrategyRegistry};

fn preset(name: &str, base: &str) -> serde_json::Value {
    json!({"format_version": "1", "name": name, "base": base, "parameters": {}})
}

#[test]
fn test_invalid_source_does_not_block_others() {
    let fixture = TestFixture::new().unwrap();
    fixture.create_manifest("a_valid.json", &preset("first_preset", "schema_compare")).unwrap();
    let broken = fixture.create_manifest_raw("b_broken.json", "{ this is not json").unwrap();
    fixture.create_manifest("c_valid.json", &preset("second_preset", "hash_compare")).unwrap();

    let report = scan(Some(&fixture.strategies_dir().unwrap()));
    assert!(report.strategies.contains_key("first_preset"));
    assert!(report.strategies.contains_key("second_preset"));
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors.contains_key(&broken.display().to_string()));
}

#[test]
fn test_each_manifest_failure_is_keyed_by_path() {
    let fixture = TestFixture::new().unwrap();
    let unknown_base = fixture.create_manifest("unknown_base.json", &preset("orphaned", "fuzzy_compare")).unwrap();
    let bad_param = fixture
        .create_manifest(
            "bad_param.json",
            &json!({"format_version": "1", "name": "bad_param", "base": "column_compare",
                    "parameters": {"tolerance": "wide"}}),
        )
        .unwrap();
    let bad_version = fixture
        .create_manifest("bad_version.json", &json!({"format_version": "9", "name": "future", "base": "row_compare"}))
        .unwrap();

    let report = scan(Some(&fixture.strategies_dir().unwrap()));
    assert_eq!(report.strategies.len(), 4);
    for path in [unknown_base, bad_param, bad_version] {
        assert!(report.errors.contains_key(&path.display().to_string()), "{}", path.display());
    }
    assert!(report.errors[&fixture.strategies_dir().unwrap().join("unknown_base.json").display().to_string()]
        .contains("fuzzy_compare"));
}

#[test]
fn test_duplicate_names_keep_first_registration() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .create_manifest(
            "a_first.json",
            &json!({"format_version": "1", "name": "quick_rows", "base": "row_compare",
                    "parameters": {"case_sensitive": false}}),
        )
        .unwrap();
    let second = fixture
        .create_manifest(
            "b_second.json",
            &json!({"format_version": "1", "name": "quick_rows", "base": "row_compare",
                    "parameters": {"case_sensitive": true}}),
        )
        .unwrap();

    let registry = StrategyRegistry::new(Some(fixture.strategies_dir().unwrap()));
    let kept = registry.get_by_name("quick_rows").unwrap();
    assert_eq!(kept.parameters().get("case_sensitive").unwrap().default, json!(false));

    let errors = registry.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[&second.display().to_string()].contains("Duplicate strategy name 'quick_rows'"));
}

#[test]
fn test_manifest_shadowing_builtin_is_rejected() {
    let fixture = TestFixture::new().unwrap();
    let shadow = fixture.create_manifest("shadow.json", &preset("row_compare", "schema_compare")).unwrap();

    let report = scan(Some(&fixture.strategies_dir().unwrap()));
    assert_eq!(report.sources["row_compare"], "builtin:row_compare");
    assert!(report.errors.contains_key(&shadow.display().to_string()));
}

#[test]
fn test_host_strategy_with_builtin_name_is_rejected() {
    let extra: Vec<Arc<dyn ComparisonStrategy>> = vec![Arc::new(RowCompare)];
    let report = scan_with(None, &extra);
    assert_eq!(report.strategies.len(), 4);
    assert!(report.errors.contains_key("static:row_compare"));
}

#[test]
fn test_abstract_and_baseless_manifests_are_skipped_silently() {
    let fixture = TestFixture::new().unwrap();
    fixture
        .create_manifest(
            "template.json",
            &json!({"format_version": "1", "name": "template", "base": "hash_compare", "abstract": true}),
        )
        .unwrap();
    fixture
        .create_manifest("incomplete.json", &json!({"format_version": "1", "name": "incomplete"}))
        .unwrap();

    let report = scan(Some(&fixture.strategies_dir().unwrap()));
    assert!(report.errors.is_empty());
    assert!(!report.strategies.contains_key("template"));
    assert!(!report.strategies.contains_key("incomplete"));
}

#[test]
fn test_nested_directories_and_non_json_files() {
    let fixture = TestFixture::new().unwrap();
    fixture.create_manifest("team/rows.json", &preset("team_rows", "row_compare")).unwrap();
    fixture.create_manifest_raw("README.md", "not a manifest").unwrap();

    let report = scan(Some(&fixture.strategies_dir().unwrap()));
    assert!(report.strategies.contains_key("team_rows"));
    assert!(report.errors.is_empty());
}

#[test]
fn test_missing_directory_is_reported() {
    let fixture = TestFixture::new().unwrap();
    let missing = fixture.root().join("nowhere");
    let registry = StrategyRegistry::new(Some(missing.clone()));

    assert_eq!(registry.names().len(), 4);
    assert!(registry.errors().contains_key(&missing.display().to_string()));
}

#[test]
fn test_descriptors_expose_parameter_schemas() {
    let registry = StrategyRegistry::builtin();
    let descriptors = registry.descriptors();
    assert_eq!(descriptors.len(), 4);

    let hash = descriptors.iter().find(|d| d.name == "hash_compare").unwrap();
    let json = serde_json::to_value(hash).unwrap();
    assert_eq!(json["parameters"]["hash_algorithm"]["kind"], json!("enum"));
    assert_eq!(json["parameters"]["hash_algorithm"]["options"], json!(["blake3", "sha256"]));
    assert_eq!(json["parameters"]["row_order_sensitive"]["default"], json!(true));
}

#[test]
fn test_reload_is_atomic_for_concurrent_readers() {
    let fixture = TestFixture::new().unwrap();
    fixture.create_manifest("p0.json", &preset("preset_0", "row_compare")).unwrap();
    let registry = fixture.registry().unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..200 {
                    let snapshot = registry.snapshot();
                    // every snapshot is internally consistent
                    assert_eq!(snapshot.strategies.len(), snapshot.sources.len());
                    assert!(snapshot.strategies.contains_key("row_compare"));
                    for name in snapshot.strategies.keys() {
                        assert!(snapshot.strategies[name].name() == name);
                    }
                }
            })
        })
        .collect();

    for i in 1..10 {
        fixture.create_manifest(&format!("p{}.json", i), &preset(&format!("preset_{}", i), "row_compare")).unwrap();
        registry.reload();
    }
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(registry.names().len(), 14);
    assert!(registry.errors().is_empty());
}

#[test]
fn test_reload_picks_up_removed_manifest() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_manifest("temp.json", &preset("temporary", "column_compare")).unwrap();
    let registry = fixture.registry().unwrap();
    assert!(registry.get_by_name("temporary").is_some());

    std::fs::remove_file(path).unwrap();
    let report = registry.reload();
    assert!(!report.strategies.contains_key("temporary"));
    assert!(registry.get_by_name("temporary").is_none());
}
