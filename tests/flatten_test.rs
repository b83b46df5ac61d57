// Result Object 平坦化のテスト

use serde_json::{Map, Value, json};

use patch_sweep::report::flatten::flatten;

#[test]
fn test_flatten_flat_scalars() {
    let value = json!({"status": "Succeeded", "rebootRequired": false, "patchCount": 12});
    let pairs = flatten(&value);
    assert_eq!(
        pairs,
        vec![
            ("patchCount".to_string(), "12".to_string()),
            ("rebootRequired".to_string(), "false".to_string()),
            ("status".to_string(), "Succeeded".to_string()),
        ]
    );
}

#[test]
fn test_flatten_nested_record_uses_dotted_path() {
    let value = json!({"summary": {"critical": 2, "security": 5}});
    let pairs = flatten(&value);
    assert_eq!(
        pairs,
        vec![
            ("summary.critical".to_string(), "2".to_string()),
            ("summary.security".to_string(), "5".to_string()),
        ]
    );
}

#[test]
fn test_flatten_two_levels_of_nesting() {
    let value = json!({"a": {"b": {"c": "deep"}}});
    let pairs = flatten(&value);
    assert_eq!(pairs, vec![("a.b.c".to_string(), "deep".to_string())]);
}

#[test]
fn test_flatten_scalar_list_joins_elements() {
    let value = json!({"kbIds": ["KB1", "KB2", "KB3"]});
    let pairs = flatten(&value);
    assert_eq!(pairs, vec![("kbIds".to_string(), "KB1; KB2; KB3".to_string())]);
}

#[test]
fn test_flatten_named_list_collapses_to_names() {
    // N件の名前付きリストは常に1カラム、N個の名前の結合になる
    let value = json!({
        "patches": [
            {"name": "KB5005565", "classification": "Security", "size": 120},
            {"name": "KB5006670", "classification": "Critical", "size": 88},
            {"name": "KB5007186", "classification": "Security", "size": 14}
        ]
    });
    let pairs = flatten(&value);
    assert_eq!(
        pairs,
        vec![(
            "patches".to_string(),
            "KB5005565; KB5006670; KB5007186".to_string()
        )]
    );
}

#[test]
fn test_flatten_spec_scenario_succeeded_with_patches() {
    let value = json!({
        "status": "Succeeded",
        "error": null,
        "patches": [{"name": "KB1"}, {"name": "KB2"}]
    });
    let pairs = flatten(&value);
    assert_eq!(
        pairs,
        vec![
            ("patches".to_string(), "KB1; KB2".to_string()),
            ("status".to_string(), "Succeeded".to_string()),
        ]
    );
}

#[test]
fn test_flatten_null_root_is_empty() {
    assert!(flatten(&Value::Null).is_empty());
}

#[test]
fn test_flatten_null_fields_omitted() {
    let value = json!({"status": "Succeeded", "error": null});
    let pairs = flatten(&value);
    assert_eq!(pairs, vec![("status".to_string(), "Succeeded".to_string())]);
}

#[test]
fn test_flatten_empty_list_yields_empty_value() {
    let value = json!({"patches": []});
    let pairs = flatten(&value);
    assert_eq!(pairs, vec![("patches".to_string(), String::new())]);
}

#[test]
fn test_flatten_unnamed_record_list_keeps_elements_as_json() {
    let value = json!({"disks": [{"lun": 0}, {"lun": 1}]});
    let pairs = flatten(&value);
    assert_eq!(
        pairs,
        vec![("disks".to_string(), r#"{"lun":0}; {"lun":1}"#.to_string())]
    );
}

#[test]
fn test_flatten_mixed_names_do_not_collapse() {
    // 名前付きリスト規則は全要素が名前を持つ場合のみ
    let value = json!({"items": [{"name": "a"}, {"id": 2}]});
    let pairs = flatten(&value);
    assert_eq!(
        pairs,
        vec![(
            "items".to_string(),
            r#"{"name":"a"}; {"id":2}"#.to_string()
        )]
    );
}

#[test]
fn test_flatten_is_idempotent_on_flat_input() {
    let value = json!({
        "osType": "Windows",
        "patches": "KB1; KB2",
        "status": "Succeeded"
    });
    let first = flatten(&value);

    // 平坦化結果をオブジェクトに戻して再度平坦化しても変わらない
    let rebuilt: Map<String, Value> = first
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let second = flatten(&Value::Object(rebuilt));
    assert_eq!(first, second);
}

#[test]
fn test_flatten_deterministic_column_order() {
    let value = json!({"b": 1, "a": 2, "c": 3});
    let pairs = flatten(&value);
    let columns: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(columns, vec!["a", "b", "c"]);
}
