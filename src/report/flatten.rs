// Result Objectの平坦化: ネストしたJSONをドット区切りの列名に展開する。
//
// Provider result shapes are not known up front, so columns are derived
// from the value tree itself. One special case: a list whose records all
// carry a name-like key collapses to the joined names only.

use serde_json::Value;

/// Separator between joined list elements.
const LIST_SEPARATOR: &str = "; ";

/// Keys that identify an element of a "named list". Checked in order,
/// matching case-insensitively.
const NAME_KEYS: &[&str] = &["name", "displayName"];

/// Flatten a Result Object into ordered `(column, value)` pairs.
///
/// - Scalars map to one column; nesting prefixes the path with `.`
/// - `null` values are omitted; a `null` root yields no pairs
/// - Lists of scalars join their elements with `"; "`
/// - Lists of named records join the names only, dropping other detail
/// - Any other list renders each element as compact JSON before joining
///
/// Column order follows `serde_json`'s sorted map iteration, so the same
/// input shape always produces the same column sequence.
pub fn flatten(value: &Value) -> Vec<(String, String)> {
    let mut out = Vec::new();
    flatten_into("", value, &mut out);
    out
}

fn flatten_into(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                match child {
                    Value::Null => {}
                    Value::Object(_) => flatten_into(&path, child, out),
                    Value::Array(items) => out.push((path, join_list(items))),
                    scalar => out.push((path, scalar_to_string(scalar))),
                }
            }
        }
        Value::Array(items) => out.push((column_or(prefix, "items"), join_list(items))),
        scalar => out.push((column_or(prefix, "value"), scalar_to_string(scalar))),
    }
}

fn column_or(prefix: &str, fallback: &str) -> String {
    if prefix.is_empty() {
        fallback.to_string()
    } else {
        prefix.to_string()
    }
}

fn join_list(items: &[Value]) -> String {
    if !items.is_empty() && items.iter().all(|i| i.is_object()) {
        if let Some(names) = named_list(items) {
            return names.join(LIST_SEPARATOR);
        }
    }
    items
        .iter()
        .map(|item| match item {
            Value::Object(_) | Value::Array(_) => item.to_string(),
            scalar => scalar_to_string(scalar),
        })
        .collect::<Vec<_>>()
        .join(LIST_SEPARATOR)
}

/// The names of a named list, or `None` unless every record has one.
fn named_list(items: &[Value]) -> Option<Vec<String>> {
    items
        .iter()
        .map(|item| {
            let map = item.as_object()?;
            NAME_KEYS.iter().find_map(|key| {
                map.iter()
                    .find(|(k, _)| k.eq_ignore_ascii_case(key))
                    .map(|(_, v)| scalar_to_string(v))
            })
        })
        .collect()
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
