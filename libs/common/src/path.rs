//! Dotted-path access into JSON documents

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// Resolve a dotted path (`owner.username`) to a single value
///
/// Arrays are not traversed; use [`values_at`] for that.
pub fn get_path<'a>(doc: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Collect every value reachable at `path`, flattening arrays on the way
///
/// `{"videos": [{"owner": 1}, {"owner": 2}]}` at `videos.owner` yields
/// `[1, 2]`, and an array found at the end of the path is flattened too.
pub fn values_at(doc: &Map<String, Value>, path: &str) -> Vec<Value> {
    let segments: Vec<&str> = path.split('.').collect();
    let mut out = Vec::new();
    if let Some(first) = doc.get(segments[0]) {
        collect(first, &segments[1..], &mut out);
    }
    out
}

fn collect(value: &Value, rest: &[&str], out: &mut Vec<Value>) {
    match (value, rest.first()) {
        (Value::Array(items), _) => {
            for item in items {
                collect(item, rest, out);
            }
        }
        (_, None) => out.push(value.clone()),
        (Value::Object(map), Some(segment)) => {
            if let Some(next) = map.get(*segment) {
                collect(next, &rest[1..], out);
            }
        }
        _ => {}
    }
}

/// Set `value` at a dotted path, creating intermediate objects
pub fn set_path(doc: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, tail)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                set_path(inner, tail, value);
            }
        }
    }
}

/// Remove the value at a dotted path, returning it
pub fn remove_path(doc: &mut Map<String, Value>, path: &str) -> Option<Value> {
    match path.split_once('.') {
        None => doc.remove(path),
        Some((head, tail)) => match doc.get_mut(head) {
            Some(Value::Object(inner)) => remove_path(inner, tail),
            _ => None,
        },
    }
}

/// Total order over JSON values used by sorting
///
/// Missing/null sorts first. Strings that both parse as RFC 3339 timestamps
/// compare chronologically, so differing fractional precision does not
/// reorder them.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (
                DateTime::parse_from_rfc3339(x),
                DateTime::parse_from_rfc3339(y),
            ) {
                (Ok(dx), Ok(dy)) => dx.with_timezone(&Utc).cmp(&dy.with_timezone(&Utc)),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => rank(x).cmp(&rank(y)),
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Object(_) => 3,
        Value::Array(_) => 4,
        Value::Bool(_) => 5,
    }
}

/// JSON equality that treats `1` and `1.0` as the same number
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_get_and_set_nested_path() {
        let mut d = doc(json!({"owner": {"username": "alice"}}));
        assert_eq!(get_path(&d, "owner.username"), Some(&json!("alice")));
        assert_eq!(get_path(&d, "owner.email"), None);

        set_path(&mut d, "stats.views", json!(3));
        assert_eq!(get_path(&d, "stats.views"), Some(&json!(3)));

        assert_eq!(remove_path(&mut d, "owner.username"), Some(json!("alice")));
        assert_eq!(get_path(&d, "owner.username"), None);
    }

    #[test]
    fn test_values_at_flattens_arrays() {
        let d = doc(json!({
            "videos": [{"owner": "a"}, {"owner": "b"}],
            "tags": ["x", "y"]
        }));
        assert_eq!(values_at(&d, "videos.owner"), vec![json!("a"), json!("b")]);
        assert_eq!(values_at(&d, "tags"), vec![json!("x"), json!("y")]);
        assert!(values_at(&d, "missing").is_empty());
    }

    #[test]
    fn test_timestamps_compare_chronologically() {
        // ".5Z" sorts after ".50001Z" as text but is the earlier instant
        let earlier = json!("2024-01-01T10:00:00.5Z");
        let later = json!("2024-01-01T10:00:00.50001Z");
        assert_eq!(
            compare_values(Some(&earlier), Some(&later)),
            Ordering::Less
        );
        assert_eq!(compare_values(None, Some(&earlier)), Ordering::Less);
    }
}
