//! State snapshots and their persisted form.

use serde_json::{Map, Value};

/// Suffix appended to the store identifier to form the persistence key.
pub const KEY_SUFFIX: &str = "micro-local-store";

/// A state snapshot: string keys mapped to arbitrary JSON values.
pub type State = Map<String, Value>;

/// Derive the persistence key for a store identifier.
#[must_use]
pub fn storage_key(id: &str) -> String {
    format!("{id}-{KEY_SUFFIX}")
}

/// Shallow merge: keys in `partial` overwrite, all other keys are kept.
#[must_use]
pub fn merge(current: &State, partial: &State) -> State {
    let mut next = current.clone();
    for (key, value) in partial {
        next.insert(key.clone(), value.clone());
    }
    next
}

/// Serialize a snapshot for persistence.
#[must_use]
pub fn to_persisted(state: &State) -> String {
    Value::Object(state.clone()).to_string()
}

/// Parse a persisted snapshot.
///
/// Anything that is not a JSON object (including `null` and malformed
/// text) is treated as "no prior state".
#[must_use]
pub fn from_persisted(raw: &str) -> Option<State> {
    match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn obj(value: Value) -> State {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_storage_key() {
        assert_eq!(storage_key("cart"), "cart-micro-local-store");
    }

    #[test]
    fn test_merge_overwrites_and_preserves() {
        let first = obj(json!({"a": 1, "b": {"nested": true}}));
        let second = obj(json!({"b": 2, "c": [1, 2]}));

        let merged = merge(&first, &second);

        assert_eq!(Value::Object(merged), json!({"a": 1, "b": 2, "c": [1, 2]}));
    }

    #[test]
    fn test_merge_is_shallow() {
        let first = obj(json!({"user": {"name": "ada", "age": 36}}));
        let second = obj(json!({"user": {"name": "grace"}}));

        let merged = merge(&first, &second);

        assert_eq!(merged["user"], json!({"name": "grace"}));
    }

    #[test]
    fn test_persisted_roundtrip() {
        let state = obj(json!({"items": [1], "total": 9.5}));
        let raw = to_persisted(&state);
        assert_eq!(from_persisted(&raw), Some(state));
    }

    #[test]
    fn test_non_object_is_no_state() {
        assert_eq!(from_persisted("null"), None);
        assert_eq!(from_persisted("[1, 2]"), None);
        assert_eq!(from_persisted("{not json"), None);
        assert_eq!(from_persisted(""), None);
    }
}
