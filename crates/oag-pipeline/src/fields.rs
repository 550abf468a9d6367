//! Loose field access over JSON property bags

use oag_model::PropertyMap;
use serde_json::Value;

/// JavaScript-style truthiness: `null`, `false`, `0`, `""` are falsy
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Whether the field holds a truthy value
pub(crate) fn has_truthy(data: &PropertyMap, name: &str) -> bool {
    data.get(name).is_some_and(is_truthy)
}

/// Field value usable as a node id reference
///
/// Non-empty strings are used as-is; non-zero numbers are rendered in
/// decimal. Falsy values reference nothing.
pub(crate) fn reference(data: &PropertyMap, name: &str) -> Option<String> {
    let value = data.get(name).filter(|v| is_truthy(v))?;
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Non-empty string field
pub(crate) fn non_empty_str<'a>(data: &'a PropertyMap, name: &str) -> Option<&'a str> {
    data.get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_loose_rules() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!("T1")));
        assert!(is_truthy(&json!([])));
        assert!(is_truthy(&json!(10)));
    }

    #[test]
    fn references_accept_strings_and_numbers() {
        let data = json!({"a": "VEH-1", "b": 42, "c": "", "d": true, "e": 0, "f": 0.0, "g": null});
        let data = data.as_object().unwrap();
        assert_eq!(reference(data, "a").as_deref(), Some("VEH-1"));
        assert_eq!(reference(data, "b").as_deref(), Some("42"));
        assert!(reference(data, "c").is_none());
        assert!(reference(data, "d").is_none());
        assert!(reference(data, "e").is_none());
        assert!(reference(data, "f").is_none());
        assert!(reference(data, "g").is_none());
        assert!(reference(data, "missing").is_none());
    }
}
