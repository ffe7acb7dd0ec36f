//! Presence rules used by required-ness checks.
//!
//! "Present" is stricter than "not null": a string made of whitespace, an
//! empty list and a mapping whose values are all blank count as absent.

use serde_json::Value;

/// Whether `value` carries meaningful content.
///
/// Strings need a non-whitespace character, arrays and objects need at least
/// one present member (checked recursively). Booleans and numbers are atomic
/// values and are always present. `null` is absent.
#[must_use]
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::String(s) => s.chars().any(|c| !c.is_whitespace()),
        Value::Array(items) => items.iter().any(is_present),
        Value::Object(map) => map.values().any(is_present),
        Value::Bool(_) | Value::Number(_) => true,
    }
}

/// Presence of an optional slot; an unset slot is absent.
#[must_use]
pub fn is_present_opt(value: Option<&Value>) -> bool {
    value.is_some_and(is_present)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!("a"), true)]
    #[case(json!("  x  "), true)]
    #[case(json!(""), false)]
    #[case(json!(" \t\n"), false)]
    #[case(json!(null), false)]
    #[case(json!(0), true)]
    #[case(json!(false), true)]
    #[case(json!([]), false)]
    #[case(json!(["", " "]), false)]
    #[case(json!(["", "b"]), true)]
    #[case(json!({}), false)]
    #[case(json!({"a": "", "b": null}), false)]
    #[case(json!({"a": {"b": [" ", "c"]}}), true)]
    #[case(json!([[], {}, [[""]]]), false)]
    fn presence(#[case] value: Value, #[case] expected: bool) {
        assert_eq!(is_present(&value), expected, "for {value}");
    }

    #[test]
    fn unset_slot_is_absent() {
        assert!(!is_present_opt(None));
        assert!(is_present_opt(Some(&json!("x"))));
        assert!(!is_present_opt(Some(&json!(""))));
    }
}
