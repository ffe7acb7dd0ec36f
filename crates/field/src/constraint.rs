//! Type constraints used by type actions.
//!
//! A constraint validates a value and may know how to coerce an invalid value
//! into a valid one. Constraints are looked up by name through a
//! [`TypeRegistry`]; [`TypeLibrary`] is the stock registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Number, Value};

use crate::message::Message;

/// A named validation (and optional coercion) capability.
pub trait TypeConstraint: Send + Sync {
    /// Name used for registry lookups and logs.
    fn name(&self) -> &str;

    /// Check `value`; `Err` carries the violation message.
    fn validate(&self, value: &Value) -> Result<(), Message>;

    /// Whether [`coerce`](Self::coerce) does anything.
    fn has_coercion(&self) -> bool {
        false
    }

    /// Convert an invalid value into a valid one.
    fn coerce(&self, value: &Value) -> Result<Value, Message> {
        Ok(value.clone())
    }

    /// The constraint's own message for `value`, preferred over a raw
    /// coercion failure when present.
    fn message(&self, _value: &Value) -> Option<Message> {
        None
    }
}

/// Reference from a type action to its constraint.
#[derive(Clone)]
pub enum TypeRef {
    /// Resolved through the field's registry at validation time.
    Named(String),
    /// Used directly.
    Inline(Arc<dyn TypeConstraint>),
}

impl TypeRef {
    /// Display name of the referenced constraint.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Named(name) => name,
            Self::Inline(constraint) => constraint.name(),
        }
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.debug_tuple("Named").field(name).finish(),
            Self::Inline(c) => f.debug_tuple("Inline").field(&c.name()).finish(),
        }
    }
}

impl From<&str> for TypeRef {
    fn from(name: &str) -> Self {
        Self::Named(name.to_owned())
    }
}

impl From<String> for TypeRef {
    fn from(name: String) -> Self {
        Self::Named(name)
    }
}

/// Looks up constraints by name.
pub trait TypeRegistry: Send + Sync {
    /// The constraint registered as `name`, if any.
    fn find(&self, name: &str) -> Option<Arc<dyn TypeConstraint>>;
}

/// In-memory constraint registry.
#[derive(Clone, Default)]
pub struct TypeLibrary {
    types: HashMap<String, Arc<dyn TypeConstraint>>,
}

impl TypeLibrary {
    /// An empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A library preloaded with the stock constraints: `Str`, `Int`,
    /// `PositiveInt`, `Num`, `Bool`, `NonEmptyStr`, `Email`.
    #[must_use]
    pub fn with_builtins() -> Self {
        Self::new()
            .with(Str)
            .with(Int)
            .with(PositiveInt)
            .with(Num)
            .with(Bool)
            .with(NonEmptyStr)
            .with(Email)
    }

    /// Register a constraint under its own name (builder-style, consuming).
    #[must_use]
    pub fn with(mut self, constraint: impl TypeConstraint + 'static) -> Self {
        self.register(Arc::new(constraint));
        self
    }

    /// Register a constraint under its own name, replacing any previous one.
    pub fn register(&mut self, constraint: Arc<dyn TypeConstraint>) {
        self.types.insert(constraint.name().to_owned(), constraint);
    }

    /// Whether a constraint named `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl TypeRegistry for TypeLibrary {
    fn find(&self, name: &str) -> Option<Arc<dyn TypeConstraint>> {
        self.types.get(name).cloned()
    }
}

impl fmt::Debug for TypeLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeLibrary")
            .field("types", &self.names())
            .finish()
    }
}

fn trimmed_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim)
}

/// Any string.
#[derive(Debug, Clone, Copy, Default)]
pub struct Str;

impl TypeConstraint for Str {
    fn name(&self) -> &str {
        "Str"
    }

    fn validate(&self, value: &Value) -> Result<(), Message> {
        if value.is_string() {
            Ok(())
        } else {
            Err(Message::new("Must be a string"))
        }
    }
}

/// A string with at least one non-whitespace character.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonEmptyStr;

impl TypeConstraint for NonEmptyStr {
    fn name(&self) -> &str {
        "NonEmptyStr"
    }

    fn validate(&self, value: &Value) -> Result<(), Message> {
        match trimmed_str(value) {
            Some(s) if !s.is_empty() => Ok(()),
            _ => Err(Message::new("Must not be empty")),
        }
    }
}

/// An integer; numeric strings coerce.
#[derive(Debug, Clone, Copy, Default)]
pub struct Int;

impl TypeConstraint for Int {
    fn name(&self) -> &str {
        "Int"
    }

    fn validate(&self, value: &Value) -> Result<(), Message> {
        if value.is_i64() || value.is_u64() {
            Ok(())
        } else {
            Err(Message::new("Must be an integer"))
        }
    }

    fn has_coercion(&self) -> bool {
        true
    }

    fn coerce(&self, value: &Value) -> Result<Value, Message> {
        trimmed_str(value)
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .ok_or_else(|| Message::new("Value [_1] is not an integer").arg(value.clone()))
    }
}

/// A strictly positive integer. No coercion.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositiveInt;

impl TypeConstraint for PositiveInt {
    fn name(&self) -> &str {
        "PositiveInt"
    }

    fn validate(&self, value: &Value) -> Result<(), Message> {
        let positive = match value {
            Value::Number(n) => n.as_u64().is_some_and(|n| n > 0),
            Value::String(s) => s.trim().parse::<u64>().is_ok_and(|n| n > 0),
            _ => false,
        };
        if positive {
            Ok(())
        } else {
            Err(Message::new("must be a positive integer"))
        }
    }
}

/// A number; numeric strings coerce.
#[derive(Debug, Clone, Copy, Default)]
pub struct Num;

impl TypeConstraint for Num {
    fn name(&self) -> &str {
        "Num"
    }

    fn validate(&self, value: &Value) -> Result<(), Message> {
        if value.is_number() {
            Ok(())
        } else {
            Err(Message::new("Must be a number"))
        }
    }

    fn has_coercion(&self) -> bool {
        true
    }

    fn coerce(&self, value: &Value) -> Result<Value, Message> {
        let s = trimmed_str(value).unwrap_or_default();
        if let Ok(n) = s.parse::<i64>() {
            return Ok(Value::from(n));
        }
        s.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| Message::new("Value [_1] is not a number").arg(value.clone()))
    }

    fn message(&self, value: &Value) -> Option<Message> {
        Some(Message::new("[_1] is not a number").arg(value.clone()))
    }
}

/// A boolean; `"1"`, `"0"`, `"true"`, `"false"`, `1` and `0` coerce.
#[derive(Debug, Clone, Copy, Default)]
pub struct Bool;

impl TypeConstraint for Bool {
    fn name(&self) -> &str {
        "Bool"
    }

    fn validate(&self, value: &Value) -> Result<(), Message> {
        if value.is_boolean() {
            Ok(())
        } else {
            Err(Message::new("Must be a boolean"))
        }
    }

    fn has_coercion(&self) -> bool {
        true
    }

    fn coerce(&self, value: &Value) -> Result<Value, Message> {
        let coerced = match value {
            Value::String(s) => match s.trim() {
                "1" | "true" => Some(true),
                "0" | "false" | "" => Some(false),
                _ => None,
            },
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::Null => Some(false),
            _ => None,
        };
        coerced
            .map(Value::Bool)
            .ok_or_else(|| Message::new("Value [_1] is not a boolean").arg(value.clone()))
    }
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid")
});

/// A plausible email address.
#[derive(Debug, Clone, Copy, Default)]
pub struct Email;

impl TypeConstraint for Email {
    fn name(&self) -> &str {
        "Email"
    }

    fn validate(&self, value: &Value) -> Result<(), Message> {
        match value.as_str() {
            Some(s) if EMAIL_RE.is_match(s) => Ok(()),
            _ => Err(Message::new("Email should be of the format [_1]").arg("someuser@example.com")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn builtins_are_registered() {
        let lib = TypeLibrary::with_builtins();
        assert_eq!(
            lib.names(),
            vec!["Bool", "Email", "Int", "NonEmptyStr", "Num", "PositiveInt", "Str"]
        );
        assert!(lib.find("Int").is_some());
        assert!(lib.find("Nope").is_none());
    }

    #[test]
    fn register_replaces_by_name() {
        struct Loose;
        impl TypeConstraint for Loose {
            fn name(&self) -> &str {
                "Int"
            }
            fn validate(&self, _value: &Value) -> Result<(), Message> {
                Ok(())
            }
        }

        let mut lib = TypeLibrary::with_builtins();
        lib.register(Arc::new(Loose));
        let int = lib.find("Int").unwrap();
        assert!(int.validate(&json!("anything")).is_ok());
        assert!(!int.has_coercion());
    }

    #[rstest]
    #[case(json!(5), true)]
    #[case(json!("5"), true)]
    #[case(json!(0), false)]
    #[case(json!(-5), false)]
    #[case(json!("-5"), false)]
    #[case(json!("abc"), false)]
    #[case(json!(1.5), false)]
    fn positive_int(#[case] value: Value, #[case] ok: bool) {
        let result = PositiveInt.validate(&value);
        assert_eq!(result.is_ok(), ok, "for {value}");
        if let Err(msg) = result {
            assert_eq!(msg.text(), "must be a positive integer");
        }
    }

    #[test]
    fn int_coerces_numeric_strings() {
        assert!(Int.validate(&json!("12")).is_err());
        assert_eq!(Int.coerce(&json!(" 12 ")).unwrap(), json!(12));
        let err = Int.coerce(&json!("twelve")).unwrap_err();
        assert_eq!(err.args(), &[json!("twelve")]);
    }

    #[test]
    fn num_coerces_and_has_own_message() {
        assert_eq!(Num.coerce(&json!("3")).unwrap(), json!(3));
        assert_eq!(Num.coerce(&json!("2.5")).unwrap(), json!(2.5));
        assert!(Num.coerce(&json!("x")).is_err());
        assert_eq!(
            Num.message(&json!("x")).unwrap().text(),
            "[_1] is not a number"
        );
    }

    #[rstest]
    #[case(json!("1"), json!(true))]
    #[case(json!("true"), json!(true))]
    #[case(json!("0"), json!(false))]
    #[case(json!(""), json!(false))]
    #[case(json!(1), json!(true))]
    #[case(json!(null), json!(false))]
    fn bool_coercion(#[case] input: Value, #[case] expected: Value) {
        assert_eq!(Bool.coerce(&input).unwrap(), expected);
    }

    #[test]
    fn bool_rejects_unknown_strings() {
        assert!(Bool.coerce(&json!("maybe")).is_err());
    }

    #[test]
    fn email_and_strings() {
        assert!(Email.validate(&json!("a@b.co")).is_ok());
        assert!(Email.validate(&json!("not an email")).is_err());
        assert!(Str.validate(&json!("x")).is_ok());
        assert!(Str.validate(&json!(1)).is_err());
        assert!(NonEmptyStr.validate(&json!("  ")).is_err());
        assert!(NonEmptyStr.validate(&json!(" a ")).is_ok());
    }

    #[test]
    fn type_ref_names() {
        assert_eq!(TypeRef::from("Int").name(), "Int");
        assert_eq!(TypeRef::Inline(Arc::new(Email)).name(), "Email");
        assert_eq!(format!("{:?}", TypeRef::from("Int")), "Named(\"Int\")");
    }
}
