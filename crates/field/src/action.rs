use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::condition::{Condition, FieldContext};
use crate::constraint::{TypeConstraint, TypeRef};
use crate::field::Field;
use crate::message::{Message, MessageOverride};

/// Predicate check: `(value, field) -> passes?`.
pub type CheckFn = dyn Fn(&Value, &Field) -> bool + Send + Sync;

/// Transform: `(value, field) -> new value`, or the reason it failed.
pub type TransformFn = dyn Fn(&Value, &Field) -> Result<Value, Message> + Send + Sync;

/// What an action does to the field's current value.
#[derive(Clone)]
pub enum ActionKind {
    /// Validate against a type constraint, coercing when supported.
    Type(TypeRef),
    /// Custom predicate.
    Check(Arc<CheckFn>),
    /// The value must match the regex.
    Pattern(Regex),
    /// The value must equal one of these.
    AllowList(Vec<Value>),
    /// Replace the value.
    Transform(Arc<TransformFn>),
}

impl ActionKind {
    /// Short name used in logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Type(_) => "type",
            Self::Check(_) => "check",
            Self::Pattern(_) => "pattern",
            Self::AllowList(_) => "allow_list",
            Self::Transform(_) => "transform",
        }
    }
}

impl fmt::Debug for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(t) => f.debug_tuple("Type").field(t).finish(),
            Self::Check(_) => f.write_str("Check(..)"),
            Self::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Self::AllowList(values) => f.debug_tuple("AllowList").field(values).finish(),
            Self::Transform(_) => f.write_str("Transform(..)"),
        }
    }
}

/// One step of a field's validation pipeline.
///
/// An action optionally carries a `when` guard that skips it for the current
/// pass, and a message override that replaces whatever error it produces.
///
/// ```rust,ignore
/// let age = Action::of_type("Int")
///     .with_message("Age must be a whole number");
/// let adults = Action::check(|v, _| v.as_i64().is_some_and(|n| n >= 18))
///     .when(Condition::field_equals("country", json!("US")));
/// ```
#[derive(Debug, Clone)]
pub struct Action {
    kind: ActionKind,
    guard: Option<Condition>,
    message: Option<MessageOverride>,
}

impl Action {
    fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            guard: None,
            message: None,
        }
    }

    /// Type action referencing a constraint by name or inline.
    #[must_use]
    pub fn of_type(type_ref: impl Into<TypeRef>) -> Self {
        Self::new(ActionKind::Type(type_ref.into()))
    }

    /// Type action using `constraint` directly, bypassing the registry.
    #[must_use]
    pub fn inline_type(constraint: impl TypeConstraint + 'static) -> Self {
        Self::new(ActionKind::Type(TypeRef::Inline(Arc::new(constraint))))
    }

    /// Predicate check.
    pub fn check<F>(f: F) -> Self
    where
        F: Fn(&Value, &Field) -> bool + Send + Sync + 'static,
    {
        Self::new(ActionKind::Check(Arc::new(f)))
    }

    /// Pattern check with a compiled regex.
    #[must_use]
    pub fn pattern(regex: Regex) -> Self {
        Self::new(ActionKind::Pattern(regex))
    }

    /// Allow-list check.
    #[must_use]
    pub fn allow_list(values: impl IntoIterator<Item = Value>) -> Self {
        Self::new(ActionKind::AllowList(values.into_iter().collect()))
    }

    /// Value transform.
    pub fn transform<F>(f: F) -> Self
    where
        F: Fn(&Value, &Field) -> Result<Value, Message> + Send + Sync + 'static,
    {
        Self::new(ActionKind::Transform(Arc::new(f)))
    }

    /// Transform that strips surrounding whitespace from strings (and from
    /// strings inside arrays). Other values pass through.
    #[must_use]
    pub fn trim() -> Self {
        Self::transform(|value, _| Ok(trim_value(value)))
    }

    /// Only run when `condition` holds (builder-style, consuming).
    #[must_use]
    pub fn when(mut self, condition: Condition) -> Self {
        self.guard = Some(condition);
        self
    }

    /// Replace the emitted error with a fixed message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<MessageOverride>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Replace the emitted error with one computed from
    /// `(value, field, raw_error)`.
    pub fn with_message_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Field, &Message) -> Message + Send + Sync + 'static,
    {
        self.message = Some(MessageOverride::dynamic(f));
        self
    }

    /// What this action does.
    #[must_use]
    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    /// The `when` guard, if any.
    #[must_use]
    pub fn guard(&self) -> Option<&Condition> {
        self.guard.as_ref()
    }

    /// The message override, if any.
    #[must_use]
    pub fn message_override(&self) -> Option<&MessageOverride> {
        self.message.as_ref()
    }

    /// Whether the action runs for `current` under `context`.
    #[must_use]
    pub fn is_enabled(&self, current: &Value, context: &FieldContext) -> bool {
        self.guard
            .as_ref()
            .is_none_or(|guard| guard.evaluate(current, context))
    }
}

fn trim_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_owned()),
        Value::Array(items) => Value::Array(items.iter().map(trim_value).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ValueTest;
    use serde_json::json;

    #[test]
    fn builders_set_parts() {
        let action = Action::of_type("Int")
            .when(Condition::Value {
                test: ValueTest::IsPresent,
            })
            .with_message("nope");
        assert_eq!(action.kind().label(), "type");
        assert!(action.guard().is_some());
        assert!(matches!(
            action.message_override(),
            Some(MessageOverride::Literal(m)) if m.text() == "nope"
        ));
    }

    #[test]
    fn unguarded_action_is_always_enabled() {
        let action = Action::allow_list([json!("a")]);
        assert!(action.is_enabled(&json!(null), &FieldContext::new()));
    }

    #[test]
    fn guard_controls_enablement() {
        let action = Action::trim().when(Condition::field_equals("mode", json!("strict")));
        let strict = FieldContext::new().with_value("mode", json!("strict"));
        let lax = FieldContext::new().with_value("mode", json!("lax"));
        assert!(action.is_enabled(&json!("x"), &strict));
        assert!(!action.is_enabled(&json!("x"), &lax));
    }

    #[test]
    fn trim_value_handles_nesting() {
        assert_eq!(trim_value(&json!("  a ")), json!("a"));
        assert_eq!(trim_value(&json!([" a", "b "])), json!(["a", "b"]));
        assert_eq!(trim_value(&json!(3)), json!(3));
    }

    #[test]
    fn debug_hides_closures() {
        let action = Action::check(|_, _| true);
        assert!(format!("{action:?}").contains("Check(..)"));
        let pattern = Action::pattern(Regex::new("^a+$").unwrap());
        assert!(format!("{pattern:?}").contains("^a+$"));
    }
}
