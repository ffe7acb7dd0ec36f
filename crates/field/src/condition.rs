//! `when` guards for actions.
//!
//! A guard decides, per validation pass, whether an action runs. It can test
//! the field's own current value, a sibling's submitted value, or a sibling's
//! validity, and guards compose with `All` / `Any` / `Not`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::presence::is_present;

/// A test applied to a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "test", rename_all = "snake_case")]
pub enum ValueTest {
    /// Value equals the given value.
    Equals { value: Value },
    /// Value does not equal the given value.
    NotEquals { value: Value },
    /// Value is not null.
    IsSet,
    /// Value is null.
    IsNull,
    /// Value is present (non-blank, see [`is_present`]).
    IsPresent,
    /// Value is not present.
    IsBlank,
    /// Value is boolean true.
    IsTrue,
    /// Value is boolean false.
    IsFalse,
    /// Numeric value is greater than the threshold.
    GreaterThan { value: f64 },
    /// Numeric value is less than the threshold.
    LessThan { value: f64 },
    /// Numeric value is within the inclusive range.
    InRange { min: f64, max: f64 },
    /// String or array value contains the given value.
    Contains { value: Value },
    /// String value starts with the prefix.
    StartsWith { prefix: String },
    /// String value ends with the suffix.
    EndsWith { suffix: String },
    /// Value is one of the given values.
    OneOf { values: Vec<Value> },
}

impl ValueTest {
    /// Evaluate this test against a concrete value.
    #[must_use]
    pub fn evaluate(&self, value: &Value) -> bool {
        match self {
            Self::Equals { value: expected } => value == expected,
            Self::NotEquals { value: expected } => value != expected,
            Self::IsSet => !value.is_null(),
            Self::IsNull => value.is_null(),
            Self::IsPresent => is_present(value),
            Self::IsBlank => !is_present(value),
            Self::IsTrue => value.as_bool() == Some(true),
            Self::IsFalse => value.as_bool() == Some(false),
            Self::GreaterThan { value: threshold } => {
                value.as_f64().is_some_and(|n| n > *threshold)
            }
            Self::LessThan { value: threshold } => value.as_f64().is_some_and(|n| n < *threshold),
            Self::InRange { min, max } => value.as_f64().is_some_and(|n| n >= *min && n <= *max),
            Self::Contains { value: needle } => match value {
                Value::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
                Value::Array(items) => items.contains(needle),
                _ => false,
            },
            Self::StartsWith { prefix } => value
                .as_str()
                .is_some_and(|s| s.starts_with(prefix.as_str())),
            Self::EndsWith { suffix } => {
                value.as_str().is_some_and(|s| s.ends_with(suffix.as_str()))
            }
            Self::OneOf { values } => values.contains(value),
        }
    }
}

/// Sibling state visible to guards during a validation pass.
#[derive(Debug, Clone, Default)]
pub struct FieldContext {
    values: HashMap<String, Value>,
    validation: HashMap<String, bool>,
}

impl FieldContext {
    /// An empty context: every sibling reads as null and invalid.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a sibling's value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// Look up whether a sibling passed validation.
    #[must_use]
    pub fn get_validation(&self, name: &str) -> Option<bool> {
        self.validation.get(name).copied()
    }

    /// Set a sibling value (builder-style, consuming).
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    /// Set a sibling's validation state (builder-style, consuming).
    #[must_use]
    pub fn with_validation(mut self, name: impl Into<String>, valid: bool) -> Self {
        self.validation.insert(name.into(), valid);
        self
    }

    /// Set a sibling value in place.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Record a sibling's validation state in place.
    pub fn set_validation(&mut self, name: impl Into<String>, valid: bool) {
        self.validation.insert(name.into(), valid);
    }
}

/// Guard closure: `(current value, context) -> run?`.
pub type GuardFn = dyn Fn(&Value, &FieldContext) -> bool + Send + Sync;

/// Decides whether an action runs in the current pass.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "when", rename_all = "snake_case")]
pub enum Condition {
    /// Test the field's own current value.
    Value { test: ValueTest },
    /// Test a sibling's value; a missing sibling reads as null.
    Field { field: String, test: ValueTest },
    /// The sibling passed validation.
    IsValid { field: String },
    /// All nested conditions hold.
    All { conditions: Vec<Condition> },
    /// At least one nested condition holds.
    Any { conditions: Vec<Condition> },
    /// The nested condition does not hold.
    Not { condition: Box<Condition> },
    /// Arbitrary code. Not serializable.
    #[serde(skip)]
    Custom(Arc<GuardFn>),
}

impl Condition {
    /// Sibling `field` must equal `value`.
    #[must_use]
    pub fn field_equals(field: impl Into<String>, value: Value) -> Self {
        Self::Field {
            field: field.into(),
            test: ValueTest::Equals { value },
        }
    }

    /// Wrap a closure as a guard.
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Value, &FieldContext) -> bool + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(f))
    }

    /// Evaluate the guard against the field's current value and its siblings.
    #[must_use]
    pub fn evaluate(&self, current: &Value, context: &FieldContext) -> bool {
        match self {
            Self::Value { test } => test.evaluate(current),
            Self::Field { field, test } => {
                test.evaluate(context.get(field).unwrap_or(&Value::Null))
            }
            Self::IsValid { field } => context.get_validation(field).unwrap_or(false),
            Self::All { conditions } => conditions.iter().all(|c| c.evaluate(current, context)),
            Self::Any { conditions } => conditions.iter().any(|c| c.evaluate(current, context)),
            Self::Not { condition } => !condition.evaluate(current, context),
            Self::Custom(f) => f(current, context),
        }
    }

    /// Sibling names this guard reads.
    #[must_use]
    pub fn dependencies(&self) -> Vec<String> {
        let mut deps = Vec::new();
        self.collect_dependencies(&mut deps);
        deps.sort();
        deps.dedup();
        deps
    }

    fn collect_dependencies(&self, deps: &mut Vec<String>) {
        match self {
            Self::Field { field, .. } | Self::IsValid { field } => deps.push(field.clone()),
            Self::All { conditions } | Self::Any { conditions } => {
                for c in conditions {
                    c.collect_dependencies(deps);
                }
            }
            Self::Not { condition } => condition.collect_dependencies(deps),
            Self::Value { .. } | Self::Custom(_) => {}
        }
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value { test } => f.debug_struct("Value").field("test", test).finish(),
            Self::Field { field, test } => f
                .debug_struct("Field")
                .field("field", field)
                .field("test", test)
                .finish(),
            Self::IsValid { field } => f.debug_struct("IsValid").field("field", field).finish(),
            Self::All { conditions } => f.debug_struct("All").field("conditions", conditions).finish(),
            Self::Any { conditions } => f.debug_struct("Any").field("conditions", conditions).finish(),
            Self::Not { condition } => f.debug_struct("Not").field("condition", condition).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
