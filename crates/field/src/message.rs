use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

use crate::field::Field;

/// An error message template plus its positional interpolation arguments.
///
/// The template uses bracket notation (`[_1]`, `[_2]`, ...) and is resolved
/// by the field's [`Localize`](crate::localize::Localize) implementation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    text: String,
    args: SmallVec<[Value; 2]>,
}

impl Message {
    /// A message with no arguments.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            args: SmallVec::new(),
        }
    }

    /// Append a positional argument (builder-style, consuming).
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Build a message from a JSON value.
    ///
    /// A string is the template itself. An array is spread: the first
    /// element is the template and the remaining elements are arguments.
    /// Any other value is rendered as text.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(s) => Self::new(s.clone()),
            Value::Array(items) => match items.split_first() {
                Some((head, rest)) => Self {
                    text: render_arg(head),
                    args: rest.iter().cloned().collect(),
                },
                None => Self::new(String::new()),
            },
            other => Self::new(render_arg(other)),
        }
    }

    /// The untranslated template.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Positional arguments, first one is `[_1]`.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Whether the template is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl From<&str> for Message {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl<S: Into<String>> From<(S, Vec<Value>)> for Message {
    fn from((text, args): (S, Vec<Value>)) -> Self {
        Self {
            text: text.into(),
            args: args.into_iter().collect(),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Text rendering of an interpolation argument.
///
/// Strings are inserted raw, everything else as compact JSON.
#[must_use]
pub fn render_arg(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Built-in messages emitted by the validator and the action pipeline.
///
/// Fields may replace any of them through their message table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKey {
    /// A required field has no present input. `[_1]` is the label.
    Required,
    /// A predicate check returned false.
    WrongValue,
    /// A pattern check failed. `[_1]` is the value.
    NoMatch,
    /// An allow-list check failed. `[_1]` is the value.
    NotAllowed,
    /// A callback failed without saying why.
    ErrorOccurred,
}

impl MessageKey {
    /// The default template for this key.
    #[must_use]
    pub fn default_text(self) -> &'static str {
        match self {
            Self::Required => "[_1] field is required",
            Self::WrongValue => "Wrong value",
            Self::NoMatch => "[_1] does not match",
            Self::NotAllowed => "[_1] not allowed",
            Self::ErrorOccurred => "error occurred",
        }
    }
}

/// Computes a replacement message from `(value, field, raw_error)`.
pub type MessageFn = dyn Fn(&Value, &Field, &Message) -> Message + Send + Sync;

/// Replacement for the error an action would otherwise emit.
#[derive(Clone)]
pub enum MessageOverride {
    /// Use this message instead of the raw one.
    Literal(Message),
    /// Compute the message from the current value, the field and the raw error.
    Dynamic(Arc<MessageFn>),
}

impl MessageOverride {
    /// Wrap a closure as a dynamic override.
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&Value, &Field, &Message) -> Message + Send + Sync + 'static,
    {
        Self::Dynamic(Arc::new(f))
    }

    /// The message to emit in place of `raw`.
    #[must_use]
    pub fn resolve(&self, value: &Value, field: &Field, raw: Message) -> Message {
        match self {
            Self::Literal(message) => message.clone(),
            Self::Dynamic(f) => f(value, field, &raw),
        }
    }
}

impl fmt::Debug for MessageOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(message) => f.debug_tuple("Literal").field(message).finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<Message> for MessageOverride {
    fn from(message: Message) -> Self {
        Self::Literal(message)
    }
}

impl From<&str> for MessageOverride {
    fn from(text: &str) -> Self {
        Self::Literal(Message::new(text))
    }
}

impl From<String> for MessageOverride {
    fn from(text: String) -> Self {
        Self::Literal(Message::new(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builder_collects_args() {
        let msg = Message::new("[_1] is not [_2]").arg("x").arg(3);
        assert_eq!(msg.text(), "[_1] is not [_2]");
        assert_eq!(msg.args(), &[json!("x"), json!(3)]);
    }

    #[test]
    fn from_tuple() {
        let msg: Message = ("[_1] bad", vec![json!("v")]).into();
        assert_eq!(msg.text(), "[_1] bad");
        assert_eq!(msg.args().len(), 1);
    }

    #[test]
    fn from_value_spreads_arrays() {
        let msg = Message::from_value(&json!(["[_1] and [_2]", "a", 2]));
        assert_eq!(msg.text(), "[_1] and [_2]");
        assert_eq!(msg.args(), &[json!("a"), json!(2)]);

        let msg = Message::from_value(&json!("plain"));
        assert_eq!(msg.text(), "plain");
        assert!(msg.args().is_empty());

        assert!(Message::from_value(&json!([])).is_empty());
    }

    #[test]
    fn render_arg_forms() {
        assert_eq!(render_arg(&json!("s")), "s");
        assert_eq!(render_arg(&json!(5)), "5");
        assert_eq!(render_arg(&json!(null)), "");
        assert_eq!(render_arg(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn message_keys_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&MessageKey::WrongValue).unwrap(),
            "\"wrong_value\""
        );
        let key: MessageKey = serde_json::from_str("\"not_allowed\"").unwrap();
        assert_eq!(key, MessageKey::NotAllowed);
    }
}
