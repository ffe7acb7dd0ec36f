use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;
use crate::condition::Condition;
use crate::constraint::{TypeLibrary, TypeRegistry};
use crate::error::FieldError;
use crate::field::Field;
use crate::localize::{Localize, Maketext};
use crate::message::{Message, MessageKey};

/// A field described as data, e.g. loaded from a JSON form schema.
///
/// ```json
/// {
///   "name": "age",
///   "required": true,
///   "apply": [
///     { "action": "type", "name": "PositiveInt" },
///     { "action": "allow_list", "values": [18, 21], "message": "adults only" }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessor: Option<String>,

    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub disabled: bool,

    #[serde(default)]
    pub noupdate: bool,

    #[serde(default = "default_active")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_without_param: Option<Value>,

    /// Per-field replacements for built-in messages.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub messages: HashMap<MessageKey, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub apply: Vec<ActionDef>,
}

fn default_active() -> bool {
    true
}

/// A pipeline action described as data.
///
/// `message` is a template string, or an array whose head is the template
/// and whose tail are its arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionDef {
    /// Type constraint looked up by name.
    Type {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        when: Option<Condition>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<Value>,
    },

    /// Regex the value must match.
    Pattern {
        pattern: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        when: Option<Condition>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<Value>,
    },

    /// Values the field may take.
    AllowList {
        values: Vec<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        when: Option<Condition>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<Value>,
    },

    /// Strip surrounding whitespace.
    Trim {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        when: Option<Condition>,
    },
}

/// Shared collaborators handed to every built field.
#[derive(Clone)]
pub struct BuildOptions {
    pub types: Arc<dyn TypeRegistry>,
    pub localizer: Arc<dyn Localize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            types: Arc::new(TypeLibrary::with_builtins()),
            localizer: Arc::new(Maketext::new()),
        }
    }
}

impl fmt::Debug for BuildOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildOptions").finish_non_exhaustive()
    }
}

impl FieldDef {
    /// Build a live field.
    ///
    /// Type names are resolved lazily at validation time; patterns are
    /// compiled here.
    pub fn build(&self, options: &BuildOptions) -> Result<Field, FieldError> {
        let mut field = Field::new(&self.name)
            .required(self.required)
            .disabled(self.disabled)
            .noupdate(self.noupdate)
            .active(self.active)
            .with_types(Arc::clone(&options.types))
            .with_localizer(Arc::clone(&options.localizer));

        if let Some(label) = &self.label {
            field = field.with_label(label);
        }
        if let Some(accessor) = &self.accessor {
            field = field.with_accessor(accessor);
        }
        if let Some(default) = &self.default {
            field = field.with_default(default.clone());
        }
        if let Some(fallback) = &self.input_without_param {
            field = field.with_input_without_param(fallback.clone());
        }
        for (key, text) in &self.messages {
            field = field.with_message(*key, text);
        }
        for def in &self.apply {
            field = field.with_action(def.build(&self.name)?);
        }
        Ok(field)
    }
}

impl ActionDef {
    /// Build the action for the field named `field`.
    pub fn build(&self, field: &str) -> Result<Action, FieldError> {
        let (action, when, message) = match self {
            Self::Type {
                name,
                when,
                message,
            } => (Action::of_type(name.as_str()), when, message.as_ref()),
            Self::Pattern {
                pattern,
                when,
                message,
            } => {
                let regex = Regex::new(pattern).map_err(|e| FieldError::InvalidPattern {
                    field: field.to_owned(),
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                (Action::pattern(regex), when, message.as_ref())
            }
            Self::AllowList {
                values,
                when,
                message,
            } => (Action::allow_list(values.iter().cloned()), when, message.as_ref()),
            Self::Trim { when } => (Action::trim(), when, None),
        };

        let action = match when {
            Some(condition) => action.when(condition.clone()),
            None => action,
        };
        Ok(match message {
            Some(message) => action.with_message(Message::from_value(message)),
            None => action,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::FieldContext;
    use serde_json::json;

    #[test]
    fn minimal_def_uses_defaults() {
        let def: FieldDef = serde_json::from_value(json!({ "name": "email" })).unwrap();
        assert!(def.active);
        assert!(!def.required);
        assert!(def.apply.is_empty());

        let field = def.build(&BuildOptions::default()).unwrap();
        assert!(field.is_active());
        assert_eq!(field.label(), "Email");
    }

    #[test]
    fn full_def_builds_pipeline() {
        let def: FieldDef = serde_json::from_value(json!({
            "name": "age",
            "label": "Your age",
            "required": true,
            "messages": { "required": "[_1] please" },
            "apply": [
                { "action": "trim" },
                { "action": "type", "name": "PositiveInt" },
                {
                    "action": "allow_list",
                    "values": ["18", "21"],
                    "message": ["[_1] must be 18 or 21", "Age"],
                    "when": { "when": "field", "field": "strict", "test": { "test": "is_true" } }
                }
            ]
        }))
        .unwrap();

        let mut field = def.build(&BuildOptions::default()).unwrap();
        assert_eq!(field.actions().len(), 3);

        field.set_input(json!(""));
        assert_eq!(field.validate_field(), Ok(false));
        assert_eq!(field.errors(), ["Your age please"]);

        field.set_input(json!(" 30 "));
        let strict = FieldContext::new().with_value("strict", json!(true));
        assert_eq!(field.validate_field_in(&strict), Ok(false));
        assert_eq!(field.errors(), ["Age must be 18 or 21"]);
        assert_eq!(field.validate_field(), Ok(true));
    }

    #[test]
    fn bad_pattern_is_rejected() {
        let def: FieldDef = serde_json::from_value(json!({
            "name": "zip",
            "apply": [{ "action": "pattern", "pattern": "([0-9" }]
        }))
        .unwrap();
        let err = def.build(&BuildOptions::default()).unwrap_err();
        assert!(matches!(err, FieldError::InvalidPattern { ref field, .. } if field == "zip"));
        assert_eq!(err.code(), "FIELD_INVALID_PATTERN");
    }

    #[test]
    fn def_serializes_sparsely() {
        let def: FieldDef = serde_json::from_value(json!({
            "name": "zip",
            "apply": [{ "action": "pattern", "pattern": "^\\d+$" }]
        }))
        .unwrap();
        let out = serde_json::to_value(&def).unwrap();
        assert_eq!(
            out,
            json!({
                "name": "zip",
                "required": false,
                "disabled": false,
                "noupdate": false,
                "active": true,
                "apply": [{ "action": "pattern", "pattern": "^\\d+$" }]
            })
        );
    }

    #[test]
    fn unknown_action_fails_to_parse() {
        let parsed = serde_json::from_value::<ActionDef>(json!({ "action": "explode" }));
        assert!(parsed.is_err());
    }
}
