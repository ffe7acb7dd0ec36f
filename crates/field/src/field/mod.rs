//! The field entity and its validation pass.
//!
//! A [`Field`] owns its submitted input, its canonical value and the error
//! messages of the current pass. Validation runs in a fixed order:
//!
//! 1. no input → nothing to do
//! 2. required check (see [`is_present`])
//! 3. nested fields derive the value, or the input is copied to the value
//! 4. the action pipeline (`base_apply`, then `apply`)
//! 5. the field kind's own `validate` hook

mod errors;
mod kind;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use serde_json::Value;
use tracing::debug;

pub use kind::{FieldKind, Plain};

use crate::action::Action;
use crate::condition::FieldContext;
use crate::constraint::{TypeLibrary, TypeRegistry};
use crate::error::FieldError;
use crate::localize::{Localize, Maketext};
use crate::message::MessageKey;
use crate::nested::NestedFields;
use crate::parent::{FieldParent, join_path};
use crate::presence::is_present;

/// A single named form field.
pub struct Field {
    name: String,
    accessor: Option<String>,
    label: OnceLock<String>,
    is_contains: bool,

    active: bool,
    disabled: bool,
    required: bool,
    noupdate: bool,

    pub(crate) input: Option<Value>,
    pub(crate) input_without_param: Option<Value>,
    pub(crate) value: Option<Value>,
    pub(crate) default: Option<Value>,

    pub(crate) errors: Vec<String>,
    nested_errors: bool,

    apply: Vec<Action>,
    base_apply: Vec<Action>,
    messages: HashMap<MessageKey, String>,

    parent: Option<Weak<dyn FieldParent>>,
    pub(crate) kind: Arc<dyn FieldKind>,
    nested: Option<Box<dyn NestedFields>>,
    pub(crate) localizer: Arc<dyn Localize>,
    pub(crate) types: Arc<dyn TypeRegistry>,
}

impl Field {
    /// A plain, active, optional field with the stock type library and
    /// localizer.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            accessor: None,
            label: OnceLock::new(),
            is_contains: false,
            active: true,
            disabled: false,
            required: false,
            noupdate: false,
            input: None,
            input_without_param: None,
            value: None,
            default: None,
            errors: Vec::new(),
            nested_errors: false,
            apply: Vec::new(),
            base_apply: Vec::new(),
            messages: HashMap::new(),
            parent: None,
            kind: Arc::new(Plain),
            nested: None,
            localizer: Arc::new(Maketext::new()),
            types: Arc::new(TypeLibrary::with_builtins()),
        }
    }

    // ── builder ─────────────────────────────────────────────────────────

    /// Set an explicit label instead of deriving one from the name.
    #[must_use]
    pub fn with_label(self, label: impl Into<String>) -> Self {
        Self {
            label: OnceLock::from(label.into()),
            ..self
        }
    }

    /// Set an explicit accessor.
    #[must_use]
    pub fn with_accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = Some(accessor.into());
        self
    }

    /// Mark the field as the element template of a repeatable container.
    #[must_use]
    pub fn contains_field(mut self) -> Self {
        self.is_contains = true;
        self
    }

    /// Require present input.
    #[must_use]
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Disable the field.
    #[must_use]
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    /// Flag the value as not to be written back on update.
    #[must_use]
    pub fn noupdate(mut self, noupdate: bool) -> Self {
        self.noupdate = noupdate;
        self
    }

    /// Set the active state.
    #[must_use]
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Value used as input when the submission has no param for this field.
    #[must_use]
    pub fn with_input_without_param(mut self, value: Value) -> Self {
        self.input_without_param = Some(value);
        self
    }

    /// Initial value for display before any submission.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Append an instance-level action.
    #[must_use]
    pub fn with_action(mut self, action: Action) -> Self {
        self.apply.push(action);
        self
    }

    /// Append a class-level action; these run before instance-level ones.
    #[must_use]
    pub fn with_base_action(mut self, action: Action) -> Self {
        self.base_apply.push(action);
        self
    }

    /// Replace a built-in message for this field only.
    #[must_use]
    pub fn with_message(mut self, key: MessageKey, text: impl Into<String>) -> Self {
        self.messages.insert(key, text.into());
        self
    }

    /// Attach to a container.
    #[must_use]
    pub fn with_parent(mut self, parent: Weak<dyn FieldParent>) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Set the field kind.
    #[must_use]
    pub fn with_kind(mut self, kind: impl FieldKind + 'static) -> Self {
        self.kind = Arc::new(kind);
        self
    }

    /// Delegate value derivation to nested fields.
    #[must_use]
    pub fn with_nested(mut self, nested: impl NestedFields + 'static) -> Self {
        self.nested = Some(Box::new(nested));
        self
    }

    /// Use another localizer.
    #[must_use]
    pub fn with_localizer(mut self, localizer: Arc<dyn Localize>) -> Self {
        self.localizer = localizer;
        self
    }

    /// Use another type registry.
    #[must_use]
    pub fn with_types(mut self, types: Arc<dyn TypeRegistry>) -> Self {
        self.types = types;
        self
    }

    // ── identity ────────────────────────────────────────────────────────

    /// The field's own name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Explicit accessor, or the last `.`-separated segment of the name.
    #[must_use]
    pub fn accessor(&self) -> &str {
        match &self.accessor {
            Some(accessor) => accessor,
            None => self.name.rsplit('.').next().unwrap_or(&self.name),
        }
    }

    /// Human-readable label; derived from the name on first access.
    #[must_use]
    pub fn label(&self) -> &str {
        self.label.get_or_init(|| derive_label(&self.name))
    }

    /// The container, if it is still alive.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<dyn FieldParent>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }

    /// Attach to a container.
    pub fn set_parent(&mut self, parent: Weak<dyn FieldParent>) {
        self.parent = Some(parent);
    }

    /// Dotted name including compound ancestors.
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.parent() {
            Some(parent) if parent.is_compound() => join_path(&parent.full_name(), &self.name),
            _ => self.name.clone(),
        }
    }

    /// Dotted accessor path including compound ancestors.
    ///
    /// A repeatable's element template collapses to its parent's path.
    #[must_use]
    pub fn full_accessor(&self) -> String {
        let parent = self.parent();
        if self.is_contains {
            return parent.map(|p| p.full_accessor()).unwrap_or_default();
        }
        match parent {
            Some(parent) if parent.is_compound() => {
                join_path(&parent.full_accessor(), self.accessor())
            }
            _ => self.accessor().to_owned(),
        }
    }

    /// Whether this is a repeatable's element template.
    #[must_use]
    pub fn is_contains(&self) -> bool {
        self.is_contains
    }

    // ── flags ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn set_required(&mut self, required: bool) {
        self.required = required;
    }

    #[must_use]
    pub fn is_noupdate(&self) -> bool {
        self.noupdate
    }

    /// Whether value derivation is delegated to nested fields.
    #[must_use]
    pub fn has_fields(&self) -> bool {
        self.nested.is_some()
    }

    /// The nested fields, if any.
    #[must_use]
    pub fn nested(&self) -> Option<&dyn NestedFields> {
        self.nested.as_deref()
    }

    pub(crate) fn nested_mut(&mut self) -> Option<&mut (dyn NestedFields + 'static)> {
        self.nested.as_deref_mut()
    }

    // ── value slots ─────────────────────────────────────────────────────

    #[must_use]
    pub fn input(&self) -> Option<&Value> {
        self.input.as_ref()
    }

    #[must_use]
    pub fn has_input(&self) -> bool {
        self.input.is_some()
    }

    pub fn set_input(&mut self, input: Value) {
        self.input = Some(input);
    }

    pub fn clear_input(&mut self) {
        self.input = None;
    }

    #[must_use]
    pub fn input_without_param(&self) -> Option<&Value> {
        self.input_without_param.as_ref()
    }

    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    #[must_use]
    pub fn has_value(&self) -> bool {
        self.value.is_some()
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = Some(value);
    }

    pub fn clear_value(&mut self) {
        self.value = None;
    }

    #[must_use]
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    // ── actions ─────────────────────────────────────────────────────────

    /// Instance-level actions.
    #[must_use]
    pub fn actions(&self) -> &[Action] {
        &self.apply
    }

    /// Class-level actions.
    #[must_use]
    pub fn base_actions(&self) -> &[Action] {
        &self.base_apply
    }

    /// Append an instance-level action.
    pub fn add_action(&mut self, action: Action) {
        self.apply.push(action);
    }

    /// Template for `key`, honoring this field's overrides.
    #[must_use]
    pub fn message_text(&self, key: MessageKey) -> &str {
        self.messages
            .get(&key)
            .map_or_else(|| key.default_text(), String::as_str)
    }

    // ── validation ──────────────────────────────────────────────────────

    /// Validate the current input with an empty sibling context.
    pub fn validate_field(&mut self) -> Result<bool, FieldError> {
        self.validate_field_in(&FieldContext::new())
    }

    /// Validate the current input; `when` guards read siblings from `context`.
    ///
    /// Returns `Ok(true)` when the pass produced no errors. A field without
    /// input is not validated and reports `Ok(true)` untouched. `Err` means
    /// the field definition itself is broken (unknown type, bad message).
    pub fn validate_field_in(&mut self, context: &FieldContext) -> Result<bool, FieldError> {
        let Some(input) = self.input.clone() else {
            return Ok(true);
        };

        self.errors.clear();
        self.nested_errors = false;
        self.value = None;

        if self.required && !is_present(&input) {
            let label = Value::String(self.label().to_owned());
            self.add_error_key(MessageKey::Required, [label])?;
            debug!(field = %self.full_name(), "required field has no input");
            return Ok(false);
        }

        if let Some(nested) = self.nested_mut() {
            let outcome = nested.validate_fields(&input, context)?;
            self.nested_errors = !outcome.valid;
            self.value = outcome.value;
        } else {
            self.value = Some(input);
        }

        self.apply_actions(context)?;

        let kind = Arc::clone(&self.kind);
        kind.validate(self)?;

        let valid = self.errors.is_empty() && !self.nested_errors;
        debug!(
            field = %self.full_name(),
            valid,
            errors = self.errors.len(),
            "validated field"
        );
        Ok(valid)
    }

    /// Whether the last pass failed in this field or in its nested fields.
    #[must_use]
    pub fn has_errors_deep(&self) -> bool {
        self.has_errors() || self.nested_errors
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("kind", &self.kind.name())
            .field("active", &self.active)
            .field("required", &self.required)
            .field("disabled", &self.disabled)
            .field("input", &self.input)
            .field("value", &self.value)
            .field("errors", &self.errors)
            .field("base_apply", &self.base_apply)
            .field("apply", &self.apply)
            .field("has_fields", &self.has_fields())
            .finish_non_exhaustive()
    }
}

/// `first_name` → `First name`.
fn derive_label(name: &str) -> String {
    let base = name.rsplit('.').next().unwrap_or(name).replace('_', " ");
    let mut chars = base.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parent::ParentNode;
    use serde_json::json;

    #[test]
    fn defaults() {
        let field = Field::new("email");
        assert!(field.is_active());
        assert!(!field.is_required());
        assert!(!field.is_disabled());
        assert!(!field.is_noupdate());
        assert!(!field.has_input());
        assert!(!field.has_value());
        assert!(!field.has_fields());
        assert!(field.errors().is_empty());
    }

    #[test]
    fn label_is_derived_once() {
        let field = Field::new("user.first_name");
        assert_eq!(field.label(), "First name");
        assert_eq!(Field::new("x").with_label("Custom").label(), "Custom");
        assert_eq!(derive_label(""), "");
    }

    #[test]
    fn accessor_is_last_segment() {
        assert_eq!(Field::new("a.b.street").accessor(), "street");
        assert_eq!(Field::new("street").accessor(), "street");
        assert_eq!(Field::new("a.b").with_accessor("road").accessor(), "road");
    }

    #[test]
    fn full_name_ignores_form_root() {
        let form = ParentNode::form("signup");
        let field = Field::new("email").with_parent(form.handle());
        assert_eq!(field.full_name(), "email");
        assert_eq!(field.full_accessor(), "email");
    }

    #[test]
    fn full_name_walks_compound_parents() {
        let form = ParentNode::form("f");
        let address = ParentNode::compound("address", Some(form.handle()));
        let field = Field::new("street")
            .with_accessor("road")
            .with_parent(address.handle());
        assert_eq!(field.full_name(), "address.street");
        assert_eq!(field.full_accessor(), "address.road");
    }

    #[test]
    fn contains_field_collapses_accessor() {
        let form = ParentNode::form("f");
        let tags = ParentNode::compound("tags", Some(form.handle()));
        let element = Field::new("contains")
            .contains_field()
            .with_parent(tags.handle());
        assert!(element.is_contains());
        assert_eq!(element.full_accessor(), "tags");
        assert_eq!(element.full_name(), "tags.contains");

        let orphan = Field::new("contains").contains_field();
        assert_eq!(orphan.full_accessor(), "");
    }

    #[test]
    fn paths_follow_reparenting() {
        let form = ParentNode::form("f");
        let a = ParentNode::compound("a", Some(form.handle()));
        let b = ParentNode::compound("b", Some(form.handle()));
        let mut field = Field::new("x").with_parent(a.handle());
        assert_eq!(field.full_name(), "a.x");
        field.set_parent(b.handle());
        assert_eq!(field.full_name(), "b.x");
    }

    #[test]
    fn message_text_prefers_field_override() {
        let field = Field::new("x").with_message(MessageKey::Required, "Need [_1]!");
        assert_eq!(field.message_text(MessageKey::Required), "Need [_1]!");
        assert_eq!(field.message_text(MessageKey::WrongValue), "Wrong value");
    }

    #[test]
    fn no_input_means_no_validation() {
        let mut field = Field::new("age")
            .required(true)
            .with_action(Action::of_type("Nope"));
        assert_eq!(field.validate_field(), Ok(true));
        assert!(field.errors().is_empty());
        assert!(!field.has_value());
    }

    #[test]
    fn debug_lists_state() {
        let mut field = Field::new("age");
        field.set_input(json!("3"));
        let out = format!("{field:?}");
        assert!(out.contains("\"age\""));
        assert!(out.contains("plain"));
    }
}
