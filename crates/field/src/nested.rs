//! Fields whose value is derived from child fields.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::condition::FieldContext;
use crate::error::FieldError;
use crate::field::Field;
use crate::parent::ParentNode;

/// Result of validating a field's children.
#[derive(Debug, Clone, PartialEq)]
pub struct NestedOutcome {
    /// Value the owning field adopts. `None` leaves it unset.
    pub value: Option<Value>,
    /// Whether every child passed.
    pub valid: bool,
}

/// Child fields a compound or repeatable field delegates to.
pub trait NestedFields: Send + Sync {
    /// Distribute `input` to the children, validate them and derive the
    /// owner's value.
    fn validate_fields(
        &mut self,
        input: &Value,
        context: &FieldContext,
    ) -> Result<NestedOutcome, FieldError>;

    /// Reset the children's input, value and errors.
    fn clear_data(&mut self) {}
}

/// Fixed set of named children submitted as one object.
///
/// Input `{"street": "Main", "zip": "123"}` is split by child name; the
/// derived value maps each child's accessor to its value. Children without
/// a value are left out.
pub struct Compound {
    node: Arc<ParentNode>,
    fields: Vec<Field>,
}

impl Compound {
    /// Children will be attached to `node`.
    #[must_use]
    pub fn new(node: Arc<ParentNode>) -> Self {
        Self {
            node,
            fields: Vec::new(),
        }
    }

    /// Add a child, re-parenting it onto this compound's node.
    #[must_use]
    pub fn with_field(mut self, mut field: Field) -> Self {
        field.set_parent(self.node.handle());
        self.fields.push(field);
        self
    }

    #[must_use]
    pub fn node(&self) -> &Arc<ParentNode> {
        &self.node
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == name)
    }
}

impl NestedFields for Compound {
    fn validate_fields(
        &mut self,
        input: &Value,
        context: &FieldContext,
    ) -> Result<NestedOutcome, FieldError> {
        self.node.clear_error_fields();
        let params = input.as_object();

        let mut valid = true;
        let mut value = Map::new();
        for field in &mut self.fields {
            let submitted = params.and_then(|p| p.get(field.name())).cloned();
            field.clear_data();
            field.fill_from_input(submitted);
            valid &= field.validate_field_in(context)?;
            if let Some(child) = field.value() {
                value.insert(field.accessor().to_owned(), child.clone());
            }
        }

        debug!(
            compound = %self.node.name(),
            valid,
            failed = ?self.node.error_fields(),
            "validated nested fields"
        );
        Ok(NestedOutcome {
            value: Some(Value::Object(value)),
            valid,
        })
    }

    fn clear_data(&mut self) {
        self.node.clear_error_fields();
        for field in &mut self.fields {
            field.clear_data();
        }
    }
}

impl fmt::Debug for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compound")
            .field("node", &self.node.name())
            .field("fields", &self.fields)
            .finish()
    }
}
