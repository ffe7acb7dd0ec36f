//! Non-owning link from a field to its container.
//!
//! The container owns its fields; fields only hold a [`Weak`] handle back to
//! it, used for path composition and error bubbling.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Container-side hooks a field calls into.
pub trait FieldParent: Send + Sync {
    /// Dotted path of the container. Empty for a form root.
    fn full_name(&self) -> String;

    /// Dotted accessor path of the container. Empty for a form root.
    fn full_accessor(&self) -> String;

    /// Whether child paths are prefixed with this container's path.
    fn is_compound(&self) -> bool {
        true
    }

    /// A child identified by `full_name` just recorded an error.
    fn add_error_field(&self, full_name: &str);
}

/// Join a parent path and a child segment.
pub(crate) fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_owned()
    } else {
        format!("{parent}.{child}")
    }
}

/// Minimal [`FieldParent`]: a form root or a compound field.
///
/// Records which children reported errors and forwards every report to its
/// own parent, so the root sees all failing fields.
#[derive(Debug)]
pub struct ParentNode {
    name: String,
    accessor: String,
    compound: bool,
    parent: Option<Weak<dyn FieldParent>>,
    error_fields: Mutex<Vec<String>>,
}

impl ParentNode {
    /// A form root. Children of a root keep their bare names.
    #[must_use]
    pub fn form(name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            accessor: String::new(),
            compound: false,
            parent: None,
            error_fields: Mutex::new(Vec::new()),
        })
    }

    /// A compound container named `name` under `parent`.
    #[must_use]
    pub fn compound(name: impl Into<String>, parent: Option<Weak<dyn FieldParent>>) -> Arc<Self> {
        let name = name.into();
        let accessor = name.rsplit('.').next().unwrap_or_default().to_owned();
        Arc::new(Self {
            name,
            accessor,
            compound: true,
            parent,
            error_fields: Mutex::new(Vec::new()),
        })
    }

    /// Weak handle suitable for [`Field::set_parent`](crate::field::Field::set_parent).
    #[must_use]
    pub fn handle(self: &Arc<Self>) -> Weak<dyn FieldParent> {
        let weak: Weak<Self> = Arc::downgrade(self);
        weak
    }

    /// The container's own (unqualified) name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full names of children that reported errors, in report order.
    #[must_use]
    pub fn error_fields(&self) -> Vec<String> {
        self.error_fields.lock().clone()
    }

    /// Whether any child reported an error.
    #[must_use]
    pub fn has_error_fields(&self) -> bool {
        !self.error_fields.lock().is_empty()
    }

    /// Forget all reported children.
    pub fn clear_error_fields(&self) {
        self.error_fields.lock().clear();
    }

    fn upstream(&self) -> Option<Arc<dyn FieldParent>> {
        self.parent.as_ref().and_then(Weak::upgrade)
    }
}

impl FieldParent for ParentNode {
    fn full_name(&self) -> String {
        if !self.compound {
            return String::new();
        }
        match self.upstream() {
            Some(parent) if parent.is_compound() => join_path(&parent.full_name(), &self.name),
            _ => self.name.clone(),
        }
    }

    fn full_accessor(&self) -> String {
        if !self.compound {
            return String::new();
        }
        match self.upstream() {
            Some(parent) if parent.is_compound() => {
                join_path(&parent.full_accessor(), &self.accessor)
            }
            _ => self.accessor.clone(),
        }
    }

    fn is_compound(&self) -> bool {
        self.compound
    }

    fn add_error_field(&self, full_name: &str) {
        {
            let mut fields = self.error_fields.lock();
            if !fields.iter().any(|f| f == full_name) {
                fields.push(full_name.to_owned());
            }
        }
        if let Some(parent) = self.upstream() {
            parent.add_error_field(full_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_root_has_empty_paths() {
        let form = ParentNode::form("signup");
        assert_eq!(form.full_name(), "");
        assert_eq!(form.full_accessor(), "");
        assert!(!form.is_compound());
        assert_eq!(form.name(), "signup");
    }

    #[test]
    fn compound_paths_walk_the_chain() {
        let form = ParentNode::form("f");
        let address = ParentNode::compound("address", Some(form.handle()));
        let geo = ParentNode::compound("geo", Some(address.handle()));

        assert_eq!(address.full_name(), "address");
        assert_eq!(geo.full_name(), "address.geo");
        assert_eq!(geo.full_accessor(), "address.geo");
    }

    #[test]
    fn dropped_parent_is_ignored() {
        let address = {
            let form = ParentNode::form("f");
            let outer = ParentNode::compound("outer", Some(form.handle()));
            ParentNode::compound("inner", Some(outer.handle()))
        };
        assert_eq!(address.full_name(), "inner");
        address.add_error_field("inner.x");
        assert_eq!(address.error_fields(), vec!["inner.x"]);
    }

    #[test]
    fn errors_bubble_to_root_once() {
        let form = ParentNode::form("f");
        let address = ParentNode::compound("address", Some(form.handle()));

        address.add_error_field("address.street");
        address.add_error_field("address.street");
        address.add_error_field("address.zip");

        assert_eq!(address.error_fields(), vec!["address.street", "address.zip"]);
        assert_eq!(form.error_fields(), vec!["address.street", "address.zip"]);

        form.clear_error_fields();
        assert!(!form.has_error_fields());
        assert!(address.has_error_fields());
    }
}
