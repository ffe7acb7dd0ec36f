//! Validation and value-transformation pipeline for a single form field.
//!
//! A [`Field`](field::Field) is filled from a submission, validated through an
//! ordered list of [`Action`](action::Action)s and reports localized error
//! messages. See [`field`] for the order of a validation pass.

pub mod action;
pub mod condition;
pub mod constraint;
pub mod def;
pub mod error;
pub mod field;
pub mod fill;
pub mod localize;
pub mod message;
pub mod nested;
pub mod parent;
pub mod pipeline;
pub mod presence;

pub mod prelude {
    pub use crate::action::{Action, ActionKind};
    pub use crate::condition::{Condition, FieldContext, ValueTest};
    pub use crate::constraint::{TypeConstraint, TypeLibrary, TypeRef, TypeRegistry};
    pub use crate::def::{ActionDef, BuildOptions, FieldDef};
    pub use crate::error::{FieldError, LocalizationError};
    pub use crate::field::{Field, FieldKind, Plain};
    pub use crate::localize::{Localize, Maketext};
    pub use crate::message::{Message, MessageKey, MessageOverride};
    pub use crate::nested::{Compound, NestedFields, NestedOutcome};
    pub use crate::parent::{FieldParent, ParentNode};
    pub use crate::presence::{is_present, is_present_opt};
}
