use serde_json::Value;

use super::Field;
use crate::error::FieldError;

/// Per-kind behavior layered on top of the generic pipeline.
///
/// `validate` runs after all actions and may add errors through
/// [`Field::add_error`]. `deflate` turns a canonical value back into its
/// display form for [`Field::fif`].
pub trait FieldKind: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Extra validation after the action pipeline.
    fn validate(&self, field: &mut Field) -> Result<(), FieldError> {
        let _ = field;
        Ok(())
    }

    /// Display form of `value`, or `None` to show it unchanged.
    fn deflate(&self, value: &Value, field: &Field) -> Option<Value> {
        let _ = (value, field);
        None
    }
}

/// Field kind with no extra behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl FieldKind for Plain {
    fn name(&self) -> &str {
        "plain"
    }
}
