use serde_json::Value;
use tracing::trace;

use super::Field;
use crate::error::FieldError;
use crate::message::{Message, MessageKey};

impl Field {
    /// Localize `message` and append it to this pass's errors.
    ///
    /// The parent container, if any, is told that this field failed.
    /// Fails only when the localizer rejects the message markup.
    pub fn add_error(&mut self, message: impl Into<Message>) -> Result<(), FieldError> {
        let message = message.into();
        let text = self
            .localizer
            .localize(&message)
            .map_err(|source| FieldError::Localization {
                label: self.label().to_owned(),
                source,
            })?;

        trace!(field = %self.name(), error = %text, "field error");
        self.errors.push(text);

        if let Some(parent) = self.parent() {
            parent.add_error_field(&self.full_name());
        }
        Ok(())
    }

    /// Add the built-in message `key` (or this field's override of it).
    pub fn add_error_key<I>(&mut self, key: MessageKey, args: I) -> Result<(), FieldError>
    where
        I: IntoIterator<Item = Value>,
    {
        let message = self.builtin_message(key, args);
        self.add_error(message)
    }

    /// Unlocalized built-in message for `key`.
    pub(crate) fn builtin_message<I>(&self, key: MessageKey, args: I) -> Message
    where
        I: IntoIterator<Item = Value>,
    {
        args.into_iter()
            .fold(Message::new(self.message_text(key)), |message, arg| {
                message.arg(arg)
            })
    }

    /// Localized errors of the current pass, in insertion order.
    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn num_errors(&self) -> usize {
        self.errors.len()
    }

    /// Drop all errors, keeping input and value.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Reset the field to its pre-submission state: input, value and errors
    /// are cleared. Flags and actions are kept.
    pub fn clear_data(&mut self) {
        self.input = None;
        self.value = None;
        self.errors.clear();
        self.nested_errors = false;
        if let Some(nested) = self.nested_mut() {
            nested.clear_data();
        }
    }
}
