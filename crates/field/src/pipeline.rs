//! The ordered action pipeline of a field.
//!
//! Actions run in declaration order, class-level (`base_apply`) first. Each
//! action reads the value left by the previous one. A failing action
//! contributes at most one error and never stops the pipeline.
//!
//! User callbacks (guards, checks, transforms, constraints and message
//! overrides) run under [`catch_unwind`]; a panic is logged and turned into
//! an ordinary field error so one bad callback cannot take the whole form
//! down. A panicking guard skips its action and reports the panic.
//!
//! Trapping does not silence the process panic hook: the default hook still
//! prints its banner to stderr before the unwind is caught. Callers that
//! want quiet output install their own hook with [`std::panic::set_hook`].

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde_json::Value;
use tracing::{trace, warn};

use crate::action::{Action, ActionKind};
use crate::condition::FieldContext;
use crate::constraint::{TypeConstraint, TypeRef};
use crate::error::FieldError;
use crate::field::Field;
use crate::localize::escape;
use crate::message::{Message, MessageKey, MessageOverride};

/// Panic text of a trapped callback, if it carried one.
type Diagnostic = Option<String>;

impl Field {
    /// Run `base_apply` then `apply` against the current value.
    ///
    /// Errors produced by actions land in [`errors`](Field::errors); the
    /// returned `Err` is reserved for broken definitions (an unknown type
    /// name, unlocalizable message markup).
    pub fn apply_actions(&mut self, context: &FieldContext) -> Result<(), FieldError> {
        let actions: Vec<Action> = self
            .base_actions()
            .iter()
            .chain(self.actions())
            .cloned()
            .collect();

        for (index, action) in actions.iter().enumerate() {
            let current = self.value.clone().unwrap_or(Value::Null);
            let guard = guarded(self.name(), "when", || action.is_enabled(&current, context));
            let enabled = match guard {
                Ok(enabled) => enabled,
                Err(diagnostic) => {
                    let message = self.failure_message(diagnostic);
                    self.add_error(message)?;
                    continue;
                }
            };
            if !enabled {
                trace!(
                    field = %self.name(),
                    index,
                    action = action.kind().label(),
                    "action skipped by guard"
                );
                continue;
            }

            let Some(raw) = self.run_action(action, current)? else {
                continue;
            };

            let value = self.value.clone().unwrap_or(Value::Null);
            let message = match action.message_override() {
                Some(replacement) => self.resolve_override(replacement, &value, raw),
                None => raw,
            };
            trace!(
                field = %self.name(),
                index,
                action = action.kind().label(),
                "action failed"
            );
            self.add_error(message)?;
        }
        Ok(())
    }

    /// Execute one action; `Some` is the candidate error.
    fn run_action(
        &mut self,
        action: &Action,
        current: Value,
    ) -> Result<Option<Message>, FieldError> {
        let candidate = match action.kind() {
            ActionKind::Type(type_ref) => {
                let constraint = self.resolve_type(type_ref)?;
                self.apply_type(constraint.as_ref(), current)
            }
            ActionKind::Check(check) => {
                let field = &*self;
                match guarded(field.name(), "check", || check(&current, field)) {
                    Ok(true) => None,
                    Ok(false) => Some(self.builtin_message(MessageKey::WrongValue, [])),
                    Err(diagnostic) => Some(self.failure_message(diagnostic)),
                }
            }
            ActionKind::Pattern(regex) => {
                let matched = scalar_text(&current).is_some_and(|text| regex.is_match(&text));
                (!matched).then(|| self.builtin_message(MessageKey::NoMatch, [current]))
            }
            ActionKind::AllowList(allowed) => (!allowed.contains(&current))
                .then(|| self.builtin_message(MessageKey::NotAllowed, [current])),
            ActionKind::Transform(transform) => {
                let field = &*self;
                match guarded(field.name(), "transform", || transform(&current, field)) {
                    Ok(Ok(value)) => {
                        self.value = Some(value);
                        None
                    }
                    Ok(Err(message)) if message.is_empty() => {
                        Some(self.builtin_message(MessageKey::ErrorOccurred, []))
                    }
                    Ok(Err(message)) => Some(message),
                    Err(diagnostic) => Some(self.failure_message(diagnostic)),
                }
            }
        };
        Ok(candidate)
    }

    fn resolve_type(&self, type_ref: &TypeRef) -> Result<Arc<dyn TypeConstraint>, FieldError> {
        match type_ref {
            TypeRef::Inline(constraint) => Ok(Arc::clone(constraint)),
            TypeRef::Named(name) => {
                self.types
                    .find(name)
                    .ok_or_else(|| FieldError::UnknownType {
                        field: self.full_name(),
                        type_name: name.clone(),
                    })
            }
        }
    }

    /// Coerce (when supported and needed), then validate.
    ///
    /// A successfully coerced value is stored even if it then fails
    /// validation.
    fn apply_type(&mut self, constraint: &dyn TypeConstraint, current: Value) -> Option<Message> {
        let name = self.name().to_owned();
        let mut value = current;
        let mut error = None;
        let mut diagnostic = None;

        if constraint.has_coercion() {
            match guarded(&name, constraint.name(), || constraint.validate(&value)) {
                Ok(Ok(())) => {}
                Ok(Err(_)) => match guarded(&name, constraint.name(), || constraint.coerce(&value)) {
                    Ok(Ok(coerced)) => {
                        trace!(field = %name, from = %value, to = %coerced, "coerced value");
                        self.value = Some(coerced.clone());
                        value = coerced;
                    }
                    Ok(Err(raw)) => error = Some(constraint.message(&value).unwrap_or(raw)),
                    Err(panic) => diagnostic = Some(panic),
                },
                Err(panic) => diagnostic = Some(panic),
            }
        }

        if error.is_none() && diagnostic.is_none() {
            match guarded(&name, constraint.name(), || constraint.validate(&value)) {
                Ok(Ok(())) => {}
                Ok(Err(raw)) => error = Some(raw),
                Err(panic) => diagnostic = Some(panic),
            }
        }

        error.or_else(|| diagnostic.map(|d| self.failure_message(d)))
    }

    /// Apply a message override. If it panics, its text wins; a panic
    /// without text keeps the action's own message.
    fn resolve_override(
        &self,
        replacement: &MessageOverride,
        value: &Value,
        raw: Message,
    ) -> Message {
        let fallback = raw.clone();
        match guarded(self.name(), "message", || replacement.resolve(value, self, raw)) {
            Ok(message) => message,
            Err(Some(text)) if !text.trim().is_empty() => self.failure_message(Some(text)),
            Err(_) => fallback,
        }
    }

    /// Error for a trapped panic: its text if any, else `ErrorOccurred`.
    fn failure_message(&self, diagnostic: Diagnostic) -> Message {
        match diagnostic {
            Some(text) if !text.trim().is_empty() => Message::new(escape(&text)),
            _ => self.builtin_message(MessageKey::ErrorOccurred, []),
        }
    }
}

/// Run `f`, turning a panic into its payload text.
fn guarded<T>(field: &str, what: &str, f: impl FnOnce() -> T) -> Result<T, Diagnostic> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let text = panic_text(payload.as_ref());
        warn!(field, action = what, panic = ?text, "callback panicked");
        text
    })
}

fn panic_text(payload: &(dyn Any + Send)) -> Diagnostic {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
}

/// Text a pattern is matched against. Containers never match.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
