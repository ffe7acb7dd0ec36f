//! Populating a field from a submission and computing what to redisplay.

use serde_json::{Map, Value};
use tracing::trace;

use crate::field::Field;

impl Field {
    /// "Fill-in-form" value: what a renderer should show.
    ///
    /// Inactive fields show nothing. Otherwise the raw input wins, so the
    /// user sees what they typed even if it failed validation. Without
    /// input the value is shown, in its deflated form when the kind defines
    /// one. A field with neither shows an empty string.
    #[must_use]
    pub fn fif(&self) -> Option<Value> {
        if !self.is_active() {
            return None;
        }
        if let Some(input) = &self.input {
            return Some(input.clone());
        }
        if let Some(value) = &self.value {
            return Some(self.kind.deflate(value, self).unwrap_or_else(|| value.clone()));
        }
        Some(Value::String(String::new()))
    }

    /// Record what the submission carried for this field.
    ///
    /// `Some` means the parameter was present (possibly as `null`) and is
    /// taken as input even on a disabled field. `None` means it was absent:
    /// an enabled field then falls back to `input_without_param` (the way an
    /// unchecked checkbox submits nothing), otherwise input stays as it is.
    pub fn fill_from_input(&mut self, submitted: Option<Value>) {
        match submitted {
            Some(input) => self.input = Some(input),
            None if !self.is_disabled() => {
                if let Some(fallback) = self.input_without_param.clone() {
                    trace!(field = %self.name(), "no param, using input_without_param");
                    self.input = Some(fallback);
                }
            }
            None => {}
        }
    }

    /// Look this field's full name up in a flat parameter map.
    ///
    /// A field with nested children also accepts its children spelled out
    /// as dotted keys: without an `address` entry, `address.street` and
    /// `address.geo.lat` are gathered into the object
    /// `{"street": .., "geo": {"lat": ..}}`.
    pub fn fill_from_params(&mut self, params: &Map<String, Value>) {
        let key = self.full_name();
        let submitted = params.get(&key).cloned().or_else(|| {
            if self.has_fields() {
                gather_prefixed(params, &key)
            } else {
                None
            }
        });
        self.fill_from_input(submitted);
    }

    /// Seed the value from the configured default.
    pub fn fill_from_default(&mut self) {
        if let Some(default) = self.default.clone() {
            self.value = Some(default);
        }
    }
}

/// Fold `prefix.`-keyed params into one object, splitting the rest on dots.
fn gather_prefixed(params: &Map<String, Value>, prefix: &str) -> Option<Value> {
    let mut root = Map::new();
    for (key, value) in params {
        let Some(path) = key.strip_prefix(prefix).and_then(|rest| rest.strip_prefix('.')) else {
            continue;
        };
        insert_path(&mut root, path, value.clone());
    }
    (!root.is_empty()).then_some(Value::Object(root))
}

fn insert_path(map: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            map.insert(path.to_owned(), value);
        }
        Some((head, tail)) => {
            let entry = map
                .entry(head.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            if let Value::Object(inner) = entry {
                insert_path(inner, tail, value);
            }
        }
    }
}
