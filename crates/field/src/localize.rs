//! Message localization.
//!
//! Fields never format error text themselves: every message goes through a
//! [`Localize`] implementation. [`Maketext`] is the default one. It looks the
//! template up in an optional translation catalog and then expands bracket
//! placeholders:
//!
//! | markup  | expands to                     |
//! |---------|--------------------------------|
//! | `[_1]`  | first argument                 |
//! | `[_N]`  | N-th argument (empty if absent) |
//! | `~[`    | literal `[`                    |
//! | `~]`    | literal `]`                    |
//! | `~~`    | literal `~`                    |

use std::collections::HashMap;

use serde_json::Value;

use crate::error::LocalizationError;
use crate::message::{Message, render_arg};

/// Turns a message template and its arguments into display text.
pub trait Localize: Send + Sync {
    /// Resolve `message` to its final text.
    fn localize(&self, message: &Message) -> Result<String, LocalizationError>;
}

/// Bracket-notation localizer with an optional translation catalog.
#[derive(Debug, Clone, Default)]
pub struct Maketext {
    catalog: HashMap<String, String>,
}

impl Maketext {
    /// A localizer without translations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a translation for a template (builder-style, consuming).
    #[must_use]
    pub fn with_translation(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.catalog.insert(from.into(), to.into());
        self
    }

    /// The template to expand for `text`.
    fn lookup<'a>(&'a self, text: &'a str) -> &'a str {
        self.catalog.get(text).map_or(text, String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Maketext {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            catalog: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Localize for Maketext {
    fn localize(&self, message: &Message) -> Result<String, LocalizationError> {
        interpolate(self.lookup(message.text()), message.args())
    }
}

/// Expand bracket markup in `template` with `args`.
pub fn interpolate(template: &str, args: &[Value]) -> Result<String, LocalizationError> {
    let malformed = |position: usize, reason: &str| LocalizationError::Malformed {
        message: template.to_owned(),
        position,
        reason: reason.to_owned(),
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            '~' => match chars.peek() {
                Some(&(_, next @ ('[' | ']' | '~'))) => {
                    out.push(next);
                    chars.next();
                }
                _ => out.push('~'),
            },
            '[' => {
                let start = pos + 1;
                let mut end = None;
                for (i, inner) in chars.by_ref() {
                    match inner {
                        ']' => {
                            end = Some(i);
                            break;
                        }
                        '[' => return Err(malformed(i, "nested bracket")),
                        _ => {}
                    }
                }
                let end = end.ok_or_else(|| malformed(pos, "unterminated bracket"))?;
                let directive = template[start..end].trim();
                let index = directive
                    .strip_prefix('_')
                    .and_then(|n| n.parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        malformed(pos, &format!("unsupported bracket directive `{directive}`"))
                    })?;
                if let Some(arg) = args.get(index - 1) {
                    out.push_str(&render_arg(arg));
                }
            }
            ']' => return Err(malformed(pos, "unmatched closing bracket")),
            other => out.push(other),
        }
    }

    Ok(out)
}

/// Escape `text` so that [`interpolate`] reproduces it verbatim.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '[' | ']' | '~') {
            out.push('~');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case("plain text", vec![], "plain text")]
    #[case("[_1] field is required", vec![json!("Age")], "Age field is required")]
    #[case("[_2] before [_1]", vec![json!("a"), json!("b")], "b before a")]
    #[case("[ _1 ] spaced", vec![json!("x")], "x spaced")]
    #[case("value [_1]", vec![json!(-5)], "value -5")]
    #[case("missing [_3]", vec![json!("a")], "missing ")]
    #[case("~[literal~] ~~ ~x", vec![], "[literal] ~ ~x")]
    fn expands(#[case] template: &str, #[case] args: Vec<Value>, #[case] expected: &str) {
        assert_eq!(interpolate(template, &args).unwrap(), expected);
    }

    #[rstest]
    #[case("[_1", "unterminated bracket")]
    #[case("oops ]", "unmatched closing bracket")]
    #[case("[quant,_1,item]", "unsupported bracket directive")]
    #[case("[_0]", "unsupported bracket directive")]
    #[case("[[_1]]", "nested bracket")]
    fn rejects_malformed(#[case] template: &str, #[case] reason: &str) {
        let err = interpolate(template, &[json!("a")]).unwrap_err();
        let LocalizationError::Malformed {
            message,
            reason: got,
            ..
        } = err;
        assert_eq!(message, template);
        assert!(got.contains(reason), "{got} should mention {reason}");
    }

    #[test]
    fn catalog_applies_before_interpolation() {
        let lh = Maketext::new().with_translation("[_1] field is required", "[_1] ist Pflicht");
        let msg = Message::new("[_1] field is required").arg("Alter");
        assert_eq!(lh.localize(&msg).unwrap(), "Alter ist Pflicht");

        let untranslated = Message::new("Wrong value");
        assert_eq!(lh.localize(&untranslated).unwrap(), "Wrong value");
    }

    #[test]
    fn escaped_text_round_trips() {
        let raw = "index [3] out of range ~ok";
        assert_eq!(interpolate(&escape(raw), &[]).unwrap(), raw);
    }

    #[test]
    fn catalog_from_iterator() {
        let lh: Maketext = [("a", "b")].into_iter().collect();
        assert_eq!(lh.localize(&Message::new("a")).unwrap(), "b");
    }
}
