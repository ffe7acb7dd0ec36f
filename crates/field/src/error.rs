/// Failure while turning a message template into display text.
///
/// Malformed bracket markup is a defect in the field definition, not a
/// validation outcome, so it is surfaced to the caller rather than appended
/// to the field's error list.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocalizationError {
    /// The template contains markup the localizer cannot interpret.
    #[error("malformed message `{message}` at byte {position}: {reason}")]
    Malformed {
        message: String,
        position: usize,
        reason: String,
    },
}

/// Error type for field operations that indicate a defective definition.
///
/// Bad user input never produces one of these; it ends up in the field's
/// `errors` list instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    /// A type action names a constraint the registry does not know.
    #[error("unknown type `{type_name}` in actions of field `{field}`")]
    UnknownType { field: String, type_name: String },

    /// A pattern action carries a regex that does not compile.
    #[error("invalid pattern `{pattern}` for field `{field}`: {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },

    /// An error message could not be localized.
    #[error("error localizing message for field '{label}': {source}")]
    Localization {
        label: String,
        #[source]
        source: LocalizationError,
    },
}

impl FieldError {
    /// Broad error category for grouping in logs.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Self::UnknownType { .. } | Self::InvalidPattern { .. } => "configuration",
            Self::Localization { .. } => "localization",
        }
    }

    /// Machine-readable error code for programmatic handling.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::UnknownType { .. } => "FIELD_UNKNOWN_TYPE",
            Self::InvalidPattern { .. } => "FIELD_INVALID_PATTERN",
            Self::Localization { .. } => "FIELD_LOCALIZATION",
        }
    }

    /// Whether the operation might succeed if retried with the same input.
    ///
    /// Every variant describes a broken definition, so this is always `false`.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn malformed() -> LocalizationError {
        LocalizationError::Malformed {
            message: "[_1".into(),
            position: 0,
            reason: "unterminated bracket".into(),
        }
    }

    #[test]
    fn display_messages() {
        let err = FieldError::UnknownType {
            field: "age".into(),
            type_name: "Positive".into(),
        };
        assert_eq!(
            err.to_string(),
            "unknown type `Positive` in actions of field `age`"
        );

        let err = FieldError::InvalidPattern {
            field: "zip".into(),
            pattern: "(".into(),
            reason: "unclosed group".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid pattern `(` for field `zip`: unclosed group"
        );

        let err = FieldError::Localization {
            label: "Age".into(),
            source: malformed(),
        };
        assert_eq!(
            err.to_string(),
            "error localizing message for field 'Age': malformed message `[_1` at byte 0: unterminated bracket"
        );
    }

    #[test]
    fn localization_error_exposes_source() {
        use std::error::Error as _;

        let err = FieldError::Localization {
            label: "Age".into(),
            source: malformed(),
        };
        let source = err.source().expect("source should be set");
        assert!(source.to_string().contains("unterminated bracket"));
    }

    #[test]
    fn categories_and_codes() {
        let cases = vec![
            (
                FieldError::UnknownType {
                    field: String::new(),
                    type_name: String::new(),
                },
                "configuration",
                "FIELD_UNKNOWN_TYPE",
            ),
            (
                FieldError::InvalidPattern {
                    field: String::new(),
                    pattern: String::new(),
                    reason: String::new(),
                },
                "configuration",
                "FIELD_INVALID_PATTERN",
            ),
            (
                FieldError::Localization {
                    label: String::new(),
                    source: malformed(),
                },
                "localization",
                "FIELD_LOCALIZATION",
            ),
        ];

        for (err, category, code) in &cases {
            assert_eq!(err.category(), *category, "for {err:?}");
            assert_eq!(err.code(), *code, "for {err:?}");
            assert!(!err.is_retryable());
        }
    }
}
