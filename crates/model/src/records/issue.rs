use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational; the row stays committable.
    Warning,
    /// Blocks commit unless the operator excludes or edits the row.
    Error,
}

/// Stable issue codes. String constants rather than an enum so stores and
/// exports stay readable and new rules don't break old persisted batches.
pub const CODE_REQUIRED_MISSING: &str = "REQUIRED_MISSING";
pub const CODE_TOO_SHORT: &str = "TOO_SHORT";
pub const CODE_EMAIL_INVALID: &str = "EMAIL_INVALID";
pub const CODE_PHONE_TOO_SHORT: &str = "PHONE_TOO_SHORT";
pub const CODE_DATE_UNPARSABLE: &str = "DATE_UNPARSABLE";
pub const CODE_VALUE_UNPARSABLE: &str = "VALUE_UNPARSABLE";
pub const CODE_COORD_OUT_OF_RANGE: &str = "COORD_OUT_OF_RANGE";
pub const CODE_POSTAL_CODE_SHAPE: &str = "POSTAL_CODE_SHAPE";

/// One finding on one field of one staged row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationIssue {
    pub field: String,
    pub severity: Severity,
    pub code: String,
    pub message: String,
    pub raw_value: String,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    pub fn new(
        field: &str,
        severity: Severity,
        code: &str,
        message: impl Into<String>,
        raw_value: &str,
    ) -> Self {
        ValidationIssue {
            field: field.to_string(),
            severity,
            code: code.to_string(),
            message: message.into(),
            raw_value: raw_value.to_string(),
            suggestion: None,
        }
    }

    pub fn error(field: &str, code: &str, message: impl Into<String>, raw_value: &str) -> Self {
        Self::new(field, Severity::Error, code, message, raw_value)
    }

    pub fn warning(field: &str, code: &str, message: impl Into<String>, raw_value: &str) -> Self {
        Self::new(field, Severity::Warning, code, message, raw_value)
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}
