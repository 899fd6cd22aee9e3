use crate::core::value::{FieldValue, Value};
use crate::records::issue::{Severity, ValidationIssue};
use serde::{Deserialize, Serialize};

/// An extracted spreadsheet row before any mapping is applied: the 1-based
/// data-row number (header excluded) and the ordered header/raw-value pairs.
/// This is the only untyped shape in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawRow {
    pub row_number: u32,
    pub cells: Vec<(String, String)>,
}

impl RawRow {
    pub fn new(row_number: u32, cells: Vec<(String, String)>) -> Self {
        RawRow { row_number, cells }
    }

    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(h, _)| h.eq_ignore_ascii_case(header))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }
}

/// The staged, typed candidate record derived from one raw row. Carries the
/// validation issues attached to it so a preview page and the commit engine
/// read the same picture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreviewRow {
    pub row_number: u32,
    pub fields: Vec<FieldValue>,
    pub issues: Vec<ValidationIssue>,
}

impl PreviewRow {
    pub fn new(row_number: u32, fields: Vec<FieldValue>) -> Self {
        PreviewRow {
            row_number,
            fields,
            issues: Vec::new(),
        }
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(field))
    }

    pub fn get_value(&self, field: &str) -> Value {
        self.get(field)
            .map(|f| f.value.clone())
            .unwrap_or(Value::Null)
    }

    /// Replaces the value for `field`, inserting it when absent.
    pub fn set_value(&mut self, field: &str, value: Value) {
        match self
            .fields
            .iter_mut()
            .find(|f| f.name.eq_ignore_ascii_case(field))
        {
            Some(existing) => existing.value = value,
            None => self.fields.push(FieldValue::new(field, value)),
        }
    }

    /// A row with at least one error-severity issue is blocked from commit.
    pub fn is_blocked(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Drops issues attached to `field`; used when an operator override
    /// replaces that field's value at commit time.
    pub fn clear_issues_for(&mut self, field: &str) {
        self.issues.retain(|i| !i.field.eq_ignore_ascii_case(field));
    }
}
