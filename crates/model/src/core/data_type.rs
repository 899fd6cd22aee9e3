use crate::core::value::Value;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Date formats accepted during coercion, tried in order. An explicit
/// per-field format hint always takes precedence over this list.
pub const ACCEPTED_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%Y-%m-%dT%H:%M:%S",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Text,
    Int,
    Float,
    Boolean,
    Date,
    Timestamp,
    /// Free-form phone number, normalized to digits (plus optional leading `+`).
    Phone,
    /// Postal code kept as text so leading zeros survive.
    PostalCode,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoerceError {
    #[error("'{raw}' does not match any accepted date format")]
    UnparsableDate { raw: String },

    #[error("'{raw}' is not a number")]
    NotANumber { raw: String },

    #[error("'{raw}' is not a boolean")]
    NotABoolean { raw: String },
}

impl DataType {
    /// Coerces a raw cell into a typed value. Empty input always becomes
    /// `Null`; unparsable input is an error, never a guessed default.
    pub fn coerce(&self, raw: &str, date_format: Option<&str>) -> Result<Value, CoerceError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Value::Null);
        }

        match self {
            DataType::Text => Ok(Value::String(trimmed.to_string())),
            DataType::PostalCode => Ok(Value::String(trimmed.to_string())),
            DataType::Phone => Ok(Value::String(normalize_phone(trimmed))),
            DataType::Int => parse_number(trimmed)
                .filter(|n| n.fract() == 0.0)
                .map(|n| Value::Int(n as i64))
                .ok_or_else(|| CoerceError::NotANumber {
                    raw: trimmed.to_string(),
                }),
            DataType::Float => {
                parse_number(trimmed)
                    .map(Value::Float)
                    .ok_or_else(|| CoerceError::NotANumber {
                        raw: trimmed.to_string(),
                    })
            }
            DataType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => Ok(Value::Boolean(true)),
                "false" | "no" | "0" => Ok(Value::Boolean(false)),
                _ => Err(CoerceError::NotABoolean {
                    raw: trimmed.to_string(),
                }),
            },
            DataType::Date | DataType::Timestamp => parse_date(trimmed, date_format)
                .map(Value::Date)
                .ok_or_else(|| CoerceError::UnparsableDate {
                    raw: trimmed.to_string(),
                }),
        }
    }

    /// True when a raw sample value would coerce cleanly into this type.
    /// Used by the mapping suggester for type-signature boosts.
    pub fn matches_sample(&self, raw: &str) -> bool {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return false;
        }
        match self {
            // Any text matches text; only a digit run reads as a postal code.
            DataType::Text => true,
            DataType::PostalCode => {
                trimmed.len() >= 4 && trimmed.chars().all(|c| c.is_ascii_digit())
            }
            DataType::Phone => normalize_phone(trimmed).chars().filter(|c| c.is_ascii_digit()).count() >= 7,
            _ => self.coerce(trimmed, None).is_ok(),
        }
    }
}

/// Strips separators, keeping digits and one leading `+`.
pub fn normalize_phone(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for (i, c) in raw.chars().enumerate() {
        if c.is_ascii_digit() || (c == '+' && i == 0) {
            out.push(c);
        }
    }
    out
}

pub fn phone_digit_count(normalized: &str) -> usize {
    normalized.chars().filter(|c| c.is_ascii_digit()).count()
}

fn parse_date(raw: &str, date_format: Option<&str>) -> Option<NaiveDate> {
    if let Some(fmt) = date_format {
        return NaiveDate::parse_from_str(raw, fmt).ok();
    }
    ACCEPTED_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Locale-tolerant number parsing: accepts `.` or `,` as the decimal
/// separator and drops thousands separators and inner spaces.
fn parse_number(raw: &str) -> Option<f64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let normalized = match (compact.rfind('.'), compact.rfind(',')) {
        // Both present: the rightmost one is the decimal separator.
        (Some(dot), Some(comma)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        // Lone comma: decimal when followed by 1-2 digits, thousands otherwise.
        (None, Some(comma)) => {
            let frac_len = compact.len() - comma - 1;
            if (1..=2).contains(&frac_len) && compact.matches(',').count() == 1 {
                compact.replace(',', ".")
            } else {
                compact.replace(',', "")
            }
        }
        _ => compact,
    };

    normalized.parse::<f64>().ok()
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Text => "text",
            DataType::Int => "int",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Timestamp => "timestamp",
            DataType::Phone => "phone",
            DataType::PostalCode => "postal_code",
        };
        write!(f, "{name}")
    }
}
