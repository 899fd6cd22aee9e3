use lazy_static::lazy_static;
use model::core::data_type::{CoerceError, DataType, phone_digit_count};
use model::core::value::Value;
use model::mapping::dictionary::FieldSpec;
use model::records::issue::{
    CODE_COORD_OUT_OF_RANGE, CODE_DATE_UNPARSABLE, CODE_EMAIL_INVALID, CODE_PHONE_TOO_SHORT,
    CODE_POSTAL_CODE_SHAPE, CODE_REQUIRED_MISSING, CODE_TOO_SHORT, CODE_VALUE_UNPARSABLE,
    ValidationIssue,
};
use regex::Regex;

const MIN_PHONE_DIGITS: usize = 7;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]{2,}$").unwrap();
}

/// Field-level business rules. The same checks run during batch validation
/// and against operator overrides at commit time, so both paths agree on
/// what blocks a row.
pub fn check_field(spec: &FieldSpec, value: &Value) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let raw = value.as_string().unwrap_or_default();

    if value.is_empty() {
        if spec.required {
            issues.push(ValidationIssue::error(
                spec.name,
                CODE_REQUIRED_MISSING,
                format!("'{}' is required", spec.name),
                "",
            ));
        }
        return issues;
    }

    if spec.min_len > 0
        && let Value::String(s) = value
        && s.trim().len() < spec.min_len
    {
        issues.push(ValidationIssue::error(
            spec.name,
            CODE_TOO_SHORT,
            format!("'{}' must be at least {} characters", spec.name, spec.min_len),
            &raw,
        ));
    }

    match spec.name {
        "email" => {
            if !EMAIL_RE.is_match(raw.trim()) {
                issues.push(ValidationIssue::error(
                    spec.name,
                    CODE_EMAIL_INVALID,
                    "Not a valid e-mail address",
                    &raw,
                ));
            }
        }
        "latitude" => {
            if let Some(lat) = value.as_f64()
                && !(-90.0..=90.0).contains(&lat)
            {
                issues.push(ValidationIssue::error(
                    spec.name,
                    CODE_COORD_OUT_OF_RANGE,
                    "Latitude must be between -90 and 90",
                    &raw,
                ));
            }
        }
        "longitude" => {
            if let Some(lon) = value.as_f64()
                && !(-180.0..=180.0).contains(&lon)
            {
                issues.push(ValidationIssue::error(
                    spec.name,
                    CODE_COORD_OUT_OF_RANGE,
                    "Longitude must be between -180 and 180",
                    &raw,
                ));
            }
        }
        "postal_code" => {
            let odd = raw
                .chars()
                .any(|c| !(c.is_ascii_alphanumeric() || c == ' ' || c == '-'));
            if odd {
                issues.push(ValidationIssue::warning(
                    spec.name,
                    CODE_POSTAL_CODE_SHAPE,
                    "Postal code contains unexpected characters",
                    &raw,
                ));
            }
        }
        _ => {}
    }

    if spec.data_type == DataType::Phone && phone_digit_count(&raw) < MIN_PHONE_DIGITS {
        issues.push(ValidationIssue::warning(
            spec.name,
            CODE_PHONE_TOO_SHORT,
            format!("Phone number has fewer than {MIN_PHONE_DIGITS} digits"),
            &raw,
        ));
    }

    issues
}

/// Turns an apply-time coercion failure into the issue attached to the
/// staged row. Always error severity: the value was never staged.
pub fn coercion_issue(field: &str, err: &CoerceError, raw: &str) -> ValidationIssue {
    match err {
        CoerceError::UnparsableDate { .. } => {
            ValidationIssue::error(field, CODE_DATE_UNPARSABLE, err.to_string(), raw)
                .with_suggestion("Use an ISO date like 2024-03-07")
        }
        _ => ValidationIssue::error(field, CODE_VALUE_UNPARSABLE, err.to_string(), raw),
    }
}

/// Coercion issues are minted at apply time and must survive re-validation:
/// the offending raw value is gone from the typed row.
pub fn is_coercion_issue(issue: &ValidationIssue) -> bool {
    issue.code == CODE_DATE_UNPARSABLE || issue.code == CODE_VALUE_UNPARSABLE
}
