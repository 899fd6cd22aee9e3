use crate::rules::{check_field, is_coercion_issue};
use model::mapping::dictionary::FIELD_DICTIONARY;
use model::records::issue::Severity;
use model::records::row::PreviewRow;
use serde::Serialize;
use tracing::debug;

/// Batch-level validation aggregates. A row counts once: error beats
/// warning beats valid.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct ValidationSummary {
    pub valid_count: u64,
    pub warning_count: u64,
    pub error_count: u64,
}

/// Re-runs the live creation rule set over every staged row, replacing any
/// previous rule findings. Apply-time coercion issues are carried forward
/// untouched. Idempotent: safe after operator edits or re-mapping.
pub fn validate(rows: &mut [PreviewRow]) -> ValidationSummary {
    let mut summary = ValidationSummary::default();

    for row in rows.iter_mut() {
        row.issues.retain(is_coercion_issue);

        for spec in FIELD_DICTIONARY.iter() {
            // Required fields are checked whether mapped or not; optional
            // fields only when the row actually carries them.
            if !spec.required && row.get(spec.name).is_none() {
                continue;
            }
            let value = row.get_value(spec.name);
            row.issues.extend(check_field(spec, &value));
        }

        if row.issues.iter().any(|i| i.severity == Severity::Error) {
            summary.error_count += 1;
        } else if !row.issues.is_empty() {
            summary.warning_count += 1;
        } else {
            summary.valid_count += 1;
        }
    }

    debug!(
        valid = summary.valid_count,
        warnings = summary.warning_count,
        errors = summary.error_count,
        "Validated staged rows"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply_mapping;
    use model::mapping::config::{MappingConfig, MappingEntry};
    use model::records::issue::{CODE_DATE_UNPARSABLE, CODE_REQUIRED_MISSING};
    use model::records::row::RawRow;

    fn staged(rows: &[&[(&str, &str)]]) -> Vec<PreviewRow> {
        let config = MappingConfig::new(vec![
            MappingEntry::new("Name", "last_name"),
            MappingEntry::new("Email", "email"),
            MappingEntry::new("Geboren", "birth_date"),
        ]);
        let raws: Vec<RawRow> = rows
            .iter()
            .enumerate()
            .map(|(i, cells)| {
                RawRow::new(
                    (i + 1) as u32,
                    cells.iter().map(|(h, v)| (h.to_string(), v.to_string())).collect(),
                )
            })
            .collect();
        apply_mapping(&config, &raws)
    }

    #[test]
    fn missing_required_name_is_an_error() {
        let mut rows = staged(&[
            &[("Name", ""), ("Email", "a@b.de")],
            &[("Name", "Meier"), ("Email", "m@example.com")],
            &[("Name", "Schulz"), ("Email", "s@example.com")],
        ]);
        let summary = validate(&mut rows);

        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.valid_count, 2);
        assert_eq!(rows[0].issues[0].code, CODE_REQUIRED_MISSING);
        assert!(rows[0].is_blocked());
    }

    #[test]
    fn coercion_issues_survive_revalidation() {
        let mut rows = staged(&[&[("Name", "Meier"), ("Geboren", "whenever")]]);
        let first = validate(&mut rows);
        let second = validate(&mut rows);

        assert_eq!(first, second);
        assert_eq!(first.error_count, 1);
        assert!(rows[0].issues.iter().any(|i| i.code == CODE_DATE_UNPARSABLE));
        // Re-running does not duplicate the carried-forward issue.
        assert_eq!(
            rows[0]
                .issues
                .iter()
                .filter(|i| i.code == CODE_DATE_UNPARSABLE)
                .count(),
            1
        );
    }

    #[test]
    fn warning_only_rows_stay_committable() {
        let config = MappingConfig::new(vec![
            MappingEntry::new("Name", "last_name"),
            MappingEntry::new("Tel", "phone"),
        ]);
        let raws = vec![RawRow::new(
            1,
            vec![("Name".into(), "Meier".into()), ("Tel".into(), "123".into())],
        )];
        let mut rows = apply_mapping(&config, &raws);
        let summary = validate(&mut rows);

        assert_eq!(summary.warning_count, 1);
        assert_eq!(summary.error_count, 0);
        assert!(!rows[0].is_blocked());
    }

    #[test]
    fn unmapped_optional_fields_are_not_checked() {
        let config = MappingConfig::new(vec![MappingEntry::new("Name", "last_name")]);
        let raws = vec![RawRow::new(1, vec![("Name".into(), "Meier".into())])];
        let mut rows = apply_mapping(&config, &raws);
        let summary = validate(&mut rows);
        assert_eq!(summary.valid_count, 1);
    }
}
