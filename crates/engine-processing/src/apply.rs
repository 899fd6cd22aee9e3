use crate::rules::coercion_issue;
use model::core::value::{FieldValue, Value};
use model::mapping::config::MappingConfig;
use model::mapping::dictionary;
use model::records::row::{PreviewRow, RawRow};
use tracing::debug;

/// Produces the staged, typed candidate rows for a confirmed mapping. This
/// is the only place untyped data is parsed; unparsable values are staged as
/// `Null` with a blocking issue attached instead of being guessed.
pub fn apply_mapping(config: &MappingConfig, raw_rows: &[RawRow]) -> Vec<PreviewRow> {
    let mut rows = Vec::with_capacity(raw_rows.len());

    for raw in raw_rows {
        let mut fields = Vec::with_capacity(config.entries.len());
        let mut issues = Vec::new();

        for entry in &config.entries {
            // Unknown targets are rejected before apply; skip defensively.
            let Some(spec) = dictionary::find_field(&entry.target_field) else {
                continue;
            };
            let cell = raw.get(&entry.source_column).unwrap_or("");

            match spec.data_type.coerce(cell, entry.date_format.as_deref()) {
                Ok(value) => fields.push(FieldValue::new(spec.name, value)),
                Err(err) => {
                    issues.push(coercion_issue(spec.name, &err, cell));
                    fields.push(FieldValue::new(spec.name, Value::Null));
                }
            }
        }

        let mut row = PreviewRow::new(raw.row_number, fields);
        row.issues = issues;
        rows.push(row);
    }

    debug!(rows = rows.len(), "Applied mapping");
    rows
}
