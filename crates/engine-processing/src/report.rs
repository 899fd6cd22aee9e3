use engine_core::error::PipelineError;
use model::records::row::PreviewRow;

/// Exports every row-level issue of a batch as delimited text: one line per
/// issue, header included. Operators feed this back to whoever supplied the
/// file.
pub fn error_report(rows: &[PreviewRow]) -> Result<String, PipelineError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record([
            "row",
            "field",
            "severity",
            "code",
            "message",
            "offending_value",
            "suggestion",
        ])
        .map_err(|e| PipelineError::Store(e.to_string()))?;

    for row in rows {
        for issue in &row.issues {
            writer
                .write_record([
                    row.row_number.to_string().as_str(),
                    issue.field.as_str(),
                    match issue.severity {
                        model::records::issue::Severity::Warning => "warning",
                        model::records::issue::Severity::Error => "error",
                    },
                    issue.code.as_str(),
                    issue.message.as_str(),
                    issue.raw_value.as_str(),
                    issue.suggestion.as_deref().unwrap_or(""),
                ])
                .map_err(|e| PipelineError::Store(e.to_string()))?;
        }
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| PipelineError::Store(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| PipelineError::Store(e.to_string()))
}
