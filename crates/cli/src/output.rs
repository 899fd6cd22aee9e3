use crate::error::CliError;
use engine_processing::suggest::MappingSuggestion;
use model::batch::ImportBatch;
use model::pagination::Page;
use model::records::row::PreviewRow;

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value).map_err(CliError::JsonParse)?;
    println!("{json}");
    Ok(())
}

pub fn print_batch_table(page: &Page<ImportBatch>) {
    println!(
        "{:<38} {:<22} {:<12} {:>6} {:>6} {:>6}",
        "ID", "File", "Status", "Rows", "Warn", "Err"
    );
    for batch in &page.items {
        println!(
            "{:<38} {:<22} {:<12} {:>6} {:>6} {:>6}",
            batch.id,
            batch.file_name,
            batch.status,
            batch.total_rows,
            batch.warning_count,
            batch.error_count
        );
    }
    println!(
        "Page {} of {} batches total",
        page.page, page.total
    );
}

pub fn print_batch_detail(batch: &ImportBatch) {
    println!("Batch {}", batch.id);
    println!("-----------------------------");
    println!("{:<14} {}", "File", batch.file_name);
    println!("{:<14} {}", "Status", batch.status);
    println!("{:<14} {}", "Rows", batch.total_rows);
    println!("{:<14} {}", "Uploaded by", batch.uploaded_by);
    println!("{:<14} {}", "Created", batch.created_at.to_rfc3339());
    println!(
        "{:<14} {} valid / {} warnings / {} errors",
        "Validation", batch.valid_count, batch.warning_count, batch.error_count
    );
}

pub fn print_preview_page(page: &Page<PreviewRow>) {
    for row in &page.items {
        let values: Vec<String> = row
            .fields
            .iter()
            .map(|f| format!("{}={}", f.name, f.value))
            .collect();
        println!("row {:>4}: {}", row.row_number, values.join(", "));
        for issue in &row.issues {
            println!(
                "          [{:?}] {} ({}): {}",
                issue.severity, issue.field, issue.code, issue.message
            );
        }
    }
    println!("Page {} of {} rows total", page.page, page.total);
}

pub fn print_suggestions(suggestions: &[MappingSuggestion]) {
    println!("{:<14} {:<24} {:>10}", "Field", "Source column", "Confidence");
    for s in suggestions {
        println!(
            "{:<14} {:<24} {:>10}",
            s.target_field,
            s.source_column.as_deref().unwrap_or("-"),
            if s.source_column.is_some() {
                format!("{:.2}", s.confidence)
            } else {
                "-".to_string()
            }
        );
    }
}
