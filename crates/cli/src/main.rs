use crate::commands::{Commands, TemplateCommand};
use crate::error::CliError;
use clap::Parser;
use engine_core::audit::TracingAuditSink;
use engine_core::records::matcher::ExternalIdMatcher;
use engine_core::records::sled_store::SledRecordStore;
use engine_core::store::sled_store::SledBatchStore;
use engine_processing::commit::CommitRequest;
use engine_runtime::pipeline::ImportPipeline;
use intake::limits::IntakeLimits;
use model::batch::status::BatchStatus;
use model::core::identifiers::{BatchId, TemplateId, TenantId};
use model::mapping::config::MappingConfig;
use model::pagination::PageRequest;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use tracing::Level;

mod commands;
mod error;
mod output;

#[derive(Parser)]
#[command(name = "granary", version = "0.0.1", about = "Customer bulk import tool")]
struct Cli {
    #[arg(long, global = true, default_value = "default", help = "Tenant scope")]
    tenant: String,

    #[arg(long, global = true, help = "Print results as JSON")]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Initialize logger
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let cli = Cli::parse();
    let tenant = TenantId::new(cli.tenant.clone());
    let pipeline = open_pipeline()?;

    match cli.command {
        Commands::Upload { file, uploader } => {
            let bytes = tokio::fs::read(&file).await?;
            let file_name = std::path::Path::new(&file)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or(file.as_str());
            let result = pipeline
                .upload(&tenant, &uploader, file_name, &bytes)
                .await?;
            if cli.json {
                output::print_json(&result)?;
            } else {
                println!(
                    "Created batch {} with {} rows",
                    result.batch.id, result.batch.total_rows
                );
            }
        }
        Commands::List {
            status,
            page,
            per_page,
        } => {
            let status = status
                .map(|s| {
                    BatchStatus::from_str(&s).map_err(|_| CliError::InvalidStatusFilter(s))
                })
                .transpose()?;
            let listed = pipeline
                .list_batches(&tenant, status, PageRequest::new(page, per_page))
                .await?;
            if cli.json {
                output::print_json(&listed)?;
            } else {
                output::print_batch_table(&listed);
            }
        }
        Commands::Show {
            batch,
            errors_only,
            page,
            per_page,
        } => {
            let id = BatchId::new(batch);
            let detail = pipeline.get_batch(&tenant, &id).await?;
            let preview = pipeline
                .preview_page(&tenant, &id, PageRequest::new(page, per_page), errors_only)
                .await?;
            if cli.json {
                output::print_json(&serde_json::json!({
                    "batch": detail,
                    "preview": preview,
                }))?;
            } else {
                output::print_batch_detail(&detail);
                output::print_preview_page(&preview);
            }
        }
        Commands::Suggest { batch } => {
            let suggestions = pipeline
                .suggest_mapping(&tenant, &BatchId::new(batch))
                .await?;
            if cli.json {
                output::print_json(&suggestions)?;
            } else {
                output::print_suggestions(&suggestions);
            }
        }
        Commands::Map {
            batch,
            config,
            save_template,
        } => {
            let source = tokio::fs::read_to_string(&config).await?;
            let config: MappingConfig = serde_json::from_str(&source)?;
            let result = pipeline
                .apply_mapping(
                    &tenant,
                    &BatchId::new(batch),
                    config,
                    save_template.as_deref(),
                )
                .await?;
            if cli.json {
                output::print_json(&result)?;
            } else {
                println!("Mapped {} rows", result.mapped_rows);
            }
        }
        Commands::Validate { batch } => {
            let summary = pipeline.validate(&tenant, &BatchId::new(batch)).await?;
            if cli.json {
                output::print_json(&summary)?;
            } else {
                println!(
                    "{} valid, {} warnings, {} errors",
                    summary.valid_count, summary.warning_count, summary.error_count
                );
            }
        }
        Commands::Commit {
            batch,
            exclude,
            edits,
            dry_run,
        } => {
            let overrides: HashMap<u32, HashMap<String, String>> = match edits {
                Some(path) => {
                    let source = tokio::fs::read_to_string(&path).await?;
                    serde_json::from_str(&source)?
                }
                None => HashMap::new(),
            };
            let request = CommitRequest {
                excluded_rows: HashSet::from_iter(exclude),
                overrides,
                dry_run,
            };
            let summary = pipeline
                .commit(&tenant, &BatchId::new(batch), request)
                .await?;
            if cli.json {
                output::print_json(&summary)?;
            } else {
                println!(
                    "{}{} created, {} updated, {} skipped, {} failed in {} ms",
                    if summary.dry_run { "[dry run] " } else { "" },
                    summary.created,
                    summary.updated,
                    summary.skipped,
                    summary.failed,
                    summary.duration_ms
                );
            }
        }
        Commands::Rollback { batch, reason } => {
            let summary = pipeline
                .rollback(&tenant, &BatchId::new(batch), &reason)
                .await?;
            if cli.json {
                output::print_json(&summary)?;
            } else {
                println!(
                    "{} deleted, {} reverted, {} failed",
                    summary.deleted, summary.reverted, summary.failed
                );
            }
        }
        Commands::Cancel { batch } => {
            pipeline.cancel(&tenant, &BatchId::new(batch)).await?;
            println!("Cancelled");
        }
        Commands::Templates { command } => match command {
            TemplateCommand::List => {
                let templates = pipeline.list_templates(&tenant).await?;
                if cli.json {
                    output::print_json(&templates)?;
                } else {
                    for template in templates {
                        println!("{:<38} {}", template.id, template.name);
                    }
                }
            }
            TemplateCommand::Show { id } => {
                let template = pipeline
                    .get_template(&tenant, &TemplateId::new(id))
                    .await?;
                output::print_json(&template)?;
            }
            TemplateCommand::Delete { id } => {
                pipeline
                    .delete_template(&tenant, &TemplateId::new(id))
                    .await?;
                println!("Deleted");
            }
        },
        Commands::ErrorReport { batch, output: out } => {
            let report = pipeline
                .error_report(&tenant, &BatchId::new(batch))
                .await?;
            match out {
                Some(path) => tokio::fs::write(path, report).await?,
                None => print!("{report}"),
            }
        }
    }

    Ok(())
}

fn open_pipeline() -> Result<ImportPipeline, CliError> {
    let home = dirs::home_dir()
        .ok_or_else(|| CliError::Unexpected("Could not determine home directory".into()))?;

    let batch_store = SledBatchStore::open(home.join(".granary/state")).map_err(|err| {
        CliError::Unexpected(format!("Failed to open batch store: {err}"))
    })?;
    let record_store = SledRecordStore::open(home.join(".granary/records")).map_err(|err| {
        CliError::Unexpected(format!("Failed to open record store: {err}"))
    })?;

    Ok(ImportPipeline::new(
        Arc::new(batch_store),
        Arc::new(record_store),
        Arc::new(ExternalIdMatcher),
        Arc::new(TracingAuditSink),
        IntakeLimits::default(),
    ))
}
