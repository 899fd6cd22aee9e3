use crate::locks::BatchLocks;
use chrono::Utc;
use engine_core::audit::AuditSink;
use engine_core::error::PipelineError;
use engine_core::records::{RecordStore, matcher::RecordMatcher};
use engine_core::store::BatchStore;
use engine_processing::apply;
use engine_processing::commit::{CommitEngine, CommitRequest};
use engine_processing::report;
use engine_processing::rollback;
use engine_processing::suggest::{self, MappingSuggestion};
use engine_processing::validate::{self as validate_mod, ValidationSummary};
use intake::extract;
use intake::limits::IntakeLimits;
use model::batch::{ImportBatch, status::BatchStatus};
use model::core::identifiers::{BatchId, TemplateId, TenantId};
use model::events::ImportEvent;
use model::mapping::config::{MappingConfig, MappingTemplate};
use model::pagination::{Page, PageRequest};
use model::records::outcome::{CommitSummary, RollbackSummary};
use model::records::row::{PreviewRow, RawRow};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Values sampled per column when suggesting a mapping.
const SUGGEST_SAMPLE_ROWS: usize = 20;

/// The pipeline facade: one explicitly constructed object holding its store
/// and collaborator dependencies, passed by reference to whatever serves
/// requests. All operations are tenant-scoped.
pub struct ImportPipeline {
    batch_store: Arc<dyn BatchStore>,
    record_store: Arc<dyn RecordStore>,
    matcher: Arc<dyn RecordMatcher>,
    audit: Arc<dyn AuditSink>,
    limits: IntakeLimits,
    locks: BatchLocks,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadResult {
    pub batch: ImportBatch,
    pub preview: Page<RawRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplyResult {
    pub mapped_rows: u64,
    pub preview: Page<PreviewRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,
}

impl ImportPipeline {
    pub fn new(
        batch_store: Arc<dyn BatchStore>,
        record_store: Arc<dyn RecordStore>,
        matcher: Arc<dyn RecordMatcher>,
        audit: Arc<dyn AuditSink>,
        limits: IntakeLimits,
    ) -> Self {
        ImportPipeline {
            batch_store,
            record_store,
            matcher,
            audit,
            limits,
            locks: BatchLocks::new(),
        }
    }

    /// Validates and decodes an upload, persists the batch plus its raw rows,
    /// and returns the first preview page. Intake failures leave no state
    /// behind.
    pub async fn upload(
        &self,
        tenant: &TenantId,
        uploaded_by: &str,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<UploadResult, PipelineError> {
        let extraction = extract::extract(file_name, bytes, &self.limits)?;

        let batch = ImportBatch::new(
            tenant.clone(),
            uploaded_by,
            file_name,
            bytes.len() as u64,
            extraction.rows.len() as u64,
        );
        self.batch_store.insert_batch(&batch).await?;
        self.batch_store
            .save_headers(tenant, &batch.id, &extraction.headers)
            .await?;
        self.batch_store
            .save_raw_rows(tenant, &batch.id, &extraction.rows)
            .await?;

        info!(
            batch_id = batch.id.as_str(),
            tenant = tenant.as_str(),
            rows = batch.total_rows,
            "Upload accepted"
        );
        self.audit.emit(ImportEvent::Uploaded {
            tenant: tenant.clone(),
            batch_id: batch.id.clone(),
            file_name: batch.file_name.clone(),
            row_count: batch.total_rows,
            timestamp: Utc::now(),
        });

        let preview = PageRequest::default().slice(&extraction.rows);
        Ok(UploadResult { batch, preview })
    }

    pub async fn list_batches(
        &self,
        tenant: &TenantId,
        status: Option<BatchStatus>,
        page: PageRequest,
    ) -> Result<Page<ImportBatch>, PipelineError> {
        self.batch_store.list_batches(tenant, status, page).await
    }

    pub async fn get_batch(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<ImportBatch, PipelineError> {
        self.require_batch(tenant, id).await
    }

    /// Pages through staged preview rows. With `errors_only`, only blocked
    /// rows are returned.
    pub async fn preview_page(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        page: PageRequest,
        errors_only: bool,
    ) -> Result<Page<PreviewRow>, PipelineError> {
        self.require_batch(tenant, id).await?;
        let rows = self.batch_store.load_preview_rows(tenant, id).await?;
        if errors_only {
            let blocked: Vec<PreviewRow> =
                rows.into_iter().filter(|r| r.is_blocked()).collect();
            Ok(page.slice(&blocked))
        } else {
            Ok(page.slice(&rows))
        }
    }

    /// Advisory column → field suggestions from headers and sampled values.
    /// Never mutates the batch.
    pub async fn suggest_mapping(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Vec<MappingSuggestion>, PipelineError> {
        self.require_batch(tenant, id).await?;
        let headers = self.batch_store.load_headers(tenant, id).await?;
        let raw_rows = self.batch_store.load_raw_rows(tenant, id).await?;

        let mut samples: HashMap<String, Vec<String>> = HashMap::new();
        for row in raw_rows.iter().take(SUGGEST_SAMPLE_ROWS) {
            for (header, value) in &row.cells {
                samples.entry(header.clone()).or_default().push(value.clone());
            }
        }

        Ok(suggest::suggest(&headers, &samples))
    }

    /// Applies an operator-confirmed mapping, replacing any previously staged
    /// rows, and optionally persists it as a named tenant template.
    pub async fn apply_mapping(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        config: MappingConfig,
        save_as_template: Option<&str>,
    ) -> Result<ApplyResult, PipelineError> {
        let _guard = self.locks.acquire(id).await;

        let unknown = config.unknown_fields();
        if !unknown.is_empty() {
            return Err(PipelineError::UnknownFields(unknown));
        }

        // Status pre-check so a bad batch never leaves a template behind.
        let current = self.require_batch(tenant, id).await?;
        if !matches!(
            current.status,
            BatchStatus::Uploaded | BatchStatus::Mapped | BatchStatus::Validated
        ) {
            return Err(PipelineError::invalid_state(
                "uploaded|mapped|validated",
                current.status,
            ));
        }

        // Template name collisions reject the whole call, before staging.
        let template_id = match save_as_template {
            Some(name) => {
                let template = MappingTemplate::new(tenant.clone(), name, config.clone());
                self.batch_store.insert_template(&template).await?;
                Some(template.id)
            }
            None => None,
        };

        let raw_rows = self.batch_store.load_raw_rows(tenant, id).await?;
        let rows = apply::apply_mapping(&config, &raw_rows);

        let mut batch = self
            .batch_store
            .transition_status(
                tenant,
                id,
                &[BatchStatus::Uploaded, BatchStatus::Mapped, BatchStatus::Validated],
                BatchStatus::Mapped,
            )
            .await?;

        self.batch_store.save_mapping(tenant, id, &config).await?;
        self.batch_store.save_preview_rows(tenant, id, &rows).await?;

        batch.reset_validation();
        batch.mapped_at = Some(Utc::now());
        self.batch_store.update_batch(&batch).await?;

        self.audit.emit(ImportEvent::MappingApplied {
            tenant: tenant.clone(),
            batch_id: id.clone(),
            mapped_fields: config.entries.len(),
            saved_template: save_as_template.map(str::to_string),
            timestamp: Utc::now(),
        });

        let preview = PageRequest::default().slice(&rows);
        Ok(ApplyResult {
            mapped_rows: rows.len() as u64,
            preview,
            template_id,
        })
    }

    /// Runs the full rule set over the staged rows and stores per-row issues
    /// plus batch aggregates. Safe to re-run.
    pub async fn validate(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<ValidationSummary, PipelineError> {
        let _guard = self.locks.acquire(id).await;

        let mut rows = self.batch_store.load_preview_rows(tenant, id).await?;
        let mut batch = self
            .batch_store
            .transition_status(
                tenant,
                id,
                &[BatchStatus::Mapped, BatchStatus::Validated],
                BatchStatus::Validated,
            )
            .await?;

        let summary = validate_mod::validate(&mut rows);
        self.batch_store.save_preview_rows(tenant, id, &rows).await?;

        batch.valid_count = summary.valid_count;
        batch.warning_count = summary.warning_count;
        batch.error_count = summary.error_count;
        batch.validated_at = Some(Utc::now());
        self.batch_store.update_batch(&batch).await?;

        self.audit.emit(ImportEvent::Validated {
            tenant: tenant.clone(),
            batch_id: id.clone(),
            valid_count: summary.valid_count,
            warning_count: summary.warning_count,
            error_count: summary.error_count,
            timestamp: Utc::now(),
        });

        Ok(summary)
    }

    /// Commits the batch (or simulates it with `dry_run`). The status flip
    /// `validated → committed` is the first durable action of a real commit,
    /// so at most one commit ever succeeds per batch.
    pub async fn commit(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        request: CommitRequest,
    ) -> Result<CommitSummary, PipelineError> {
        let _guard = self.locks.acquire(id).await;

        if request.dry_run {
            let batch = self.require_batch(tenant, id).await?;
            if batch.status != BatchStatus::Validated {
                return Err(PipelineError::invalid_state("validated", batch.status));
            }
        } else {
            self.batch_store
                .transition_status(tenant, id, &[BatchStatus::Validated], BatchStatus::Committed)
                .await?;
        }

        let rows = self.batch_store.load_preview_rows(tenant, id).await?;
        let engine = CommitEngine {
            batch_store: self.batch_store.as_ref(),
            record_store: self.record_store.as_ref(),
            matcher: self.matcher.as_ref(),
        };
        let summary = engine.run(tenant, id, rows, &request).await?;

        if !request.dry_run {
            let mut batch = self.require_batch(tenant, id).await?;
            batch.committed_at = Some(Utc::now());
            self.batch_store.update_batch(&batch).await?;
        }

        self.audit.emit(ImportEvent::Committed {
            tenant: tenant.clone(),
            batch_id: id.clone(),
            created: summary.created,
            updated: summary.updated,
            skipped: summary.skipped,
            failed: summary.failed,
            dry_run: summary.dry_run,
            timestamp: Utc::now(),
        });

        Ok(summary)
    }

    /// Replays the reversal log. Terminal: a second attempt fails with
    /// `already_rolled_back`.
    pub async fn rollback(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        reason: &str,
    ) -> Result<RollbackSummary, PipelineError> {
        let _guard = self.locks.acquire(id).await;

        let batch = self.require_batch(tenant, id).await?;
        if batch.status == BatchStatus::RolledBack {
            return Err(PipelineError::AlreadyRolledBack);
        }

        match self
            .batch_store
            .transition_status(tenant, id, &[BatchStatus::Committed], BatchStatus::RolledBack)
            .await
        {
            Ok(_) => {}
            // Lost a race against another rollback of the same batch.
            Err(PipelineError::InvalidState {
                actual: BatchStatus::RolledBack,
                ..
            }) => return Err(PipelineError::AlreadyRolledBack),
            Err(err) => return Err(err),
        }

        let log = self.batch_store.load_rollback_log(tenant, id).await?;
        let summary = rollback::rollback(self.record_store.as_ref(), tenant, &log).await;

        self.audit.emit(ImportEvent::RolledBack {
            tenant: tenant.clone(),
            batch_id: id.clone(),
            deleted: summary.deleted,
            reverted: summary.reverted,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });

        Ok(summary)
    }

    /// Cancels a batch that has not written anything. Committed batches are
    /// rejected; rollback is the only undo path once writes occurred.
    pub async fn cancel(&self, tenant: &TenantId, id: &BatchId) -> Result<(), PipelineError> {
        let _guard = self.locks.acquire(id).await;

        let prior = self.require_batch(tenant, id).await?.status;
        self.batch_store
            .transition_status(
                tenant,
                id,
                &[BatchStatus::Uploaded, BatchStatus::Mapped, BatchStatus::Validated],
                BatchStatus::Cancelled,
            )
            .await?;

        self.audit.emit(ImportEvent::Cancelled {
            tenant: tenant.clone(),
            batch_id: id.clone(),
            from_status: prior,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    pub async fn list_templates(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<MappingTemplate>, PipelineError> {
        self.batch_store.list_templates(tenant).await
    }

    pub async fn get_template(
        &self,
        tenant: &TenantId,
        id: &TemplateId,
    ) -> Result<MappingTemplate, PipelineError> {
        self.batch_store
            .get_template(tenant, id)
            .await?
            .ok_or_else(|| PipelineError::not_found("template", id))
    }

    pub async fn delete_template(
        &self,
        tenant: &TenantId,
        id: &TemplateId,
    ) -> Result<(), PipelineError> {
        if self.batch_store.delete_template(tenant, id).await? {
            Ok(())
        } else {
            Err(PipelineError::not_found("template", id))
        }
    }

    /// Delimited export of every row-level issue on the batch.
    pub async fn error_report(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<String, PipelineError> {
        self.require_batch(tenant, id).await?;
        let rows = self.batch_store.load_preview_rows(tenant, id).await?;
        report::error_report(&rows)
    }

    async fn require_batch(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<ImportBatch, PipelineError> {
        self.batch_store
            .load_batch(tenant, id)
            .await?
            .ok_or_else(|| PipelineError::not_found("batch", id))
    }
}
