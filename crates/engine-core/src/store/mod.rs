use crate::error::PipelineError;
use async_trait::async_trait;
use model::{
    batch::{ImportBatch, status::BatchStatus},
    core::identifiers::{BatchId, TemplateId, TenantId},
    mapping::config::{MappingConfig, MappingTemplate},
    pagination::{Page, PageRequest},
    records::{outcome::RollbackRecord, row::PreviewRow, row::RawRow},
};

pub mod sled_store;

/// Persistence seam for batches and everything staged against them. Every
/// operation is scoped by tenant; a batch belonging to one tenant is never
/// visible to another.
#[async_trait]
pub trait BatchStore: Send + Sync {
    async fn insert_batch(&self, batch: &ImportBatch) -> Result<(), PipelineError>;

    async fn load_batch(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Option<ImportBatch>, PipelineError>;

    async fn update_batch(&self, batch: &ImportBatch) -> Result<(), PipelineError>;

    async fn list_batches(
        &self,
        tenant: &TenantId,
        status: Option<BatchStatus>,
        page: PageRequest,
    ) -> Result<Page<ImportBatch>, PipelineError>;

    /// Atomically flips the batch's status to `next` if its current status is
    /// one of `expected`; fails with `invalid_state` otherwise. This is the
    /// at-most-once guard for commit and rollback.
    async fn transition_status(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        expected: &[BatchStatus],
        next: BatchStatus,
    ) -> Result<ImportBatch, PipelineError>;

    async fn save_headers(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        headers: &[String],
    ) -> Result<(), PipelineError>;

    async fn load_headers(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Vec<String>, PipelineError>;

    async fn save_raw_rows(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        rows: &[RawRow],
    ) -> Result<(), PipelineError>;

    async fn load_raw_rows(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Vec<RawRow>, PipelineError>;

    async fn save_preview_rows(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        rows: &[PreviewRow],
    ) -> Result<(), PipelineError>;

    async fn load_preview_rows(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Vec<PreviewRow>, PipelineError>;

    async fn save_mapping(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        config: &MappingConfig,
    ) -> Result<(), PipelineError>;

    async fn load_mapping(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Option<MappingConfig>, PipelineError>;

    async fn append_rollback_records(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        records: &[RollbackRecord],
    ) -> Result<(), PipelineError>;

    async fn load_rollback_log(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Vec<RollbackRecord>, PipelineError>;

    /// Rejects duplicate template names per tenant.
    async fn insert_template(&self, template: &MappingTemplate) -> Result<(), PipelineError>;

    async fn list_templates(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<MappingTemplate>, PipelineError>;

    async fn get_template(
        &self,
        tenant: &TenantId,
        id: &TemplateId,
    ) -> Result<Option<MappingTemplate>, PipelineError>;

    async fn delete_template(
        &self,
        tenant: &TenantId,
        id: &TemplateId,
    ) -> Result<bool, PipelineError>;
}
