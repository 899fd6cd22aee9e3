use crate::error::PipelineError;
use crate::store::BatchStore;
use async_trait::async_trait;
use model::{
    batch::{ImportBatch, status::BatchStatus},
    core::identifiers::{BatchId, TemplateId, TenantId},
    mapping::config::{MappingConfig, MappingTemplate},
    pagination::{Page, PageRequest},
    records::{outcome::RollbackRecord, row::PreviewRow, row::RawRow},
};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use std::path::Path;

/// Sled-backed batch store. Values are bincode; keys are tenant-prefixed so
/// listing and lookup are tenant-scoped by construction.
pub struct SledBatchStore {
    db: sled::Db,
}

impl SledBatchStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// In-memory variant for tests and ephemeral tooling.
    pub fn temporary() -> Result<Self, sled::Error> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    #[inline]
    fn batch_key(tenant: &TenantId, id: &BatchId) -> String {
        format!("batch:{}:{}", tenant.as_str(), id.as_str())
    }

    #[inline]
    fn staged_key(prefix: &str, tenant: &TenantId, id: &BatchId) -> String {
        format!("{prefix}:{}:{}", tenant.as_str(), id.as_str())
    }

    #[inline]
    fn template_key(tenant: &TenantId, id: &TemplateId) -> String {
        format!("tpl:{}:{}", tenant.as_str(), id.as_str())
    }

    #[inline]
    fn template_name_key(tenant: &TenantId, name: &str) -> String {
        format!("tplname:{}:{}", tenant.as_str(), name.to_lowercase())
    }

    fn put<T: serde::Serialize>(&self, key: String, value: &T) -> Result<(), PipelineError> {
        let bytes = bincode::serialize(value)?;
        self.db.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    fn get<T: serde::de::DeserializeOwned>(&self, key: String) -> Result<Option<T>, PipelineError> {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl BatchStore for SledBatchStore {
    async fn insert_batch(&self, batch: &ImportBatch) -> Result<(), PipelineError> {
        self.put(Self::batch_key(&batch.tenant, &batch.id), batch)
    }

    async fn load_batch(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Option<ImportBatch>, PipelineError> {
        self.get(Self::batch_key(tenant, id))
    }

    async fn update_batch(&self, batch: &ImportBatch) -> Result<(), PipelineError> {
        self.put(Self::batch_key(&batch.tenant, &batch.id), batch)
    }

    async fn list_batches(
        &self,
        tenant: &TenantId,
        status: Option<BatchStatus>,
        page: PageRequest,
    ) -> Result<Page<ImportBatch>, PipelineError> {
        let prefix = format!("batch:{}:", tenant.as_str());
        let mut batches = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (_key, value) = item?;
            let batch: ImportBatch = bincode::deserialize(&value)?;
            if status.is_none_or(|s| batch.status == s) {
                batches.push(batch);
            }
        }
        // Newest first; listing is operator-facing.
        batches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(page.slice(&batches))
    }

    async fn transition_status(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        expected: &[BatchStatus],
        next: BatchStatus,
    ) -> Result<ImportBatch, PipelineError> {
        let key = Self::batch_key(tenant, id);
        let expected_label = expected
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("|");

        // Check-then-set inside one transaction so two concurrent commits
        // cannot both observe `validated`.
        let result = self
            .db
            .transaction::<_, ImportBatch, PipelineError>(|tx_db| {
                let bytes = tx_db.get(key.as_bytes())?.ok_or_else(|| {
                    ConflictableTransactionError::Abort(PipelineError::not_found("batch", id))
                })?;
                let mut batch: ImportBatch = bincode::deserialize(&bytes).map_err(|e| {
                    ConflictableTransactionError::Abort(PipelineError::Store(e.to_string()))
                })?;

                if !expected.contains(&batch.status) {
                    return Err(ConflictableTransactionError::Abort(
                        PipelineError::invalid_state(expected_label.clone(), batch.status),
                    ));
                }

                batch.status = next;
                let updated = bincode::serialize(&batch).map_err(|e| {
                    ConflictableTransactionError::Abort(PipelineError::Store(e.to_string()))
                })?;
                tx_db.insert(key.as_bytes(), updated)?;
                Ok(batch)
            });

        match result {
            Ok(batch) => Ok(batch),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(e.into()),
        }
    }

    async fn save_headers(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        headers: &[String],
    ) -> Result<(), PipelineError> {
        self.put(Self::staged_key("hdr", tenant, id), &headers.to_vec())
    }

    async fn load_headers(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Vec<String>, PipelineError> {
        Ok(self.get(Self::staged_key("hdr", tenant, id))?.unwrap_or_default())
    }

    async fn save_raw_rows(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        rows: &[RawRow],
    ) -> Result<(), PipelineError> {
        self.put(Self::staged_key("raw", tenant, id), &rows.to_vec())
    }

    async fn load_raw_rows(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Vec<RawRow>, PipelineError> {
        Ok(self.get(Self::staged_key("raw", tenant, id))?.unwrap_or_default())
    }

    async fn save_preview_rows(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        rows: &[PreviewRow],
    ) -> Result<(), PipelineError> {
        self.put(Self::staged_key("prev", tenant, id), &rows.to_vec())
    }

    async fn load_preview_rows(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Vec<PreviewRow>, PipelineError> {
        Ok(self.get(Self::staged_key("prev", tenant, id))?.unwrap_or_default())
    }

    async fn save_mapping(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        config: &MappingConfig,
    ) -> Result<(), PipelineError> {
        self.put(Self::staged_key("map", tenant, id), config)
    }

    async fn load_mapping(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Option<MappingConfig>, PipelineError> {
        self.get(Self::staged_key("map", tenant, id))
    }

    async fn append_rollback_records(
        &self,
        tenant: &TenantId,
        id: &BatchId,
        records: &[RollbackRecord],
    ) -> Result<(), PipelineError> {
        let key = Self::staged_key("rlog", tenant, id);
        let mut log: Vec<RollbackRecord> = self.get(key.clone())?.unwrap_or_default();
        log.extend_from_slice(records);
        self.put(key, &log)
    }

    async fn load_rollback_log(
        &self,
        tenant: &TenantId,
        id: &BatchId,
    ) -> Result<Vec<RollbackRecord>, PipelineError> {
        Ok(self.get(Self::staged_key("rlog", tenant, id))?.unwrap_or_default())
    }

    async fn insert_template(&self, template: &MappingTemplate) -> Result<(), PipelineError> {
        let name_key = Self::template_name_key(&template.tenant, &template.name);

        // Name uniqueness per tenant via compare-and-swap on the name index.
        let claimed = self.db.compare_and_swap(
            name_key.as_bytes(),
            None as Option<&[u8]>,
            Some(template.id.as_str().as_bytes()),
        )?;
        if claimed.is_err() {
            return Err(PipelineError::DuplicateTemplate(template.name.clone()));
        }

        self.put(Self::template_key(&template.tenant, &template.id), template)
    }

    async fn list_templates(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<MappingTemplate>, PipelineError> {
        let prefix = format!("tpl:{}:", tenant.as_str());
        let mut templates = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (_key, value) = item?;
            templates.push(bincode::deserialize::<MappingTemplate>(&value)?);
        }
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    async fn get_template(
        &self,
        tenant: &TenantId,
        id: &TemplateId,
    ) -> Result<Option<MappingTemplate>, PipelineError> {
        self.get(Self::template_key(tenant, id))
    }

    async fn delete_template(
        &self,
        tenant: &TenantId,
        id: &TemplateId,
    ) -> Result<bool, PipelineError> {
        let Some(template) = self.get_template(tenant, id).await? else {
            return Ok(false);
        };
        self.db
            .remove(Self::template_name_key(tenant, &template.name).as_bytes())?;
        self.db.remove(Self::template_key(tenant, id).as_bytes())?;
        Ok(true)
    }
}
