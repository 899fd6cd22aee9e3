use async_trait::async_trait;
use chrono::{DateTime, Utc};
use model::core::identifiers::{RecordId, TenantId};
use model::core::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub mod matcher;
pub mod memory;
pub mod sled_store;

pub const EXTERNAL_ID_FIELD: &str = "external_id";

/// A production customer record as the collaborator store exposes it. The
/// pipeline only ever reads and writes whole field maps; the store's inner
/// schema is its own business.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: RecordId,
    pub tenant: TenantId,
    pub fields: HashMap<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CustomerRecord {
    pub fn external_id(&self) -> Option<&str> {
        match self.fields.get(EXTERNAL_ID_FIELD) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

/// Collaborator seam onto the production customer-record store. The pipeline
/// treats it as a black box: create/update/lookup scoped by tenant.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn create(
        &self,
        tenant: &TenantId,
        fields: HashMap<String, Value>,
    ) -> Result<RecordId, RecordStoreError>;

    async fn get(
        &self,
        tenant: &TenantId,
        id: &RecordId,
    ) -> Result<Option<CustomerRecord>, RecordStoreError>;

    /// Merges the given fields over the existing record.
    async fn update(
        &self,
        tenant: &TenantId,
        id: &RecordId,
        fields: HashMap<String, Value>,
    ) -> Result<(), RecordStoreError>;

    /// Overwrites the record's whole field map; the rollback restore path.
    async fn replace(
        &self,
        tenant: &TenantId,
        id: &RecordId,
        fields: HashMap<String, Value>,
    ) -> Result<(), RecordStoreError>;

    async fn delete(&self, tenant: &TenantId, id: &RecordId) -> Result<(), RecordStoreError>;

    async fn find_by_external_id(
        &self,
        tenant: &TenantId,
        external_id: &str,
    ) -> Result<Option<CustomerRecord>, RecordStoreError>;

    /// Finds a record whose listed fields all match exactly (string
    /// comparison is case-insensitive). Used by the name+address matcher.
    async fn find_by_exact(
        &self,
        tenant: &TenantId,
        criteria: &[(String, Value)],
    ) -> Result<Option<CustomerRecord>, RecordStoreError>;

    async fn count(&self, tenant: &TenantId) -> Result<u64, RecordStoreError>;
}

pub(crate) fn values_match(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.eq_ignore_ascii_case(y),
        _ => a.equal(b),
    }
}
