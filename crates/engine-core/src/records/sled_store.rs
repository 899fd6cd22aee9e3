use crate::records::{
    CustomerRecord, EXTERNAL_ID_FIELD, RecordStore, RecordStoreError, values_match,
};
use async_trait::async_trait;
use chrono::Utc;
use model::core::identifiers::{RecordId, TenantId};
use model::core::value::Value;
use std::collections::HashMap;
use std::path::Path;

/// Sled-backed record store used by the CLI so commits survive process
/// restarts. Keeps a secondary index on `external_id` for matcher lookups.
pub struct SledRecordStore {
    db: sled::Db,
}

impl SledRecordStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn temporary() -> Result<Self, sled::Error> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    #[inline]
    fn record_key(tenant: &TenantId, id: &RecordId) -> String {
        format!("rec:{}:{}", tenant.as_str(), id.as_str())
    }

    #[inline]
    fn ext_key(tenant: &TenantId, external_id: &str) -> String {
        format!("recext:{}:{}", tenant.as_str(), external_id.to_lowercase())
    }

    fn storage_err(err: impl std::fmt::Display) -> RecordStoreError {
        RecordStoreError::Storage(err.to_string())
    }

    fn write_record(&self, record: &CustomerRecord) -> Result<(), RecordStoreError> {
        let bytes = bincode::serialize(record).map_err(Self::storage_err)?;
        self.db
            .insert(Self::record_key(&record.tenant, &record.id).as_bytes(), bytes)
            .map_err(Self::storage_err)?;
        if let Some(ext) = record.external_id() {
            self.db
                .insert(
                    Self::ext_key(&record.tenant, ext).as_bytes(),
                    record.id.as_str().as_bytes(),
                )
                .map_err(Self::storage_err)?;
        }
        Ok(())
    }

    fn read_record(
        &self,
        tenant: &TenantId,
        id: &RecordId,
    ) -> Result<Option<CustomerRecord>, RecordStoreError> {
        match self
            .db
            .get(Self::record_key(tenant, id).as_bytes())
            .map_err(Self::storage_err)?
        {
            Some(bytes) => Ok(Some(
                bincode::deserialize(&bytes).map_err(Self::storage_err)?,
            )),
            None => Ok(None),
        }
    }

    fn drop_ext_index(&self, record: &CustomerRecord) -> Result<(), RecordStoreError> {
        if let Some(ext) = record.external_id() {
            self.db
                .remove(Self::ext_key(&record.tenant, ext).as_bytes())
                .map_err(Self::storage_err)?;
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SledRecordStore {
    async fn create(
        &self,
        tenant: &TenantId,
        fields: HashMap<String, Value>,
    ) -> Result<RecordId, RecordStoreError> {
        let now = Utc::now();
        let record = CustomerRecord {
            id: RecordId::generate(),
            tenant: tenant.clone(),
            fields,
            created_at: now,
            updated_at: now,
        };
        self.write_record(&record)?;
        Ok(record.id)
    }

    async fn get(
        &self,
        tenant: &TenantId,
        id: &RecordId,
    ) -> Result<Option<CustomerRecord>, RecordStoreError> {
        self.read_record(tenant, id)
    }

    async fn update(
        &self,
        tenant: &TenantId,
        id: &RecordId,
        fields: HashMap<String, Value>,
    ) -> Result<(), RecordStoreError> {
        let mut record = self
            .read_record(tenant, id)?
            .ok_or_else(|| RecordStoreError::NotFound(id.as_str().to_string()))?;
        // The external-id index entry may move when that field changes.
        self.drop_ext_index(&record)?;
        record.fields.extend(fields);
        record.updated_at = Utc::now();
        self.write_record(&record)
    }

    async fn replace(
        &self,
        tenant: &TenantId,
        id: &RecordId,
        fields: HashMap<String, Value>,
    ) -> Result<(), RecordStoreError> {
        let mut record = self
            .read_record(tenant, id)?
            .ok_or_else(|| RecordStoreError::NotFound(id.as_str().to_string()))?;
        self.drop_ext_index(&record)?;
        record.fields = fields;
        record.updated_at = Utc::now();
        self.write_record(&record)
    }

    async fn delete(&self, tenant: &TenantId, id: &RecordId) -> Result<(), RecordStoreError> {
        let record = self
            .read_record(tenant, id)?
            .ok_or_else(|| RecordStoreError::NotFound(id.as_str().to_string()))?;
        self.drop_ext_index(&record)?;
        self.db
            .remove(Self::record_key(tenant, id).as_bytes())
            .map_err(Self::storage_err)?;
        Ok(())
    }

    async fn find_by_external_id(
        &self,
        tenant: &TenantId,
        external_id: &str,
    ) -> Result<Option<CustomerRecord>, RecordStoreError> {
        let Some(id_bytes) = self
            .db
            .get(Self::ext_key(tenant, external_id).as_bytes())
            .map_err(Self::storage_err)?
        else {
            return Ok(None);
        };
        let id = RecordId::new(String::from_utf8_lossy(&id_bytes).to_string());
        self.read_record(tenant, &id)
    }

    async fn find_by_exact(
        &self,
        tenant: &TenantId,
        criteria: &[(String, Value)],
    ) -> Result<Option<CustomerRecord>, RecordStoreError> {
        if criteria.is_empty() {
            return Ok(None);
        }
        let prefix = format!("rec:{}:", tenant.as_str());
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (_key, value) = item.map_err(Self::storage_err)?;
            let record: CustomerRecord =
                bincode::deserialize(&value).map_err(Self::storage_err)?;
            let matches = criteria.iter().all(|(field, expected)| {
                record
                    .fields
                    .get(field)
                    .is_some_and(|v| values_match(v, expected))
            });
            if matches {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    async fn count(&self, tenant: &TenantId) -> Result<u64, RecordStoreError> {
        let prefix = format!("rec:{}:", tenant.as_str());
        let mut count = 0u64;
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            item.map_err(Self::storage_err)?;
            count += 1;
        }
        Ok(count)
    }
}
