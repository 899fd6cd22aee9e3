use crate::records::{
    CustomerRecord, EXTERNAL_ID_FIELD, RecordStore, RecordStoreError, values_match,
};
use async_trait::async_trait;
use chrono::Utc;
use model::core::identifiers::{RecordId, TenantId};
use model::core::value::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory record store for tests and dry wiring. Write failures can be
/// injected so commit/rollback partial-failure paths are exercisable.
#[derive(Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, HashMap<RecordId, CustomerRecord>>>,
    fail_when: RwLock<Option<(String, Value)>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write whose field map carries `(field, value)` fail with a
    /// storage error.
    pub async fn fail_writes_when(&self, field: &str, value: Value) {
        *self.fail_when.write().await = Some((field.to_string(), value));
    }

    async fn check_injected_failure(
        &self,
        fields: &HashMap<String, Value>,
    ) -> Result<(), RecordStoreError> {
        if let Some((field, value)) = self.fail_when.read().await.as_ref()
            && fields.get(field).is_some_and(|v| values_match(v, value))
        {
            return Err(RecordStoreError::Storage(format!(
                "Injected failure on {field}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn create(
        &self,
        tenant: &TenantId,
        fields: HashMap<String, Value>,
    ) -> Result<RecordId, RecordStoreError> {
        self.check_injected_failure(&fields).await?;
        let now = Utc::now();
        let record = CustomerRecord {
            id: RecordId::generate(),
            tenant: tenant.clone(),
            fields,
            created_at: now,
            updated_at: now,
        };
        let id = record.id.clone();
        self.records
            .write()
            .await
            .entry(tenant.as_str().to_string())
            .or_default()
            .insert(id.clone(), record);
        Ok(id)
    }

    async fn get(
        &self,
        tenant: &TenantId,
        id: &RecordId,
    ) -> Result<Option<CustomerRecord>, RecordStoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(tenant.as_str())
            .and_then(|m| m.get(id))
            .cloned())
    }

    async fn update(
        &self,
        tenant: &TenantId,
        id: &RecordId,
        fields: HashMap<String, Value>,
    ) -> Result<(), RecordStoreError> {
        self.check_injected_failure(&fields).await?;
        let mut records = self.records.write().await;
        let record = records
            .get_mut(tenant.as_str())
            .and_then(|m| m.get_mut(id))
            .ok_or_else(|| RecordStoreError::NotFound(id.as_str().to_string()))?;
        record.fields.extend(fields);
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn replace(
        &self,
        tenant: &TenantId,
        id: &RecordId,
        fields: HashMap<String, Value>,
    ) -> Result<(), RecordStoreError> {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(tenant.as_str())
            .and_then(|m| m.get_mut(id))
            .ok_or_else(|| RecordStoreError::NotFound(id.as_str().to_string()))?;
        record.fields = fields;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn delete(&self, tenant: &TenantId, id: &RecordId) -> Result<(), RecordStoreError> {
        let mut records = self.records.write().await;
        let removed = records
            .get_mut(tenant.as_str())
            .and_then(|m| m.remove(id));
        match removed {
            Some(_) => Ok(()),
            None => Err(RecordStoreError::NotFound(id.as_str().to_string())),
        }
    }

    async fn find_by_external_id(
        &self,
        tenant: &TenantId,
        external_id: &str,
    ) -> Result<Option<CustomerRecord>, RecordStoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(tenant.as_str())
            .and_then(|m| {
                m.values()
                    .find(|r| {
                        r.fields.get(EXTERNAL_ID_FIELD).is_some_and(|v| {
                            values_match(v, &Value::String(external_id.to_string()))
                        })
                    })
                    .cloned()
            }))
    }

    async fn find_by_exact(
        &self,
        tenant: &TenantId,
        criteria: &[(String, Value)],
    ) -> Result<Option<CustomerRecord>, RecordStoreError> {
        if criteria.is_empty() {
            return Ok(None);
        }
        Ok(self
            .records
            .read()
            .await
            .get(tenant.as_str())
            .and_then(|m| {
                m.values()
                    .find(|r| {
                        criteria.iter().all(|(field, expected)| {
                            r.fields.get(field).is_some_and(|v| values_match(v, expected))
                        })
                    })
                    .cloned()
            }))
    }

    async fn count(&self, tenant: &TenantId) -> Result<u64, RecordStoreError> {
        Ok(self
            .records
            .read()
            .await
            .get(tenant.as_str())
            .map(|m| m.len() as u64)
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn create_get_update_delete_round_trip() {
        let store = InMemoryRecordStore::new();
        let tenant = TenantId::new("t");

        let id = store
            .create(&tenant, fields(&[("last_name", "Meier")]))
            .await
            .unwrap();
        assert_eq!(store.count(&tenant).await.unwrap(), 1);

        store
            .update(&tenant, &id, fields(&[("city", "Bremen")]))
            .await
            .unwrap();
        let record = store.get(&tenant, &id).await.unwrap().unwrap();
        assert_eq!(record.fields.len(), 2);

        store.delete(&tenant, &id).await.unwrap();
        assert_eq!(store.count(&tenant).await.unwrap(), 0);
        assert!(store.delete(&tenant, &id).await.is_err());
    }

    #[tokio::test]
    async fn external_id_lookup_is_tenant_scoped() {
        let store = InMemoryRecordStore::new();
        let tenant = TenantId::new("t");
        store
            .create(&tenant, fields(&[("external_id", "C-100")]))
            .await
            .unwrap();

        assert!(store
            .find_by_external_id(&tenant, "c-100")
            .await
            .unwrap()
            .is_some());
        assert!(store
            .find_by_external_id(&TenantId::new("other"), "C-100")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn injected_failures_hit_matching_writes() {
        let store = InMemoryRecordStore::new();
        let tenant = TenantId::new("t");
        store
            .fail_writes_when("last_name", Value::String("Kaputt".into()))
            .await;

        assert!(store
            .create(&tenant, fields(&[("last_name", "Kaputt")]))
            .await
            .is_err());
        assert!(store
            .create(&tenant, fields(&[("last_name", "Meier")]))
            .await
            .is_ok());
    }
}
