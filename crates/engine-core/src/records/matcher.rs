use crate::records::{EXTERNAL_ID_FIELD, RecordStore, RecordStoreError};
use async_trait::async_trait;
use model::core::identifiers::{RecordId, TenantId};
use model::core::value::Value;
use model::records::row::PreviewRow;

/// Decides whether a staged row corresponds to an existing production
/// record. Pluggable so deployments can swap the matching rule without
/// touching the commit engine.
#[async_trait]
pub trait RecordMatcher: Send + Sync {
    async fn find_match(
        &self,
        store: &dyn RecordStore,
        tenant: &TenantId,
        row: &PreviewRow,
    ) -> Result<Option<RecordId>, RecordStoreError>;
}

/// Default strategy: exact lookup on the external identifier carried by the
/// row. Rows without one never match.
pub struct ExternalIdMatcher;

#[async_trait]
impl RecordMatcher for ExternalIdMatcher {
    async fn find_match(
        &self,
        store: &dyn RecordStore,
        tenant: &TenantId,
        row: &PreviewRow,
    ) -> Result<Option<RecordId>, RecordStoreError> {
        let external_id = row.get_value(EXTERNAL_ID_FIELD);
        match external_id {
            Value::String(ext) if !ext.trim().is_empty() => Ok(store
                .find_by_external_id(tenant, ext.trim())
                .await?
                .map(|r| r.id)),
            _ => Ok(None),
        }
    }
}

/// Opt-in alternative: exact, case-insensitive equality on
/// last_name+street+city. No fuzzy matching.
pub struct NameAddressMatcher;

#[async_trait]
impl RecordMatcher for NameAddressMatcher {
    async fn find_match(
        &self,
        store: &dyn RecordStore,
        tenant: &TenantId,
        row: &PreviewRow,
    ) -> Result<Option<RecordId>, RecordStoreError> {
        let mut criteria = Vec::with_capacity(3);
        for field in ["last_name", "street", "city"] {
            let value = row.get_value(field);
            if value.is_empty() {
                // Partial addresses never match anything.
                return Ok(None);
            }
            criteria.push((field.to_string(), value));
        }
        Ok(store.find_by_exact(tenant, &criteria).await?.map(|r| r.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::memory::InMemoryRecordStore;
    use model::core::value::FieldValue;
    use std::collections::HashMap;

    fn preview(fields: &[(&str, &str)]) -> PreviewRow {
        PreviewRow::new(
            1,
            fields
                .iter()
                .map(|(k, v)| FieldValue::new(k, Value::String(v.to_string())))
                .collect(),
        )
    }

    #[tokio::test]
    async fn external_id_matcher_finds_existing_records() {
        let store = InMemoryRecordStore::new();
        let tenant = TenantId::new("t");
        let mut fields = HashMap::new();
        fields.insert("external_id".to_string(), Value::String("C-7".into()));
        let id = store.create(&tenant, fields).await.unwrap();

        let matched = ExternalIdMatcher
            .find_match(&store, &tenant, &preview(&[("external_id", "C-7")]))
            .await
            .unwrap();
        assert_eq!(matched, Some(id));

        let unmatched = ExternalIdMatcher
            .find_match(&store, &tenant, &preview(&[("last_name", "Meier")]))
            .await
            .unwrap();
        assert_eq!(unmatched, None);
    }

    #[tokio::test]
    async fn name_address_matcher_requires_all_three_fields() {
        let store = InMemoryRecordStore::new();
        let tenant = TenantId::new("t");
        let mut fields = HashMap::new();
        fields.insert("last_name".to_string(), Value::String("Meier".into()));
        fields.insert("street".to_string(), Value::String("Am Wall 1".into()));
        fields.insert("city".to_string(), Value::String("Bremen".into()));
        let id = store.create(&tenant, fields).await.unwrap();

        let matched = NameAddressMatcher
            .find_match(
                &store,
                &tenant,
                &preview(&[
                    ("last_name", "MEIER"),
                    ("street", "am wall 1"),
                    ("city", "Bremen"),
                ]),
            )
            .await
            .unwrap();
        assert_eq!(matched, Some(id));

        let partial = NameAddressMatcher
            .find_match(
                &store,
                &tenant,
                &preview(&[("last_name", "Meier"), ("city", "Bremen")]),
            )
            .await
            .unwrap();
        assert_eq!(partial, None);
    }
}
