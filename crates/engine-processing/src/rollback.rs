use engine_core::records::{RecordStore, RecordStoreError};
use model::core::identifiers::TenantId;
use model::records::outcome::{RollbackFailure, RollbackRecord, RollbackSummary};
use tracing::{info, warn};

/// Replays a batch's reversal log in reverse: created records are deleted,
/// updated records restored to their captured prior values. Per-record
/// failures are collected and surfaced; the replay never stops early.
pub async fn rollback(
    record_store: &dyn RecordStore,
    tenant: &TenantId,
    log: &[RollbackRecord],
) -> RollbackSummary {
    let mut summary = RollbackSummary::default();

    for entry in log.iter().rev() {
        let result: Result<(), RecordStoreError> = match entry {
            RollbackRecord::Created { record_id, .. } => {
                record_store.delete(tenant, record_id).await
            }
            RollbackRecord::Updated {
                record_id,
                prior_values,
                ..
            } => {
                record_store
                    .replace(tenant, record_id, prior_values.clone())
                    .await
            }
        };

        match (result, entry) {
            (Ok(()), RollbackRecord::Created { .. }) => summary.deleted += 1,
            (Ok(()), RollbackRecord::Updated { .. }) => summary.reverted += 1,
            (Err(err), _) => {
                warn!(
                    record_id = entry.record_id().as_str(),
                    error = %err,
                    "Rollback step failed"
                );
                summary.failed += 1;
                summary.failures.push(RollbackFailure {
                    record_id: entry.record_id().clone(),
                    error: err.to_string(),
                });
            }
        }
    }

    info!(
        deleted = summary.deleted,
        reverted = summary.reverted,
        failed = summary.failed,
        "Rollback replay finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::records::memory::InMemoryRecordStore;
    use model::core::identifiers::RecordId;
    use model::core::value::Value;
    use std::collections::HashMap;

    fn fields(pairs: &[(&str, &str)]) -> HashMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect()
    }

    #[tokio::test]
    async fn created_records_are_deleted_and_updates_restored() {
        let store = InMemoryRecordStore::new();
        let tenant = TenantId::new("t");

        let created_id = store
            .create(&tenant, fields(&[("last_name", "Neu")]))
            .await
            .unwrap();
        let updated_id = store
            .create(&tenant, fields(&[("last_name", "Alt")]))
            .await
            .unwrap();
        let prior = store.get(&tenant, &updated_id).await.unwrap().unwrap().fields;
        store
            .update(&tenant, &updated_id, fields(&[("last_name", "Geaendert")]))
            .await
            .unwrap();

        let log = vec![
            RollbackRecord::Created {
                row_number: 1,
                record_id: created_id.clone(),
            },
            RollbackRecord::Updated {
                row_number: 2,
                record_id: updated_id.clone(),
                prior_values: prior,
            },
        ];

        let summary = rollback(&store, &tenant, &log).await;
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.reverted, 1);
        assert_eq!(summary.failed, 0);

        assert!(store.get(&tenant, &created_id).await.unwrap().is_none());
        let restored = store.get(&tenant, &updated_id).await.unwrap().unwrap();
        assert_eq!(restored.fields.get("last_name"), Some(&Value::String("Alt".into())));
    }

    #[tokio::test]
    async fn failures_are_reported_per_record_and_replay_continues() {
        let store = InMemoryRecordStore::new();
        let tenant = TenantId::new("t");

        let good_id = store
            .create(&tenant, fields(&[("last_name", "Neu")]))
            .await
            .unwrap();

        let log = vec![
            RollbackRecord::Created {
                row_number: 1,
                record_id: good_id.clone(),
            },
            // Never existed: the delete fails, the pass continues.
            RollbackRecord::Created {
                row_number: 2,
                record_id: RecordId::new("ghost"),
            },
        ];

        let summary = rollback(&store, &tenant, &log).await;
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.failures[0].record_id.as_str(), "ghost");
        assert!(store.get(&tenant, &good_id).await.unwrap().is_none());
    }
}
