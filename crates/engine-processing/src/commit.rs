use crate::rules::{check_field, coercion_issue};
use engine_core::error::PipelineError;
use engine_core::records::{RecordStore, matcher::RecordMatcher};
use engine_core::store::BatchStore;
use model::core::identifiers::{BatchId, TenantId};
use model::core::value::Value;
use model::mapping::dictionary;
use model::records::outcome::{CommitSummary, RollbackRecord, RowAction, SkipReason};
use model::records::row::PreviewRow;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{info, warn};

/// Operator inputs for one commit attempt.
#[derive(Debug, Clone, Default)]
pub struct CommitRequest {
    /// Rows the operator excluded outright (by row number).
    pub excluded_rows: HashSet<u32>,
    /// Just-in-time corrections: row number → field → replacement raw value.
    /// Only the edited fields are re-checked; full validation is not re-run.
    pub overrides: HashMap<u32, HashMap<String, String>>,
    pub dry_run: bool,
}

/// Executes the per-row create/update/skip decisions for a batch. Individual
/// write failures become `Failed` outcomes and never abort the remaining
/// rows; the caller always receives the complete picture.
pub struct CommitEngine<'a> {
    pub batch_store: &'a dyn BatchStore,
    pub record_store: &'a dyn RecordStore,
    pub matcher: &'a dyn RecordMatcher,
}

impl CommitEngine<'_> {
    pub async fn run(
        &self,
        tenant: &TenantId,
        batch_id: &BatchId,
        mut rows: Vec<PreviewRow>,
        request: &CommitRequest,
    ) -> Result<CommitSummary, PipelineError> {
        let start = Instant::now();
        let mut summary = CommitSummary {
            dry_run: request.dry_run,
            ..Default::default()
        };

        rows.sort_by_key(|r| r.row_number);
        for row in rows.iter_mut() {
            if request.excluded_rows.contains(&row.row_number) {
                summary.record(row.row_number, RowAction::Skipped {
                    reason: SkipReason::Excluded,
                });
                continue;
            }

            if let Some(edits) = request.overrides.get(&row.row_number) {
                apply_overrides(row, edits);
            }

            if row.is_blocked() {
                summary.record(row.row_number, RowAction::Skipped {
                    reason: SkipReason::Blocked,
                });
                continue;
            }

            let action = self.write_row(tenant, batch_id, row, request.dry_run).await?;
            if let RowAction::Failed { error } = &action {
                warn!(row = row.row_number, error = %error, "Row write failed");
            }
            summary.record(row.row_number, action);
        }

        summary.duration_ms = start.elapsed().as_millis() as u64;
        info!(
            batch_id = batch_id.as_str(),
            created = summary.created,
            updated = summary.updated,
            skipped = summary.skipped,
            failed = summary.failed,
            dry_run = summary.dry_run,
            "Commit pass finished"
        );
        Ok(summary)
    }

    /// Decides update-vs-create for one unblocked row and performs (or, on a
    /// dry run, only reports) the write. Only batch-store faults bubble up;
    /// record-store trouble is folded into the outcome.
    async fn write_row(
        &self,
        tenant: &TenantId,
        batch_id: &BatchId,
        row: &PreviewRow,
        dry_run: bool,
    ) -> Result<RowAction, PipelineError> {
        let matched = match self.matcher.find_match(self.record_store, tenant, row).await {
            Ok(matched) => matched,
            Err(err) => {
                return Ok(RowAction::Failed {
                    error: format!("Match lookup failed: {err}"),
                });
            }
        };

        let fields = staged_fields(row);

        match matched {
            Some(record_id) => {
                if dry_run {
                    return Ok(RowAction::Updated { record_id });
                }

                let prior = match self.record_store.get(tenant, &record_id).await {
                    Ok(Some(record)) => record.fields,
                    Ok(None) => {
                        return Ok(RowAction::Failed {
                            error: format!("Matched record {record_id} no longer exists"),
                        });
                    }
                    Err(err) => return Ok(RowAction::Failed { error: err.to_string() }),
                };

                match self.record_store.update(tenant, &record_id, fields).await {
                    Ok(()) => {
                        self.batch_store
                            .append_rollback_records(tenant, batch_id, &[
                                RollbackRecord::Updated {
                                    row_number: row.row_number,
                                    record_id: record_id.clone(),
                                    prior_values: prior,
                                },
                            ])
                            .await?;
                        Ok(RowAction::Updated { record_id })
                    }
                    Err(err) => Ok(RowAction::Failed { error: err.to_string() }),
                }
            }
            None => {
                if dry_run {
                    return Ok(RowAction::Created { record_id: None });
                }

                match self.record_store.create(tenant, fields).await {
                    Ok(record_id) => {
                        self.batch_store
                            .append_rollback_records(tenant, batch_id, &[
                                RollbackRecord::Created {
                                    row_number: row.row_number,
                                    record_id: record_id.clone(),
                                },
                            ])
                            .await?;
                        Ok(RowAction::Created {
                            record_id: Some(record_id),
                        })
                    }
                    Err(err) => Ok(RowAction::Failed { error: err.to_string() }),
                }
            }
        }
    }
}

/// Applies operator edits to a staged row: re-coerce the edited field,
/// replace its issues with fresh findings for that field only.
fn apply_overrides(row: &mut PreviewRow, edits: &HashMap<String, String>) {
    for (field, raw) in edits {
        let Some(spec) = dictionary::find_field(field) else {
            continue;
        };
        row.clear_issues_for(spec.name);
        match spec.data_type.coerce(raw, None) {
            Ok(value) => {
                row.issues.extend(check_field(spec, &value));
                row.set_value(spec.name, value);
            }
            Err(err) => {
                row.issues.push(coercion_issue(spec.name, &err, raw));
                row.set_value(spec.name, Value::Null);
            }
        }
    }
}

/// Non-empty staged values, keyed by field name. Empty fields are not
/// written so updates never blank out existing data.
fn staged_fields(row: &PreviewRow) -> HashMap<String, Value> {
    row.fields
        .iter()
        .filter(|f| !f.value.is_empty())
        .map(|f| (f.name.clone(), f.value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply_mapping;
    use crate::validate::validate;
    use engine_core::records::matcher::ExternalIdMatcher;
    use engine_core::records::memory::InMemoryRecordStore;
    use engine_core::store::{BatchStore, sled_store::SledBatchStore};
    use model::mapping::config::{MappingConfig, MappingEntry};
    use model::records::row::RawRow;

    fn staged_rows(cells: &[&[(&str, &str)]]) -> Vec<PreviewRow> {
        let config = MappingConfig::new(vec![
            MappingEntry::new("Name", "last_name"),
            MappingEntry::new("Email", "email"),
            MappingEntry::new("Kundennr", "external_id"),
        ]);
        let raws: Vec<RawRow> = cells
            .iter()
            .enumerate()
            .map(|(i, row)| {
                RawRow::new(
                    (i + 1) as u32,
                    row.iter().map(|(h, v)| (h.to_string(), v.to_string())).collect(),
                )
            })
            .collect();
        let mut rows = apply_mapping(&config, &raws);
        validate(&mut rows);
        rows
    }

    fn engine<'a>(
        batch_store: &'a SledBatchStore,
        record_store: &'a InMemoryRecordStore,
        matcher: &'a ExternalIdMatcher,
    ) -> CommitEngine<'a> {
        CommitEngine {
            batch_store,
            record_store,
            matcher,
        }
    }

    #[tokio::test]
    async fn blocked_rows_are_skipped_and_valid_rows_created() {
        let batch_store = SledBatchStore::temporary().unwrap();
        let record_store = InMemoryRecordStore::new();
        let matcher = ExternalIdMatcher;
        let tenant = TenantId::new("t");
        let batch_id = BatchId::generate();

        let rows = staged_rows(&[
            &[("Name", ""), ("Email", "a@b.de")],
            &[("Name", "Meier"), ("Email", "m@example.com")],
            &[("Name", "Schulz"), ("Email", "s@example.com")],
        ]);

        let summary = engine(&batch_store, &record_store, &matcher)
            .run(&tenant, &batch_id, rows, &CommitRequest::default())
            .await
            .unwrap();

        assert_eq!(summary.created, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.failed, 0);
        assert_eq!(record_store.count(&tenant).await.unwrap(), 2);

        let log = batch_store.load_rollback_log(&tenant, &batch_id).await.unwrap();
        assert_eq!(log.len(), 2);
    }

    #[tokio::test]
    async fn dry_run_writes_nothing() {
        let batch_store = SledBatchStore::temporary().unwrap();
        let record_store = InMemoryRecordStore::new();
        let matcher = ExternalIdMatcher;
        let tenant = TenantId::new("t");
        let batch_id = BatchId::generate();

        let rows = staged_rows(&[&[("Name", "Meier"), ("Email", "m@example.com")]]);
        let request = CommitRequest {
            dry_run: true,
            ..Default::default()
        };

        let summary = engine(&batch_store, &record_store, &matcher)
            .run(&tenant, &batch_id, rows, &request)
            .await
            .unwrap();

        assert_eq!(summary.created, 1);
        assert!(summary.dry_run);
        assert_eq!(record_store.count(&tenant).await.unwrap(), 0);
        assert!(batch_store
            .load_rollback_log(&tenant, &batch_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn matched_external_ids_update_instead_of_create() {
        let batch_store = SledBatchStore::temporary().unwrap();
        let record_store = InMemoryRecordStore::new();
        let matcher = ExternalIdMatcher;
        let tenant = TenantId::new("t");
        let batch_id = BatchId::generate();

        let mut existing = HashMap::new();
        existing.insert("external_id".to_string(), Value::String("C-1".into()));
        existing.insert("last_name".to_string(), Value::String("Alt".into()));
        let existing_id = record_store.create(&tenant, existing).await.unwrap();

        let rows = staged_rows(&[&[
            ("Name", "Neu"),
            ("Email", "neu@example.com"),
            ("Kundennr", "C-1"),
        ]]);

        let summary = engine(&batch_store, &record_store, &matcher)
            .run(&tenant, &batch_id, rows, &CommitRequest::default())
            .await
            .unwrap();

        assert_eq!(summary.updated, 1);
        assert_eq!(summary.created, 0);

        let record = record_store.get(&tenant, &existing_id).await.unwrap().unwrap();
        assert_eq!(record.fields.get("last_name"), Some(&Value::String("Neu".into())));

        // Prior values are captured for rollback.
        let log = batch_store.load_rollback_log(&tenant, &batch_id).await.unwrap();
        match &log[0] {
            RollbackRecord::Updated { prior_values, .. } => {
                assert_eq!(prior_values.get("last_name"), Some(&Value::String("Alt".into())));
            }
            other => panic!("expected update record, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn overrides_unblock_edited_rows() {
        let batch_store = SledBatchStore::temporary().unwrap();
        let record_store = InMemoryRecordStore::new();
        let matcher = ExternalIdMatcher;
        let tenant = TenantId::new("t");
        let batch_id = BatchId::generate();

        let rows = staged_rows(&[&[("Name", ""), ("Email", "m@example.com")]]);
        assert!(rows[0].is_blocked());

        let mut edits = HashMap::new();
        edits.insert("last_name".to_string(), "Meier".to_string());
        let request = CommitRequest {
            overrides: HashMap::from([(1, edits)]),
            ..Default::default()
        };

        let summary = engine(&batch_store, &record_store, &matcher)
            .run(&tenant, &batch_id, rows, &request)
            .await
            .unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test]
    async fn bad_overrides_keep_the_row_blocked() {
        let batch_store = SledBatchStore::temporary().unwrap();
        let record_store = InMemoryRecordStore::new();
        let matcher = ExternalIdMatcher;
        let tenant = TenantId::new("t");
        let batch_id = BatchId::generate();

        let rows = staged_rows(&[&[("Name", ""), ("Email", "m@example.com")]]);
        let mut edits = HashMap::new();
        // Still empty after the edit: required check fails again.
        edits.insert("last_name".to_string(), "  ".to_string());
        let request = CommitRequest {
            overrides: HashMap::from([(1, edits)]),
            ..Default::default()
        };

        let summary = engine(&batch_store, &record_store, &matcher)
            .run(&tenant, &batch_id, rows, &request)
            .await
            .unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(record_store.count(&tenant).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn individual_write_failures_do_not_abort_the_batch() {
        let batch_store = SledBatchStore::temporary().unwrap();
        let record_store = InMemoryRecordStore::new();
        record_store
            .fail_writes_when("last_name", Value::String("Kaputt".into()))
            .await;
        let matcher = ExternalIdMatcher;
        let tenant = TenantId::new("t");
        let batch_id = BatchId::generate();

        let rows = staged_rows(&[
            &[("Name", "Kaputt"), ("Email", "k@example.com")],
            &[("Name", "Meier"), ("Email", "m@example.com")],
        ]);

        let summary = engine(&batch_store, &record_store, &matcher)
            .run(&tenant, &batch_id, rows, &CommitRequest::default())
            .await
            .unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.created, 1);
        assert_eq!(record_store.count(&tenant).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn excluded_rows_are_reported_as_skipped() {
        let batch_store = SledBatchStore::temporary().unwrap();
        let record_store = InMemoryRecordStore::new();
        let matcher = ExternalIdMatcher;
        let tenant = TenantId::new("t");
        let batch_id = BatchId::generate();

        let rows = staged_rows(&[&[("Name", "Meier"), ("Email", "m@example.com")]]);
        let request = CommitRequest {
            excluded_rows: HashSet::from([1]),
            ..Default::default()
        };

        let summary = engine(&batch_store, &record_store, &matcher)
            .run(&tenant, &batch_id, rows, &request)
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert!(matches!(
            summary.outcomes[0].action,
            RowAction::Skipped {
                reason: SkipReason::Excluded
            }
        ));
    }
}
