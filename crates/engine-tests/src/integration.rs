#[cfg(test)]
mod tests {
    use crate::{customer_mapping, harness, harness_with_limits};
    use engine_core::error::PipelineError;
    use engine_core::records::RecordStore;
    use engine_processing::commit::CommitRequest;
    use intake::error::IntakeError;
    use intake::limits::IntakeLimits;
    use model::batch::status::BatchStatus;
    use model::core::identifiers::BatchId;
    use model::core::value::Value;
    use model::pagination::PageRequest;
    use std::collections::HashMap;

    const THREE_ROWS: &[u8] = b"Name,Email,Kundennr\n\
        ,missing@example.com,\n\
        Meier,m@example.com,\n\
        Schulz,s@example.com,\n";

    async fn upload_and_map(h: &crate::TestHarness, csv: &[u8]) -> BatchId {
        let id = h
            .pipeline
            .upload(&h.tenant, "ops@acme", "kunden.csv", csv)
            .await
            .expect("upload")
            .batch
            .id;
        h.pipeline
            .apply_mapping(&h.tenant, &id, customer_mapping(), None)
            .await
            .expect("apply mapping");
        id
    }

    #[tokio::test]
    async fn upload_starts_uploaded_with_exact_row_count() {
        let h = harness();
        let result = h
            .pipeline
            .upload(&h.tenant, "ops@acme", "kunden.csv", THREE_ROWS)
            .await
            .unwrap();
        assert_eq!(result.batch.status, BatchStatus::Uploaded);
        // Header excluded.
        assert_eq!(result.batch.total_rows, 3);
    }

    #[tokio::test]
    async fn signature_mismatch_creates_no_batch() {
        let h = harness();
        let err = h
            .pipeline
            .upload(&h.tenant, "ops@acme", "kunden.xlsx", THREE_ROWS)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Intake(IntakeError::InvalidFormat(_))
        ));
        let listed = h
            .pipeline
            .list_batches(&h.tenant, None, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(listed.total, 0);
    }

    #[tokio::test]
    async fn oversize_uploads_are_rejected_before_decoding() {
        let h = harness_with_limits(IntakeLimits::new(16, 10_000));
        let err = h
            .pipeline
            .upload(&h.tenant, "ops@acme", "kunden.csv", THREE_ROWS)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Intake(IntakeError::TooLarge { .. })
        ));
    }

    #[tokio::test]
    async fn row_ceiling_is_enforced() {
        let h = harness_with_limits(IntakeLimits::new(1024 * 1024, 2));
        let err = h
            .pipeline
            .upload(&h.tenant, "ops@acme", "kunden.csv", THREE_ROWS)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Intake(IntakeError::TooManyRows { .. })
        ));
    }

    #[tokio::test]
    async fn applying_the_same_mapping_twice_is_idempotent() {
        let h = harness();
        let id = upload_and_map(&h, THREE_ROWS).await;
        let first = h
            .pipeline
            .preview_page(&h.tenant, &id, PageRequest::new(1, 100), false)
            .await
            .unwrap();

        h.pipeline
            .apply_mapping(&h.tenant, &id, customer_mapping(), None)
            .await
            .unwrap();
        let second = h
            .pipeline
            .preview_page(&h.tenant, &id, PageRequest::new(1, 100), false)
            .await
            .unwrap();

        assert_eq!(first.items, second.items);
    }

    #[tokio::test]
    async fn three_row_scenario_counts_match_the_contract() {
        let h = harness();
        let id = upload_and_map(&h, THREE_ROWS).await;

        let summary = h.pipeline.validate(&h.tenant, &id).await.unwrap();
        assert_eq!(summary.error_count, 1);
        assert_eq!(summary.valid_count, 2);

        let commit = h
            .pipeline
            .commit(&h.tenant, &id, CommitRequest::default())
            .await
            .unwrap();
        assert_eq!(commit.created, 2);
        assert_eq!(commit.skipped, 1);
        assert_eq!(commit.failed, 0);
        assert_eq!(h.records.count(&h.tenant).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn commit_then_rollback_restores_record_count() {
        let h = harness();
        let csv = b"Name,Email,Kundennr\nMeier,m@example.com,\n";
        let id = upload_and_map(&h, csv).await;
        h.pipeline.validate(&h.tenant, &id).await.unwrap();

        let before = h.records.count(&h.tenant).await.unwrap();
        let commit = h
            .pipeline
            .commit(&h.tenant, &id, CommitRequest::default())
            .await
            .unwrap();
        assert_eq!(commit.created, 1);
        assert_eq!(h.records.count(&h.tenant).await.unwrap(), before + 1);

        let rollback = h
            .pipeline
            .rollback(&h.tenant, &id, "wrong file")
            .await
            .unwrap();
        assert_eq!(rollback.deleted, 1);
        assert_eq!(h.records.count(&h.tenant).await.unwrap(), before);

        let err = h
            .pipeline
            .rollback(&h.tenant, &id, "twice")
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::AlreadyRolledBack));
    }

    #[tokio::test]
    async fn rollback_restores_updated_records_to_prior_values() {
        let h = harness();

        let mut existing = HashMap::new();
        existing.insert("external_id".to_string(), Value::String("C-1".into()));
        existing.insert("last_name".to_string(), Value::String("Alt".into()));
        let existing_id = h.records.create(&h.tenant, existing).await.unwrap();

        let csv = b"Name,Email,Kundennr\nNeu,n@example.com,C-1\n";
        let id = upload_and_map(&h, csv).await;
        h.pipeline.validate(&h.tenant, &id).await.unwrap();

        let commit = h
            .pipeline
            .commit(&h.tenant, &id, CommitRequest::default())
            .await
            .unwrap();
        assert_eq!(commit.updated, 1);
        let changed = h.records.get(&h.tenant, &existing_id).await.unwrap().unwrap();
        assert_eq!(
            changed.fields.get("last_name"),
            Some(&Value::String("Neu".into()))
        );

        let rollback = h
            .pipeline
            .rollback(&h.tenant, &id, "restore")
            .await
            .unwrap();
        assert_eq!(rollback.reverted, 1);

        let restored = h.records.get(&h.tenant, &existing_id).await.unwrap().unwrap();
        assert_eq!(
            restored.fields.get("last_name"),
            Some(&Value::String("Alt".into()))
        );
        // The update's e-mail merge is undone too.
        assert_eq!(restored.fields.get("email"), None);
    }

    #[tokio::test]
    async fn dry_run_never_transitions_nor_writes() {
        let h = harness();
        let id = upload_and_map(&h, THREE_ROWS).await;
        h.pipeline.validate(&h.tenant, &id).await.unwrap();

        let request = CommitRequest {
            dry_run: true,
            ..Default::default()
        };
        let summary = h.pipeline.commit(&h.tenant, &id, request).await.unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.created, 2);
        assert_eq!(h.records.count(&h.tenant).await.unwrap(), 0);
        assert_eq!(
            h.pipeline.get_batch(&h.tenant, &id).await.unwrap().status,
            BatchStatus::Validated
        );

        // A real commit still works afterwards.
        let real = h
            .pipeline
            .commit(&h.tenant, &id, CommitRequest::default())
            .await
            .unwrap();
        assert_eq!(real.created, 2);
    }

    #[tokio::test]
    async fn second_commit_fails_with_invalid_state() {
        let h = harness();
        let id = upload_and_map(&h, THREE_ROWS).await;
        h.pipeline.validate(&h.tenant, &id).await.unwrap();
        h.pipeline
            .commit(&h.tenant, &id, CommitRequest::default())
            .await
            .unwrap();

        let err = h
            .pipeline
            .commit(&h.tenant, &id, CommitRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidState {
                actual: BatchStatus::Committed,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn row_edits_at_commit_time_unblock_rows() {
        let h = harness();
        let id = upload_and_map(&h, THREE_ROWS).await;
        h.pipeline.validate(&h.tenant, &id).await.unwrap();

        let mut edits = HashMap::new();
        edits.insert("last_name".to_string(), "Lange".to_string());
        let request = CommitRequest {
            overrides: HashMap::from([(1, edits)]),
            ..Default::default()
        };

        let summary = h.pipeline.commit(&h.tenant, &id, request).await.unwrap();
        assert_eq!(summary.created, 3);
        assert_eq!(summary.skipped, 0);
    }

    #[tokio::test]
    async fn cancel_is_rejected_once_committed() {
        let h = harness();
        let id = upload_and_map(&h, THREE_ROWS).await;
        h.pipeline.validate(&h.tenant, &id).await.unwrap();
        h.pipeline
            .commit(&h.tenant, &id, CommitRequest::default())
            .await
            .unwrap();

        let err = h.pipeline.cancel(&h.tenant, &id).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidState { .. }));

        // Rollback remains the only undo path.
        h.pipeline.rollback(&h.tenant, &id, "undo").await.unwrap();
    }

    #[tokio::test]
    async fn independent_batches_commit_in_parallel() {
        let h = harness();
        let first = upload_and_map(&h, THREE_ROWS).await;
        let second = upload_and_map(&h, THREE_ROWS).await;
        h.pipeline.validate(&h.tenant, &first).await.unwrap();
        h.pipeline.validate(&h.tenant, &second).await.unwrap();

        let (a, b) = tokio::join!(
            h.pipeline.commit(&h.tenant, &first, CommitRequest::default()),
            h.pipeline.commit(&h.tenant, &second, CommitRequest::default()),
        );
        assert_eq!(a.unwrap().created, 2);
        assert_eq!(b.unwrap().created, 2);
        assert_eq!(h.records.count(&h.tenant).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn audit_sink_sees_the_whole_lifecycle() {
        let h = harness();
        let id = upload_and_map(&h, THREE_ROWS).await;
        h.pipeline.validate(&h.tenant, &id).await.unwrap();
        h.pipeline
            .commit(&h.tenant, &id, CommitRequest::default())
            .await
            .unwrap();
        h.pipeline.rollback(&h.tenant, &id, "test").await.unwrap();

        assert_eq!(h.audit.event_types(), vec![
            "import.uploaded",
            "import.mapping_applied",
            "import.validated",
            "import.committed",
            "import.rolled_back",
        ]);
    }

    #[tokio::test]
    async fn suggestions_cover_the_uploaded_headers() {
        let h = harness();
        let csv = b"Surname,E-Mail,ZIP\nMeier,m@example.com,28195\n";
        let id = h
            .pipeline
            .upload(&h.tenant, "ops@acme", "kunden.csv", csv)
            .await
            .unwrap()
            .batch
            .id;

        let suggestions = h.pipeline.suggest_mapping(&h.tenant, &id).await.unwrap();
        let pick = |field: &str| {
            suggestions
                .iter()
                .find(|s| s.target_field == field)
                .and_then(|s| s.source_column.clone())
        };
        assert_eq!(pick("last_name").as_deref(), Some("Surname"));
        assert_eq!(pick("email").as_deref(), Some("E-Mail"));
        assert_eq!(pick("postal_code").as_deref(), Some("ZIP"));
    }
}
