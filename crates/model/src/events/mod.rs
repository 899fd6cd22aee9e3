use crate::batch::status::BatchStatus;
use crate::core::identifiers::{BatchId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle events emitted to the audit sink. Delivery is fire-and-forget;
/// the pipeline never blocks on a slow sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImportEvent {
    Uploaded {
        tenant: TenantId,
        batch_id: BatchId,
        file_name: String,
        row_count: u64,
        timestamp: DateTime<Utc>,
    },
    MappingApplied {
        tenant: TenantId,
        batch_id: BatchId,
        mapped_fields: usize,
        saved_template: Option<String>,
        timestamp: DateTime<Utc>,
    },
    Validated {
        tenant: TenantId,
        batch_id: BatchId,
        valid_count: u64,
        warning_count: u64,
        error_count: u64,
        timestamp: DateTime<Utc>,
    },
    Committed {
        tenant: TenantId,
        batch_id: BatchId,
        created: u64,
        updated: u64,
        skipped: u64,
        failed: u64,
        dry_run: bool,
        timestamp: DateTime<Utc>,
    },
    RolledBack {
        tenant: TenantId,
        batch_id: BatchId,
        deleted: u64,
        reverted: u64,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    Cancelled {
        tenant: TenantId,
        batch_id: BatchId,
        from_status: BatchStatus,
        timestamp: DateTime<Utc>,
    },
}

impl ImportEvent {
    /// Stable identifier for filtering/routing.
    pub fn event_type(&self) -> &'static str {
        match self {
            ImportEvent::Uploaded { .. } => "import.uploaded",
            ImportEvent::MappingApplied { .. } => "import.mapping_applied",
            ImportEvent::Validated { .. } => "import.validated",
            ImportEvent::Committed { .. } => "import.committed",
            ImportEvent::RolledBack { .. } => "import.rolled_back",
            ImportEvent::Cancelled { .. } => "import.cancelled",
        }
    }

    pub fn batch_id(&self) -> &BatchId {
        match self {
            ImportEvent::Uploaded { batch_id, .. }
            | ImportEvent::MappingApplied { batch_id, .. }
            | ImportEvent::Validated { batch_id, .. }
            | ImportEvent::Committed { batch_id, .. }
            | ImportEvent::RolledBack { batch_id, .. }
            | ImportEvent::Cancelled { batch_id, .. } => batch_id,
        }
    }

    pub fn tenant(&self) -> &TenantId {
        match self {
            ImportEvent::Uploaded { tenant, .. }
            | ImportEvent::MappingApplied { tenant, .. }
            | ImportEvent::Validated { tenant, .. }
            | ImportEvent::Committed { tenant, .. }
            | ImportEvent::RolledBack { tenant, .. }
            | ImportEvent::Cancelled { tenant, .. } => tenant,
        }
    }
}

impl fmt::Display for ImportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportEvent::Uploaded {
                batch_id,
                file_name,
                row_count,
                ..
            } => write!(f, "Uploaded '{file_name}': {row_count} rows (batch={batch_id})"),
            ImportEvent::MappingApplied {
                batch_id,
                mapped_fields,
                ..
            } => write!(f, "Mapping applied: {mapped_fields} fields (batch={batch_id})"),
            ImportEvent::Validated {
                batch_id,
                valid_count,
                warning_count,
                error_count,
                ..
            } => write!(
                f,
                "Validated: {valid_count} valid, {warning_count} warnings, {error_count} errors (batch={batch_id})"
            ),
            ImportEvent::Committed {
                batch_id,
                created,
                updated,
                skipped,
                failed,
                dry_run,
                ..
            } => write!(
                f,
                "Commit{}: {created} created, {updated} updated, {skipped} skipped, {failed} failed (batch={batch_id})",
                if *dry_run { " (dry run)" } else { "" }
            ),
            ImportEvent::RolledBack {
                batch_id,
                deleted,
                reverted,
                reason,
                ..
            } => write!(
                f,
                "Rolled back: {deleted} deleted, {reverted} reverted, reason '{reason}' (batch={batch_id})"
            ),
            ImportEvent::Cancelled {
                batch_id,
                from_status,
                ..
            } => write!(f, "Cancelled from {from_status} (batch={batch_id})"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_round_trip_through_json() {
        let event = ImportEvent::Validated {
            tenant: TenantId::new("t1"),
            batch_id: BatchId::new("b1"),
            valid_count: 2,
            warning_count: 1,
            error_count: 1,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&event).unwrap();
        let back: ImportEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type(), "import.validated");
        assert_eq!(back.batch_id().as_str(), "b1");
    }

    #[test]
    fn display_mentions_counts() {
        let event = ImportEvent::Committed {
            tenant: TenantId::new("t1"),
            batch_id: BatchId::new("b1"),
            created: 5,
            updated: 2,
            skipped: 1,
            failed: 0,
            dry_run: true,
            timestamp: Utc::now(),
        };
        let text = event.to_string();
        assert!(text.contains("dry run"));
        assert!(text.contains("5 created"));
    }
}
