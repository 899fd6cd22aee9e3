use crate::core::identifiers::RecordId;
use crate::core::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Why a row was skipped during commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Explicitly excluded by the operator.
    Excluded,
    /// Carries at least one unresolved error-severity issue.
    Blocked,
}

/// Per-row result of a commit attempt. Row-level write failures are data,
/// not errors; the batch keeps going.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RowAction {
    /// The id is absent on dry runs, where nothing was written yet.
    Created { record_id: Option<RecordId> },
    Updated { record_id: RecordId },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommitOutcome {
    pub row_number: u32,
    #[serde(flatten)]
    pub action: RowAction,
}

/// Aggregate view of a commit (or dry run) over one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitSummary {
    pub created: u64,
    pub updated: u64,
    pub skipped: u64,
    pub failed: u64,
    pub dry_run: bool,
    pub duration_ms: u64,
    pub outcomes: Vec<CommitOutcome>,
}

impl CommitSummary {
    pub fn record(&mut self, row_number: u32, action: RowAction) {
        match &action {
            RowAction::Created { .. } => self.created += 1,
            RowAction::Updated { .. } => self.updated += 1,
            RowAction::Skipped { .. } => self.skipped += 1,
            RowAction::Failed { .. } => self.failed += 1,
        }
        self.outcomes.push(CommitOutcome { row_number, action });
    }
}

/// One entry per row actually written during commit, holding enough prior
/// state to reverse the write exactly once. Externally tagged so the bincode
/// persistence round-trips.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum RollbackRecord {
    Created {
        row_number: u32,
        record_id: RecordId,
    },
    Updated {
        row_number: u32,
        record_id: RecordId,
        prior_values: HashMap<String, Value>,
    },
}

impl RollbackRecord {
    pub fn record_id(&self) -> &RecordId {
        match self {
            RollbackRecord::Created { record_id, .. } => record_id,
            RollbackRecord::Updated { record_id, .. } => record_id,
        }
    }
}

/// Per-record rollback failure, surfaced for manual follow-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollbackFailure {
    pub record_id: RecordId,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollbackSummary {
    pub deleted: u64,
    pub reverted: u64,
    pub failed: u64,
    pub failures: Vec<RollbackFailure>,
}
