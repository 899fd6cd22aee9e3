pub mod status;

use crate::batch::status::BatchStatus;
use crate::core::identifiers::{BatchId, TenantId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const FILE_NAME_MAX_LEN: usize = 120;

/// One uploaded file's end-to-end import session. Never physically deleted;
/// terminal states are `Committed`-then-`RolledBack` and `Cancelled`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportBatch {
    pub id: BatchId,
    pub tenant: TenantId,
    pub uploaded_by: String,
    pub file_name: String,
    pub byte_size: u64,
    pub total_rows: u64,
    pub status: BatchStatus,
    pub valid_count: u64,
    pub warning_count: u64,
    pub error_count: u64,
    pub created_at: DateTime<Utc>,
    pub mapped_at: Option<DateTime<Utc>>,
    pub validated_at: Option<DateTime<Utc>>,
    pub committed_at: Option<DateTime<Utc>>,
}

impl ImportBatch {
    pub fn new(
        tenant: TenantId,
        uploaded_by: &str,
        file_name: &str,
        byte_size: u64,
        total_rows: u64,
    ) -> Self {
        ImportBatch {
            id: BatchId::generate(),
            tenant,
            uploaded_by: uploaded_by.to_string(),
            file_name: sanitize_file_name(file_name),
            byte_size,
            total_rows,
            status: BatchStatus::Uploaded,
            valid_count: 0,
            warning_count: 0,
            error_count: 0,
            created_at: Utc::now(),
            mapped_at: None,
            validated_at: None,
            committed_at: None,
        }
    }

    /// Clears validation results, used when the batch is re-mapped.
    pub fn reset_validation(&mut self) {
        self.valid_count = 0;
        self.warning_count = 0;
        self.error_count = 0;
        self.validated_at = None;
    }
}

/// Restricts a declared file name to `[A-Za-z0-9._-]`, replacing everything
/// else with `_`, and caps the length. The result is safe to echo back in
/// listings and log lines.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    out.truncate(FILE_NAME_MAX_LEN);
    if out.is_empty() {
        out.push_str("upload");
    }
    out
}
