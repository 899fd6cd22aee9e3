//! Cross-crate integration tests for the import pipeline. Shared fixtures
//! live here; the scenarios are in the test modules.

use engine_core::audit::CapturingAuditSink;
use engine_core::records::matcher::ExternalIdMatcher;
use engine_core::records::memory::InMemoryRecordStore;
use engine_core::store::sled_store::SledBatchStore;
use engine_runtime::pipeline::ImportPipeline;
use intake::limits::IntakeLimits;
use model::core::identifiers::TenantId;
use model::mapping::config::{MappingConfig, MappingEntry};
use std::sync::Arc;

mod integration;

pub struct TestHarness {
    pub pipeline: ImportPipeline,
    pub records: Arc<InMemoryRecordStore>,
    pub audit: Arc<CapturingAuditSink>,
    pub tenant: TenantId,
}

pub fn harness() -> TestHarness {
    harness_with_limits(IntakeLimits::default())
}

pub fn harness_with_limits(limits: IntakeLimits) -> TestHarness {
    let records = Arc::new(InMemoryRecordStore::new());
    let audit = Arc::new(CapturingAuditSink::new());
    let pipeline = ImportPipeline::new(
        Arc::new(SledBatchStore::temporary().expect("temporary sled store")),
        records.clone(),
        Arc::new(ExternalIdMatcher),
        audit.clone(),
        limits,
    );
    TestHarness {
        pipeline,
        records,
        audit,
        tenant: TenantId::new("tenant-a"),
    }
}

/// The standard three-column customer mapping used across scenarios.
pub fn customer_mapping() -> MappingConfig {
    MappingConfig::new(vec![
        MappingEntry::new("Name", "last_name"),
        MappingEntry::new("Email", "email"),
        MappingEntry::new("Kundennr", "external_id"),
    ])
}
