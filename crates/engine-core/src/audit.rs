use model::events::ImportEvent;
use std::sync::Mutex;
use tracing::info;

/// Fire-and-forget audit seam. Implementations must never block the
/// pipeline; a slow or broken sink loses events, not imports.
pub trait AuditSink: Send + Sync {
    fn emit(&self, event: ImportEvent);
}

/// Default sink: structured log lines via `tracing`.
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: ImportEvent) {
        info!(
            event_type = event.event_type(),
            tenant = event.tenant().as_str(),
            batch_id = event.batch_id().as_str(),
            "{event}"
        );
    }
}

/// Test sink that records everything it sees.
#[derive(Default)]
pub struct CapturingAuditSink {
    events: Mutex<Vec<ImportEvent>>,
}

impl CapturingAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ImportEvent> {
        self.events.lock().expect("audit sink poisoned").clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events().iter().map(|e| e.event_type()).collect()
    }
}

impl AuditSink for CapturingAuditSink {
    fn emit(&self, event: ImportEvent) {
        self.events.lock().expect("audit sink poisoned").push(event);
    }
}
