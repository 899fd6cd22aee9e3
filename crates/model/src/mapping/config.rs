use crate::core::identifiers::{TemplateId, TenantId};
use crate::mapping::dictionary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maps one source column onto one dictionary field, with optional
/// per-field transform hints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MappingEntry {
    pub source_column: String,
    pub target_field: String,
    /// chrono format string applied before the accepted-format list.
    #[serde(default)]
    pub date_format: Option<String>,
}

impl MappingEntry {
    pub fn new(source_column: &str, target_field: &str) -> Self {
        MappingEntry {
            source_column: source_column.to_string(),
            target_field: target_field.to_string(),
            date_format: None,
        }
    }

    pub fn with_date_format(mut self, format: &str) -> Self {
        self.date_format = Some(format.to_string());
        self
    }
}

/// An operator-confirmed column → field mapping for one batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MappingConfig {
    pub entries: Vec<MappingEntry>,
}

impl MappingConfig {
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        MappingConfig { entries }
    }

    pub fn entry_for_field(&self, target_field: &str) -> Option<&MappingEntry> {
        self.entries
            .iter()
            .find(|e| e.target_field.eq_ignore_ascii_case(target_field))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the target fields this config references that the validation
    /// engine does not recognize. An empty result means the config is usable.
    pub fn unknown_fields(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !dictionary::is_known_field(&e.target_field))
            .map(|e| e.target_field.clone())
            .collect()
    }
}

/// A tenant-scoped, named mapping config persisted for reuse across batches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingTemplate {
    pub id: TemplateId,
    pub tenant: TenantId,
    pub name: String,
    pub config: MappingConfig,
    pub created_at: DateTime<Utc>,
}

impl MappingTemplate {
    pub fn new(tenant: TenantId, name: &str, config: MappingConfig) -> Self {
        MappingTemplate {
            id: TemplateId::generate(),
            tenant,
            name: name.to_string(),
            config,
            created_at: Utc::now(),
        }
    }
}
