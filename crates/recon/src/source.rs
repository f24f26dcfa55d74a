//! Catalog source adapters.
//!
//! The engine never parses files itself. Each source type (JSON file, CSV
//! export, in-memory fixture) implements [`CatalogSource`] and hands back raw
//! records; the loader normalizes them.

use crate::error::ReconError;
use crate::model::RawRecord;

pub trait CatalogSource {
    /// Human-readable label used in errors and reports (usually the file path).
    fn label(&self) -> &str;

    /// Vendor identifier that scopes records lacking their own vendor field.
    fn vendor(&self) -> &str;

    /// A required source that fails to load aborts the run.
    fn required(&self) -> bool {
        true
    }

    fn load(&self) -> Result<Vec<RawRecord>, ReconError>;
}

/// Records held in memory. Used by tests and by callers that build catalogs
/// programmatically.
#[derive(Debug, Clone)]
pub struct MemorySource {
    pub label: String,
    pub vendor: String,
    pub records: Vec<RawRecord>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>, vendor: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            label: label.into(),
            vendor: vendor.into(),
            records,
        }
    }

    /// Build from a JSON array literal. Non-object elements are kept out.
    pub fn from_json(label: &str, vendor: &str, value: serde_json::Value) -> Self {
        let records = match value {
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::Object(map) => Some(map),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        Self::new(label, vendor, records)
    }
}

impl CatalogSource for MemorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn vendor(&self) -> &str {
        &self.vendor
    }

    fn load(&self) -> Result<Vec<RawRecord>, ReconError> {
        Ok(self.records.clone())
    }
}
