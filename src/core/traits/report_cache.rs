use std::fmt;

use serde::Serialize;

use crate::core::errors::{AnvilAuditError, Result};
use crate::core::models::report::AuditReport;

/// Port for caching completed audit reports between invocations.
///
/// Reports are stored in their serialized form so the cache stays agnostic
/// of the record and error types; expiry is the backend's concern.
pub trait ReportCache {
    /// Store a serialized report under its fixed key, replacing any
    /// previous entry.
    fn store(&self, key: &str, report: &serde_json::Value) -> Result<()>;

    /// Load a serialized report, or `None` when absent or expired.
    fn load(&self, key: &str) -> Result<Option<serde_json::Value>>;
}

/// Serialize a completed report and store it under its own cache key.
pub fn store_report<R, E>(cache: &dyn ReportCache, report: &AuditReport<R, E>) -> Result<()>
where
    R: PartialEq + fmt::Display + Serialize,
    E: Ord + fmt::Display + Serialize,
{
    let value = serde_json::to_value(report).map_err(|e| AnvilAuditError::Cache {
        detail: format!("Failed to serialize report for '{}': {e}", report.cache_key()),
    })?;
    cache.store(report.cache_key(), &value)
}
