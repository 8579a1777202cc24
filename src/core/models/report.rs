use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::core::errors::{AnvilAuditError, Result};

/// Audit outcome for one local record: the record plus the set of
/// discrepancies found for it. A record with an empty set is verified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordResult<R, E: Ord> {
    pub record: R,
    pub errors: BTreeSet<E>,
}

impl<R, E: Ord> RecordResult<R, E> {
    pub fn new(record: R) -> Self {
        Self {
            record,
            errors: BTreeSet::new(),
        }
    }

    /// Record a discrepancy. A record can accumulate several kinds at once.
    pub fn add_error(&mut self, error: E) {
        self.errors.insert(error);
    }

    /// Whether this record matched the remote state on every checked field.
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A record that exists on AnVIL but has no counterpart in the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotInAppResult {
    pub record: String,
}

impl NotInAppResult {
    pub fn new(record: impl Into<String>) -> Self {
        Self {
            record: record.into(),
        }
    }
}

impl fmt::Display for NotInAppResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.record)
    }
}

/// A remote-only record that was matched against an explicit ignore list
/// instead of being reported as not-in-app. `record` holds the current
/// remote value, or `None` when the ignored identifier is no longer
/// present remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoredResult {
    pub ignored_email: String,
    pub record: Option<String>,
}

impl IgnoredResult {
    pub fn new(ignored_email: impl Into<String>, record: Option<String>) -> Self {
        Self {
            ignored_email: ignored_email.into(),
            record,
        }
    }
}

/// Aggregate of one audit run, generic over the audited record type and
/// its closed set of error kinds.
///
/// The timestamp is frozen at construction so a cached report carries the
/// time the audit actually ran. Insertion order is preserved for all three
/// result lists; only `export` sorts the not-in-app section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport<R, E: Ord> {
    cache_key: String,
    pub timestamp: DateTime<Utc>,
    results: Vec<RecordResult<R, E>>,
    not_in_app: Vec<NotInAppResult>,
    ignored: Vec<IgnoredResult>,
}

impl<R, E> AuditReport<R, E>
where
    R: PartialEq + fmt::Display,
    E: Ord + fmt::Display,
{
    pub fn new(cache_key: impl Into<String>) -> Self {
        Self {
            cache_key: cache_key.into(),
            timestamp: Utc::now(),
            results: Vec::new(),
            not_in_app: Vec::new(),
            ignored: Vec::new(),
        }
    }

    /// Fixed cache key for this report.
    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    /// Add the outcome for a local record.
    ///
    /// Registering a second result for the same record is a caller bug:
    /// it returns an error and leaves the report unchanged.
    pub fn add_result(&mut self, result: RecordResult<R, E>) -> Result<()> {
        if self.results.iter().any(|r| r.record == result.record) {
            return Err(AnvilAuditError::DuplicateResult {
                record: result.record.to_string(),
            });
        }
        self.results.push(result);
        Ok(())
    }

    /// Add a remote-only record, rejecting duplicates.
    pub fn add_not_in_app(&mut self, result: NotInAppResult) -> Result<()> {
        if self.not_in_app.iter().any(|r| r.record == result.record) {
            return Err(AnvilAuditError::DuplicateResult {
                record: result.record.clone(),
            });
        }
        self.not_in_app.push(result);
        Ok(())
    }

    /// Add an ignored record, rejecting duplicate identifiers.
    pub fn add_ignored(&mut self, result: IgnoredResult) -> Result<()> {
        if self
            .ignored
            .iter()
            .any(|r| r.ignored_email == result.ignored_email)
        {
            return Err(AnvilAuditError::DuplicateResult {
                record: result.ignored_email.clone(),
            });
        }
        self.ignored.push(result);
        Ok(())
    }

    /// True iff no record has errors and nothing is missing from the app.
    /// Ignored entries do not affect the verdict.
    pub fn ok(&self) -> bool {
        self.results.iter().all(|r| r.ok()) && self.not_in_app.is_empty()
    }

    pub fn verified(&self) -> Vec<&RecordResult<R, E>> {
        self.results.iter().filter(|r| r.ok()).collect()
    }

    pub fn errors(&self) -> Vec<&RecordResult<R, E>> {
        self.results.iter().filter(|r| !r.ok()).collect()
    }

    pub fn not_in_app(&self) -> &[NotInAppResult] {
        &self.not_in_app
    }

    pub fn ignored(&self) -> &[IgnoredResult] {
        &self.ignored
    }

    /// Look up the result registered for a specific record.
    pub fn result_for(&self, record: &R) -> Option<&RecordResult<R, E>> {
        self.results.iter().find(|r| &r.record == record)
    }

    /// Number of ignore-list entries that matched this run.
    pub fn ignored_count(&self) -> usize {
        self.ignored.len()
    }

    /// Plain nested-JSON representation for reporting.
    ///
    /// Each section can be toggled off; `not_in_app` is sorted
    /// alphabetically here (and only here).
    pub fn export(
        &self,
        include_verified: bool,
        include_errors: bool,
        include_not_in_app: bool,
        include_ignored: bool,
    ) -> Value {
        let mut out = serde_json::Map::new();
        if include_verified {
            let verified: Vec<Value> = self
                .verified()
                .iter()
                .map(|r| json!({ "instance": r.record.to_string() }))
                .collect();
            out.insert("verified".to_string(), Value::Array(verified));
        }
        if include_errors {
            let errors: Vec<Value> = self
                .errors()
                .iter()
                .map(|r| {
                    json!({
                        "instance": r.record.to_string(),
                        "errors": r.errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
                    })
                })
                .collect();
            out.insert("errors".to_string(), Value::Array(errors));
        }
        if include_not_in_app {
            let mut records: Vec<&str> =
                self.not_in_app.iter().map(|r| r.record.as_str()).collect();
            records.sort_unstable();
            out.insert("not_in_app".to_string(), json!(records));
        }
        if include_ignored {
            let ignored: Vec<Value> = self
                .ignored
                .iter()
                .map(|r| json!({ "instance": r.ignored_email, "record": r.record }))
                .collect();
            out.insert("ignored".to_string(), Value::Array(ignored));
        }
        Value::Object(out)
    }
}
