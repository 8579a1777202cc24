use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::errors::{AnvilAuditError, Result};
use crate::core::traits::report_cache::ReportCache;

/// On-disk wrapper around one cached report.
#[derive(Serialize, Deserialize)]
struct CacheEntry {
    cached_at: String,
    report: Value,
}

/// `ReportCache` writing one JSON file per key under a cache directory.
///
/// Keys can contain `/` (workspace sharing keys do); anything outside
/// `[A-Za-z0-9._-]` is mapped to `-` to keep file names flat.
pub struct FileReportCache {
    dir: PathBuf,
    ttl_hours: i64,
    max_entries: Option<u32>,
}

impl FileReportCache {
    pub fn new(dir: PathBuf, ttl_hours: i64, max_entries: Option<u32>) -> Self {
        Self {
            dir,
            ttl_hours,
            max_entries,
        }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }

    fn is_fresh(&self, cached_at: &str, path: &Path) -> Result<bool> {
        // ttl 0 disables expiry.
        if self.ttl_hours == 0 {
            return Ok(true);
        }
        let cached_at =
            chrono::DateTime::parse_from_rfc3339(cached_at).map_err(|e| AnvilAuditError::Cache {
                detail: format!("Invalid timestamp in '{}': {e}", path.display()),
            })?;
        let age = chrono::Utc::now().signed_duration_since(cached_at);
        Ok(age.num_hours() < self.ttl_hours)
    }

    /// Warn when the configured capacity cannot hold the expected number
    /// of entries. Advisory only; nothing is evicted.
    pub fn capacity_warning(&self, expected_entries: usize) -> Option<String> {
        let max = self.max_entries?;
        if (expected_entries as u64) > u64::from(max) {
            Some(format!(
                "Cache capacity ({max}) is below the expected number of reports ({expected_entries}); older entries will be overwritten on key collisions only"
            ))
        } else {
            None
        }
    }
}

impl ReportCache for FileReportCache {
    fn store(&self, key: &str, report: &Value) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| AnvilAuditError::Cache {
            detail: format!("Failed to create '{}': {e}", self.dir.display()),
        })?;
        let entry = CacheEntry {
            cached_at: chrono::Utc::now().to_rfc3339(),
            report: report.clone(),
        };
        let path = self.entry_path(key);
        let json = serde_json::to_string_pretty(&entry).map_err(|e| AnvilAuditError::Cache {
            detail: format!("Failed to serialize cache entry '{key}': {e}"),
        })?;
        std::fs::write(&path, json).map_err(|e| AnvilAuditError::Cache {
            detail: format!("Failed to write '{}': {e}", path.display()),
        })?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.entry_path(key);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AnvilAuditError::Cache {
                    detail: format!("Failed to read '{}': {e}", path.display()),
                });
            }
        };
        let entry: CacheEntry =
            serde_json::from_str(&content).map_err(|e| AnvilAuditError::Cache {
                detail: format!("Corrupt cache entry '{}': {e}", path.display()),
            })?;
        if self.is_fresh(&entry.cached_at, &path)? {
            Ok(Some(entry.report))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache(dir: &Path, ttl_hours: i64) -> FileReportCache {
        FileReportCache::new(dir.to_path_buf(), ttl_hours, None)
    }

    #[test]
    fn stored_report_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), 24);
        let report = json!({"ok": true, "verified": []});

        cache.store("billing_project_audit_results", &report).unwrap();
        let loaded = cache.load("billing_project_audit_results").unwrap();
        assert_eq!(loaded, Some(report));
    }

    #[test]
    fn absent_key_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(cache(dir.path(), 24).load("nothing").unwrap(), None);
    }

    #[test]
    fn keys_with_slashes_become_flat_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), 24);
        cache.store("workspace_sharing_bp/ws", &json!({})).unwrap();

        let files: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files, vec!["workspace_sharing_bp-ws.json".to_string()]);
        assert!(cache.load("workspace_sharing_bp/ws").unwrap().is_some());
    }

    #[test]
    fn expired_entry_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), 1);
        let stale = CacheEntry {
            cached_at: (chrono::Utc::now() - chrono::Duration::hours(2)).to_rfc3339(),
            report: json!({}),
        };
        std::fs::write(
            cache.entry_path("old"),
            serde_json::to_string(&stale).unwrap(),
        )
        .unwrap();

        assert_eq!(cache.load("old").unwrap(), None);
    }

    #[test]
    fn zero_ttl_never_expires() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), 0);
        let old = CacheEntry {
            cached_at: (chrono::Utc::now() - chrono::Duration::days(365)).to_rfc3339(),
            report: json!({"kept": true}),
        };
        std::fs::write(
            cache.entry_path("ancient"),
            serde_json::to_string(&old).unwrap(),
        )
        .unwrap();

        assert_eq!(cache.load("ancient").unwrap(), Some(json!({"kept": true})));
    }

    #[test]
    fn corrupt_entry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path(), 24);
        std::fs::write(cache.entry_path("bad"), "not json").unwrap();

        assert!(matches!(
            cache.load("bad").unwrap_err(),
            AnvilAuditError::Cache { .. }
        ));
    }

    #[test]
    fn capacity_warning_fires_only_when_undersized() {
        let dir = tempfile::tempdir().unwrap();
        let cache = FileReportCache::new(dir.path().to_path_buf(), 24, Some(2));
        assert!(cache.capacity_warning(2).is_none());
        assert!(cache.capacity_warning(3).is_some());

        let unlimited = FileReportCache::new(dir.path().to_path_buf(), 24, None);
        assert!(unlimited.capacity_warning(1000).is_none());
    }
}
