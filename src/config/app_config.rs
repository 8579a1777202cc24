use serde::Deserialize;
use std::path::Path;

use crate::core::errors::{AnvilAuditError, Result};

pub const DEFAULT_CACHE_TTL_HOURS: i64 = 24;
pub const DEFAULT_CACHE_MAX_ENTRIES: u32 = 64;

/// Top-level configuration read from `anvil-audit.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub anvil: AnvilSection,
    pub audit: AuditSection,
}

impl AppConfig {
    /// Load and validate the configuration file.
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Err(AnvilAuditError::InvalidConfig {
                detail: format!(
                    "{} not found. Create it with [anvil] and [audit] sections first.",
                    config_path.display()
                ),
            });
        }
        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content).map_err(|e| AnvilAuditError::InvalidConfig {
            detail: format!("Failed to parse {}: {e}", config_path.display()),
        })?;

        if config.anvil.service_account_email.trim().is_empty() {
            return Err(AnvilAuditError::InvalidConfig {
                detail: "anvil.service_account_email must not be empty".into(),
            });
        }
        if config.anvil.api_url.trim().is_empty() {
            return Err(AnvilAuditError::InvalidConfig {
                detail: "anvil.api_url must not be empty".into(),
            });
        }
        if config.audit.cache_ttl_hours <= 0 {
            return Err(AnvilAuditError::InvalidConfig {
                detail: "audit.cache_ttl_hours must be at least 1".into(),
            });
        }

        Ok(config)
    }
}

/// The `[anvil]` section: how to reach and authenticate against Terra.
#[derive(Debug, Clone, Deserialize)]
pub struct AnvilSection {
    pub api_url: String,
    pub service_account_email: String,
    pub token_file: String,
}

/// The `[audit]` section: local snapshot and report cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditSection {
    pub snapshot: String,
    pub cache_dir: String,
    #[serde(default = "default_cache_ttl_hours")]
    pub cache_ttl_hours: i64,
    #[serde(default = "default_cache_max_entries")]
    pub cache_max_entries: u32,
}

fn default_cache_ttl_hours() -> i64 {
    DEFAULT_CACHE_TTL_HOURS
}

fn default_cache_max_entries() -> u32 {
    DEFAULT_CACHE_MAX_ENTRIES
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    const VALID: &str = r#"
        [anvil]
        api_url = "https://api.firecloud.org"
        service_account_email = "app@example.iam.gserviceaccount.com"
        token_file = ".anvil-audit/token"

        [audit]
        snapshot = "snapshot.json"
        cache_dir = ".anvil-audit/cache"
    "#;

    #[test]
    fn loads_with_cache_defaults() {
        let file = write_config(VALID);
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.audit.cache_ttl_hours, DEFAULT_CACHE_TTL_HOURS);
        assert_eq!(config.audit.cache_max_entries, DEFAULT_CACHE_MAX_ENTRIES);
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let err = AppConfig::load(Path::new("/nonexistent/anvil-audit.toml")).unwrap_err();
        assert!(matches!(err, AnvilAuditError::InvalidConfig { .. }));
    }

    #[test]
    fn empty_service_account_is_rejected() {
        let file = write_config(
            r#"
            [anvil]
            api_url = "https://api.firecloud.org"
            service_account_email = " "
            token_file = "token"

            [audit]
            snapshot = "snapshot.json"
            cache_dir = "cache"
            "#,
        );
        let err = AppConfig::load(file.path()).unwrap_err();
        match err {
            AnvilAuditError::InvalidConfig { detail } => {
                assert!(detail.contains("service_account_email"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let file = write_config(
            r#"
            [anvil]
            api_url = "https://api.firecloud.org"
            service_account_email = "app@example.iam.gserviceaccount.com"
            token_file = "token"

            [audit]
            snapshot = "snapshot.json"
            cache_dir = "cache"
            cache_ttl_hours = 0
            "#,
        );
        assert!(AppConfig::load(file.path()).is_err());
    }
}
