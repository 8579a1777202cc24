use std::fmt;
use std::path::PathBuf;

use serde::de::DeserializeOwned;

use crate::adapters::cache::file_report_cache::FileReportCache;
use crate::cli::{AuditModel, context, output};
use crate::config::app_config::AppConfig;
use crate::core::errors::{AnvilAuditError, Result};
use crate::core::models::records::{Account, BillingProject, ManagedGroup, Workspace};
use crate::core::models::report::AuditReport;
use crate::core::services::accounts::{ACCOUNT_AUDIT_CACHE_KEY, AccountError};
use crate::core::services::billing_projects::{
    BILLING_PROJECT_AUDIT_CACHE_KEY, BillingProjectError,
};
use crate::core::services::managed_groups::{MANAGED_GROUP_AUDIT_CACHE_KEY, ManagedGroupError};
use crate::core::services::workspaces::{WORKSPACE_AUDIT_CACHE_KEY, WorkspaceError};
use crate::core::traits::report_cache::ReportCache;

/// Execute the `anvil-audit report` command.
///
/// Prints the cached report for each selected model. A model without a
/// fresh cache entry is an error.
pub fn execute(models: &[AuditModel]) -> Result<()> {
    let config = AppConfig::load(context::config_path())?;
    let cache = FileReportCache::new(
        PathBuf::from(&config.audit.cache_dir),
        config.audit.cache_ttl_hours,
        Some(config.audit.cache_max_entries),
    );

    for model in AuditModel::selection(models) {
        match model {
            AuditModel::BillingProject => {
                print_cached::<BillingProject, BillingProjectError>(
                    &cache,
                    BILLING_PROJECT_AUDIT_CACHE_KEY,
                    "BillingProjectAudit",
                )?;
            }
            AuditModel::Account => {
                print_cached::<Account, AccountError>(
                    &cache,
                    ACCOUNT_AUDIT_CACHE_KEY,
                    "AccountAudit",
                )?;
            }
            AuditModel::ManagedGroup => {
                print_cached::<ManagedGroup, ManagedGroupError>(
                    &cache,
                    MANAGED_GROUP_AUDIT_CACHE_KEY,
                    "ManagedGroupAudit",
                )?;
            }
            AuditModel::Workspace => {
                print_cached::<Workspace, WorkspaceError>(
                    &cache,
                    WORKSPACE_AUDIT_CACHE_KEY,
                    "WorkspaceAudit",
                )?;
            }
        }
    }

    Ok(())
}

fn print_cached<R, E>(cache: &dyn ReportCache, key: &str, name: &str) -> Result<()>
where
    R: PartialEq + fmt::Display + DeserializeOwned,
    E: Ord + fmt::Display + DeserializeOwned,
{
    let value = cache.load(key)?.ok_or(AnvilAuditError::NoCachedResult)?;
    let report: AuditReport<R, E> =
        serde_json::from_value(value).map_err(|e| AnvilAuditError::Cache {
            detail: format!("Corrupt cached report '{key}': {e}"),
        })?;

    output::header(&format!(
        "{name} (cached {})",
        report.timestamp.to_rfc3339()
    ));
    let export = report.export(true, true, true, true);
    let text = serde_json::to_string_pretty(&export).unwrap_or_else(|_| export.to_string());
    println!("{text}");
    Ok(())
}
