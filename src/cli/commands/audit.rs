use std::fmt;
use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::adapters::cache::file_report_cache::FileReportCache;
use crate::adapters::remote::firecloud_client::FirecloudClient;
use crate::adapters::store::snapshot_store::SnapshotStore;
use crate::cli::{AuditModel, context, output};
use crate::config::app_config::AppConfig;
use crate::core::errors::Result;
use crate::core::models::report::AuditReport;
use crate::core::services::accounts::AccountAuditor;
use crate::core::services::billing_projects::BillingProjectAuditor;
use crate::core::services::managed_groups::ManagedGroupAuditor;
use crate::core::services::workspaces::WorkspaceAuditor;
use crate::core::traits::local_store::LocalStore;

/// Execute the `anvil-audit audit` command.
///
/// Runs the selected audits in a fixed order and prints one line per
/// model, plus the exported problems when a model fails. A fatal API
/// error aborts the whole command.
pub fn execute(
    models: &[AuditModel],
    errors_only: bool,
    cache_results: bool,
    verbose: bool,
) -> Result<()> {
    let config = AppConfig::load(context::config_path())?;
    let store = SnapshotStore::load(Path::new(&config.audit.snapshot))?;
    let remote = FirecloudClient::new(
        &config.anvil.api_url,
        &config.anvil.service_account_email,
        Path::new(&config.anvil.token_file),
    )?;
    let cache = FileReportCache::new(
        PathBuf::from(&config.audit.cache_dir),
        config.audit.cache_ttl_hours,
        Some(config.audit.cache_max_entries),
    );

    if verbose {
        println!("Snapshot: {}", config.audit.snapshot);
        println!("API: {}", config.anvil.api_url);
    }

    let selected = AuditModel::selection(models);

    if cache_results
        && let Some(warning) = cache.capacity_warning(expected_cache_entries(&store, &selected)?)
    {
        output::warning(&warning);
    }

    for model in &selected {
        match model {
            AuditModel::BillingProject => {
                let report =
                    BillingProjectAuditor::new(&store, &remote, &cache).run(cache_results)?;
                print_outcome("BillingProjectAudit", &report, 0, errors_only);
            }
            AuditModel::Account => {
                let report = AccountAuditor::new(&store, &remote, &cache).run(cache_results)?;
                print_outcome("AccountAudit", &report, 0, errors_only);
            }
            AuditModel::ManagedGroup => {
                let n_ignored = ignored_membership_count(&store)?;
                let report =
                    ManagedGroupAuditor::new(&store, &remote, &cache).run(cache_results)?;
                print_outcome("ManagedGroupAudit", &report, n_ignored, errors_only);
            }
            AuditModel::Workspace => {
                let n_ignored = ignored_sharing_count(&store)?;
                let report = WorkspaceAuditor::new(&store, &remote, &cache).run(cache_results)?;
                print_outcome("WorkspaceAudit", &report, n_ignored, errors_only);
            }
        }
    }

    Ok(())
}

fn print_outcome<R, E>(
    name: &str,
    report: &AuditReport<R, E>,
    n_ignored: usize,
    errors_only: bool,
) where
    R: PartialEq + fmt::Display,
    E: Ord + fmt::Display,
{
    if report.ok() {
        if errors_only {
            return;
        }
        let mut msg = "ok!".to_string();
        if n_ignored > 0 {
            msg.push_str(&format!(" (ignoring {n_ignored} records)"));
        }
        println!("Running on {name}... {}", msg.green());
    } else {
        println!("Running on {name}... {}", "problems found.".red());
        let export = report.export(false, true, true, true);
        let text = serde_json::to_string_pretty(&export).unwrap_or_else(|_| export.to_string());
        println!("{text}");
    }
}

/// Number of cache entries one caching run will write: one per selected
/// model, plus one per managed group's membership report and one per
/// workspace's sharing report.
fn expected_cache_entries(store: &dyn LocalStore, selected: &[AuditModel]) -> Result<usize> {
    let mut count = selected.len();
    if selected.contains(&AuditModel::ManagedGroup) {
        count += store
            .managed_groups()?
            .iter()
            .filter(|g| g.is_managed_by_app)
            .count();
    }
    if selected.contains(&AuditModel::Workspace) {
        count += store.workspaces()?.len();
    }
    Ok(count)
}

fn ignored_membership_count(store: &dyn LocalStore) -> Result<usize> {
    let mut count = 0;
    for group in store.managed_groups()? {
        if group.is_managed_by_app {
            count += store.ignored_group_memberships(&group.name)?.len();
        }
    }
    Ok(count)
}

fn ignored_sharing_count(store: &dyn LocalStore) -> Result<usize> {
    let mut count = 0;
    for workspace in store.workspaces()? {
        count += store
            .ignored_workspace_sharing(&workspace.billing_project, &workspace.name)?
            .len();
    }
    Ok(count)
}
