use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::core::models::records::{AccessLevel, Workspace, WorkspaceSharing};
use crate::core::models::report::{AuditReport, IgnoredResult, NotInAppResult, RecordResult};
use crate::core::traits::local_store::LocalStore;
use crate::core::traits::remote_api::RemoteApi;
use crate::core::traits::report_cache::{ReportCache, store_report};

pub const WORKSPACE_AUDIT_CACHE_KEY: &str = "workspace_audit_results";

/// Cache key for one workspace's sharing report.
pub fn sharing_cache_key(billing_project: &str, workspace: &str) -> String {
    format!("workspace_sharing_{billing_project}/{workspace}")
}

/// Discrepancies a workspace can exhibit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkspaceError {
    /// The workspace does not exist on AnVIL.
    NotInAnvil,
    /// The service account has access but is not an owner.
    NotOwnerOnAnvil,
    /// The auth domain sets differ.
    DifferentAuthDomains,
    /// The workspace's sharing audit found problems.
    WorkspaceSharing,
    /// The lock flag differs.
    DifferentLock,
    /// The bucket's requester-pays flag differs.
    DifferentRequesterPays,
}

impl fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkspaceError::NotInAnvil => write!(f, "Not in AnVIL"),
            WorkspaceError::NotOwnerOnAnvil => write!(f, "Not an owner on AnVIL"),
            WorkspaceError::DifferentAuthDomains => {
                write!(f, "Has different auth domains on AnVIL")
            }
            WorkspaceError::WorkspaceSharing => {
                write!(f, "Workspace sharing does not match on AnVIL")
            }
            WorkspaceError::DifferentLock => {
                write!(f, "Workspace lock status does not match on AnVIL")
            }
            WorkspaceError::DifferentRequesterPays => write!(
                f,
                "Workspace bucket requester_pays status does not match on AnVIL"
            ),
        }
    }
}

/// Discrepancies a single sharing record can exhibit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SharingError {
    NotSharedInAnvil,
    DifferentAccess,
    DifferentCanCompute,
    DifferentCanShare,
}

impl fmt::Display for SharingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SharingError::NotSharedInAnvil => write!(f, "Not shared in AnVIL"),
            SharingError::DifferentAccess => write!(f, "Different access level in AnVIL"),
            SharingError::DifferentCanCompute => {
                write!(f, "can_compute value does not match in AnVIL")
            }
            SharingError::DifferentCanShare => {
                write!(f, "can_share value does not match in AnVIL")
            }
        }
    }
}

fn same_auth_domains(local: &[String], remote: &[String]) -> bool {
    let mut local: Vec<&String> = local.iter().collect();
    let mut remote: Vec<&String> = remote.iter().collect();
    local.sort();
    local.dedup();
    remote.sort();
    remote.dedup();
    local == remote
}

/// Audits workspaces against the service account's workspace listing.
pub struct WorkspaceAuditor<'a> {
    store: &'a dyn LocalStore,
    remote: &'a dyn RemoteApi,
    cache: &'a dyn ReportCache,
}

impl<'a> WorkspaceAuditor<'a> {
    pub fn new(
        store: &'a dyn LocalStore,
        remote: &'a dyn RemoteApi,
        cache: &'a dyn ReportCache,
    ) -> Self {
        Self {
            store,
            remote,
            cache,
        }
    }

    /// Match local workspaces against one bulk listing.
    ///
    /// Auth domains and lock status are checked for every listed
    /// workspace; sharing and requester-pays need owner-level access
    /// and are only audited when the app owns the workspace.
    pub fn run(&self, cache_results: bool) -> Result<AuditReport<Workspace, WorkspaceError>> {
        let mut report = AuditReport::new(WORKSPACE_AUDIT_CACHE_KEY);

        let listing = self.remote.list_workspaces()?;
        let mut listing_order: Vec<(String, String)> = Vec::new();
        let mut on_anvil = HashMap::new();
        for remote_workspace in listing {
            let key = (
                remote_workspace.namespace.clone(),
                remote_workspace.name.clone(),
            );
            listing_order.push(key.clone());
            on_anvil.insert(key, remote_workspace);
        }

        for workspace in self.store.workspaces()? {
            let mut result = RecordResult::new(workspace.clone());
            let key = (workspace.billing_project.clone(), workspace.name.clone());
            match on_anvil.remove(&key) {
                None => result.add_error(WorkspaceError::NotInAnvil),
                Some(remote_workspace) => {
                    if remote_workspace.access_level != AccessLevel::Owner.as_str() {
                        result.add_error(WorkspaceError::NotOwnerOnAnvil);
                    } else {
                        let sharing_report = WorkspaceSharingAuditor::new(
                            workspace.clone(),
                            self.store,
                            self.remote,
                            self.cache,
                        )
                        .run(cache_results)?;
                        if !sharing_report.ok() {
                            result.add_error(WorkspaceError::WorkspaceSharing);
                        }
                        let requester_pays = self
                            .remote
                            .get_workspace_requester_pays(&workspace.billing_project, &workspace.name)?;
                        if requester_pays != workspace.is_requester_pays {
                            result.add_error(WorkspaceError::DifferentRequesterPays);
                        }
                    }
                    if !same_auth_domains(
                        &workspace.authorization_domains,
                        &remote_workspace.auth_domains,
                    ) {
                        result.add_error(WorkspaceError::DifferentAuthDomains);
                    }
                    if remote_workspace.is_locked != workspace.is_locked {
                        result.add_error(WorkspaceError::DifferentLock);
                    }
                }
            }
            report.add_result(result)?;
        }

        // Owned workspaces the app does not track.
        for key in listing_order {
            if let Some(remote_workspace) = on_anvil.get(&key)
                && remote_workspace.access_level == AccessLevel::Owner.as_str()
            {
                report.add_not_in_app(NotInAppResult::new(format!(
                    "{}/{}",
                    remote_workspace.namespace, remote_workspace.name
                )))?;
            }
        }

        if cache_results {
            store_report(self.cache, &report)?;
        }
        Ok(report)
    }
}

/// Audits the sharing (ACL) of a single workspace the app owns.
pub struct WorkspaceSharingAuditor<'a> {
    workspace: Workspace,
    store: &'a dyn LocalStore,
    remote: &'a dyn RemoteApi,
    cache: &'a dyn ReportCache,
}

impl<'a> WorkspaceSharingAuditor<'a> {
    pub fn new(
        workspace: Workspace,
        store: &'a dyn LocalStore,
        remote: &'a dyn RemoteApi,
        cache: &'a dyn ReportCache,
    ) -> Self {
        Self {
            workspace,
            store,
            remote,
            cache,
        }
    }

    /// Compare local sharing records against the workspace ACL.
    ///
    /// ACL emails are lower-cased before matching and the service
    /// account's own entry is dropped. `can_share` has no local column;
    /// owners are expected to have it and nobody else.
    pub fn run(
        &self,
        cache_results: bool,
    ) -> Result<AuditReport<WorkspaceSharing, SharingError>> {
        let mut report = AuditReport::new(sharing_cache_key(
            &self.workspace.billing_project,
            &self.workspace.name,
        ));

        let service_account = self.remote.service_account_email().to_lowercase();
        let mut acl = self
            .remote
            .get_workspace_acl(&self.workspace.billing_project, &self.workspace.name)?;
        for entry in &mut acl {
            entry.email = entry.email.to_lowercase();
        }
        acl.retain(|entry| entry.email != service_account);

        for sharing in self
            .store
            .workspace_sharing(&self.workspace.billing_project, &self.workspace.name)?
        {
            let mut result = RecordResult::new(sharing.clone());
            let email = sharing.group_email.to_lowercase();
            match acl.iter().position(|entry| entry.email == email) {
                None => result.add_error(SharingError::NotSharedInAnvil),
                Some(pos) => {
                    let entry = acl.remove(pos);
                    if entry.access_level != sharing.access.as_str() {
                        result.add_error(SharingError::DifferentAccess);
                    }
                    if entry.can_compute != sharing.can_compute {
                        result.add_error(SharingError::DifferentCanCompute);
                    }
                    let expected_can_share = sharing.access == AccessLevel::Owner;
                    if entry.can_share != expected_can_share {
                        result.add_error(SharingError::DifferentCanShare);
                    }
                }
            }
            report.add_result(result)?;
        }

        // The ignore list claims leftovers before they become not-in-app.
        for ignored_email in self
            .store
            .ignored_workspace_sharing(&self.workspace.billing_project, &self.workspace.name)?
        {
            let email = ignored_email.to_lowercase();
            let record = match acl.iter().position(|entry| entry.email == email) {
                Some(pos) => {
                    let entry = acl.remove(pos);
                    Some(format!("{}: {}", entry.access_level, entry.email))
                }
                None => None,
            };
            report.add_ignored(IgnoredResult::new(ignored_email, record))?;
        }

        for entry in acl {
            report.add_not_in_app(NotInAppResult::new(format!(
                "{}: {}",
                entry.access_level, entry.email
            )))?;
        }

        if cache_results {
            store_report(self.cache, &report)?;
        }
        Ok(report)
    }
}
