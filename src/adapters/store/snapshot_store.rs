use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::core::errors::{AnvilAuditError, Result};
use crate::core::models::records::{
    AccessLevel, Account, AccountMembership, AccountStatus, BillingProject, GroupMembership,
    GroupRole, ManagedGroup, Workspace, WorkspaceSharing,
};
use crate::core::traits::local_store::LocalStore;

/// Raw shape of the snapshot file. Membership and sharing rows reference
/// other records by name or email; the joins happen at load time.
#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    billing_projects: Vec<BillingProject>,
    #[serde(default)]
    accounts: Vec<Account>,
    #[serde(default)]
    managed_groups: Vec<ManagedGroup>,
    #[serde(default)]
    workspaces: Vec<Workspace>,
    #[serde(default)]
    group_account_memberships: Vec<RawAccountMembership>,
    #[serde(default)]
    group_group_memberships: Vec<RawGroupMembership>,
    #[serde(default)]
    workspace_sharing: Vec<RawWorkspaceSharing>,
    #[serde(default)]
    ignored_group_memberships: Vec<RawIgnoredMembership>,
    #[serde(default)]
    ignored_workspace_sharing: Vec<RawIgnoredSharing>,
}

#[derive(Deserialize)]
struct RawAccountMembership {
    group: String,
    account_email: String,
    role: GroupRole,
}

#[derive(Deserialize)]
struct RawGroupMembership {
    parent_group: String,
    child_group: String,
    role: GroupRole,
}

#[derive(Deserialize)]
struct RawWorkspaceSharing {
    billing_project: String,
    workspace: String,
    group: String,
    access: AccessLevel,
    can_compute: bool,
}

#[derive(Deserialize)]
struct RawIgnoredMembership {
    group: String,
    ignored_email: String,
}

#[derive(Deserialize)]
struct RawIgnoredSharing {
    billing_project: String,
    workspace: String,
    ignored_email: String,
}

/// `LocalStore` over a JSON snapshot file exported from the tracking
/// database. The whole snapshot is resolved up front so every dangling
/// reference fails the load instead of surfacing mid-audit.
#[derive(Debug)]
pub struct SnapshotStore {
    billing_projects: Vec<BillingProject>,
    accounts: Vec<Account>,
    managed_groups: Vec<ManagedGroup>,
    workspaces: Vec<Workspace>,
    account_memberships: Vec<AccountMembership>,
    group_memberships: Vec<GroupMembership>,
    sharing: Vec<WorkspaceSharing>,
    ignored_memberships: Vec<(String, String)>,
    ignored_sharing: Vec<(String, String, String)>,
}

impl SnapshotStore {
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|_| AnvilAuditError::FileNotFound {
                path: path.to_path_buf(),
            })?;
        let raw: RawSnapshot =
            serde_json::from_str(&content).map_err(|e| AnvilAuditError::Snapshot {
                path: path.to_path_buf(),
                detail: format!("Invalid JSON: {e}"),
            })?;
        Self::resolve(raw).map_err(|detail| AnvilAuditError::Snapshot {
            path: path.to_path_buf(),
            detail,
        })
    }

    fn resolve(raw: RawSnapshot) -> std::result::Result<Self, String> {
        let account_status: HashMap<&str, AccountStatus> = raw
            .accounts
            .iter()
            .map(|a| (a.email.as_str(), a.status))
            .collect();
        let group_emails: HashMap<&str, &str> = raw
            .managed_groups
            .iter()
            .map(|g| (g.name.as_str(), g.email.as_str()))
            .collect();
        let workspace_keys: Vec<(&str, &str)> = raw
            .workspaces
            .iter()
            .map(|w| (w.billing_project.as_str(), w.name.as_str()))
            .collect();

        let group_exists = |name: &str| group_emails.contains_key(name);
        let workspace_exists =
            |bp: &str, ws: &str| workspace_keys.iter().any(|(b, w)| *b == bp && *w == ws);

        let mut account_memberships = Vec::with_capacity(raw.group_account_memberships.len());
        for row in raw.group_account_memberships {
            if !group_exists(&row.group) {
                return Err(format!(
                    "Membership references unknown group '{}'",
                    row.group
                ));
            }
            let status = account_status.get(row.account_email.as_str()).ok_or_else(|| {
                format!(
                    "Membership in '{}' references unknown account '{}'",
                    row.group, row.account_email
                )
            })?;
            account_memberships.push(AccountMembership {
                group: row.group,
                account_email: row.account_email,
                account_status: *status,
                role: row.role,
            });
        }

        let mut group_memberships = Vec::with_capacity(raw.group_group_memberships.len());
        for row in raw.group_group_memberships {
            if !group_exists(&row.parent_group) {
                return Err(format!(
                    "Membership references unknown group '{}'",
                    row.parent_group
                ));
            }
            let child_email = group_emails.get(row.child_group.as_str()).ok_or_else(|| {
                format!(
                    "Membership in '{}' references unknown group '{}'",
                    row.parent_group, row.child_group
                )
            })?;
            group_memberships.push(GroupMembership {
                parent_group: row.parent_group,
                child_email: child_email.to_string(),
                child_group: row.child_group,
                role: row.role,
            });
        }

        let mut sharing = Vec::with_capacity(raw.workspace_sharing.len());
        for row in raw.workspace_sharing {
            if !workspace_exists(&row.billing_project, &row.workspace) {
                return Err(format!(
                    "Sharing references unknown workspace '{}/{}'",
                    row.billing_project, row.workspace
                ));
            }
            let group_email = group_emails.get(row.group.as_str()).ok_or_else(|| {
                format!(
                    "Sharing on '{}/{}' references unknown group '{}'",
                    row.billing_project, row.workspace, row.group
                )
            })?;
            sharing.push(WorkspaceSharing {
                billing_project: row.billing_project,
                workspace: row.workspace,
                group_email: group_email.to_string(),
                group: row.group,
                access: row.access,
                can_compute: row.can_compute,
            });
        }

        for row in &raw.ignored_group_memberships {
            if !group_exists(&row.group) {
                return Err(format!(
                    "Ignore entry references unknown group '{}'",
                    row.group
                ));
            }
        }
        for row in &raw.ignored_workspace_sharing {
            if !workspace_exists(&row.billing_project, &row.workspace) {
                return Err(format!(
                    "Ignore entry references unknown workspace '{}/{}'",
                    row.billing_project, row.workspace
                ));
            }
        }

        Ok(Self {
            ignored_memberships: raw
                .ignored_group_memberships
                .into_iter()
                .map(|r| (r.group, r.ignored_email))
                .collect(),
            ignored_sharing: raw
                .ignored_workspace_sharing
                .into_iter()
                .map(|r| (r.billing_project, r.workspace, r.ignored_email))
                .collect(),
            billing_projects: raw.billing_projects,
            accounts: raw.accounts,
            managed_groups: raw.managed_groups,
            workspaces: raw.workspaces,
            account_memberships,
            group_memberships,
            sharing,
        })
    }
}

impl LocalStore for SnapshotStore {
    fn billing_projects(&self) -> Result<Vec<BillingProject>> {
        Ok(self.billing_projects.clone())
    }

    fn accounts(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.clone())
    }

    fn managed_groups(&self) -> Result<Vec<ManagedGroup>> {
        Ok(self.managed_groups.clone())
    }

    fn workspaces(&self) -> Result<Vec<Workspace>> {
        Ok(self.workspaces.clone())
    }

    fn group_account_memberships(&self, group: &str) -> Result<Vec<AccountMembership>> {
        Ok(self
            .account_memberships
            .iter()
            .filter(|m| m.group == group)
            .cloned()
            .collect())
    }

    fn group_group_memberships(&self, group: &str) -> Result<Vec<GroupMembership>> {
        Ok(self
            .group_memberships
            .iter()
            .filter(|m| m.parent_group == group)
            .cloned()
            .collect())
    }

    fn workspace_sharing(
        &self,
        billing_project: &str,
        workspace: &str,
    ) -> Result<Vec<WorkspaceSharing>> {
        Ok(self
            .sharing
            .iter()
            .filter(|s| s.billing_project == billing_project && s.workspace == workspace)
            .cloned()
            .collect())
    }

    fn ignored_group_memberships(&self, group: &str) -> Result<Vec<String>> {
        let mut emails: Vec<String> = self
            .ignored_memberships
            .iter()
            .filter(|(g, _)| g == group)
            .map(|(_, e)| e.clone())
            .collect();
        emails.sort();
        Ok(emails)
    }

    fn ignored_workspace_sharing(
        &self,
        billing_project: &str,
        workspace: &str,
    ) -> Result<Vec<String>> {
        let mut emails: Vec<String> = self
            .ignored_sharing
            .iter()
            .filter(|(bp, ws, _)| bp == billing_project && ws == workspace)
            .map(|(_, _, e)| e.clone())
            .collect();
        emails.sort();
        Ok(emails)
    }
}
