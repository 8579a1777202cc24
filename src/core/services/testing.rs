//! In-memory fakes for the audit ports, shared by the service unit tests.

use std::cell::RefCell;
use std::collections::HashMap;

use serde_json::Value;

use crate::core::errors::{AnvilAuditError, Result};
use crate::core::models::records::{
    Account, AccountMembership, BillingProject, GroupMembership, ManagedGroup, Workspace,
    WorkspaceSharing,
};
use crate::core::models::remote::{RemoteGroupEntry, RemoteWorkspace, WorkspaceAclEntry};
use crate::core::traits::local_store::LocalStore;
use crate::core::traits::remote_api::RemoteApi;
use crate::core::traits::report_cache::ReportCache;

pub const SERVICE_ACCOUNT: &str = "app@example.iam.gserviceaccount.com";

/// Local store backed by plain vectors.
#[derive(Default)]
pub struct FakeStore {
    pub billing_projects: Vec<BillingProject>,
    pub accounts: Vec<Account>,
    pub managed_groups: Vec<ManagedGroup>,
    pub workspaces: Vec<Workspace>,
    pub account_memberships: Vec<AccountMembership>,
    pub group_memberships: Vec<GroupMembership>,
    pub sharing: Vec<WorkspaceSharing>,
    /// (group, ignored email)
    pub ignored_memberships: Vec<(String, String)>,
    /// (billing project, workspace, ignored email)
    pub ignored_sharing: Vec<(String, String, String)>,
}

impl LocalStore for FakeStore {
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

/// Remote API stub with canned responses. Setting `fail` makes every call
/// return a fatal 500, for fail-fast tests.
#[derive(Default)]
pub struct FakeRemote {
    pub billing_projects: Vec<String>,
    pub accounts: Vec<String>,
    pub groups: Vec<RemoteGroupEntry>,
    /// Groups that exist at all, keyed by name (value: group email).
    pub group_emails: HashMap<String, String>,
    pub members: HashMap<String, Vec<String>>,
    pub admins: HashMap<String, Vec<String>>,
    pub workspaces: Vec<RemoteWorkspace>,
    pub requester_pays: HashMap<(String, String), bool>,
    pub acls: HashMap<(String, String), Vec<WorkspaceAclEntry>>,
    pub fail: bool,
}

impl FakeRemote {
    fn check_fail(&self) -> Result<()> {
        if self.fail {
            Err(AnvilAuditError::Api {
                status: 500,
                message: "internal error".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl RemoteApi for FakeRemote {
    fn service_account_email(&self) -> &str {
        SERVICE_ACCOUNT
    }

    fn billing_project_exists(&self, name: &str) -> Result<bool> {
        self.check_fail()?;
        Ok(self.billing_projects.iter().any(|p| p == name))
    }

    fn account_exists(&self, email: &str) -> Result<bool> {
        self.check_fail()?;
        Ok(self.accounts.iter().any(|a| a == email))
    }

    fn get_groups(&self) -> Result<Vec<RemoteGroupEntry>> {
        self.check_fail()?;
        Ok(self.groups.clone())
    }

    fn get_group_email(&self, name: &str) -> Result<Option<String>> {
        self.check_fail()?;
        Ok(self.group_emails.get(name).cloned())
    }

    fn get_group_members(&self, name: &str) -> Result<Vec<String>> {
        self.check_fail()?;
        Ok(self.members.get(name).cloned().unwrap_or_default())
    }

    fn get_group_admins(&self, name: &str) -> Result<Vec<String>> {
        self.check_fail()?;
        Ok(self.admins.get(name).cloned().unwrap_or_default())
    }

    fn list_workspaces(&self) -> Result<Vec<RemoteWorkspace>> {
        self.check_fail()?;
        Ok(self.workspaces.clone())
    }

    fn get_workspace_requester_pays(&self, namespace: &str, name: &str) -> Result<bool> {
        self.check_fail()?;
        Ok(*self
            .requester_pays
            .get(&(namespace.to_string(), name.to_string()))
            .unwrap_or(&false))
    }

    fn get_workspace_acl(&self, namespace: &str, name: &str) -> Result<Vec<WorkspaceAclEntry>> {
        self.check_fail()?;
        Ok(self
            .acls
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Report cache over a `HashMap`.
#[derive(Default)]
pub struct MemoryCache {
    entries: RefCell<HashMap<String, Value>>,
}

impl MemoryCache {
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.borrow().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl ReportCache for MemoryCache {
    fn store(&self, key: &str, report: &Value) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), report.clone());
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.borrow().get(key).cloned())
    }
}
