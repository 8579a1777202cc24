use crate::core::errors::Result;
use crate::core::models::records::{
    Account, AccountMembership, BillingProject, GroupMembership, ManagedGroup, Workspace,
    WorkspaceSharing,
};

/// Port for the local record store.
///
/// The audit core treats this as a plain read-only data source; filtering
/// (active accounts, app-as-user projects) happens in the auditors.
pub trait LocalStore {
    fn billing_projects(&self) -> Result<Vec<BillingProject>>;

    fn accounts(&self) -> Result<Vec<Account>>;

    fn managed_groups(&self) -> Result<Vec<ManagedGroup>>;

    fn workspaces(&self) -> Result<Vec<Workspace>>;

    /// Account memberships of one group.
    fn group_account_memberships(&self, group: &str) -> Result<Vec<AccountMembership>>;

    /// Child-group memberships of one group.
    fn group_group_memberships(&self, group: &str) -> Result<Vec<GroupMembership>>;

    /// Sharing rows for one workspace.
    fn workspace_sharing(&self, billing_project: &str, workspace: &str)
    -> Result<Vec<WorkspaceSharing>>;

    /// Ignore-list emails for one group's membership audit,
    /// sorted alphabetically.
    fn ignored_group_memberships(&self, group: &str) -> Result<Vec<String>>;

    /// Ignore-list emails for one workspace's sharing audit,
    /// sorted alphabetically.
    fn ignored_workspace_sharing(
        &self,
        billing_project: &str,
        workspace: &str,
    ) -> Result<Vec<String>>;
}
