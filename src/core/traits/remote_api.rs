use crate::core::errors::Result;
use crate::core::models::remote::{RemoteGroupEntry, RemoteWorkspace, WorkspaceAclEntry};

/// Port for the AnVIL/Terra read API.
///
/// A 404 from the service is data (the entity does not exist); every other
/// non-success response must surface as `AnvilAuditError::Api` so the run
/// aborts with no partial results.
pub trait RemoteApi {
    /// Email of the service account the app authenticates as. Remote
    /// listings include it; the auditors strip it before comparing.
    fn service_account_email(&self) -> &str;

    /// Whether a billing project exists (and is visible to the app).
    fn billing_project_exists(&self, name: &str) -> Result<bool>;

    /// Whether an account is registered, via its proxy group.
    fn account_exists(&self, email: &str) -> Result<bool>;

    /// All groups the service account belongs to, one entry per role.
    fn get_groups(&self) -> Result<Vec<RemoteGroupEntry>>;

    /// The email of a group, or `None` if the group does not exist at all.
    /// Distinguishes "exists but app is not a member" from "gone".
    fn get_group_email(&self, name: &str) -> Result<Option<String>>;

    /// Member emails of a group the app administers.
    fn get_group_members(&self, name: &str) -> Result<Vec<String>>;

    /// Admin emails of a group the app administers.
    fn get_group_admins(&self, name: &str) -> Result<Vec<String>>;

    /// All workspaces visible to the app, with access level, auth domains,
    /// and lock status.
    fn list_workspaces(&self) -> Result<Vec<RemoteWorkspace>>;

    /// The bucket's requester-pays flag. A separate call per workspace;
    /// the listing does not include bucket options.
    fn get_workspace_requester_pays(&self, namespace: &str, name: &str) -> Result<bool>;

    /// The full ACL of a workspace the app owns.
    fn get_workspace_acl(&self, namespace: &str, name: &str) -> Result<Vec<WorkspaceAclEntry>>;
}
