use std::fmt;

use serde::{Deserialize, Serialize};

/// Membership role within a managed group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupRole {
    Member,
    Admin,
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupRole::Member => write!(f, "MEMBER"),
            GroupRole::Admin => write!(f, "ADMIN"),
        }
    }
}

/// Workspace access level granted by a sharing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessLevel {
    Reader,
    Writer,
    Owner,
}

impl AccessLevel {
    /// The string Terra uses in ACL responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Reader => "READER",
            AccessLevel::Writer => "WRITER",
            AccessLevel::Owner => "OWNER",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an account is still in service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

/// A billing project tracked locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingProject {
    pub name: String,
    /// Whether the app's service account is a user of this project.
    /// Only projects with this flag set are audited.
    pub has_app_as_user: bool,
}

impl fmt::Display for BillingProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An AnVIL account tracked locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub status: AccountStatus,
}

impl Account {
    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.email)
    }
}

/// A named access-control group, optionally managed (admin'd) by the app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedGroup {
    pub name: String,
    /// The group's email address on Terra (usually `{name}@firecloud.org`).
    pub email: String,
    pub is_managed_by_app: bool,
}

impl fmt::Display for ManagedGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// An account's membership in a managed group.
///
/// Rows carry the account's status so the auditor can flag memberships
/// that survived a deactivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMembership {
    pub group: String,
    pub account_email: String,
    pub account_status: AccountStatus,
    pub role: GroupRole,
}

impl fmt::Display for AccountMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} as {} in {}", self.account_email, self.role, self.group)
    }
}

/// A group's membership in another managed group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMembership {
    pub parent_group: String,
    pub child_group: String,
    /// Email of the child group, used for the case-insensitive match
    /// against the remote member listing.
    pub child_email: String,
    pub role: GroupRole,
}

impl fmt::Display for GroupMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} as {} in {}", self.child_group, self.role, self.parent_group)
    }
}

/// A billing-project-scoped workspace tracked locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workspace {
    pub billing_project: String,
    pub name: String,
    pub is_locked: bool,
    pub is_requester_pays: bool,
    /// Names of the auth domain groups gating this workspace.
    pub authorization_domains: Vec<String>,
}

impl fmt::Display for Workspace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.billing_project, self.name)
    }
}

/// A (workspace, group) access grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSharing {
    pub billing_project: String,
    pub workspace: String,
    pub group: String,
    pub group_email: String,
    pub access: AccessLevel,
    pub can_compute: bool,
}

impl fmt::Display for WorkspaceSharing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} with {} on {}/{}",
            self.group, self.access, self.billing_project, self.workspace
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_serialize_as_terra_constants() {
        assert_eq!(serde_json::to_string(&GroupRole::Admin).unwrap(), "\"ADMIN\"");
        assert_eq!(serde_json::to_string(&AccessLevel::Writer).unwrap(), "\"WRITER\"");
        assert_eq!(serde_json::to_string(&AccountStatus::Inactive).unwrap(), "\"inactive\"");
    }

    #[test]
    fn workspace_identity_is_namespace_qualified() {
        let ws = Workspace {
            billing_project: "test-bp".to_string(),
            name: "ws-1".to_string(),
            is_locked: false,
            is_requester_pays: false,
            authorization_domains: vec![],
        };
        assert_eq!(ws.to_string(), "test-bp/ws-1");
    }

    #[test]
    fn membership_display_includes_role_and_group() {
        let row = AccountMembership {
            group: "analysts".to_string(),
            account_email: "user@example.com".to_string(),
            account_status: AccountStatus::Active,
            role: GroupRole::Member,
        };
        assert_eq!(row.to_string(), "user@example.com as MEMBER in analysts");
    }
}
