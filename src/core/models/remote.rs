use serde::{Deserialize, Serialize};

/// One row of the `/api/groups` listing: a group the service account
/// belongs to, with its role in that group.
///
/// The same group can appear twice (once as `member`, once as `admin`);
/// roles are kept as lowercased strings for that reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGroupEntry {
    pub name: String,
    pub role: String,
}

/// One row of the workspace listing, flattened from the nested
/// `workspace.*` / `accessLevel` response shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteWorkspace {
    pub namespace: String,
    pub name: String,
    pub access_level: String,
    pub auth_domains: Vec<String>,
    pub is_locked: bool,
}

/// One entry of a workspace ACL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceAclEntry {
    pub email: String,
    pub access_level: String,
    pub can_compute: bool,
    pub can_share: bool,
}
