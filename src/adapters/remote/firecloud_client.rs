use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::core::errors::{AnvilAuditError, Result};
use crate::core::models::remote::{RemoteGroupEntry, RemoteWorkspace, WorkspaceAclEntry};
use crate::core::traits::remote_api::RemoteApi;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Fields requested from the workspace listing; everything else the
/// response would carry is dead weight for the audit.
const WORKSPACE_LIST_FIELDS: &str =
    "workspace.namespace,workspace.name,workspace.authorizationDomain,workspace.isLocked,accessLevel";

/// Terra (Firecloud orchestration) API client.
///
/// All calls are blocking from the caller's perspective; a current-thread
/// runtime drives reqwest under the hood.
#[derive(Debug)]
pub struct FirecloudClient {
    base_url: String,
    service_account_email: String,
    token: String,
    client: reqwest::Client,
    runtime: tokio::runtime::Runtime,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupListEntry {
    group_name: String,
    role: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceListEntry {
    workspace: WorkspaceDetails,
    access_level: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceDetails {
    namespace: String,
    name: String,
    #[serde(default)]
    authorization_domain: Vec<AuthDomainEntry>,
    is_locked: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthDomainEntry {
    members_group_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AclDetails {
    access_level: String,
    #[serde(default)]
    can_compute: bool,
    #[serde(default)]
    can_share: bool,
}

impl FirecloudClient {
    /// Build a client from the configured entry point and a bearer token
    /// file (one token, surrounding whitespace ignored).
    pub fn new(base_url: &str, service_account_email: &str, token_file: &Path) -> Result<Self> {
        let token = std::fs::read_to_string(token_file)
            .map_err(|_| AnvilAuditError::FileNotFound {
                path: token_file.to_path_buf(),
            })?
            .trim()
            .to_string();
        if token.is_empty() {
            return Err(AnvilAuditError::InvalidConfig {
                detail: format!("Token file '{}' is empty", token_file.display()),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(format!("anvil-audit/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AnvilAuditError::Http {
                reason: format!("Failed to create HTTP client: {e}"),
            })?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AnvilAuditError::Http {
                reason: format!("Failed to create async runtime: {e}"),
            })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            service_account_email: service_account_email.to_string(),
            token,
            client,
            runtime,
        })
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<(u16, Value)> {
        self.runtime.block_on(async {
            let mut request = self
                .client
                .get(format!("{}{path}", self.base_url))
                .bearer_auth(&self.token);
            if !query.is_empty() {
                request = request.query(query);
            }
            let response = request.send().await.map_err(|e| AnvilAuditError::Http {
                reason: format!("Request to {path} failed: {e}"),
            })?;
            let status = response.status().as_u16();
            // Error bodies are not always JSON; fall back to null.
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            Ok((status, body))
        })
    }

    fn api_error(path: &str, status: u16, body: &Value) -> AnvilAuditError {
        let message = body["message"]
            .as_str()
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("Unexpected status from {path}"));
        AnvilAuditError::Api { status, message }
    }

    /// GET expecting a 2xx response.
    fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let (status, body) = self.get(path, query)?;
        if (200..300).contains(&status) {
            Ok(body)
        } else {
            Err(Self::api_error(path, status, &body))
        }
    }

    /// GET where 404 is data, not an error.
    fn probe(&self, path: &str) -> Result<bool> {
        let (status, body) = self.get(path, &[])?;
        match status {
            200..=299 => Ok(true),
            404 => Ok(false),
            _ => Err(Self::api_error(path, status, &body)),
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(path: &str, body: Value) -> Result<T> {
        serde_json::from_value(body).map_err(|e| AnvilAuditError::Http {
            reason: format!("Unexpected response from {path}: {e}"),
        })
    }

    fn email_list(&self, path: &str) -> Result<Vec<String>> {
        let body = self.fetch(path, &[])?;
        Self::parse(path, body)
    }

    /// GET /status, returning the subsystem health document.
    pub fn status(&self) -> Result<Value> {
        self.fetch("/status", &[])
    }

    /// GET /me, confirming the token is valid and returning user details.
    pub fn me(&self) -> Result<Value> {
        self.fetch("/me", &[("userDetailsOnly", "true")])
    }
}

impl RemoteApi for FirecloudClient {
    fn service_account_email(&self) -> &str {
        &self.service_account_email
    }

    fn billing_project_exists(&self, name: &str) -> Result<bool> {
        self.probe(&format!("/api/billing/v2/{name}"))
    }

    fn account_exists(&self, email: &str) -> Result<bool> {
        self.probe(&format!("/api/proxyGroup/{email}"))
    }

    fn get_groups(&self) -> Result<Vec<RemoteGroupEntry>> {
        let path = "/api/groups";
        let body = self.fetch(path, &[])?;
        let entries: Vec<GroupListEntry> = Self::parse(path, body)?;
        Ok(entries
            .into_iter()
            .map(|e| RemoteGroupEntry {
                name: e.group_name,
                role: e.role.to_lowercase(),
            })
            .collect())
    }

    fn get_group_email(&self, name: &str) -> Result<Option<String>> {
        let path = format!("/api/groups/{name}");
        let (status, body) = self.get(&path, &[])?;
        match status {
            200..=299 => {
                let email = body["groupEmail"].as_str().ok_or_else(|| {
                    AnvilAuditError::Http {
                        reason: format!("Unexpected response from {path}: missing groupEmail"),
                    }
                })?;
                Ok(Some(email.to_string()))
            }
            404 => Ok(None),
            _ => Err(Self::api_error(&path, status, &body)),
        }
    }

    fn get_group_members(&self, name: &str) -> Result<Vec<String>> {
        self.email_list(&format!("/api/groups/{name}/member"))
    }

    fn get_group_admins(&self, name: &str) -> Result<Vec<String>> {
        self.email_list(&format!("/api/groups/{name}/admin"))
    }

    fn list_workspaces(&self) -> Result<Vec<RemoteWorkspace>> {
        let path = "/api/workspaces";
        let body = self.fetch(path, &[("fields", WORKSPACE_LIST_FIELDS)])?;
        let entries: Vec<WorkspaceListEntry> = Self::parse(path, body)?;
        Ok(entries
            .into_iter()
            .map(|e| RemoteWorkspace {
                namespace: e.workspace.namespace,
                name: e.workspace.name,
                access_level: e.access_level,
                auth_domains: e
                    .workspace
                    .authorization_domain
                    .into_iter()
                    .map(|d| d.members_group_name)
                    .collect(),
                is_locked: e.workspace.is_locked,
            })
            .collect())
    }

    fn get_workspace_requester_pays(&self, namespace: &str, name: &str) -> Result<bool> {
        let path = format!("/api/workspaces/{namespace}/{name}");
        let body = self.fetch(&path, &[("fields", "bucketOptions")])?;
        body["bucketOptions"]["requesterPays"]
            .as_bool()
            .ok_or_else(|| AnvilAuditError::Http {
                reason: format!("Unexpected response from {path}: missing bucketOptions"),
            })
    }

    fn get_workspace_acl(&self, namespace: &str, name: &str) -> Result<Vec<WorkspaceAclEntry>> {
        let path = format!("/api/workspaces/{namespace}/{name}/acl");
        let body = self.fetch(&path, &[])?;
        let acl = body["acl"].as_object().ok_or_else(|| AnvilAuditError::Http {
            reason: format!("Unexpected response from {path}: missing acl"),
        })?;
        let mut entries = Vec::with_capacity(acl.len());
        for (email, details) in acl {
            let details: AclDetails = Self::parse(&path, details.clone())?;
            entries.push(WorkspaceAclEntry {
                email: email.clone(),
                access_level: details.access_level,
                can_compute: details.can_compute,
                can_share: details.can_share,
            });
        }
        Ok(entries)
    }
}
