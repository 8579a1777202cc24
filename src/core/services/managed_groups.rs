use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::{AnvilAuditError, Result};
use crate::core::models::records::{
    AccountMembership, AccountStatus, GroupMembership, GroupRole, ManagedGroup,
};
use crate::core::models::report::{AuditReport, IgnoredResult, NotInAppResult, RecordResult};
use crate::core::traits::local_store::LocalStore;
use crate::core::traits::remote_api::RemoteApi;
use crate::core::traits::report_cache::{ReportCache, store_report};

pub const MANAGED_GROUP_AUDIT_CACHE_KEY: &str = "managed_group_audit_results";

/// Cache key for one group's membership report.
pub fn membership_cache_key(group: &str) -> String {
    format!("managed_group_membership_{group}")
}

/// Discrepancies a managed group can exhibit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ManagedGroupError {
    /// The group does not exist on AnVIL.
    NotInAnvil,
    /// The service account's role on AnVIL differs from the local
    /// `is_managed_by_app` flag.
    DifferentRole,
    /// The group's membership audit found problems.
    GroupMembership,
}

impl fmt::Display for ManagedGroupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManagedGroupError::NotInAnvil => write!(f, "Not in AnVIL"),
            ManagedGroupError::DifferentRole => {
                write!(f, "App has a different role in this group")
            }
            ManagedGroupError::GroupMembership => {
                write!(f, "Group membership does not match in AnVIL")
            }
        }
    }
}

/// Discrepancies a single membership row can exhibit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipError {
    AccountAdminNotInAnvil,
    AccountMemberNotInAnvil,
    DeactivatedAccount,
    GroupAdminNotInAnvil,
    GroupMemberNotInAnvil,
}

impl fmt::Display for MembershipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipError::AccountAdminNotInAnvil => {
                write!(f, "Account not an admin in AnVIL")
            }
            MembershipError::AccountMemberNotInAnvil => {
                write!(f, "Account not a member in AnVIL")
            }
            MembershipError::DeactivatedAccount => write!(
                f,
                "Account is deactivated but still has membership records in the app"
            ),
            MembershipError::GroupAdminNotInAnvil => write!(f, "Group not an admin in AnVIL"),
            MembershipError::GroupMemberNotInAnvil => write!(f, "Group not a member in AnVIL"),
        }
    }
}

/// A membership row audited for one group: either an account's membership
/// or a child group's membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRecord {
    Account(AccountMembership),
    Group(GroupMembership),
}

impl fmt::Display for MembershipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MembershipRecord::Account(m) => m.fmt(f),
            MembershipRecord::Group(m) => m.fmt(f),
        }
    }
}

/// Remove the first occurrence of `value` from `list`, reporting whether
/// anything was removed. Listings can contain duplicates, so only one
/// occurrence is claimed per call.
fn remove_first(list: &mut Vec<String>, value: &str) -> bool {
    if let Some(pos) = list.iter().position(|x| x == value) {
        list.remove(pos);
        true
    } else {
        false
    }
}

/// Audits all managed groups against the service account's group listing.
pub struct ManagedGroupAuditor<'a> {
    store: &'a dyn LocalStore,
    remote: &'a dyn RemoteApi,
    cache: &'a dyn ReportCache,
}

impl<'a> ManagedGroupAuditor<'a> {
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

    /// Compare local groups against one bulk group listing.
    ///
    /// The listing carries one row per (group, role) pair, so a group the
    /// app is both member and admin of appears twice; roles are folded
    /// into a multimap before matching. Groups missing from the listing
    /// get a second chance via a direct existence probe, because the app
    /// may simply not be a member of a group that still exists.
    pub fn run(
        &self,
        cache_results: bool,
    ) -> Result<AuditReport<ManagedGroup, ManagedGroupError>> {
        let mut report = AuditReport::new(MANAGED_GROUP_AUDIT_CACHE_KEY);

        let mut roles_on_anvil: HashMap<String, Vec<String>> = HashMap::new();
        let mut listing_order: Vec<String> = Vec::new();
        for entry in self.remote.get_groups()? {
            let roles = roles_on_anvil.entry(entry.name.clone()).or_default();
            if roles.is_empty() {
                listing_order.push(entry.name);
            }
            roles.push(entry.role.to_lowercase());
        }

        for group in self.store.managed_groups()? {
            let mut result = RecordResult::new(group.clone());
            match roles_on_anvil.remove(&group.name) {
                None => {
                    // Not in the listing; the group may still exist without
                    // the app being a member of it.
                    if self.remote.get_group_email(&group.name)?.is_some() {
                        if group.is_managed_by_app {
                            result.add_error(ManagedGroupError::DifferentRole);
                        }
                    } else {
                        result.add_error(ManagedGroupError::NotInAnvil);
                    }
                }
                Some(roles) => {
                    let is_admin = roles.iter().any(|r| r == "admin");
                    if group.is_managed_by_app {
                        if !is_admin {
                            result.add_error(ManagedGroupError::DifferentRole);
                        } else {
                            let membership_report = ManagedGroupMembershipAuditor::new(
                                group.clone(),
                                self.store,
                                self.remote,
                                self.cache,
                            )?
                            .run(cache_results)?;
                            if !membership_report.ok() {
                                result.add_error(ManagedGroupError::GroupMembership);
                            }
                        }
                    } else if is_admin {
                        result.add_error(ManagedGroupError::DifferentRole);
                    }
                }
            }
            report.add_result(result)?;
        }

        // Remote groups the app administers but does not track.
        for name in listing_order {
            if let Some(roles) = roles_on_anvil.get(&name)
                && roles.iter().any(|r| r == "admin")
            {
                report.add_not_in_app(NotInAppResult::new(name))?;
            }
        }

        if cache_results {
            store_report(self.cache, &report)?;
        }
        Ok(report)
    }
}

/// Audits the membership of a single app-managed group.
pub struct ManagedGroupMembershipAuditor<'a> {
    group: ManagedGroup,
    store: &'a dyn LocalStore,
    remote: &'a dyn RemoteApi,
    cache: &'a dyn ReportCache,
}

impl fmt::Debug for ManagedGroupMembershipAuditor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedGroupMembershipAuditor")
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

impl<'a> ManagedGroupMembershipAuditor<'a> {
    /// Membership can only be audited for groups the app administers.
    pub fn new(
        group: ManagedGroup,
        store: &'a dyn LocalStore,
        remote: &'a dyn RemoteApi,
        cache: &'a dyn ReportCache,
    ) -> Result<Self> {
        if !group.is_managed_by_app {
            return Err(AnvilAuditError::NotGroupAdmin {
                group: group.name,
            });
        }
        Ok(Self {
            group,
            store,
            remote,
            cache,
        })
    }

    /// Compare local membership rows against the remote member and admin
    /// listings.
    ///
    /// Emails are lower-cased on both sides before matching. The service
    /// account itself can show up in either listing and is stripped first;
    /// its absence is fine (admin rights can come via group membership).
    /// Admin rows also claim a member listing entry, since an admin group
    /// is sometimes listed as a member too.
    pub fn run(
        &self,
        cache_results: bool,
    ) -> Result<AuditReport<MembershipRecord, MembershipError>> {
        let mut report = AuditReport::new(membership_cache_key(&self.group.name));

        let service_account = self.remote.service_account_email().to_lowercase();
        let mut members_in_anvil: Vec<String> = self
            .remote
            .get_group_members(&self.group.name)?
            .iter()
            .map(|e| e.to_lowercase())
            .collect();
        remove_first(&mut members_in_anvil, &service_account);
        let mut admins_in_anvil: Vec<String> = self
            .remote
            .get_group_admins(&self.group.name)?
            .iter()
            .map(|e| e.to_lowercase())
            .collect();
        remove_first(&mut admins_in_anvil, &service_account);

        for membership in self.store.group_account_memberships(&self.group.name)? {
            let mut result = RecordResult::new(MembershipRecord::Account(membership.clone()));
            if membership.account_status == AccountStatus::Inactive {
                result.add_error(MembershipError::DeactivatedAccount);
            }
            let email = membership.account_email.to_lowercase();
            match membership.role {
                GroupRole::Admin => {
                    if !remove_first(&mut admins_in_anvil, &email) {
                        result.add_error(MembershipError::AccountAdminNotInAnvil);
                    }
                }
                GroupRole::Member => {
                    if !remove_first(&mut members_in_anvil, &email) {
                        result.add_error(MembershipError::AccountMemberNotInAnvil);
                    }
                }
            }
            report.add_result(result)?;
        }

        for membership in self.store.group_group_memberships(&self.group.name)? {
            let mut result = RecordResult::new(MembershipRecord::Group(membership.clone()));
            let email = membership.child_email.to_lowercase();
            match membership.role {
                GroupRole::Admin => {
                    if !remove_first(&mut admins_in_anvil, &email) {
                        result.add_error(MembershipError::GroupAdminNotInAnvil);
                    }
                    // An admin group can additionally be listed as a member.
                    remove_first(&mut members_in_anvil, &email);
                }
                GroupRole::Member => {
                    if !remove_first(&mut members_in_anvil, &email) {
                        result.add_error(MembershipError::GroupMemberNotInAnvil);
                    }
                }
            }
            report.add_result(result)?;
        }

        // The ignore list claims leftovers before they become not-in-app.
        for ignored_email in self.store.ignored_group_memberships(&self.group.name)? {
            let email = ignored_email.to_lowercase();
            let record = if remove_first(&mut admins_in_anvil, &email) {
                Some(format!("{}: {email}", GroupRole::Admin))
            } else if remove_first(&mut members_in_anvil, &email) {
                Some(format!("{}: {email}", GroupRole::Member))
            } else {
                None
            };
            report.add_ignored(IgnoredResult::new(ignored_email, record))?;
        }

        for email in admins_in_anvil {
            report.add_not_in_app(NotInAppResult::new(format!("{}: {email}", GroupRole::Admin)))?;
        }
        for email in members_in_anvil {
            report
                .add_not_in_app(NotInAppResult::new(format!("{}: {email}", GroupRole::Member)))?;
        }

        if cache_results {
            store_report(self.cache, &report)?;
        }
        Ok(report)
    }
}
