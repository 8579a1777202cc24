use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::core::models::records::BillingProject;
use crate::core::models::report::{AuditReport, RecordResult};
use crate::core::traits::local_store::LocalStore;
use crate::core::traits::remote_api::RemoteApi;
use crate::core::traits::report_cache::{ReportCache, store_report};

pub const BILLING_PROJECT_AUDIT_CACHE_KEY: &str = "billing_project_audit_results";

/// Discrepancies a billing project can exhibit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingProjectError {
    /// The billing project does not exist on AnVIL.
    NotInAnvil,
}

impl fmt::Display for BillingProjectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BillingProjectError::NotInAnvil => write!(f, "Not in AnVIL"),
        }
    }
}

/// Audits billing projects where the app is a user.
pub struct BillingProjectAuditor<'a> {
    store: &'a dyn LocalStore,
    remote: &'a dyn RemoteApi,
    cache: &'a dyn ReportCache,
}

impl<'a> BillingProjectAuditor<'a> {
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

    /// Check that every billing project with the app as user still exists
    /// on AnVIL. Projects without the flag are skipped entirely.
    pub fn run(
        &self,
        cache_results: bool,
    ) -> Result<AuditReport<BillingProject, BillingProjectError>> {
        let mut report = AuditReport::new(BILLING_PROJECT_AUDIT_CACHE_KEY);

        for project in self
            .store
            .billing_projects()?
            .into_iter()
            .filter(|p| p.has_app_as_user)
        {
            let mut result = RecordResult::new(project);
            if !self.remote.billing_project_exists(&result.record.name)? {
                result.add_error(BillingProjectError::NotInAnvil);
            }
            report.add_result(result)?;
        }

        if cache_results {
            store_report(self.cache, &report)?;
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::AnvilAuditError;
    use crate::core::services::testing::{FakeRemote, FakeStore, MemoryCache};

    fn project(name: &str, has_app_as_user: bool) -> BillingProject {
        BillingProject {
            name: name.to_string(),
            has_app_as_user,
        }
    }

    #[test]
    fn existing_project_is_verified() {
        let store = FakeStore {
            billing_projects: vec![project("bp-1", true)],
            ..Default::default()
        };
        let remote = FakeRemote {
            billing_projects: vec!["bp-1".to_string()],
            ..Default::default()
        };
        let cache = MemoryCache::default();

        let report = BillingProjectAuditor::new(&store, &remote, &cache)
            .run(false)
            .unwrap();

        assert!(report.ok());
        assert_eq!(report.verified().len(), 1);
    }

    #[test]
    fn missing_project_gets_not_in_anvil() {
        let store = FakeStore {
            billing_projects: vec![project("bp-1", true)],
            ..Default::default()
        };
        let remote = FakeRemote::default();
        let cache = MemoryCache::default();

        let report = BillingProjectAuditor::new(&store, &remote, &cache)
            .run(false)
            .unwrap();

        assert!(!report.ok());
        assert_eq!(report.errors().len(), 1);
        assert_eq!(report.verified().len(), 0);
        assert_eq!(report.not_in_app().len(), 0);
        assert!(
            report.errors()[0]
                .errors
                .contains(&BillingProjectError::NotInAnvil)
        );
    }

    #[test]
    fn projects_without_app_as_user_are_skipped() {
        let store = FakeStore {
            billing_projects: vec![project("bp-1", false)],
            ..Default::default()
        };
        let remote = FakeRemote::default();
        let cache = MemoryCache::default();

        let report = BillingProjectAuditor::new(&store, &remote, &cache)
            .run(false)
            .unwrap();

        assert!(report.ok());
        assert!(report.verified().is_empty());
        assert!(report.errors().is_empty());
    }

    #[test]
    fn api_failure_aborts_the_run() {
        let store = FakeStore {
            billing_projects: vec![project("bp-1", true)],
            ..Default::default()
        };
        let remote = FakeRemote {
            fail: true,
            ..Default::default()
        };
        let cache = MemoryCache::default();

        let err = BillingProjectAuditor::new(&store, &remote, &cache)
            .run(false)
            .unwrap_err();
        assert!(matches!(err, AnvilAuditError::Api { status: 500, .. }));
    }

    #[test]
    fn caching_stores_under_fixed_key() {
        let store = FakeStore {
            billing_projects: vec![project("bp-1", true)],
            ..Default::default()
        };
        let remote = FakeRemote {
            billing_projects: vec!["bp-1".to_string()],
            ..Default::default()
        };
        let cache = MemoryCache::default();

        let report = BillingProjectAuditor::new(&store, &remote, &cache)
            .run(true)
            .unwrap();

        let cached = cache
            .load(BILLING_PROJECT_AUDIT_CACHE_KEY)
            .unwrap()
            .unwrap();
        assert_eq!(
            cached["timestamp"],
            serde_json::to_value(report.timestamp).unwrap()
        );
    }
}
