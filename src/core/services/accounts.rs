use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::errors::Result;
use crate::core::models::records::Account;
use crate::core::models::report::{AuditReport, RecordResult};
use crate::core::traits::local_store::LocalStore;
use crate::core::traits::remote_api::RemoteApi;
use crate::core::traits::report_cache::{ReportCache, store_report};

pub const ACCOUNT_AUDIT_CACHE_KEY: &str = "account_audit_results";

/// Discrepancies an account can exhibit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountError {
    /// The account's email is not registered on AnVIL.
    NotInAnvil,
}

impl fmt::Display for AccountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountError::NotInAnvil => write!(f, "Not in AnVIL"),
        }
    }
}

/// Audits active accounts against the AnVIL registry.
pub struct AccountAuditor<'a> {
    store: &'a dyn LocalStore,
    remote: &'a dyn RemoteApi,
    cache: &'a dyn ReportCache,
}

impl<'a> AccountAuditor<'a> {
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

    /// Probe each active account's proxy group. Deactivated accounts are
    /// not audited here; their leftover memberships are flagged by the
    /// group membership audit instead.
    pub fn run(&self, cache_results: bool) -> Result<AuditReport<Account, AccountError>> {
        let mut report = AuditReport::new(ACCOUNT_AUDIT_CACHE_KEY);

        for account in self
            .store
            .accounts()?
            .into_iter()
            .filter(|a| a.is_active())
        {
            let mut result = RecordResult::new(account);
            if !self.remote.account_exists(&result.record.email)? {
                result.add_error(AccountError::NotInAnvil);
            }
            report.add_result(result)?;
        }

        if cache_results {
            store_report(self.cache, &report)?;
        }
        Ok(report)
    }
}
