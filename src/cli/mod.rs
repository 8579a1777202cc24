pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand, ValueEnum};

/// Reconcile locally tracked AnVIL resources against the Terra API.
#[derive(Parser, Debug)]
#[command(name = "anvil-audit", version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to alternative config file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit tracked records against AnVIL
    Audit {
        /// Audit a subset of models. Repeat for several: --models Account --models Workspace
        #[arg(long = "models", value_enum)]
        models: Vec<AuditModel>,

        /// Only print output for models with problems
        #[arg(long)]
        errors_only: bool,

        /// Store each report in the cache after running
        #[arg(long)]
        cache_results: bool,
    },

    /// Print cached audit reports
    Report {
        /// Report on a subset of models (default: all)
        #[arg(long = "models", value_enum)]
        models: Vec<AuditModel>,
    },

    /// Check API health and the authenticated identity
    Status,
}

/// The record types the audit can run on.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditModel {
    #[value(name = "BillingProject")]
    BillingProject,
    #[value(name = "Account")]
    Account,
    #[value(name = "ManagedGroup")]
    ManagedGroup,
    #[value(name = "Workspace")]
    Workspace,
}

impl AuditModel {
    pub const ALL: [AuditModel; 4] = [
        AuditModel::BillingProject,
        AuditModel::Account,
        AuditModel::ManagedGroup,
        AuditModel::Workspace,
    ];

    /// The fixed audit order, filtered to the requested subset. An empty
    /// request means all models.
    pub fn selection(requested: &[AuditModel]) -> Vec<AuditModel> {
        if requested.is_empty() {
            Self::ALL.to_vec()
        } else {
            Self::ALL
                .iter()
                .copied()
                .filter(|m| requested.contains(m))
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_selection_means_all_models() {
        assert_eq!(AuditModel::selection(&[]), AuditModel::ALL.to_vec());
    }

    #[test]
    fn selection_keeps_fixed_audit_order() {
        let selected =
            AuditModel::selection(&[AuditModel::Workspace, AuditModel::BillingProject]);
        assert_eq!(
            selected,
            vec![AuditModel::BillingProject, AuditModel::Workspace]
        );
    }
}
