use std::path::PathBuf;

/// All domain errors for anvil-audit.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum AnvilAuditError {
    #[error(
        "File not found: {path}\n\n  \
         Check that the path is correct and the file exists.\n  \
         Run 'anvil-audit status' to verify your configuration."
    )]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(
        "Snapshot error in {path}: {detail}\n\n  \
         The snapshot must be a JSON export of the consortium records, with \
         every\n  membership and sharing row referencing a group or account \
         defined in the\n  same snapshot."
    )]
    Snapshot { path: PathBuf, detail: String },

    #[error("AnVIL API request failed: {reason}")]
    Http { reason: String },

    #[error("AnVIL API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Group '{group}' is not managed by the app")]
    NotGroupAdmin { group: String },

    #[error("Already added a result for {record}")]
    DuplicateResult { record: String },

    #[error("Audit cache error: {detail}")]
    Cache { detail: String },

    #[error(
        "No audit results found. Please run the audit first.\n\n  \
         Run 'anvil-audit audit --cache-results' to populate the cache."
    )]
    NoCachedResult,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AnvilAuditError>;
