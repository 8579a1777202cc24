use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Initialize the global config file path.
/// If `custom` is provided, uses that path; otherwise defaults to `anvil-audit.toml`.
pub fn init(custom: Option<&str>) {
    let path = custom
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("anvil-audit.toml"));
    let _ = CONFIG_PATH.set(path);
}

/// Get the current config file path.
pub fn config_path() -> &'static Path {
    CONFIG_PATH
        .get()
        .map(|p| p.as_path())
        .unwrap_or(Path::new("anvil-audit.toml"))
}
