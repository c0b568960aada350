use std::{
    fs,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;

const APP_DIR: &str = "community-pulse";
pub const DATA_DIR_VAR: &str = "COMMUNITY_PULSE_DATA_DIR";

static DATA_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    let root = resolve_data_root(std::env::var_os(DATA_DIR_VAR).map(PathBuf::from));
    if let Err(err) = fs::create_dir_all(&root) {
        tracing::warn!(path = %root.display(), "could not create data root: {err}");
    }
    root
});

/// An explicit directory wins; otherwise the platform data dir, then the
/// working directory.
fn resolve_data_root(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    })
}

fn data_file(root: &Path, name: &str) -> PathBuf {
    root.join(name)
}

pub fn drafts_database_path() -> PathBuf {
    data_file(&DATA_ROOT, "drafts.sqlite")
}

pub fn config_path() -> PathBuf {
    data_file(&DATA_ROOT, "config.json")
}
