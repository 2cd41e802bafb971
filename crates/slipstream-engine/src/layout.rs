//! On-disk layout of an installed application
//!
//! ```text
//! {root}/
//!   app-{version}/        one directory per installed version
//!   app-{version}/.dead   marker: scheduled for deletion, never live
//!   packages/             downloaded and synthesized package files
//!   packages/RELEASES     local manifest
//!   .update-lock          advisory lock held during update operations
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use slipstream_core::{PackageVersion, Result};
use tracing::debug;

/// Name of the packages directory under the app root
pub const PACKAGES_DIR: &str = "packages";

/// Marker file flagging a version directory as dead
pub const DEAD_MARKER: &str = ".dead";

/// Lock file guarding update operations
pub const LOCK_FILE: &str = ".update-lock";

/// Well-known updater binary carried in application payloads
#[cfg(windows)]
pub const UPDATER_BINARY: &str = "slipstream.exe";
#[cfg(not(windows))]
pub const UPDATER_BINARY: &str = "slipstream";

pub fn packages_dir(root: &Path) -> PathBuf {
    root.join(PACKAGES_DIR)
}

/// `{root}/app-{version}`
pub fn version_dir(root: &Path, version: &PackageVersion) -> PathBuf {
    root.join(format!("app-{version}"))
}

/// Parse the version out of an `app-{version}` directory name
pub fn parse_version_dir(path: &Path) -> Option<PackageVersion> {
    let name = path.file_name()?.to_str()?;
    let version = name.strip_prefix("app-")?;
    PackageVersion::parse(version).ok()
}

/// Flag a version directory as dead; it will never be treated as live again
pub fn mark_dead(dir: &Path) -> Result<()> {
    fs::write(dir.join(DEAD_MARKER), b"")?;
    debug!(dir = %dir.display(), "marked version directory dead");
    Ok(())
}

pub fn is_dead(dir: &Path) -> bool {
    dir.join(DEAD_MARKER).exists()
}

/// All `app-{version}` directories under the root, sorted ascending,
/// dead ones included
pub fn list_version_dirs(root: &Path) -> Result<Vec<(PackageVersion, PathBuf)>> {
    let mut dirs = Vec::new();
    if !root.is_dir() {
        return Ok(dirs);
    }
    for dirent in fs::read_dir(root)? {
        let path = dirent?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(version) = parse_version_dir(&path) {
            dirs.push((version, path));
        }
    }
    dirs.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(dirs)
}

/// The newest live (not dead) version directory, if any
pub fn current_version_dir(root: &Path) -> Result<Option<(PackageVersion, PathBuf)>> {
    let live = list_version_dirs(root)?
        .into_iter()
        .filter(|(_, path)| !is_dead(path))
        .next_back();
    Ok(live)
}
