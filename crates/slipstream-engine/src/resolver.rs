//! Release resolution
//!
//! Decides what to download and apply given the remote feed and the newest
//! locally installed release.

use std::path::{Path, PathBuf};

use slipstream_core::{Error, ReleaseEntry, Result};
use tracing::debug;

/// Everything one check-for-update decided; derived per check, never
/// persisted
#[derive(Debug, Clone)]
pub struct UpdateInfo {
    /// Newest locally installed release, if any
    pub currently_installed: Option<ReleaseEntry>,

    /// The release this update lands on
    pub future_release: ReleaseEntry,

    /// Entries to download and apply, ascending by version; empty when
    /// local and remote already agree
    pub releases_to_apply: Vec<ReleaseEntry>,

    /// Local packages directory downloads land in
    pub packages_dir: PathBuf,
}

impl UpdateInfo {
    pub fn is_up_to_date(&self) -> bool {
        self.releases_to_apply.is_empty()
    }
}

/// Resolve the batch of releases to apply
///
/// Entries strictly newer than the installed version qualify. With delta
/// mode enabled and an unbroken delta chain back to the installed version,
/// the chain wins; otherwise the single newest full entry is used.
pub fn resolve_updates(
    remote: &[ReleaseEntry],
    local: Option<&ReleaseEntry>,
    prefer_deltas: bool,
    packages_dir: &Path,
) -> Result<UpdateInfo> {
    if remote.is_empty() {
        return Err(Error::EmptyFeed);
    }

    let newer: Vec<&ReleaseEntry> = match local {
        Some(local) => remote.iter().filter(|e| e.version > local.version).collect(),
        None => remote.iter().collect(),
    };

    let newest_full = newer
        .iter()
        .filter(|e| !e.is_delta)
        .max_by(|a, b| a.version.cmp(&b.version));

    let releases_to_apply: Vec<ReleaseEntry> = if newer.is_empty() {
        Vec::new()
    } else if prefer_deltas && local.is_some() {
        match delta_chain(&newer) {
            Some(chain) => chain.into_iter().cloned().collect(),
            None => newest_full.map(|e| vec![(*e).clone()]).unwrap_or_default(),
        }
    } else {
        newest_full.map(|e| vec![(*e).clone()]).unwrap_or_default()
    };

    let future_release = releases_to_apply
        .last()
        .cloned()
        .or_else(|| local.cloned())
        .or_else(|| {
            remote
                .iter()
                .max_by(|a, b| a.version.cmp(&b.version))
                .cloned()
        })
        .ok_or(Error::EmptyFeed)?;

    debug!(
        to_apply = releases_to_apply.len(),
        future = %future_release.version,
        "resolved update batch"
    );

    Ok(UpdateInfo {
        currently_installed: local.cloned(),
        future_release,
        releases_to_apply,
        packages_dir: packages_dir.to_path_buf(),
    })
}

/// An unbroken chain of deltas from the installed version to the newest
/// remote version: one delta per newer version, none missing
fn delta_chain<'a>(newer: &[&'a ReleaseEntry]) -> Option<Vec<&'a ReleaseEntry>> {
    let mut versions: Vec<_> = newer.iter().map(|e| e.version).collect();
    versions.sort();
    versions.dedup();

    let mut chain = Vec::new();
    for version in versions {
        let delta = newer.iter().find(|e| e.is_delta && e.version == version)?;
        chain.push(*delta);
    }
    if chain.is_empty() {
        return None;
    }
    Some(chain)
}
