//! Payload, package and feed builders for engine tests

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use slipstream_core::manifest::build_manifest_for_dir;
use slipstream_core::{ReleaseEntry, SourceBackend, UpdateConfig};
use slipstream_engine::delta::build_delta_package;
use slipstream_engine::package::build_full_package;

pub const APP_ID: &str = "MyApp";

/// Write a payload tree from `(relative path, bytes)` pairs
pub fn write_payload(dir: &Path, files: &[(&str, &[u8])]) {
    for (path, bytes) in files {
        let full = dir.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, bytes).unwrap();
    }
}

/// Read a payload tree back as `relative path -> bytes`
pub fn read_payload(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    for dirent in walkdir_files(dir) {
        let rel = dirent
            .strip_prefix(dir)
            .unwrap()
            .to_string_lossy()
            .replace('\\', "/");
        files.insert(rel, fs::read(&dirent).unwrap());
    }
    files
}

fn walkdir_files(dir: &Path) -> Vec<PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for dirent in fs::read_dir(&current).unwrap() {
            let path = dirent.unwrap().path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out.sort();
    out
}

/// Build `{id}.{version}-full.package` from a payload dir into `feed_dir`
pub fn add_full_package(feed_dir: &Path, version: &str, payload: &Path) -> PathBuf {
    let dest = feed_dir.join(format!("{APP_ID}.{version}-full.package"));
    build_full_package(payload, &dest).unwrap();
    dest
}

/// Build `{id}.{version}-delta.package` between two payload dirs
pub fn add_delta_package(feed_dir: &Path, version: &str, old: &Path, new: &Path) -> PathBuf {
    let dest = feed_dir.join(format!("{APP_ID}.{version}-delta.package"));
    build_delta_package(old, new, &dest).unwrap();
    dest
}

/// Rescan the feed directory and rewrite its RELEASES manifest
pub fn rebuild_feed_manifest(feed_dir: &Path) -> Vec<ReleaseEntry> {
    build_manifest_for_dir(feed_dir).unwrap()
}

/// Configuration pointing a directory-backed manager at a feed
pub fn dir_config(root: &Path, feed_dir: &Path) -> UpdateConfig {
    UpdateConfig {
        app_id: APP_ID.into(),
        root_dir: root.to_path_buf(),
        update_url: feed_dir.to_string_lossy().into_owned(),
        backend: SourceBackend::Dir,
        prerelease: false,
        prefer_deltas: true,
        access_token: None,
        staging_id: None,
    }
}

/// An aware shell-script executable whose hook invocations append
/// `"{name} {flag} {version}"` lines to `log`
#[cfg(unix)]
pub fn write_aware_script(payload: &Path, name: &str, log: &Path) {
    use std::os::unix::fs::PermissionsExt;
    fs::create_dir_all(payload).unwrap();
    let exe = payload.join(name);
    fs::write(
        &exe,
        format!("#!/bin/sh\necho \"{name} $1 $2\" >> {}\n", log.display()),
    )
    .unwrap();
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).unwrap();
    fs::write(payload.join(format!("{name}.slipstream")), "1").unwrap();
}

/// Lines appended by hook scripts, empty when no hook ran
pub fn hook_log_lines(log: &Path) -> Vec<String> {
    fs::read_to_string(log)
        .map(|text| text.lines().map(str::to_string).collect())
        .unwrap_or_default()
}
