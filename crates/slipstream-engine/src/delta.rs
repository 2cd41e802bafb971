//! Delta packages and delta chain composition
//!
//! A delta package is a gzipped tar carrying a `DELTA_MANIFEST` JSON file
//! plus payloads:
//!
//! ```text
//! DELTA_MANIFEST            operation list
//! files/{path}              full bytes for added files
//! patches/{path}.bspatch    bsdiff patch against the expected base
//! ```
//!
//! Composition turns an installed full package plus an ascending run of
//! deltas into a synthesized full package for the newest version.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use slipstream_core::manifest::package_filename;
use slipstream_core::{
    map_progress, noop_progress, progress_fn, Error, ProgressCallback, ReleaseEntry, Result,
};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::package::{build_full_package, extract_package};

/// Name of the operation list inside a delta package
pub const DELTA_MANIFEST_NAME: &str = "DELTA_MANIFEST";

/// One file-level operation in a delta package
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum DeltaOp {
    /// New file; full bytes shipped under `files/{path}`
    Add { path: String },

    /// Changed file; bsdiff patch shipped under `patches/{path}.bspatch`,
    /// valid only against a base file with this SHA-1
    Patch { path: String, base_sha1: String },

    /// File no longer present in the new version
    Remove { path: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaManifest {
    pub operations: Vec<DeltaOp>,
}

/// Build a delta package from two payload directories
pub fn build_delta_package(old_dir: &Path, new_dir: &Path, dest: &Path) -> Result<()> {
    let staging = tempfile::tempdir_in(dest.parent().unwrap_or(Path::new(".")))?;
    let mut operations = Vec::new();

    for path in relative_files(new_dir)? {
        let new_bytes = fs::read(new_dir.join(&path))?;
        let old_path = old_dir.join(&path);
        let rel = path.to_string_lossy().replace('\\', "/");

        if old_path.is_file() {
            let old_bytes = fs::read(&old_path)?;
            if old_bytes == new_bytes {
                continue;
            }
            let mut patch = Vec::new();
            bsdiff::diff(&old_bytes, &new_bytes, &mut patch)
                .map_err(|_| Error::patch_application(&rel))?;
            let patch_path = staging.path().join("patches").join(format!("{rel}.bspatch"));
            fs::create_dir_all(patch_path.parent().expect("patch path has a parent"))?;
            fs::write(&patch_path, patch)?;
            operations.push(DeltaOp::Patch {
                path: rel,
                base_sha1: sha1_hex(&old_bytes),
            });
        } else {
            let add_path = staging.path().join("files").join(&rel);
            fs::create_dir_all(add_path.parent().expect("add path has a parent"))?;
            fs::write(&add_path, new_bytes)?;
            operations.push(DeltaOp::Add { path: rel });
        }
    }

    for path in relative_files(old_dir)? {
        if !new_dir.join(&path).is_file() {
            operations.push(DeltaOp::Remove {
                path: path.to_string_lossy().replace('\\', "/"),
            });
        }
    }

    let manifest = DeltaManifest { operations };
    fs::write(
        staging.path().join(DELTA_MANIFEST_NAME),
        serde_json::to_vec_pretty(&manifest)?,
    )?;
    build_full_package(staging.path(), dest)?;
    debug!(dest = %dest.display(), ops = manifest.operations.len(), "built delta package");
    Ok(())
}

/// Apply one delta package against a base payload, producing `out_dir`
///
/// `out_dir` is populated from scratch; the base is never modified. Byte
/// progress within the delta flows through `on_progress` as 0..=100.
pub fn apply_delta_package(
    base_dir: &Path,
    delta_package: &Path,
    out_dir: &Path,
    on_progress: ProgressCallback,
) -> Result<()> {
    let staging = tempfile::tempdir()?;
    extract_package(delta_package, staging.path(), noop_progress())?;

    let manifest_path = staging.path().join(DELTA_MANIFEST_NAME);
    let manifest: DeltaManifest = serde_json::from_slice(&fs::read(&manifest_path).map_err(
        |_| Error::malformed_manifest(format!("delta package without {DELTA_MANIFEST_NAME}")),
    )?)?;

    // Start from the base, then rewrite per the operation list.
    copy_tree(base_dir, out_dir)?;

    let total = manifest.operations.len().max(1);
    for (i, op) in manifest.operations.iter().enumerate() {
        match op {
            DeltaOp::Add { path } => {
                let src = staging.path().join("files").join(path);
                let dest = out_dir.join(path);
                fs::create_dir_all(dest.parent().expect("payload path has a parent"))?;
                fs::copy(&src, &dest).map_err(|_| Error::patch_application(path))?;
            }
            DeltaOp::Patch { path, base_sha1 } => {
                let base_path = base_dir.join(path);
                if !base_path.is_file() {
                    return Err(Error::patch_application(path));
                }
                let base_bytes = fs::read(&base_path)?;
                if !sha1_hex(&base_bytes).eq_ignore_ascii_case(base_sha1) {
                    return Err(Error::patch_application(path));
                }
                let patch_bytes =
                    fs::read(staging.path().join("patches").join(format!("{path}.bspatch")))
                        .map_err(|_| Error::patch_application(path))?;
                let mut new_bytes = Vec::new();
                bsdiff::patch(&base_bytes, &mut patch_bytes.as_slice(), &mut new_bytes)
                    .map_err(|_| Error::patch_application(path))?;
                let dest = out_dir.join(path);
                fs::create_dir_all(dest.parent().expect("payload path has a parent"))?;
                fs::write(&dest, new_bytes)?;
            }
            DeltaOp::Remove { path } => {
                let dest = out_dir.join(path);
                if dest.is_file() {
                    fs::remove_file(&dest)?;
                }
            }
        }
        on_progress(((i + 1) * 100 / total) as u32);
    }
    on_progress(100);
    Ok(())
}

/// Reduce an ascending run of delta releases onto the installed full
/// package, synthesizing the newest full package in `packages_dir`
///
/// The loop carries the current payload forward one delta at a time; each
/// delta owns an equal share of the 0..=100 progress range. Nothing is
/// written into `packages_dir` until every delta has applied cleanly.
pub fn compose_full_from_deltas(
    installed: &ReleaseEntry,
    deltas: &[ReleaseEntry],
    packages_dir: &Path,
    on_progress: ProgressCallback,
) -> Result<ReleaseEntry> {
    if deltas.is_empty() || deltas.iter().any(|d| !d.is_delta) {
        return Err(Error::IncompatibleChain);
    }

    let work = tempfile::tempdir()?;
    let mut base = work.path().join("base-0");
    extract_package(&packages_dir.join(&installed.filename), &base, noop_progress())?;

    let total = deltas.len() as u32;
    for (i, delta) in deltas.iter().enumerate() {
        info!(delta = %delta.filename, "applying delta");
        let next = work.path().join(format!("base-{}", i + 1));
        let start = i as u32 * 100 / total;
        let end = (i as u32 + 1) * 100 / total;
        let outer = on_progress.clone();
        apply_delta_package(
            &base,
            &packages_dir.join(&delta.filename),
            &next,
            progress_fn(move |p| outer(map_progress(p, start, end))),
        )?;
        base = next;
    }

    let last = deltas.last().expect("non-empty delta run");
    let filename = package_filename(&last.package_id, &last.version, false);
    let dest = packages_dir.join(&filename);
    build_full_package(&base, &dest)?;
    on_progress(100);

    ReleaseEntry::from_package_file(&dest)
}

fn relative_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dirent in WalkDir::new(dir).sort_by_file_name() {
        let dirent = dirent.map_err(std::io::Error::from)?;
        if dirent.file_type().is_file() {
            files.push(
                dirent
                    .path()
                    .strip_prefix(dir)
                    .expect("walked path under dir")
                    .to_path_buf(),
            );
        }
    }
    Ok(files)
}

fn copy_tree(src: &Path, dest: &Path) -> Result<()> {
    fs::create_dir_all(dest)?;
    for dirent in WalkDir::new(src) {
        let dirent = dirent.map_err(std::io::Error::from)?;
        let relative = dirent.path().strip_prefix(src).expect("walked path under src");
        let target = dest.join(relative);
        if dirent.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else if dirent.file_type().is_file() {
            fs::copy(dirent.path(), &target)?;
        }
    }
    Ok(())
}

fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
