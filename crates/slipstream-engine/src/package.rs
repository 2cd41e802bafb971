//! Package containers
//!
//! A package is a gzipped tar archive of the application payload. The
//! container format is opaque to everything above this module.

use std::fs;
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use slipstream_core::{ProgressCallback, Result};
use tar::{Archive, Builder};
use tracing::debug;
use walkdir::WalkDir;

/// Build a full package from the contents of a payload directory
///
/// Paths inside the archive are relative to `payload_dir`.
pub fn build_full_package(payload_dir: &Path, dest: &Path) -> Result<()> {
    let file = fs::File::create(dest)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = Builder::new(encoder);

    for dirent in WalkDir::new(payload_dir).sort_by_file_name() {
        let dirent = dirent.map_err(std::io::Error::from)?;
        let path = dirent.path();
        if path == payload_dir {
            continue;
        }
        let relative = path
            .strip_prefix(payload_dir)
            .expect("walked path under payload dir");
        if dirent.file_type().is_dir() {
            builder.append_dir(relative, path)?;
        } else if dirent.file_type().is_file() {
            builder.append_path_with_name(path, relative)?;
        }
    }

    builder.into_inner()?.finish()?;
    debug!(dest = %dest.display(), "built package");
    Ok(())
}

/// Extract a package into a directory with per-entry progress
pub fn extract_package(package: &Path, dest: &Path, on_progress: ProgressCallback) -> Result<()> {
    let total = count_entries(package)?.max(1);

    let file = fs::File::open(package)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    fs::create_dir_all(dest)?;

    for (i, entry) in archive.entries()?.enumerate() {
        let mut entry = entry?;
        entry.unpack_in(dest)?;
        on_progress(((i + 1) * 100 / total).min(100) as u32);
    }
    on_progress(100);
    Ok(())
}

/// Relative paths of all files inside a package
pub fn list_package_files(package: &Path) -> Result<Vec<PathBuf>> {
    let file = fs::File::open(package)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    let mut files = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        if entry.header().entry_type().is_file() {
            files.push(entry.path()?.into_owned());
        }
    }
    Ok(files)
}

fn count_entries(package: &Path) -> Result<usize> {
    let file = fs::File::open(package)?;
    let mut archive = Archive::new(GzDecoder::new(file));
    Ok(archive.entries()?.count())
}
