//! Local directory backend
//!
//! Reads a RELEASES manifest and copies package files out of a directory.
//! Used for file-path update URLs, network shares and tests.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use slipstream_core::manifest::{load_manifest_file, RELEASES_FILE_NAME};
use slipstream_core::{Error, ProgressCallback, ReleaseEntry, Result};
use tracing::debug;
use uuid::Uuid;

use crate::downloader::verify_package_checksum;
use crate::source::{filter_staged, UpdateSource};

pub struct DirSource {
    dir: PathBuf,
}

impl DirSource {
    pub fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
        }
    }
}

#[async_trait]
impl UpdateSource for DirSource {
    fn name(&self) -> &'static str {
        "dir"
    }

    async fn get_release_feed(
        &self,
        staging_id: Option<&Uuid>,
        _latest_local: Option<&ReleaseEntry>,
    ) -> Result<Vec<ReleaseEntry>> {
        let manifest = self.dir.join(RELEASES_FILE_NAME);
        debug!(path = %manifest.display(), "reading release manifest");
        filter_staged(load_manifest_file(&manifest)?, staging_id)
    }

    async fn download_release_entry(
        &self,
        entry: &ReleaseEntry,
        dest: &Path,
        on_progress: ProgressCallback,
    ) -> Result<()> {
        let src = self.dir.join(&entry.filename);
        if !src.is_file() {
            return Err(Error::asset_not_found(&entry.filename));
        }
        fs::copy(&src, dest)?;
        on_progress(100);
        verify_package_checksum(entry, dest)
    }
}
