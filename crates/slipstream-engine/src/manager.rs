//! The update manager facade
//!
//! Ties a configuration to an update source and the apply engine:
//! check-for-update, concurrent verified downloads, apply, uninstall.
//! Download and apply operations hold the update lock for their whole
//! duration.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use slipstream_core::manifest::load_manifest_file;
use slipstream_core::{
    PackageVersion, ProgressCallback, ProgressContext, ReleaseEntry, Result, UpdateConfig,
    RELEASES_FILE_NAME,
};
use slipstream_sources::downloader::verify_package_checksum;
use slipstream_sources::{source_for_config, UpdateSource};
use tracing::{debug, info};

use crate::apply::ApplyEngine;
use crate::layout::packages_dir;
use crate::lock::UpdateLock;
use crate::resolver::{resolve_updates, UpdateInfo};

/// How many release assets may download at once
const DOWNLOAD_CONCURRENCY: usize = 4;

pub struct UpdateManager {
    config: UpdateConfig,
    source: Box<dyn UpdateSource>,
    engine: ApplyEngine,
}

impl UpdateManager {
    pub fn new(config: UpdateConfig) -> Result<Self> {
        let source = source_for_config(&config)?;
        let engine = ApplyEngine::new(&config.root_dir);
        Ok(Self {
            config,
            source,
            engine,
        })
    }

    /// Swap in a custom source (tests, embedded feeds)
    pub fn with_source(mut self, source: Box<dyn UpdateSource>) -> Self {
        self.source = source;
        self
    }

    /// Swap in a custom apply engine (shell integration, shim store)
    pub fn with_engine(mut self, engine: ApplyEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &UpdateConfig {
        &self.config
    }

    fn packages_dir(&self) -> PathBuf {
        packages_dir(&self.config.root_dir)
    }

    /// Newest entry in the local manifest, if one exists
    fn latest_local_release(&self) -> Option<ReleaseEntry> {
        let manifest = self.packages_dir().join(RELEASES_FILE_NAME);
        let entries = load_manifest_file(&manifest).ok()?;
        entries
            .into_iter()
            .filter(|e| !e.is_delta)
            .max_by(|a, b| a.version.cmp(&b.version))
    }

    /// Compare the remote feed against the local state
    pub async fn check_for_update(&self) -> Result<UpdateInfo> {
        let local = self.latest_local_release();
        debug!(
            local = local.as_ref().map(|e| e.version.to_string()),
            "checking for updates"
        );
        let feed = self
            .source
            .get_release_feed(self.config.staging_id.as_ref(), local.as_ref())
            .await?;
        resolve_updates(
            &feed,
            local.as_ref(),
            self.config.prefer_deltas,
            &self.packages_dir(),
        )
    }

    /// Download every release in the batch into the packages directory
    ///
    /// Assets download concurrently (bounded); each reports its own
    /// sub-progress, combined into one non-regressing stream. A package
    /// already on disk with a matching checksum is not fetched again. Any
    /// failed download fails the whole operation.
    pub async fn download_releases(
        &self,
        info: &UpdateInfo,
        on_progress: ProgressCallback,
    ) -> Result<()> {
        let _lock = UpdateLock::acquire(&self.config.root_dir)?;
        fs::create_dir_all(&info.packages_dir)?;

        let ctx = Arc::new(ProgressContext::new(
            info.releases_to_apply.len(),
            on_progress,
        ));

        let results: Vec<Result<()>> = stream::iter(info.releases_to_apply.iter().enumerate())
            .map(|(index, entry)| {
                let ctx = ctx.clone();
                let dest = info.packages_dir.join(&entry.filename);
                async move {
                    if dest.is_file() && verify_package_checksum(entry, &dest).is_ok() {
                        debug!(file = %entry.filename, "package already downloaded");
                        ctx.finish_item(index);
                        return Ok(());
                    }
                    let item = ctx.clone();
                    self.source
                        .download_release_entry(
                            entry,
                            &dest,
                            slipstream_core::progress_fn(move |p| item.report_item(index, p)),
                        )
                        .await?;
                    ctx.finish_item(index);
                    Ok(())
                }
            })
            .buffer_unordered(DOWNLOAD_CONCURRENCY)
            .collect()
            .await;

        for result in results {
            result?;
        }
        info!(count = info.releases_to_apply.len(), "downloads complete");
        Ok(())
    }

    /// Apply a downloaded batch; returns the version now current
    pub async fn apply_releases(
        &self,
        info: &UpdateInfo,
        silent: bool,
        on_progress: ProgressCallback,
    ) -> Result<PackageVersion> {
        let _lock = UpdateLock::acquire(&self.config.root_dir)?;
        let is_first_install = info.currently_installed.is_none();
        self.engine
            .apply_releases(info, is_first_install, silent, on_progress)
            .await
    }

    /// Check, download and apply in one call
    pub async fn update_app(&self, on_progress: ProgressCallback) -> Result<PackageVersion> {
        let info = self.check_for_update().await?;
        let download = on_progress.clone();
        self.download_releases(&info, slipstream_core::progress_fn(move |p| {
            download(p / 2);
        }))
        .await?;
        let apply = on_progress.clone();
        self.apply_releases(&info, true, slipstream_core::progress_fn(move |p| {
            apply(50 + p / 2);
        }))
        .await
    }

    /// Remove the application entirely
    pub async fn full_uninstall(&self) -> Result<()> {
        let _lock = UpdateLock::acquire(&self.config.root_dir)?;
        self.engine.full_uninstall().await
    }
}
