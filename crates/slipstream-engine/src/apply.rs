//! The apply state machine
//!
//! Applying a resolved update runs through fixed phases, each owning a
//! disjoint slice of the 0..=100 progress range:
//!
//! ```text
//! ComposeDeltas          [0, 40]
//! InstallToVersionDir    [40, 80]
//! UpdateLocalManifest    [80, 85]
//! SelfUpdateBinaryCopy   [85, 90]
//! RunPostInstallHooks    [90, 95]
//! FixPinnedShortcuts     [95, 97]
//! RemoveLegacyShims      [97, 98]
//! CleanDeadVersions      [98, 100]
//! ```
//!
//! Hook, shortcut, shim and cleanup failures are logged and swallowed;
//! composition, extraction and manifest failures abort the apply.

use std::fs;
use std::path::{Path, PathBuf};

use slipstream_core::manifest::{build_manifest_for_dir, write_manifest_file, RELEASES_FILE_NAME};
use slipstream_core::{
    map_progress, progress_fn, Error, PackageVersion, ProgressCallback, ReleaseEntry, Result,
};
use tracing::{debug, info, warn};

use crate::aware::{aware_executables_in, executables_in};
use crate::delta::compose_full_from_deltas;
use crate::hooks::{invoke_hooks, launch_first_run, HookEvent};
use crate::layout::{
    current_version_dir, is_dead, list_version_dirs, mark_dead, version_dir, DEAD_MARKER,
    UPDATER_BINARY,
};
use crate::package::extract_package;
use crate::resolver::UpdateInfo;
use crate::shell::{NoopShell, ShellIntegration};
use crate::shims::{NoopShimStore, ShimStore};

pub struct ApplyEngine {
    root: PathBuf,
    shell: Box<dyn ShellIntegration>,
    shims: Box<dyn ShimStore>,
}

impl ApplyEngine {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            shell: Box::new(NoopShell),
            shims: Box::new(NoopShimStore),
        }
    }

    pub fn with_shell(mut self, shell: Box<dyn ShellIntegration>) -> Self {
        self.shell = shell;
        self
    }

    pub fn with_shims(mut self, shims: Box<dyn ShimStore>) -> Self {
        self.shims = shims;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Apply a resolved update batch, returning the version now current
    pub async fn apply_releases(
        &self,
        info: &UpdateInfo,
        is_first_install: bool,
        silent: bool,
        on_progress: ProgressCallback,
    ) -> Result<PackageVersion> {
        let previous = current_version_dir(&self.root)?;

        // ComposeDeltas [0, 40]
        let target = self.compose(info, on_progress.clone())?;
        on_progress(40);

        let Some(target) = target else {
            // Nothing new to install. On a very first install the current
            // directory still gets its first-run treatment.
            if is_first_install {
                if let Some((version, dir)) = &previous {
                    self.post_install_hooks(dir, version, true, silent).await;
                }
            }
            on_progress(100);
            let version = previous
                .map(|(v, _)| v)
                .unwrap_or(info.future_release.version);
            return Ok(version);
        };

        let version = target.version;
        info!(version = %version, "installing release");

        // InstallToVersionDir [40, 80]
        let target_dir = version_dir(&self.root, &version);
        if target_dir.exists() {
            // Leftover from an interrupted run; installs never resume into
            // a half-written directory.
            debug!(dir = %target_dir.display(), "removing stale version directory");
            fs::remove_dir_all(&target_dir)?;
        }
        let outer = on_progress.clone();
        extract_package(
            &info.packages_dir.join(&target.filename),
            &target_dir,
            progress_fn(move |p| outer(map_progress(p, 40, 80))),
        )?;

        // UpdateLocalManifest [80, 85]
        build_manifest_for_dir(&info.packages_dir)?;
        on_progress(85);

        // SelfUpdateBinaryCopy [85, 90]
        self.self_update_binary(&target_dir);
        on_progress(90);

        // RunPostInstallHooks [90, 95]
        self.post_install_hooks(&target_dir, &version, is_first_install, silent)
            .await;
        on_progress(95);

        // FixPinnedShortcuts [95, 97]
        if let Err(e) = self.shell.fix_pinned_shortcuts(&self.root, &target_dir) {
            warn!("failed to fix pinned shortcuts: {e}");
        }
        on_progress(97);

        // RemoveLegacyShims [97, 98]
        self.remove_legacy_shims();
        on_progress(98);

        // CleanDeadVersions [98, 100]
        self.clean_dead_versions(Some(&version), previous.as_ref().map(|(v, _)| v), false)
            .await?;
        self.prune_packages(&target)?;
        on_progress(100);

        Ok(version)
    }

    /// Run uninstall hooks on the live version, then take the root down
    pub async fn full_uninstall(&self) -> Result<()> {
        if let Some((version, dir)) = current_version_dir(&self.root)? {
            info!(version = %version, "uninstalling");
            let _ = invoke_hooks(&dir, HookEvent::Uninstall, &version).await;

            let aware = aware_executables_in(&dir, 1).unwrap_or_default();
            if aware.is_empty() {
                for exe in executables_in(&dir).unwrap_or_default() {
                    if let Err(e) = self.shell.remove_shortcuts(&exe) {
                        warn!(exe = %exe.display(), "failed to remove shortcuts: {e}");
                    }
                }
            }
        }

        if let Err(e) = fs::remove_dir_all(&self.root) {
            warn!(root = %self.root.display(), "could not fully remove app root: {e}");
        }
        if self.root.exists() {
            fs::write(self.root.join(DEAD_MARKER), b"")?;
        }
        Ok(())
    }

    /// Retire version directories that are neither the new nor the
    /// previous version
    ///
    /// Candidates that still back a running process, and any that cannot
    /// be deleted, are marked dead and left for a later pass. With `force`
    /// set, obsolete hooks are skipped.
    pub async fn clean_dead_versions(
        &self,
        keep_new: Option<&PackageVersion>,
        keep_previous: Option<&PackageVersion>,
        force: bool,
    ) -> Result<()> {
        let running = running_process_exes();

        for (version, dir) in list_version_dirs(&self.root)? {
            if keep_new == Some(&version) || keep_previous == Some(&version) {
                continue;
            }
            if !is_dead(&dir) && !force {
                let _ = invoke_hooks(&dir, HookEvent::Obsolete, &version).await;
            }
            let real_dir = fs::canonicalize(&dir).unwrap_or_else(|_| dir.clone());
            if running.iter().any(|exe| exe.starts_with(&real_dir)) {
                debug!(dir = %dir.display(), "directory backs a running process, marking dead for a later pass");
                if !is_dead(&dir) {
                    let _ = mark_dead(&dir);
                }
                continue;
            }
            if let Err(e) = fs::remove_dir_all(&dir) {
                warn!(dir = %dir.display(), "could not delete version directory, marking dead: {e}");
                let _ = mark_dead(&dir);
            } else {
                debug!(dir = %dir.display(), "removed old version directory");
            }
        }
        Ok(())
    }

    fn compose(
        &self,
        info: &UpdateInfo,
        on_progress: ProgressCallback,
    ) -> Result<Option<ReleaseEntry>> {
        let batch = &info.releases_to_apply;
        if batch.is_empty() {
            return Ok(None);
        }

        let deltas = batch.iter().filter(|e| e.is_delta).count();
        if deltas != 0 && deltas != batch.len() {
            return Err(Error::IncompatibleChain);
        }

        if deltas == 0 {
            let newest = batch
                .iter()
                .max_by(|a, b| a.version.cmp(&b.version))
                .expect("non-empty batch");
            return Ok(Some(newest.clone()));
        }

        let installed = info
            .currently_installed
            .as_ref()
            .ok_or(Error::IncompatibleChain)?;
        let outer = on_progress.clone();
        let composed = compose_full_from_deltas(
            installed,
            batch,
            &info.packages_dir,
            progress_fn(move |p| outer(map_progress(p, 0, 40))),
        )?;
        Ok(Some(composed))
    }

    async fn post_install_hooks(
        &self,
        dir: &Path,
        version: &PackageVersion,
        is_first_install: bool,
        silent: bool,
    ) {
        let event = if is_first_install {
            HookEvent::Install
        } else {
            HookEvent::Updated
        };
        match invoke_hooks(dir, event, version).await {
            Ok(0) => {
                // No aware executables: default shortcuts for everything
                // at the top level, and an unsupervised first launch.
                let exes = executables_in(dir).unwrap_or_default();
                for exe in &exes {
                    if let Err(e) = self.shell.create_shortcuts(exe, &self.root) {
                        warn!(exe = %exe.display(), "failed to create shortcuts: {e}");
                    }
                }
                if is_first_install && !silent {
                    launch_first_run(&exes, dir);
                }
            }
            Ok(_) => {}
            Err(e) => warn!("post-install hooks failed: {e}"),
        }
    }

    /// Copy a payload-carried updater binary over the root-level one
    fn self_update_binary(&self, new_dir: &Path) {
        let source = new_dir.join(UPDATER_BINARY);
        if !source.is_file() {
            return;
        }
        let dest = self.root.join(UPDATER_BINARY);

        let running = std::env::current_exe().ok();
        if running.as_deref() == Some(dest.as_path()) {
            // Can't overwrite ourselves while running; the fresh copy
            // finishes the swap once we exit.
            debug!("delegating self-update to the new updater binary");
            if let Err(e) = std::process::Command::new(&source)
                .arg(format!("--copy-self-on-exit={}", dest.display()))
                .spawn()
            {
                warn!("failed to launch replacement updater: {e}");
            }
            return;
        }

        if let Err(e) = fs::copy(&source, &dest) {
            warn!("failed to update the updater binary: {e}");
        }
    }

    fn remove_legacy_shims(&self) {
        match self.shims.list_by_prefix(&self.root) {
            Ok(shims) => {
                for shim in shims {
                    if let Err(e) = self.shims.delete(&shim) {
                        warn!(shim = %shim.display(), "failed to delete shim: {e}");
                    }
                }
            }
            Err(e) => warn!("failed to enumerate shims: {e}"),
        }
    }

    /// Keep only the newly installed package on disk and rewrite the
    /// manifest to exactly that entry
    fn prune_packages(&self, target: &ReleaseEntry) -> Result<()> {
        let packages = self.root.join(crate::layout::PACKAGES_DIR);
        for dirent in fs::read_dir(&packages)? {
            let path = dirent?.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if !path.is_file() || name == RELEASES_FILE_NAME || name == target.filename {
                continue;
            }
            if name.ends_with(".package") {
                if let Err(e) = fs::remove_file(&path) {
                    warn!(path = %path.display(), "could not prune package: {e}");
                }
            }
        }
        write_manifest_file(&packages.join(RELEASES_FILE_NAME), &[target.clone()])
    }
}

fn running_process_exes() -> Vec<PathBuf> {
    let system = sysinfo::System::new_all();
    system
        .processes()
        .values()
        .filter_map(|p| p.exe().map(Path::to_path_buf))
        .collect()
}
