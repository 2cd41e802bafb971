//! Lifecycle hook invocation
//!
//! Aware executables receive lifecycle flags at the appropriate points of
//! the apply flow. Hooks run strictly sequentially, each under its own
//! timeout; a failing or timed-out hook is logged and skipped, never fatal.

use std::path::Path;
use std::time::Duration;

use slipstream_core::{PackageVersion, Result};
use tokio::process::Command;
use tracing::{info, warn};

use crate::aware::aware_executables_in;

/// A lifecycle event delivered to aware executables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    /// First installation of the application
    Install,
    /// Updated to a new version
    Updated,
    /// This version directory is about to be removed
    Obsolete,
    /// The whole application is being uninstalled
    Uninstall,
}

impl HookEvent {
    pub fn flag(&self) -> &'static str {
        match self {
            HookEvent::Install => "--slipstream-install",
            HookEvent::Updated => "--slipstream-updated",
            HookEvent::Obsolete => "--slipstream-obsolete",
            HookEvent::Uninstall => "--slipstream-uninstall",
        }
    }

    /// Install-side events get longer to do real work than teardown events
    pub fn timeout(&self) -> Duration {
        match self {
            HookEvent::Install | HookEvent::Updated => Duration::from_secs(30),
            HookEvent::Obsolete | HookEvent::Uninstall => Duration::from_secs(10),
        }
    }
}

/// Flag passed on the unsupervised first launch after initial install
pub const FIRST_RUN_FLAG: &str = "--slipstream-firstrun";

/// Invoke every aware executable in `dir` with the event flag and version
///
/// Returns the number of aware executables found; hook outcomes never
/// propagate as errors.
pub async fn invoke_hooks(dir: &Path, event: HookEvent, version: &PackageVersion) -> Result<usize> {
    let exes = aware_executables_in(dir, 1)?;
    for exe in &exes {
        info!(exe = %exe.display(), flag = event.flag(), "invoking lifecycle hook");
        run_one_hook(exe, dir, event, version).await;
    }
    Ok(exes.len())
}

async fn run_one_hook(exe: &Path, dir: &Path, event: HookEvent, version: &PackageVersion) {
    let child = Command::new(exe)
        .arg(event.flag())
        .arg(version.to_string())
        .current_dir(dir)
        .kill_on_drop(true)
        .spawn();

    let mut child = match child {
        Ok(child) => child,
        Err(e) => {
            warn!(exe = %exe.display(), "hook failed to start: {e}");
            return;
        }
    };

    match tokio::time::timeout(event.timeout(), child.wait()).await {
        Ok(Ok(status)) if status.success() => {}
        Ok(Ok(status)) => {
            warn!(exe = %exe.display(), %status, "hook exited with failure");
        }
        Ok(Err(e)) => {
            warn!(exe = %exe.display(), "hook wait failed: {e}");
        }
        Err(_) => {
            warn!(exe = %exe.display(), timeout = ?event.timeout(), "hook timed out");
        }
    }
}

/// Launch executables unsupervised with the first-run flag
///
/// Spawn failures are logged; nothing is awaited.
pub fn launch_first_run(exes: &[std::path::PathBuf], dir: &Path) {
    for exe in exes {
        info!(exe = %exe.display(), "launching for first run");
        if let Err(e) = std::process::Command::new(exe)
            .arg(FIRST_RUN_FLAG)
            .current_dir(dir)
            .spawn()
        {
            warn!(exe = %exe.display(), "first-run launch failed: {e}");
        }
    }
}
