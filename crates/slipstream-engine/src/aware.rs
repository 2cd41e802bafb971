//! Awareness detection
//!
//! An executable opts in to lifecycle hooks by declaring an awareness
//! version. Detectors run in fixed precedence:
//!
//! 1. sidecar text file `{exe}.slipstream` holding a bare integer
//! 2. sibling application manifest `{exe}.manifest` with a
//!    `<SlipstreamAwareVersion>` element
//! 3. sibling library manifest `{stem}.dll.manifest`, same element
//!
//! A pass over the whole list is retried up to 3 times with a 100ms delay
//! whenever any detector errors (transient file locks during extraction);
//! retrying stops as soon as one pass completes error-free, whether or not
//! it found a value.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use slipstream_core::Result;
use tracing::debug;

const DETECT_ATTEMPTS: u32 = 3;
const DETECT_RETRY_DELAY: Duration = Duration::from_millis(100);

static MANIFEST_VALUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<SlipstreamAwareVersion>\s*(-?\d+)\s*</SlipstreamAwareVersion>")
        .expect("awareness manifest regex")
});

type Detector = fn(&Path) -> Result<Option<i32>>;

const DETECTORS: [Detector; 3] = [sidecar_value, app_manifest_value, dll_manifest_value];

/// The awareness version an executable declares, if any
pub fn awareness_value(exe: &Path) -> Option<i32> {
    for attempt in 1..=DETECT_ATTEMPTS {
        let mut errored = false;
        for detector in DETECTORS {
            match detector(exe) {
                Ok(Some(value)) => return Some(value),
                Ok(None) => {}
                Err(e) => {
                    debug!(exe = %exe.display(), attempt, "awareness detector error: {e}");
                    errored = true;
                }
            }
        }
        if !errored {
            return None;
        }
        if attempt < DETECT_ATTEMPTS {
            std::thread::sleep(DETECT_RETRY_DELAY);
        }
    }
    None
}

/// Whether an executable declares awareness at `minimum` or above
pub fn is_aware(exe: &Path, minimum: i32) -> bool {
    awareness_value(exe).is_some_and(|v| v > 0 && v >= minimum)
}

/// Top-level executables in a directory, sorted by file name
pub fn executables_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut exes = Vec::new();
    for dirent in fs::read_dir(dir)? {
        let path = dirent?.path();
        if path.is_file() && is_executable(&path) {
            exes.push(path);
        }
    }
    exes.sort();
    Ok(exes)
}

/// Aware top-level executables in fixed (name) order
pub fn aware_executables_in(dir: &Path, minimum: i32) -> Result<Vec<PathBuf>> {
    Ok(executables_in(dir)?
        .into_iter()
        .filter(|exe| is_aware(exe, minimum))
        .collect())
}

fn sidecar_value(exe: &Path) -> Result<Option<i32>> {
    let sidecar = sibling_with_suffix(exe, ".slipstream");
    if !sidecar.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(&sidecar)?;
    Ok(text.trim().parse().ok())
}

fn app_manifest_value(exe: &Path) -> Result<Option<i32>> {
    manifest_value(&sibling_with_suffix(exe, ".manifest"))
}

fn dll_manifest_value(exe: &Path) -> Result<Option<i32>> {
    let stem = exe.with_extension("");
    manifest_value(&sibling_with_suffix(&stem, ".dll.manifest"))
}

fn manifest_value(manifest: &Path) -> Result<Option<i32>> {
    if !manifest.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(manifest)?;
    Ok(MANIFEST_VALUE_RE
        .captures(&text)
        .and_then(|caps| caps[1].parse().ok()))
}

fn sibling_with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("exe"))
}
