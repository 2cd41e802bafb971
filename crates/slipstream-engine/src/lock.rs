//! The update lock
//!
//! At most one download or apply flow may run per application root. The
//! lock is a `fs4` advisory lock on a file under the root; a busy lock
//! fails fast rather than queueing.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;
use slipstream_core::{Error, Result};
use tracing::debug;

use crate::layout::LOCK_FILE;

/// Held for the duration of an update operation; released on drop
pub struct UpdateLock {
    file: fs::File,
    path: PathBuf,
}

impl UpdateLock {
    /// Acquire the lock for an application root, failing fast when busy
    pub fn acquire(root: &Path) -> Result<Self> {
        fs::create_dir_all(root)?;
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;
        if !file.try_lock_exclusive()? {
            return Err(Error::LockTimeout);
        }
        debug!(path = %path.display(), "acquired update lock");
        Ok(Self { file, path })
    }
}

impl Drop for UpdateLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            debug!(path = %self.path.display(), "failed to release update lock: {e}");
        }
    }
}
