//! Injected shim store
//!
//! Legacy launcher shims live in platform-specific registries the engine
//! does not own. The apply flow only needs to enumerate shims pointing
//! into the app root and delete them.

use std::path::{Path, PathBuf};

use slipstream_core::Result;

/// Registry of launcher shims, keyed by the target path prefix
pub trait ShimStore: Send + Sync {
    /// Shims whose target path starts with `prefix`
    fn list_by_prefix(&self, prefix: &Path) -> Result<Vec<PathBuf>>;

    /// Delete one shim
    fn delete(&self, shim: &Path) -> Result<()>;
}

/// Shim store with nothing in it
pub struct NoopShimStore;

impl ShimStore for NoopShimStore {
    fn list_by_prefix(&self, _prefix: &Path) -> Result<Vec<PathBuf>> {
        Ok(Vec::new())
    }

    fn delete(&self, _shim: &Path) -> Result<()> {
        Ok(())
    }
}
