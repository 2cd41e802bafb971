//! Injected OS shell integration
//!
//! Shortcut and pinned-item handling is platform surface the engine only
//! orchestrates. Callers inject an implementation; the default does
//! nothing, which is correct on headless systems and in tests.

use std::path::Path;

use slipstream_core::Result;

/// Shortcut and pinned-item operations delegated to the platform
pub trait ShellIntegration: Send + Sync {
    /// Create default shortcuts for a top-level executable
    fn create_shortcuts(&self, exe: &Path, root: &Path) -> Result<()>;

    /// Remove shortcuts previously created for an executable
    fn remove_shortcuts(&self, exe: &Path) -> Result<()>;

    /// Repoint pinned shortcuts at the newly installed version directory
    fn fix_pinned_shortcuts(&self, root: &Path, new_version_dir: &Path) -> Result<()>;
}

/// Shell integration that does nothing
pub struct NoopShell;

impl ShellIntegration for NoopShell {
    fn create_shortcuts(&self, _exe: &Path, _root: &Path) -> Result<()> {
        Ok(())
    }

    fn remove_shortcuts(&self, _exe: &Path) -> Result<()> {
        Ok(())
    }

    fn fix_pinned_shortcuts(&self, _root: &Path, _new_version_dir: &Path) -> Result<()> {
        Ok(())
    }
}
