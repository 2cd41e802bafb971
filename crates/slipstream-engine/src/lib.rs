//! # slipstream-engine
//!
//! The apply side of the Slipstream update engine:
//! - Package containers and delta chain composition
//! - Release resolution against the local install
//! - The multi-phase apply state machine and full uninstall
//! - Awareness detection, lifecycle hooks, cleanup and the update lock

pub mod apply;
pub mod aware;
pub mod delta;
pub mod hooks;
pub mod layout;
pub mod lock;
pub mod manager;
pub mod package;
pub mod resolver;
pub mod shell;
pub mod shims;

pub use apply::ApplyEngine;
pub use hooks::HookEvent;
pub use lock::UpdateLock;
pub use manager::UpdateManager;
pub use resolver::{resolve_updates, UpdateInfo};
pub use shell::{NoopShell, ShellIntegration};
pub use shims::{NoopShimStore, ShimStore};
