//! CLI command implementations

pub mod apply;
pub mod check;
pub mod download;
pub mod uninstall;
pub mod version;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use slipstream_core::{progress_fn, ProgressCallback, UpdateConfig};
use slipstream_engine::UpdateManager;

/// Config file looked up in the working directory when --config is absent
const DEFAULT_CONFIG_FILE: &str = "slipstream.json";

/// Load the update configuration from `--config` or the default location
pub(crate) fn load_config(config_path: Option<&Path>) -> Result<UpdateConfig> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    UpdateConfig::load(&path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}

/// Build an update manager from the configuration file
pub(crate) fn manager_for(config_path: Option<&Path>) -> Result<UpdateManager> {
    let config = load_config(config_path)?;
    UpdateManager::new(config).context("failed to initialize the update source")
}

/// Bridge a percent bar into the engine's progress callback
pub(crate) fn bar_progress(bar: &ProgressBar) -> ProgressCallback {
    let bar = bar.clone();
    progress_fn(move |p| bar.set_position(u64::from(p)))
}
