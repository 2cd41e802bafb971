//! Update configuration

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Which update-source backend to talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceBackend {
    /// Pick by inspecting the update URL
    #[default]
    Auto,
    /// Static web host serving RELEASES + packages
    Web,
    /// Local directory
    Dir,
    /// GitHub or GitHub Enterprise releases
    Github,
    /// Gitea releases API
    Gitea,
}

/// Configuration for one self-updating application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateConfig {
    /// Package id, the `{id}` in `{id}.{version}-full.package`
    pub app_id: String,

    /// Root installation directory holding `app-{version}` dirs and `packages`
    pub root_dir: PathBuf,

    /// Feed location: an http(s) URL, a repository URL, or a directory path
    pub update_url: String,

    #[serde(default)]
    pub backend: SourceBackend,

    /// Include pre-releases from hosted backends
    #[serde(default)]
    pub prerelease: bool,

    /// Prefer delta chains over full packages when available
    #[serde(default = "default_prefer_deltas")]
    pub prefer_deltas: bool,

    /// Bearer token for hosted backends
    #[serde(default)]
    pub access_token: Option<String>,

    /// Stable per-device id for staged rollouts
    #[serde(default)]
    pub staging_id: Option<Uuid>,
}

fn default_prefer_deltas() -> bool {
    true
}

impl UpdateConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }
}
