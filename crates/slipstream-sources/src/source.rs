//! Update-source trait and backend selection

use std::path::Path;

use async_trait::async_trait;
use slipstream_core::{
    Error, ProgressCallback, ReleaseEntry, Result, SourceBackend, UpdateConfig,
};
use uuid::Uuid;

use crate::dir::DirSource;
use crate::gitea::GiteaSource;
use crate::github::GithubSource;
use crate::web::WebSource;

/// A place releases come from
///
/// Given identical remote state, `get_release_feed` is deterministic.
/// An empty feed is reported as `Error::EmptyFeed`, distinct from
/// transport failures.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Fetch the release feed visible to this device
    ///
    /// `latest_local` is the newest locally installed release, forwarded to
    /// backends that report it to the server; `staging_id` gates staged
    /// entries out of the returned set.
    async fn get_release_feed(
        &self,
        staging_id: Option<&Uuid>,
        latest_local: Option<&ReleaseEntry>,
    ) -> Result<Vec<ReleaseEntry>>;

    /// Download one release entry's package file to `dest`
    async fn download_release_entry(
        &self,
        entry: &ReleaseEntry,
        dest: &Path,
        on_progress: ProgressCallback,
    ) -> Result<()>;
}

/// Select and build the backend for a configuration
///
/// `Auto` picks the web backend for http(s) URLs and the directory backend
/// for anything else; hosted backends are always explicit.
pub fn source_for_config(config: &UpdateConfig) -> Result<Box<dyn UpdateSource>> {
    let url = config.update_url.as_str();
    let source: Box<dyn UpdateSource> = match config.backend {
        SourceBackend::Auto => {
            if url.starts_with("http://") || url.starts_with("https://") {
                Box::new(WebSource::new(url)?)
            } else {
                Box::new(DirSource::new(Path::new(url)))
            }
        }
        SourceBackend::Web => Box::new(WebSource::new(url)?),
        SourceBackend::Dir => Box::new(DirSource::new(Path::new(url))),
        SourceBackend::Github => Box::new(GithubSource::new(
            url,
            config.access_token.clone(),
            config.prerelease,
        )?),
        SourceBackend::Gitea => Box::new(GiteaSource::new(
            url,
            config.access_token.clone(),
            config.prerelease,
        )?),
    };
    Ok(source)
}

/// Drop feed entries a staged device must not see
pub(crate) fn filter_staged(
    entries: Vec<ReleaseEntry>,
    staging_id: Option<&Uuid>,
) -> Result<Vec<ReleaseEntry>> {
    let visible: Vec<ReleaseEntry> = entries
        .into_iter()
        .filter(|e| e.is_visible_to(staging_id))
        .collect();
    if visible.is_empty() {
        return Err(Error::EmptyFeed);
    }
    Ok(visible)
}
