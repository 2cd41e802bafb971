//! Static web host backend
//!
//! The feed is `GET {base}/RELEASES`; package assets live next to it unless
//! an entry carries its own absolute URL.

use std::path::Path;

use async_trait::async_trait;
use slipstream_core::manifest::{parse_manifest, RELEASES_FILE_NAME};
use slipstream_core::{Error, ProgressCallback, ReleaseEntry, Result};
use tracing::debug;
use url::Url;
use uuid::Uuid;

use crate::downloader::{verify_package_checksum, HttpFileDownloader};
use crate::source::{filter_staged, UpdateSource};

pub struct WebSource {
    base: Url,
    downloader: HttpFileDownloader,
}

impl WebSource {
    pub fn new(base_url: &str) -> Result<Self> {
        // A trailing slash keeps Url::join from eating the last path segment.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base = Url::parse(&normalized).map_err(|_| Error::invalid_repo_url(base_url))?;
        Ok(Self {
            base,
            downloader: HttpFileDownloader::new()?,
        })
    }

    fn feed_url(&self, latest_local: Option<&ReleaseEntry>) -> Result<Url> {
        let mut url = self
            .base
            .join(RELEASES_FILE_NAME)
            .map_err(|_| Error::invalid_repo_url(self.base.as_str()))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("arch", std::env::consts::ARCH);
            query.append_pair("os", std::env::consts::OS);
            query.append_pair(
                "rid",
                &format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
            );
            if let Some(local) = latest_local {
                query.append_pair("id", &local.package_id);
                query.append_pair("localVersion", &local.version.to_string());
            }
        }
        Ok(url)
    }

    fn asset_url(&self, entry: &ReleaseEntry) -> Result<Url> {
        let mut target = match &entry.base_url {
            Some(base) => {
                let full = format!("{base}{}", entry.filename);
                Url::parse(&full).map_err(|_| Error::invalid_repo_url(full))?
            }
            None => self
                .base
                .join(&entry.filename)
                .map_err(|_| Error::invalid_repo_url(self.base.as_str()))?,
        };
        if let Some(query) = &entry.query {
            target.set_query(Some(query.trim_start_matches('?')));
        }
        Ok(target)
    }
}

#[async_trait]
impl UpdateSource for WebSource {
    fn name(&self) -> &'static str {
        "web"
    }

    async fn get_release_feed(
        &self,
        staging_id: Option<&Uuid>,
        latest_local: Option<&ReleaseEntry>,
    ) -> Result<Vec<ReleaseEntry>> {
        let url = self.feed_url(latest_local)?;
        debug!(%url, "fetching release manifest");
        let text = self
            .downloader
            .download_string(self.downloader.client().get(url.as_str()))
            .await?;
        filter_staged(parse_manifest(&text)?, staging_id)
    }

    async fn download_release_entry(
        &self,
        entry: &ReleaseEntry,
        dest: &Path,
        on_progress: ProgressCallback,
    ) -> Result<()> {
        let url = self.asset_url(entry)?;
        debug!(%url, file = %entry.filename, "downloading package");
        self.downloader
            .download_file(
                self.downloader.client().get(url.as_str()),
                dest,
                Some(entry.file_size),
                on_progress,
            )
            .await?;
        verify_package_checksum(entry, dest)
    }
}
