//! Self-hosted Gitea releases backend
//!
//! Uses the `{authority}/api/v1/` releases API with the same `RELEASES`
//! manifest convention as the other hosted backends. Asset downloads need
//! an access token; a missing token is only a warning until a download is
//! actually attempted.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::RequestBuilder;
use serde::Deserialize;
use slipstream_core::manifest::{parse_manifest, RELEASES_FILE_NAME};
use slipstream_core::{Error, ProgressCallback, ReleaseEntry, Result};
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::downloader::{verify_package_checksum, HttpFileDownloader};
use crate::source::{filter_staged, UpdateSource};

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaRelease {
    pub tag_name: String,

    #[serde(default)]
    pub draft: bool,

    #[serde(default)]
    pub prerelease: bool,

    pub published_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub assets: Vec<GiteaAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GiteaAsset {
    pub name: String,
    pub browser_download_url: String,
    pub size: u64,
}

pub struct GiteaSource {
    api_base: Url,
    owner: String,
    repo: String,
    token: Option<String>,
    prerelease: bool,
    downloader: HttpFileDownloader,
    cached_release: Mutex<Option<GiteaRelease>>,
}

impl GiteaSource {
    pub fn new(repo_url: &str, token: Option<String>, prerelease: bool) -> Result<Self> {
        let url = Url::parse(repo_url).map_err(|_| Error::invalid_repo_url(repo_url))?;
        let host = url
            .host_str()
            .ok_or_else(|| Error::invalid_repo_url(repo_url))?;

        let mut segments = url
            .path_segments()
            .ok_or_else(|| Error::invalid_repo_url(repo_url))?
            .filter(|s| !s.is_empty());
        let owner = segments
            .next()
            .ok_or_else(|| Error::invalid_repo_url(repo_url))?
            .to_string();
        let repo = segments
            .next()
            .ok_or_else(|| Error::invalid_repo_url(repo_url))?
            .trim_end_matches(".git")
            .to_string();

        let mut base = format!("{}://{}", url.scheme(), host);
        if let Some(port) = url.port() {
            base.push_str(&format!(":{port}"));
        }
        base.push_str("/api/v1/");
        let api_base = Url::parse(&base).map_err(|_| Error::invalid_repo_url(repo_url))?;

        if token.is_none() {
            warn!("no access token configured; gitea asset downloads will fail");
        }

        Ok(Self {
            api_base,
            owner,
            repo,
            token,
            prerelease,
            downloader: HttpFileDownloader::new()?,
            cached_release: Mutex::new(None),
        })
    }

    fn get(&self, url: &str) -> RequestBuilder {
        let mut request = self.downloader.client().get(url);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {token}"));
        }
        request
    }

    async fn fetch_latest_release(&self) -> Result<GiteaRelease> {
        let url = format!(
            "{}repos/{}/{}/releases?limit=10",
            self.api_base, self.owner, self.repo
        );
        debug!(%url, "listing releases");
        let body = self.downloader.download_string(self.get(&url)).await?;
        let mut releases: Vec<GiteaRelease> = serde_json::from_str(&body)?;

        releases.retain(|r| !r.draft && (self.prerelease || !r.prerelease));
        releases.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        let latest = releases.into_iter().next().ok_or(Error::EmptyFeed)?;
        debug!(tag = %latest.tag_name, "selected release");

        *self.cached_release.lock().unwrap_or_else(|e| e.into_inner()) = Some(latest.clone());
        Ok(latest)
    }

    async fn release(&self) -> Result<GiteaRelease> {
        let cached = self
            .cached_release
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        match cached {
            Some(release) => Ok(release),
            None => self.fetch_latest_release().await,
        }
    }

    fn find_asset<'a>(assets: &'a [GiteaAsset], name: &str) -> Result<&'a GiteaAsset> {
        let mut matches = assets.iter().filter(|a| a.name.eq_ignore_ascii_case(name));
        let first = matches.next().ok_or_else(|| Error::asset_not_found(name))?;
        if matches.next().is_some() {
            warn!(asset = name, "release carries more than one asset with this name");
        }
        Ok(first)
    }
}

#[async_trait]
impl UpdateSource for GiteaSource {
    fn name(&self) -> &'static str {
        "gitea"
    }

    async fn get_release_feed(
        &self,
        staging_id: Option<&Uuid>,
        _latest_local: Option<&ReleaseEntry>,
    ) -> Result<Vec<ReleaseEntry>> {
        let release = self.fetch_latest_release().await?;
        let manifest_asset = Self::find_asset(&release.assets, RELEASES_FILE_NAME)?;
        let text = self
            .downloader
            .download_string(self.get(&manifest_asset.browser_download_url))
            .await?;
        filter_staged(parse_manifest(&text)?, staging_id)
    }

    async fn download_release_entry(
        &self,
        entry: &ReleaseEntry,
        dest: &Path,
        on_progress: ProgressCallback,
    ) -> Result<()> {
        if self.token.is_none() {
            return Err(Error::missing_credentials("gitea"));
        }
        let release = self.release().await?;
        let asset = Self::find_asset(&release.assets, &entry.filename)?;
        self.downloader
            .download_file(
                self.get(&asset.browser_download_url),
                dest,
                Some(entry.file_size),
                on_progress,
            )
            .await?;
        verify_package_checksum(entry, dest)
    }
}
