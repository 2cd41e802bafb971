//! GitHub and GitHub Enterprise releases backend
//!
//! The newest published release carries a `RELEASES` asset (the manifest)
//! alongside the package assets. github.com is served by
//! `https://api.github.com/`; Enterprise hosts by `{scheme}://{host}/api/v3/`.

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

use crate::downloader::{ensure_trusted_content_type, verify_package_checksum, HttpFileDownloader};
use crate::source::{filter_staged, UpdateSource};

/// One release as reported by the releases API
#[derive(Debug, Clone, Deserialize)]
pub struct GithubRelease {
    /// Release name (may differ from the tag)
    pub name: Option<String>,

    /// Tag the release was cut from
    pub tag_name: String,

    /// Draft releases are never offered to updaters
    #[serde(default)]
    pub draft: bool,

    /// Marked as a pre-release by the publisher
    #[serde(default)]
    pub prerelease: bool,

    /// Publish timestamp, used for newest-first ordering
    pub published_at: Option<DateTime<Utc>>,

    /// Attached files
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

/// One file attached to a release
#[derive(Debug, Clone, Deserialize)]
pub struct GithubAsset {
    pub name: String,

    /// API endpoint for the asset; serves bytes under `application/octet-stream`
    pub url: String,

    pub browser_download_url: String,

    /// Content type recorded at upload time
    pub content_type: String,

    pub size: u64,
}

pub struct GithubSource {
    api_base: Url,
    owner: String,
    repo: String,
    token: Option<String>,
    prerelease: bool,
    downloader: HttpFileDownloader,
    cached_release: Mutex<Option<GithubRelease>>,
}

impl GithubSource {
    pub fn new(repo_url: &str, token: Option<String>, prerelease: bool) -> Result<Self> {
        let url = Url::parse(repo_url).map_err(|_| Error::invalid_repo_url(repo_url))?;
        let (owner, repo) = repo_path(&url).ok_or_else(|| Error::invalid_repo_url(repo_url))?;
        let api_base = api_base_for(&url).ok_or_else(|| Error::invalid_repo_url(repo_url))?;
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

    fn api_get(&self, url: &str) -> RequestBuilder {
        let mut request = self
            .downloader
            .client()
            .get(url)
            .header("Accept", "application/vnd.github.v3+json");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        request
    }

    fn asset_get(&self, url: &str) -> RequestBuilder {
        let mut request = self
            .downloader
            .client()
            .get(url)
            .header("Accept", "application/octet-stream");
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        request
    }

    /// Fetch the newest published release matching the pre-release flag
    async fn fetch_latest_release(&self) -> Result<GithubRelease> {
        let url = format!(
            "{}repos/{}/{}/releases?per_page=10",
            self.api_base, self.owner, self.repo
        );
        debug!(%url, "listing releases");
        let body = self.downloader.download_string(self.api_get(&url)).await?;
        let mut releases: Vec<GithubRelease> = serde_json::from_str(&body)?;

        releases.retain(|r| !r.draft && (self.prerelease || !r.prerelease));
        releases.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        let latest = releases.into_iter().next().ok_or(Error::EmptyFeed)?;
        debug!(tag = %latest.tag_name, "selected release");

        *self.cached_release.lock().unwrap_or_else(|e| e.into_inner()) = Some(latest.clone());
        Ok(latest)
    }

    async fn release(&self) -> Result<GithubRelease> {
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
}

#[async_trait]
impl UpdateSource for GithubSource {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get_release_feed(
        &self,
        staging_id: Option<&Uuid>,
        _latest_local: Option<&ReleaseEntry>,
    ) -> Result<Vec<ReleaseEntry>> {
        let release = self.fetch_latest_release().await?;
        let manifest_asset = find_asset(&release.assets, RELEASES_FILE_NAME)?;
        ensure_trusted_content_type(&manifest_asset.content_type, &manifest_asset.name)?;

        let text = self
            .downloader
            .download_string(self.asset_get(&manifest_asset.url))
            .await?;
        filter_staged(parse_manifest(&text)?, staging_id)
    }

    async fn download_release_entry(
        &self,
        entry: &ReleaseEntry,
        dest: &Path,
        on_progress: ProgressCallback,
    ) -> Result<()> {
        let release = self.release().await?;
        let asset = find_asset(&release.assets, &entry.filename)?;
        ensure_trusted_content_type(&asset.content_type, &asset.name)?;

        self.downloader
            .download_file(
                self.asset_get(&asset.url),
                dest,
                Some(entry.file_size),
                on_progress,
            )
            .await?;
        verify_package_checksum(entry, dest)
    }
}

/// Look an asset up by name; zero matches fail, extras only warn
fn find_asset<'a>(assets: &'a [GithubAsset], name: &str) -> Result<&'a GithubAsset> {
    let mut matches = assets.iter().filter(|a| a.name.eq_ignore_ascii_case(name));
    let first = matches.next().ok_or_else(|| Error::asset_not_found(name))?;
    if matches.next().is_some() {
        warn!(asset = name, "release carries more than one asset with this name");
    }
    Ok(first)
}

fn repo_path(url: &Url) -> Option<(String, String)> {
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());
    let owner = segments.next()?.to_string();
    let repo = segments.next()?.trim_end_matches(".git").to_string();
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner, repo))
}

/// Public GitHub uses the dedicated API host; Enterprise nests the API
/// under the instance itself.
fn api_base_for(url: &Url) -> Option<Url> {
    let host = url.host_str()?;
    if host.eq_ignore_ascii_case("github.com") || host.eq_ignore_ascii_case("www.github.com") {
        return Url::parse("https://api.github.com/").ok();
    }
    let mut base = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        base.push_str(&format!(":{port}"));
    }
    base.push_str("/api/v3/");
    Url::parse(&base).ok()
}
