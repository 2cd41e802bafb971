//! Streaming HTTP downloads with progress and checksum verification

use std::fs;
use std::io::Write;
use std::path::Path;

use futures_util::StreamExt;
use reqwest::RequestBuilder;
use slipstream_core::manifest::sha1_hex_of_file;
use slipstream_core::{Error, ProgressCallback, ReleaseEntry, Result};
use tracing::{debug, warn};

/// Content types a hosted backend will accept for package assets
///
/// Anything else (an HTML error page, a redirect splash) must not end up on
/// disk pretending to be a package.
pub const TRUSTED_CONTENT_TYPES: [&str; 2] = ["application/octet-stream", "application/json"];

/// Fail unless `content_type` (parameters stripped) is on the allow-list
pub fn ensure_trusted_content_type(content_type: &str, asset: &str) -> Result<()> {
    let bare = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    if TRUSTED_CONTENT_TYPES.contains(&bare.as_str()) {
        return Ok(());
    }
    Err(Error::untrusted_content_type(content_type, asset))
}

/// HTTP downloader shared by the web-facing backends
pub struct HttpFileDownloader {
    client: reqwest::Client,
}

impl HttpFileDownloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("slipstream/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// The underlying client, for backends that add their own headers
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Fetch a small text resource (a manifest, an API response)
    pub async fn download_string(&self, request: RequestBuilder) -> Result<String> {
        let response = request.send().await?.error_for_status()?;
        Ok(response.text().await?)
    }

    /// Stream a download to `dest` with byte-level progress
    ///
    /// Writes to a sibling `.partial` file and renames on completion, so a
    /// torn download never masquerades as a finished package.
    pub async fn download_file(
        &self,
        request: RequestBuilder,
        dest: &Path,
        expected_size: Option<u64>,
        on_progress: ProgressCallback,
    ) -> Result<()> {
        let response = request.send().await?.error_for_status()?;
        let total = response.content_length().or(expected_size);

        let partial = partial_path(dest);
        let mut file = fs::File::create(&partial)?;
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        let streamed: Result<()> = async {
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                file.write_all(&chunk)?;
                downloaded += chunk.len() as u64;
                if let Some(total) = total {
                    if total > 0 {
                        let pct = (downloaded.min(total) * 100 / total) as u32;
                        on_progress(pct);
                    }
                }
            }
            file.flush()?;
            Ok(())
        }
        .await;
        drop(file);

        if let Err(e) = streamed {
            // A torn stream must not leave its partial file behind.
            let _ = fs::remove_file(&partial);
            return Err(e);
        }
        fs::rename(&partial, dest)?;
        on_progress(100);
        debug!(dest = %dest.display(), bytes = downloaded, "download complete");
        Ok(())
    }
}

fn partial_path(dest: &Path) -> std::path::PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".partial");
    dest.with_file_name(name)
}

/// Verify a downloaded package against its manifest entry
///
/// Checks the byte length first, then the SHA-1. A failing file is deleted
/// before the error is raised so a corrupt package can never be applied or
/// resumed.
pub fn verify_package_checksum(entry: &ReleaseEntry, path: &Path) -> Result<()> {
    let actual_size = fs::metadata(path)?.len();
    let ok = if actual_size != entry.file_size {
        warn!(
            file = %entry.filename,
            expected = entry.file_size,
            actual = actual_size,
            "package size mismatch"
        );
        false
    } else {
        let actual_sha = sha1_hex_of_file(path)?;
        if !actual_sha.eq_ignore_ascii_case(&entry.sha1) {
            warn!(file = %entry.filename, expected = %entry.sha1, actual = %actual_sha, "package hash mismatch");
            false
        } else {
            true
        }
    };

    if !ok {
        fs::remove_file(path)?;
        return Err(Error::checksum_mismatch(&entry.filename));
    }
    Ok(())
}
