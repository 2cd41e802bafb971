//! Release entries and the RELEASES manifest codec
//!
//! A manifest is a UTF-8 text file with one line per release:
//!
//! ```text
//! [# {pct}% ]{sha1} {filename}[?query] {filesize}
//! ```
//!
//! The optional `# {pct}% ` prefix limits staged rollout; the optional
//! query string rides on the filename column. The filename column may also
//! carry an absolute URL, in which case everything up to the last slash is
//! kept as the entry's base URL.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use sha1::{Digest, Sha1};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::version::PackageVersion;

/// File name of the release manifest inside a packages directory
pub const RELEASES_FILE_NAME: &str = "RELEASES";

/// Extension carried by package container files
pub const PACKAGE_EXTENSION: &str = "package";

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:#\s*(\d{1,3})%\s+)?([0-9a-fA-F]{40})\s+(\S+)\s+(\d+)\s*$")
        .expect("manifest line regex")
});

static FILENAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?)\.(\d+(?:\.\d+){1,3})-(full|delta)\.package$").expect("package name regex")
});

/// One release known to the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseEntry {
    pub package_id: String,
    pub version: PackageVersion,
    pub is_delta: bool,
    /// Bare package file name, `{id}.{version}-{full|delta}.package`
    pub filename: String,
    /// Lowercase 40-hex SHA-1 of the package file
    pub sha1: String,
    pub file_size: u64,
    /// Absolute URL prefix when the manifest carried a full URL
    pub base_url: Option<String>,
    /// Query string (including the leading `?`) appended on download
    pub query: Option<String>,
    /// Staged-rollout ceiling; `Some(60)` means visible to 60% of devices
    pub staging_percentage: Option<u8>,
}

impl ReleaseEntry {
    /// Parse one manifest line
    pub fn parse_line(line: &str) -> Result<Self> {
        let caps = LINE_RE
            .captures(line.trim())
            .ok_or_else(|| Error::malformed_manifest(format!("unparseable line: {line:?}")))?;

        let staging_percentage = match caps.get(1) {
            Some(pct) => {
                let pct: u8 = pct
                    .as_str()
                    .parse()
                    .map_err(|_| Error::malformed_manifest(format!("bad staging value: {line:?}")))?;
                if pct > 100 {
                    return Err(Error::malformed_manifest(format!(
                        "staging value over 100: {line:?}"
                    )));
                }
                Some(pct)
            }
            None => None,
        };

        let sha1 = caps[2].to_ascii_lowercase();
        let file_size: u64 = caps[4]
            .parse()
            .map_err(|_| Error::malformed_manifest(format!("bad file size: {line:?}")))?;

        let mut name_col = caps[3].to_string();
        let query = match name_col.find('?') {
            Some(idx) => {
                let q = name_col.split_off(idx);
                Some(q)
            }
            None => None,
        };
        let (base_url, filename) = if name_col.contains("://") {
            let slash = name_col
                .rfind('/')
                .ok_or_else(|| Error::malformed_manifest(format!("bad package URL: {line:?}")))?;
            let (base, name) = name_col.split_at(slash + 1);
            (Some(base.to_string()), name.to_string())
        } else {
            (None, name_col)
        };

        let (package_id, version, is_delta) = parse_package_filename(&filename)?;

        Ok(Self {
            package_id,
            version,
            is_delta,
            filename,
            sha1,
            file_size,
            base_url,
            query,
            staging_percentage,
        })
    }

    /// Hash a package file on disk and build its entry
    pub fn from_package_file(path: &Path) -> Result<Self> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| Error::malformed_manifest(format!("bad package path: {path:?}")))?
            .to_string();
        let (package_id, version, is_delta) = parse_package_filename(&filename)?;
        let file_size = fs::metadata(path)?.len();
        let sha1 = sha1_hex_of_file(path)?;
        Ok(Self {
            package_id,
            version,
            is_delta,
            filename,
            sha1,
            file_size,
            base_url: None,
            query: None,
            staging_percentage: None,
        })
    }

    /// Render this entry as a manifest line
    pub fn to_line(&self) -> String {
        let mut line = String::new();
        if let Some(pct) = self.staging_percentage {
            line.push_str(&format!("# {pct}% "));
        }
        line.push_str(&self.sha1);
        line.push(' ');
        if let Some(base) = &self.base_url {
            line.push_str(base);
        }
        line.push_str(&self.filename);
        if let Some(query) = &self.query {
            line.push_str(query);
        }
        line.push_str(&format!(" {}", self.file_size));
        line
    }

    /// Whether a device identified by `staging_id` sees this entry
    pub fn is_visible_to(&self, staging_id: Option<&Uuid>) -> bool {
        match self.staging_percentage {
            None => true,
            Some(pct) => match staging_id {
                None => false,
                Some(id) => staging_percentile(id, &self.package_id) < pct,
            },
        }
    }
}

/// Deterministic 0..100 percentile for a device/package pair
pub fn staging_percentile(staging_id: &Uuid, package_id: &str) -> u8 {
    let mut hasher = Sha1::new();
    hasher.update(staging_id.as_bytes());
    hasher.update(package_id.as_bytes());
    let digest = hasher.finalize();
    let word = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    (word % 100) as u8
}

fn parse_package_filename(filename: &str) -> Result<(String, PackageVersion, bool)> {
    let caps = FILENAME_RE
        .captures(filename)
        .ok_or_else(|| Error::malformed_manifest(format!("bad package file name: {filename:?}")))?;
    let version = PackageVersion::parse(&caps[2])?;
    Ok((caps[1].to_string(), version, &caps[3] == "delta"))
}

/// Compose the canonical package file name for an id/version pair
pub fn package_filename(package_id: &str, version: &PackageVersion, is_delta: bool) -> String {
    let kind = if is_delta { "delta" } else { "full" };
    format!("{package_id}.{version}-{kind}.{PACKAGE_EXTENSION}")
}

/// Lowercase 40-hex SHA-1 of a file, streamed
pub fn sha1_hex_of_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Parse a full manifest document
///
/// Rejects documents with no entries and documents that carry more than one
/// full or one delta entry for the same version.
pub fn parse_manifest(text: &str) -> Result<Vec<ReleaseEntry>> {
    let entries: Vec<ReleaseEntry> = text
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ReleaseEntry::parse_line)
        .collect::<Result<_>>()?;

    if entries.is_empty() {
        return Err(Error::EmptyFeed);
    }

    for (i, entry) in entries.iter().enumerate() {
        let dup = entries[..i]
            .iter()
            .any(|e| e.version == entry.version && e.is_delta == entry.is_delta);
        if dup {
            return Err(Error::malformed_manifest(format!(
                "duplicate entry for {}",
                entry.filename
            )));
        }
    }

    Ok(entries)
}

/// Render a manifest document
pub fn write_manifest(entries: &[ReleaseEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.to_line());
        out.push('\n');
    }
    out
}

/// Read and parse a manifest file
pub fn load_manifest_file(path: &Path) -> Result<Vec<ReleaseEntry>> {
    let text = fs::read_to_string(path)?;
    parse_manifest(&text)
}

/// Write a manifest file atomically (temp file + rename)
pub fn write_manifest_file(path: &Path, entries: &[ReleaseEntry]) -> Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, write_manifest(entries))?;
    fs::rename(&tmp, path)?;
    debug!(path = %path.display(), entries = entries.len(), "wrote release manifest");
    Ok(())
}

/// Rescan a packages directory and rewrite its manifest to match the
/// package files physically present. Returns the entries written, sorted
/// by version with full packages before deltas.
pub fn build_manifest_for_dir(dir: &Path) -> Result<Vec<ReleaseEntry>> {
    let mut entries = Vec::new();
    for dirent in fs::read_dir(dir)? {
        let path = dirent?.path();
        if !path.is_file() {
            continue;
        }
        let is_package = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| FILENAME_RE.is_match(n));
        if is_package {
            entries.push(ReleaseEntry::from_package_file(&path)?);
        }
    }
    entries.sort_by(|a, b| a.version.cmp(&b.version).then(a.is_delta.cmp(&b.is_delta)));
    write_manifest_file(&dir.join(RELEASES_FILE_NAME), &entries)?;
    Ok(entries)
}
