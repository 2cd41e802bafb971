//! Error types for slipstream-core

use thiserror::Error;

/// Result type alias using slipstream-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for Slipstream
#[derive(Error, Debug)]
pub enum Error {
    /// The release feed contained no entries
    #[error("No releases found in the update feed")]
    EmptyFeed,

    /// A manifest line could not be parsed
    #[error("Malformed release manifest: {message}")]
    MalformedManifest { message: String },

    /// A named release asset does not exist on the remote release
    #[error("Release asset not found: {name}")]
    AssetNotFound { name: String },

    /// The remote served an asset with a content type outside the allow-list
    #[error("Refusing to download asset '{asset}' with untrusted content type '{content_type}'")]
    UntrustedContentType { content_type: String, asset: String },

    /// A downloaded file failed size or SHA-1 verification
    #[error("Checksum verification failed for {file}")]
    ChecksumMismatch { file: String },

    /// A release batch mixed delta and full packages
    #[error("Cannot apply a release batch that mixes delta and full packages")]
    IncompatibleChain,

    /// A binary patch could not be applied
    #[error("Failed to apply binary patch for {path}")]
    PatchApplication { path: String },

    /// Another apply-flow already holds the update lock
    #[error("Another update operation is in progress")]
    LockTimeout,

    /// A backend requires credentials that were not provided
    #[error("The {backend} source requires an access token for downloads")]
    MissingCredentials { backend: String },

    /// A version string could not be parsed
    #[error("Invalid version format: {version}")]
    InvalidVersion { version: String },

    /// An update URL does not identify a repository
    #[error("Invalid repository URL: {url}")]
    InvalidRepoUrl { url: String },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a malformed manifest error
    pub fn malformed_manifest(message: impl Into<String>) -> Self {
        Self::MalformedManifest {
            message: message.into(),
        }
    }

    /// Create an asset not found error
    pub fn asset_not_found(name: impl Into<String>) -> Self {
        Self::AssetNotFound { name: name.into() }
    }

    /// Create an untrusted content type error
    pub fn untrusted_content_type(content_type: impl Into<String>, asset: impl Into<String>) -> Self {
        Self::UntrustedContentType {
            content_type: content_type.into(),
            asset: asset.into(),
        }
    }

    /// Create a checksum mismatch error
    pub fn checksum_mismatch(file: impl Into<String>) -> Self {
        Self::ChecksumMismatch { file: file.into() }
    }

    /// Create a patch application error
    pub fn patch_application(path: impl Into<String>) -> Self {
        Self::PatchApplication { path: path.into() }
    }

    /// Create a missing credentials error
    pub fn missing_credentials(backend: impl Into<String>) -> Self {
        Self::MissingCredentials {
            backend: backend.into(),
        }
    }

    /// Create an invalid version error
    pub fn invalid_version(version: impl Into<String>) -> Self {
        Self::InvalidVersion {
            version: version.into(),
        }
    }

    /// Create an invalid repository URL error
    pub fn invalid_repo_url(url: impl Into<String>) -> Self {
        Self::InvalidRepoUrl { url: url.into() }
    }
}
