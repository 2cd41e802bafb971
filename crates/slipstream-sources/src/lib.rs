//! # slipstream-sources
//!
//! Update-source backends for the Slipstream update engine:
//! - `UpdateSource` trait and configuration-driven backend selection
//! - Static web host, local directory, GitHub/Enterprise and Gitea backends
//! - Streaming HTTP downloader with checksum verification

pub mod dir;
pub mod downloader;
pub mod gitea;
pub mod github;
pub mod source;
pub mod web;

pub use dir::DirSource;
pub use downloader::{verify_package_checksum, HttpFileDownloader};
pub use gitea::GiteaSource;
pub use github::GithubSource;
pub use source::{source_for_config, UpdateSource};
pub use web::WebSource;
