//! # slipstream-core
//!
//! Core library for the Slipstream update engine providing:
//! - The RELEASES manifest codec and `ReleaseEntry` model
//! - Four-part package versions
//! - Progress mapping and weighted progress combination
//! - The shared error taxonomy and update configuration

pub mod config;
pub mod error;
pub mod manifest;
pub mod progress;
pub mod version;

pub use config::{SourceBackend, UpdateConfig};
pub use error::{Error, Result};
pub use manifest::{ReleaseEntry, RELEASES_FILE_NAME};
pub use progress::{map_progress, noop_progress, progress_fn, ProgressCallback, ProgressContext};
pub use version::PackageVersion;
