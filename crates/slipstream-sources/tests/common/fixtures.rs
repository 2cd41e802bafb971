//! Fixture data for source tests

use sha1::{Digest, Sha1};

/// Standard test package id
pub const APP_ID: &str = "MyApp";

/// Payload bytes standing in for a full package
pub const FULL_PACKAGE_BYTES: &[u8] = b"full package payload";

/// Payload bytes standing in for a delta package
pub const DELTA_PACKAGE_BYTES: &[u8] = b"delta package payload";

/// Lowercase 40-hex SHA-1 of a byte slice
pub fn sha1_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// One well-formed manifest line for a payload
pub fn manifest_line(filename: &str, payload: &[u8]) -> String {
    format!("{} {} {}", sha1_hex(payload), filename, payload.len())
}

/// A single-entry manifest for the standard full package
pub fn single_full_manifest(version: &str) -> String {
    let mut line = manifest_line(
        &format!("{APP_ID}.{version}-full.package"),
        FULL_PACKAGE_BYTES,
    );
    line.push('\n');
    line
}
