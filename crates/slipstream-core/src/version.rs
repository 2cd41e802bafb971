//! Four-part package versions
//!
//! Release packages are versioned with up to four numeric components
//! (`major.minor.patch.revision`). Semver cannot represent the fourth
//! component, so versions get their own type. Display round-trips the
//! printed arity: `1.0.1` stays `1.0.1`, `1.0.1.9` stays `1.0.1.9`.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::{Error, Result};

/// A numeric version with two to four components
#[derive(Debug, Clone, Copy)]
pub struct PackageVersion {
    parts: [u64; 4],
    printed: usize,
}

impl PackageVersion {
    /// Build a version from explicit components
    pub fn new(major: u64, minor: u64, patch: u64, revision: u64) -> Self {
        Self {
            parts: [major, minor, patch, revision],
            printed: 4,
        }
    }

    /// Parse a dotted numeric version with two to four components
    pub fn parse(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split('.').collect();
        if fields.len() < 2 || fields.len() > 4 {
            return Err(Error::invalid_version(s));
        }
        let mut parts = [0u64; 4];
        for (i, field) in fields.iter().enumerate() {
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(Error::invalid_version(s));
            }
            parts[i] = field.parse().map_err(|_| Error::invalid_version(s))?;
        }
        Ok(Self {
            parts,
            printed: fields.len(),
        })
    }

    pub fn major(&self) -> u64 {
        self.parts[0]
    }

    pub fn minor(&self) -> u64 {
        self.parts[1]
    }

    pub fn patch(&self) -> u64 {
        self.parts[2]
    }

    pub fn revision(&self) -> u64 {
        self.parts[3]
    }
}

impl FromStr for PackageVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, part) in self.parts[..self.printed].iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{part}")?;
        }
        Ok(())
    }
}

// Equality and ordering ignore the printed arity: 1.2 == 1.2.0.0.
impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.parts == other.parts
    }
}

impl Eq for PackageVersion {}

impl Hash for PackageVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.parts.hash(state);
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.parts.cmp(&other.parts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_round_trips_printed_arity() {
        let three = PackageVersion::parse("1.0.1").unwrap();
        assert_eq!(three.to_string(), "1.0.1");

        let four = PackageVersion::parse("1.0.1.9").unwrap();
        assert_eq!(four.to_string(), "1.0.1.9");
        assert_eq!(four.revision(), 9);

        let two = PackageVersion::parse("2.5").unwrap();
        assert_eq!(two.to_string(), "2.5");
    }

    #[test]
    fn ordering_compares_all_four_parts() {
        let a = PackageVersion::parse("1.0.1").unwrap();
        let b = PackageVersion::parse("1.0.1.1").unwrap();
        let c = PackageVersion::parse("1.0.2").unwrap();
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a, PackageVersion::parse("1.0.1.0").unwrap());
    }

    #[test]
    fn rejects_malformed_versions() {
        for bad in ["", "1", "1.0.0.0.0", "1.a", "1..2", "v1.0", "-1.0"] {
            assert!(PackageVersion::parse(bad).is_err(), "accepted {bad:?}");
        }
    }
}
