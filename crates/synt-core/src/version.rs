//! Schema versions declared by parsed result files.
//!
//! Versions arrive as loose strings ("31.0.2", "31.1", "v32"). They are
//! normalized to `major.minor.patch` and compared numerically; comparing the
//! raw strings would put "31.10" before "31.9".

use semver::Version;
use std::fmt;
use std::str::FromStr;

use crate::error::SyntError;

/// Last schema version that numbers scenarios as tree nodes.
pub const LEGACY_NODE_NUMBERING: SchemaVersion = SchemaVersion::new(31, 0, 2);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion(Version);

impl SchemaVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        SchemaVersion(Version::new(major, minor, patch))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    /// Whether files of this version number scenarios as tree nodes.
    pub fn uses_legacy_node_numbering(&self) -> bool {
        *self <= LEGACY_NODE_NUMBERING
    }
}

impl FromStr for SchemaVersion {
    type Err = SyntError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim().trim_start_matches(['v', 'V']);
        let mut parts = [0u64; 3];
        let mut count = 0;
        for piece in trimmed.split('.') {
            if count == parts.len() {
                return Err(SyntError::Version(input.to_string()));
            }
            parts[count] = piece
                .trim()
                .parse()
                .map_err(|_| SyntError::Version(input.to_string()))?;
            count += 1;
        }
        Ok(SchemaVersion::new(parts[0], parts[1], parts[2]))
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_versions_are_padded() {
        let version: SchemaVersion = "31.1".parse().unwrap();
        assert_eq!(version, SchemaVersion::new(31, 1, 0));
        let version: SchemaVersion = "v32".parse().unwrap();
        assert_eq!(version.major(), 32);
        assert_eq!(version.to_string(), "32.0.0");
    }

    #[test]
    fn comparison_is_numeric() {
        let nine: SchemaVersion = "31.9".parse().unwrap();
        let ten: SchemaVersion = "31.10".parse().unwrap();
        assert!(nine < ten);
    }

    #[test]
    fn legacy_threshold_is_inclusive() {
        assert!("31.0.2"
            .parse::<SchemaVersion>()
            .unwrap()
            .uses_legacy_node_numbering());
        assert!("30".parse::<SchemaVersion>().unwrap().uses_legacy_node_numbering());
        assert!(!"31.0.3"
            .parse::<SchemaVersion>()
            .unwrap()
            .uses_legacy_node_numbering());
        assert!(!"31.1".parse::<SchemaVersion>().unwrap().uses_legacy_node_numbering());
    }

    #[test]
    fn malformed_versions_are_rejected() {
        assert!("abc".parse::<SchemaVersion>().is_err());
        assert!("1.2.3.4".parse::<SchemaVersion>().is_err());
        assert!("".parse::<SchemaVersion>().is_err());
    }
}
