// Version parsing and comparison used to gate installation on minimum
// supported toolchain versions

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ToolchainError;

/// A `.`-separated tuple of non-negative integers, compared element-wise.
///
/// A shorter tuple sorts below a longer one once all shared positions are
/// equal, so `1.21 < 1.21.0 < 1.21.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DottedVersion(Vec<u64>);

impl DottedVersion {
    pub fn parse(value: &str) -> Result<Self, ToolchainError> {
        value.parse()
    }

    pub fn from_components(components: impl Into<Vec<u64>>) -> Self {
        DottedVersion(components.into())
    }

    pub fn components(&self) -> &[u64] {
        &self.0
    }
}

impl FromStr for DottedVersion {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ToolchainError::MalformedVersion {
            value: s.to_string(),
        };
        if s.is_empty() {
            return Err(malformed());
        }
        let components = s
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DottedVersion(components))
    }
}

impl fmt::Display for DottedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .0
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        f.write_str(&rendered)
    }
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        for (left, right) in self.0.iter().zip(other.0.iter()) {
            match left.cmp(right) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// `major.minor.patch[-prerelease]` with exactly three numeric components.
///
/// A release supersedes its own prereleases: an absent prerelease compares
/// greater than any present one, and two prereleases compare
/// lexicographically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
}

impl SemanticVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
        }
    }

    pub fn parse(value: &str) -> Result<Self, ToolchainError> {
        value.parse()
    }
}

impl FromStr for SemanticVersion {
    type Err = ToolchainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ToolchainError::MalformedVersion {
            value: s.to_string(),
        };

        let (numeric, prerelease) = match s.split_once('-') {
            Some((numeric, prerelease)) if !prerelease.is_empty() => {
                (numeric, Some(prerelease.to_string()))
            }
            Some(_) => return Err(malformed()),
            None => (s, None),
        };

        let components = numeric
            .split('.')
            .map(|part| part.parse::<u64>().map_err(|_| malformed()))
            .collect::<Result<Vec<_>, _>>()?;
        let &[major, minor, patch] = components.as_slice() else {
            return Err(malformed());
        };

        Ok(SemanticVersion {
            major,
            minor,
            patch,
            prerelease,
        })
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(prerelease) = &self.prerelease {
            write!(f, "-{prerelease}")?;
        }
        Ok(())
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(left), Some(right)) => left.cmp(right),
            })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dotted(value: &str) -> DottedVersion {
        DottedVersion::parse(value).unwrap()
    }

    fn semantic(value: &str) -> SemanticVersion {
        SemanticVersion::parse(value).unwrap()
    }

    #[test]
    fn test_dotted_numeric_not_lexicographic() {
        assert!(dotted("1.11") > dotted("1.9"));
        assert!(dotted("2.0") > dotted("1.99.99"));
    }

    #[test]
    fn test_dotted_shorter_tuple_is_smaller() {
        assert!(dotted("1.21") < dotted("1.21.0"));
        assert_eq!(dotted("1.21.3"), dotted("1.21.3"));
    }

    #[test]
    fn test_dotted_rejects_garbage() {
        assert!(DottedVersion::parse("").is_err());
        assert!(DottedVersion::parse("1.x").is_err());
        assert!(DottedVersion::parse("1..2").is_err());
        assert!(DottedVersion::parse("-1.2").is_err());
    }

    #[test]
    fn test_semantic_release_supersedes_prerelease() {
        assert!(semantic("1.2.3-beta") < semantic("1.2.3"));
        assert!(semantic("1.2.3-alpha") < semantic("1.2.3-beta"));
    }

    #[test]
    fn test_semantic_numeric_ordering() {
        assert!(semantic("1.10.0") > semantic("1.9.9"));
        assert!(semantic("2.0.0-alpha") > semantic("1.9.9"));
    }

    #[test]
    fn test_semantic_requires_three_components() {
        assert!(SemanticVersion::parse("1.2").is_err());
        assert!(SemanticVersion::parse("1.2.3.4").is_err());
        assert!(SemanticVersion::parse("1.2.3-").is_err());
        assert!(SemanticVersion::parse("v1.2.3").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        assert_eq!(dotted("1.21.3").to_string(), "1.21.3");
        assert_eq!(semantic("1.2.3-rc.1").to_string(), "1.2.3-rc.1");
    }
}
