//! Semantic version parsing and comparison.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{UpdateError, UpdateResult};

/// A strictly parsed semantic version.
///
/// Ordering and equality follow SemVer precedence: build metadata is
/// ignored, so `1.0.0+a == 1.0.0+b`.
#[derive(Debug, Clone)]
pub struct Version(semver::Version);

impl Version {
    /// Parse a version string, accepting one optional leading `v`.
    ///
    /// Two-component versions such as `1.0` are rejected rather than padded.
    pub fn parse(raw: &str) -> UpdateResult<Self> {
        let trimmed = raw.trim();
        let clean = trimmed.strip_prefix('v').unwrap_or(trimmed);

        if clean.is_empty() {
            return Err(UpdateError::InvalidVersion {
                version: raw.to_string(),
                reason: "empty version string".to_string(),
            });
        }

        semver::Version::parse(clean)
            .map(Self)
            .map_err(|e| UpdateError::InvalidVersion {
                version: raw.to_string(),
                reason: e.to_string(),
            })
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

    /// Whether this version carries a prerelease tag (`1.0.0-beta.1`).
    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }

    /// Prerelease identifiers, empty for a release.
    pub fn prerelease(&self) -> &str {
        self.0.pre.as_str()
    }

    /// Build metadata, empty when absent.
    pub fn build(&self) -> &str {
        self.0.build.as_str()
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // semver::Prerelease already ranks the empty prerelease above any tag
        (self.0.major, self.0.minor, self.0.patch, &self.0.pre).cmp(&(
            other.0.major,
            other.0.minor,
            other.0.patch,
            &other.0.pre,
        ))
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for Version {
    type Err = UpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Compare two version strings.
///
/// `Less`, `Equal` and `Greater` stand for `a < b`, `a == b` and `a > b`.
pub fn compare_versions(a: &str, b: &str) -> UpdateResult<Ordering> {
    let a = Version::parse(a)?;
    let b = Version::parse(b)?;
    Ok(a.cmp(&b))
}

/// Check whether `latest` is strictly newer than `current`.
pub fn is_newer(current: &str, latest: &str) -> UpdateResult<bool> {
    Ok(compare_versions(latest, current)? == Ordering::Greater)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        for raw in ["1.0.0", "1.0.0-alpha.1", "1.0.0+build123", "v1.0.0", " 2.3.4 "] {
            assert!(Version::parse(raw).is_ok(), "{raw} should parse");
        }
    }

    #[test]
    fn test_parse_invalid() {
        for raw in ["", "v", "abc", "invalid", "1.0", "1", "1.0.0.0", "01.0.0", "1.x.0"] {
            let err = Version::parse(raw).unwrap_err();
            assert!(
                matches!(err, UpdateError::InvalidVersion { .. }),
                "{raw} should be InvalidVersion"
            );
        }
    }

    #[test]
    fn test_prefix_is_stripped_once() {
        assert_eq!(
            Version::parse("v1.2.3").unwrap(),
            Version::parse("1.2.3").unwrap()
        );
        assert!(Version::parse("vv1.2.3").is_err());
    }

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.0.0", "1.0.0").unwrap(), Ordering::Equal);
        assert_eq!(compare_versions("2.0.0", "1.0.0").unwrap(), Ordering::Greater);
        assert_eq!(compare_versions("0.1.0", "1.0.0").unwrap(), Ordering::Less);
        assert_eq!(compare_versions("1.0.0-beta", "1.0.0").unwrap(), Ordering::Less);
        assert_eq!(
            compare_versions("1.0.0-alpha.1", "1.0.0-alpha.2").unwrap(),
            Ordering::Less
        );
        assert_eq!(compare_versions("1.10.0", "1.9.0").unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_prerelease_precedence_chain() {
        // SemVer 2.0 section 11 example chain
        let chain = [
            "1.0.0-alpha",
            "1.0.0-alpha.1",
            "1.0.0-alpha.beta",
            "1.0.0-beta",
            "1.0.0-beta.2",
            "1.0.0-beta.11",
            "1.0.0-rc.1",
            "1.0.0",
        ];
        for pair in chain.windows(2) {
            assert_eq!(
                compare_versions(pair[0], pair[1]).unwrap(),
                Ordering::Less,
                "{} < {}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn test_compare_is_antisymmetric() {
        let samples = ["0.0.1", "1.0.0-alpha", "1.0.0-alpha.1", "1.0.0", "1.0.1", "v2.0.0"];
        for a in samples {
            assert_eq!(compare_versions(a, a).unwrap(), Ordering::Equal);
            for b in samples {
                let ab = compare_versions(a, b).unwrap();
                let ba = compare_versions(b, a).unwrap();
                assert_eq!(ab, ba.reverse(), "{a} vs {b}");
            }
        }
    }

    #[test]
    fn test_build_metadata_ignored() {
        assert_eq!(
            compare_versions("1.0.0+build.1", "1.0.0+build.2").unwrap(),
            Ordering::Equal
        );
        let v = Version::parse("1.0.0+build.7").unwrap();
        assert_eq!(v.build(), "build.7");
    }

    #[test]
    fn test_compare_invalid_fails() {
        assert!(compare_versions("invalid", "1.0.0").is_err());
        assert!(compare_versions("1.0.0", "invalid").is_err());
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("1.0.0", "1.0.1").unwrap());
        assert!(!is_newer("1.0.0", "1.0.0").unwrap());
        assert!(!is_newer("1.0.1", "1.0.0").unwrap());
        assert!(is_newer("1.0.0-rc.1", "v1.0.0").unwrap());
        assert!(is_newer("1.0", "1.0.1").is_err());
    }

    #[test]
    fn test_serde_roundtrip_as_string() {
        let v: Version = serde_json::from_str("\"v3.1.4-rc.1\"").unwrap();
        assert!(v.is_prerelease());
        assert_eq!(v.prerelease(), "rc.1");
        assert_eq!(serde_json::to_string(&v).unwrap(), "\"3.1.4-rc.1\"");
    }
}
