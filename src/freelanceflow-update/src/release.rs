//! Release metadata types and resolution strategies.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{UpdateError, UpdateResult};

/// Name of the structured metadata asset attached to a release.
pub const UPDATE_MANIFEST_NAME: &str = "update.json";

/// Download information for one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformArtifact {
    /// Download URL for this artifact
    pub url: String,
    /// Expected digest, formatted as `algorithm:hex` (e.g. `sha256:ab12...`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// File size in bytes
    #[serde(default)]
    pub size: u64,
}

impl PlatformArtifact {
    /// Parse the expected digest, `None` when the artifact is unverified.
    pub fn digest(&self) -> UpdateResult<Option<Digest>> {
        match self.signature.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Digest::parse(raw).map(Some),
        }
    }

    /// File name taken from the last URL path segment.
    pub fn file_name(&self) -> Option<&str> {
        self.url
            .split(['?', '#'])
            .next()
            .and_then(|u| u.rsplit('/').next())
            .filter(|s| !s.is_empty())
    }
}

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
}

/// Expected digest of an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub algorithm: DigestAlgorithm,
    /// Lowercase hex encoding
    pub hex: String,
}

impl Digest {
    /// Parse `sha256:<hex>`. A bare 64-character hex string is taken as SHA-256.
    pub fn parse(raw: &str) -> UpdateResult<Self> {
        let (algorithm, hex) = match raw.split_once(':') {
            Some((algo, hex)) => (algo.trim().to_ascii_lowercase(), hex.trim()),
            None => ("sha256".to_string(), raw.trim()),
        };

        if algorithm != "sha256" {
            return Err(UpdateError::UnsupportedDigest { algorithm });
        }

        if hex.len() != 64 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(UpdateError::decode(
                "artifact signature",
                format!("expected 64 hex characters, got {hex:?}"),
            ));
        }

        Ok(Self {
            algorithm: DigestAlgorithm::Sha256,
            hex: hex.to_ascii_lowercase(),
        })
    }
}

/// One upstream release, as consumed by the update controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    /// Version string (semver, no leading `v`)
    pub version: String,
    /// Release timestamp
    #[serde(default)]
    pub release_date: Option<DateTime<Utc>>,
    /// Human-readable release notes
    #[serde(default)]
    pub release_notes: String,
    /// URL of the full release notes page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_notes_url: Option<String>,
    /// Whether the update must be installed
    #[serde(default)]
    pub mandatory: bool,
    /// Artifacts by platform key (e.g. "darwin-arm64", "windows-amd64")
    #[serde(default)]
    pub platforms: HashMap<String, PlatformArtifact>,
}

impl ReleaseInfo {
    /// Get the artifact for a platform key.
    pub fn artifact_for(&self, platform: &str) -> Option<&PlatformArtifact> {
        self.platforms.get(platform)
    }
}

/// How a [`ReleaseInfo`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReleaseSource {
    /// Decoded from the release's `update.json` asset
    StructuredMetadata,
    /// Guessed from asset file names; carries no digests
    HeuristicAssetMatch,
}

/// Release metadata tagged with the strategy that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRelease {
    pub source: ReleaseSource,
    pub info: ReleaseInfo,
}

impl ResolvedRelease {
    /// Only structured metadata can carry digests worth trusting.
    pub fn is_trusted(&self) -> bool {
        self.source == ReleaseSource::StructuredMetadata
    }
}

/// GitHub release envelope (`/repos/{owner}/{repo}/releases/latest`).
#[derive(Debug, Clone, Deserialize)]
pub struct GithubRelease {
    pub tag_name: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub assets: Vec<GithubAsset>,
}

/// One asset attached to a GitHub release.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubAsset {
    pub name: String,
    #[serde(default)]
    pub size: u64,
    pub browser_download_url: String,
}

impl GithubRelease {
    /// The `update.json` asset, if the release carries one.
    pub fn manifest_asset(&self) -> Option<&GithubAsset> {
        self.assets.iter().find(|a| a.name == UPDATE_MANIFEST_NAME)
    }

    /// Build release info from asset names alone.
    pub fn to_heuristic_info(&self) -> ReleaseInfo {
        let version = self
            .tag_name
            .strip_prefix('v')
            .unwrap_or(&self.tag_name)
            .to_string();

        ReleaseInfo {
            version,
            release_date: self.published_at,
            release_notes: self.body.clone().unwrap_or_default(),
            release_notes_url: self.html_url.clone(),
            mandatory: false,
            platforms: match_platform_assets(&self.assets),
        }
    }
}

/// Name substrings that identify a platform, checked in order.
const PLATFORM_PATTERNS: &[(&str, &str, &str)] = &[
    ("darwin-amd64", "darwin", "amd64"),
    ("darwin-arm64", "darwin", "arm64"),
    ("windows-amd64", "windows", "amd64"),
];

/// Map assets to platform keys by case-insensitive name matching.
///
/// Each asset claims the first pattern it matches; a key already claimed by
/// an earlier asset is never overwritten.
pub fn match_platform_assets(assets: &[GithubAsset]) -> HashMap<String, PlatformArtifact> {
    let mut platforms = HashMap::new();

    for asset in assets {
        let name = asset.name.to_lowercase();
        let Some((key, _, _)) = PLATFORM_PATTERNS
            .iter()
            .find(|(_, os, arch)| name.contains(os) && name.contains(arch))
        else {
            continue;
        };

        if platforms.contains_key(*key) {
            tracing::debug!(asset = %asset.name, platform = key, "platform already matched, ignoring asset");
            continue;
        }

        platforms.insert(
            key.to_string(),
            PlatformArtifact {
                url: asset.browser_download_url.clone(),
                signature: None,
                size: asset.size,
            },
        );
    }

    platforms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str, url: &str, size: u64) -> GithubAsset {
        GithubAsset {
            name: name.to_string(),
            size,
            browser_download_url: url.to_string(),
        }
    }

    #[test]
    fn test_digest_parse() {
        let hex = "B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9";
        let digest = Digest::parse(&format!("sha256:{hex}")).unwrap();
        assert_eq!(digest.algorithm, DigestAlgorithm::Sha256);
        assert_eq!(digest.hex, hex.to_lowercase());

        let bare = Digest::parse(&hex.to_lowercase()).unwrap();
        assert_eq!(bare, digest);
    }

    #[test]
    fn test_digest_parse_rejects() {
        assert!(matches!(
            Digest::parse("md5:d41d8cd98f00b204e9800998ecf8427e"),
            Err(UpdateError::UnsupportedDigest { .. })
        ));
        assert!(matches!(
            Digest::parse("sha256:xyz"),
            Err(UpdateError::Decode { .. })
        ));
    }

    #[test]
    fn test_missing_signature_is_unverified() {
        let mut artifact = PlatformArtifact {
            url: "https://dl.example/app.dmg?x=1".into(),
            signature: None,
            size: 1,
        };
        assert_eq!(artifact.digest().unwrap(), None);
        artifact.signature = Some("  ".into());
        assert_eq!(artifact.digest().unwrap(), None);
        assert_eq!(artifact.file_name(), Some("app.dmg"));
    }

    #[test]
    fn test_heuristic_darwin_amd64() {
        let release = GithubRelease {
            tag_name: "v1.0.1".into(),
            published_at: None,
            body: Some("notes".into()),
            html_url: Some("https://github.com/o/r/releases/tag/v1.0.1".into()),
            assets: vec![asset("App-1.0.1-darwin-amd64.dmg", "https://dl/dmg", 1024)],
        };
        let info = release.to_heuristic_info();
        assert_eq!(info.version, "1.0.1");
        assert_eq!(info.release_notes, "notes");
        let artifact = info.artifact_for("darwin-amd64").unwrap();
        assert_eq!(artifact.url, "https://dl/dmg");
        assert_eq!(artifact.size, 1024);
        assert_eq!(artifact.signature, None);
        assert_eq!(info.platforms.len(), 1);
    }

    #[test]
    fn test_heuristic_first_match_wins() {
        let assets = vec![
            asset("App-WINDOWS-AMD64.msi", "https://dl/first", 1),
            asset("App-windows-amd64-debug.msi", "https://dl/second", 2),
            asset("App-darwin-arm64.dmg", "https://dl/arm", 3),
            asset("checksums.txt", "https://dl/sums", 4),
        ];
        let platforms = match_platform_assets(&assets);
        assert_eq!(platforms["windows-amd64"].url, "https://dl/first");
        assert_eq!(platforms["darwin-arm64"].url, "https://dl/arm");
        assert!(!platforms.contains_key("darwin-amd64"));
        assert_eq!(platforms.len(), 2);
    }

    #[test]
    fn test_heuristic_ambiguous_name_claims_first_pattern() {
        // Matches both darwin+amd64 and darwin+arm64; amd64 is checked first
        let assets = vec![
            asset("App-darwin-amd64-arm64-universal.dmg", "https://dl/universal", 9),
            asset("App-darwin-arm64.dmg", "https://dl/arm", 3),
        ];
        let platforms = match_platform_assets(&assets);
        assert_eq!(platforms["darwin-amd64"].url, "https://dl/universal");
        assert_eq!(platforms["darwin-arm64"].url, "https://dl/arm");
    }

    #[test]
    fn test_tag_strips_single_v() {
        let release = GithubRelease {
            tag_name: "vv2.0.0".into(),
            published_at: None,
            body: None,
            html_url: None,
            assets: vec![],
        };
        let info = release.to_heuristic_info();
        assert_eq!(info.version, "v2.0.0");
        assert!(info.platforms.is_empty());
    }

    #[test]
    fn test_update_manifest_decodes() {
        let json = r#"{
            "version": "1.0.1",
            "releaseDate": "2024-05-01T10:00:00Z",
            "releaseNotes": "authoritative",
            "mandatory": true,
            "platforms": {
                "darwin-arm64": {"url": "https://dl/arm", "signature": "sha256:00", "size": 10}
            }
        }"#;
        let info: ReleaseInfo = serde_json::from_str(json).unwrap();
        assert!(info.mandatory);
        assert_eq!(info.release_notes, "authoritative");
        assert_eq!(info.release_notes_url, None);
        assert_eq!(info.platforms["darwin-arm64"].size, 10);
        assert!(info.release_date.is_some());
    }
}
