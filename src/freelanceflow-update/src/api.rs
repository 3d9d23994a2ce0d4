//! Release hosting API client.

use async_trait::async_trait;
use freelanceflow_common::create_client_builder;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::DEFAULT_API_BASE;
use crate::error::{UpdateError, UpdateResult};
use crate::release::{GithubRelease, ReleaseInfo, ReleaseSource, ResolvedRelease};

/// Source of release metadata for the update controller.
#[async_trait]
pub trait ReleaseResolver: Send + Sync {
    /// Resolve the latest release of `owner/repo`.
    async fn fetch_latest(&self, owner: &str, repo: &str) -> UpdateResult<ResolvedRelease>;
}

/// Client for the GitHub Releases API.
#[derive(Clone)]
pub struct ReleaseClient {
    client: Client,
    base_url: String,
}

impl ReleaseClient {
    /// Create a new client with the default API origin.
    pub fn new() -> Self {
        Self::with_url(DEFAULT_API_BASE.to_string())
    }

    /// Create a new client with a custom API origin (staging, tests).
    pub fn with_url(base_url: String) -> Self {
        let client = create_client_builder()
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the latest release envelope without resolving it.
    pub async fn get_latest_envelope(&self, owner: &str, repo: &str) -> UpdateResult<GithubRelease> {
        let url = format!("{}/repos/{}/{}/releases/latest", self.base_url, owner, repo);
        self.get_json(&url, "release envelope", "application/vnd.github+json")
            .await
    }

    /// Fetch and decode an `update.json` manifest.
    pub async fn get_manifest(&self, url: &str) -> UpdateResult<ReleaseInfo> {
        self.get_json(url, "update.json", "application/octet-stream").await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        what: &str,
        accept: &str,
    ) -> UpdateResult<T> {
        tracing::debug!(%url, "fetching {}", what);

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, accept)
            .send()
            .await
            .map_err(|e| UpdateError::network(url, e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(UpdateError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| UpdateError::network(url, e))?;

        serde_json::from_slice(&body).map_err(|e| UpdateError::decode(what, e))
    }
}

impl Default for ReleaseClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReleaseResolver for ReleaseClient {
    async fn fetch_latest(&self, owner: &str, repo: &str) -> UpdateResult<ResolvedRelease> {
        let release = self.get_latest_envelope(owner, repo).await?;

        // update.json is authoritative; once referenced there is no fallback
        if let Some(asset) = release.manifest_asset() {
            let info = self.get_manifest(&asset.browser_download_url).await?;
            tracing::debug!(version = %info.version, "resolved release from update.json");
            return Ok(ResolvedRelease {
                source: ReleaseSource::StructuredMetadata,
                info,
            });
        }

        let info = release.to_heuristic_info();
        tracing::debug!(
            version = %info.version,
            platforms = info.platforms.len(),
            "no update.json asset, resolved release from asset names"
        );
        Ok(ResolvedRelease {
            source: ReleaseSource::HeuristicAssetMatch,
            info,
        })
    }
}

/// Get the platform key for the current system, e.g. `darwin-arm64`.
pub fn platform_key() -> String {
    let os = if cfg!(target_os = "linux") {
        "linux"
    } else if cfg!(target_os = "macos") {
        "darwin"
    } else if cfg!(target_os = "windows") {
        "windows"
    } else {
        "unknown"
    };

    let arch = if cfg!(target_arch = "x86_64") {
        "amd64"
    } else if cfg!(target_arch = "aarch64") {
        "arm64"
    } else if cfg!(target_arch = "x86") {
        "386"
    } else {
        "unknown"
    };

    format!("{}-{}", os, arch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn envelope(server_uri: &str, with_manifest: bool) -> serde_json::Value {
        let mut assets = vec![serde_json::json!({
            "name": "App-1.0.1-darwin-amd64.dmg",
            "size": 1024,
            "browser_download_url": "https://download.url/dmg"
        })];
        if with_manifest {
            assets.push(serde_json::json!({
                "name": "update.json",
                "size": 512,
                "browser_download_url": format!("{server_uri}/update.json")
            }));
        }
        serde_json::json!({
            "tag_name": "v1.0.1",
            "published_at": "2024-05-01T10:00:00Z",
            "body": "ignored",
            "html_url": "https://github.com/owner/repo/releases/tag/v1.0.1",
            "assets": assets
        })
    }

    async fn mount_envelope(server: &MockServer, with_manifest: bool) {
        Mock::given(method("GET"))
            .and(path("/repos/owner/repo/releases/latest"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(envelope(&server.uri(), with_manifest)),
            )
            .mount(server)
            .await;
    }

    #[test]
    fn test_platform_key() {
        let key = platform_key();
        assert!(!key.is_empty());
        assert!(key.contains('-'));
    }

    #[tokio::test]
    async fn test_update_json_is_authoritative() {
        let server = MockServer::start().await;
        mount_envelope(&server, true).await;
        Mock::given(method("GET"))
            .and(path("/update.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "version": "1.0.1",
                "releaseNotes": "authoritative",
                "mandatory": true,
                "platforms": {
                    "darwin-amd64": {"url": "https://dl/dmg", "signature": "sha256:abc", "size": 2048}
                }
            })))
            .mount(&server)
            .await;

        let client = ReleaseClient::with_url(server.uri());
        let resolved = client.fetch_latest("owner", "repo").await.unwrap();

        assert_eq!(resolved.source, ReleaseSource::StructuredMetadata);
        assert!(resolved.is_trusted());
        assert_eq!(resolved.info.release_notes, "authoritative");
        assert!(resolved.info.mandatory);
        assert_eq!(resolved.info.platforms["darwin-amd64"].size, 2048);
    }

    #[tokio::test]
    async fn test_heuristic_fallback() {
        let server = MockServer::start().await;
        mount_envelope(&server, false).await;

        let client = ReleaseClient::with_url(format!("{}/", server.uri()));
        let resolved = client.fetch_latest("owner", "repo").await.unwrap();

        assert_eq!(resolved.source, ReleaseSource::HeuristicAssetMatch);
        assert!(!resolved.is_trusted());
        assert_eq!(resolved.info.version, "1.0.1");
        assert_eq!(resolved.info.release_notes, "ignored");
        let artifact = &resolved.info.platforms["darwin-amd64"];
        assert_eq!(artifact.url, "https://download.url/dmg");
        assert_eq!(artifact.size, 1024);
        assert!(artifact.signature.is_none());
    }

    #[tokio::test]
    async fn test_non_200_is_http_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/repo/releases/latest"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = ReleaseClient::with_url(server.uri());
        let err = client.fetch_latest("owner", "repo").await.unwrap_err();
        assert!(matches!(err, UpdateError::HttpStatus { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_malformed_body_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/owner/repo/releases/latest"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let client = ReleaseClient::with_url(server.uri());
        let err = client.fetch_latest("owner", "repo").await.unwrap_err();
        assert!(matches!(err, UpdateError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_broken_update_json_does_not_fall_back() {
        let server = MockServer::start().await;
        mount_envelope(&server, true).await;
        Mock::given(method("GET"))
            .and(path("/update.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("garbage"))
            .mount(&server)
            .await;

        let client = ReleaseClient::with_url(server.uri());
        let err = client.fetch_latest("owner", "repo").await.unwrap_err();
        assert!(matches!(err, UpdateError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        // Port 9 (discard) on localhost is expected to refuse connections
        let client = ReleaseClient::with_url("http://127.0.0.1:9".to_string());
        let err = client.fetch_latest("owner", "repo").await.unwrap_err();
        assert!(matches!(err, UpdateError::Network { .. }));
    }
}
