//! Release index client
//!
//! Queries the php.net release index once per supported line, caches the
//! result for a validity window, and builds source tarball URLs from a
//! fixed distribution host.

use crate::config::schema::RegistryConfig;
use crate::error::{PhpsmithError, PhpsmithResult};
use crate::http::HttpTransport;
use crate::registry::cache::{CacheFile, VersionCache};
use crate::registry::version::line_of;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// One line's latest release as reported by the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: String,
    pub filename: String,
    pub sha256: Option<String>,
}

/// A release resolved for building
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelease {
    pub line: String,
    pub version: String,
    pub url: String,
    pub sha256: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IndexResponse {
    version: Option<String>,
    #[serde(default)]
    source: Vec<SourceArtifact>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceArtifact {
    filename: String,
    sha256: Option<String>,
}

/// Extract the exact version and `.tar.gz` artifact from an index response
pub fn parse_release(line: &str, body: &str) -> PhpsmithResult<ReleaseInfo> {
    let parse_err = |reason: String| PhpsmithError::RegistryParse {
        line: line.to_string(),
        reason,
    };

    let response: IndexResponse =
        serde_json::from_str(body).map_err(|e| parse_err(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(parse_err(error));
    }

    let version = response
        .version
        .filter(|v| !v.is_empty())
        .ok_or_else(|| parse_err("missing version".to_string()))?;

    if line_of(&version).as_deref() != Some(line) {
        return Err(parse_err(format!("version {} is not on this line", version)));
    }

    let artifact = response
        .source
        .into_iter()
        .find(|a| a.filename.ends_with(".tar.gz"))
        .ok_or_else(|| parse_err("no .tar.gz source artifact".to_string()))?;

    Ok(ReleaseInfo {
        version,
        filename: artifact.filename,
        sha256: artifact.sha256.filter(|s| !s.is_empty()),
    })
}

/// Client for the upstream release index
pub struct VersionRegistry {
    transport: Arc<dyn HttpTransport>,
    cache: CacheFile,
    index_url: String,
    distribution_url: String,
    lines: Vec<String>,
    ttl: Duration,
}

impl VersionRegistry {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        config: &RegistryConfig,
        cache_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            transport,
            cache: CacheFile::new(cache_path),
            index_url: config.index_url.clone(),
            distribution_url: config.distribution_url.trim_end_matches('/').to_string(),
            lines: config.lines.clone(),
            ttl: Duration::seconds(config.cache_ttl_secs as i64),
        }
    }

    /// Supported major.minor lines
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn supports(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l == line)
    }

    /// Deterministic source URL for an exact version
    pub fn download_url_for(&self, version: &str) -> String {
        self.tarball_url(&format!("php-{}.tar.gz", version))
    }

    fn tarball_url(&self, filename: &str) -> String {
        format!("{}/{}", self.distribution_url, filename)
    }

    /// Latest versions of every supported line.
    ///
    /// A fresh cache is returned without network access unless
    /// `force_refresh` is set.
    pub async fn get_latest_versions(&self, force_refresh: bool) -> PhpsmithResult<VersionCache> {
        self.get_latest_versions_at(force_refresh, Utc::now()).await
    }

    /// `get_latest_versions` evaluated at a given instant
    pub async fn get_latest_versions_at(
        &self,
        force_refresh: bool,
        now: DateTime<Utc>,
    ) -> PhpsmithResult<VersionCache> {
        if !force_refresh {
            if let Some(cached) = self.cache.read().await {
                if cached.is_fresh(now, self.ttl) && cached.covers(&self.lines) {
                    debug!("Using cached release index from {}", cached.last_updated);
                    return Ok(cached);
                }
                debug!("Release index cache is stale");
            }
        }

        // Every line must succeed before anything is written
        let mut fresh = VersionCache::new(now);
        for line in &self.lines {
            let release = self.fetch_line(line).await?;
            let url = self.tarball_url(&release.filename);
            if let Some(sha) = release.sha256 {
                fresh.checksum_by_version.insert(release.version.clone(), sha);
            }
            fresh
                .download_url_by_version
                .insert(release.version.clone(), url);
            fresh.latest_by_line.insert(line.clone(), release.version);
        }

        self.cache.write(&fresh).await?;
        info!("Release index refreshed for {} lines", self.lines.len());
        Ok(fresh)
    }

    async fn fetch_line(&self, line: &str) -> PhpsmithResult<ReleaseInfo> {
        let url = format!("{}?json&version={}", self.index_url, line);
        let body = self
            .transport
            .get_text(&url)
            .await
            .map_err(|e| PhpsmithError::RegistryFetch {
                line: line.to_string(),
                reason: e.to_string(),
            })?;
        parse_release(line, &body)
    }

    /// Resolve the latest release of one line
    pub async fn resolve(&self, line: &str, force_refresh: bool) -> PhpsmithResult<ResolvedRelease> {
        if !self.supports(line) {
            return Err(PhpsmithError::UnsupportedLine(line.to_string()));
        }

        let cache = self.get_latest_versions(force_refresh).await?;
        let version = cache
            .latest(line)
            .ok_or_else(|| PhpsmithError::UnsupportedLine(line.to_string()))?
            .to_string();
        let url = cache
            .download_url(&version)
            .map(str::to_string)
            .unwrap_or_else(|| self.download_url_for(&version));

        Ok(ResolvedRelease {
            line: line.to_string(),
            sha256: cache.checksum(&version).map(str::to_string),
            version,
            url,
        })
    }

    /// Release for a specific exact version, e.g. to rebuild what is installed.
    ///
    /// The checksum is only known when the version is the cached latest.
    /// Freshness is not checked: URL and checksum are keyed by exact
    /// version and do not change once published.
    pub async fn release_for(&self, version: &str) -> ResolvedRelease {
        let cached = self.cache.read().await;
        let url = cached
            .as_ref()
            .and_then(|c| c.download_url(version))
            .map(str::to_string)
            .unwrap_or_else(|| self.download_url_for(version));
        let sha256 = cached
            .as_ref()
            .and_then(|c| c.checksum(version))
            .map(str::to_string);

        ResolvedRelease {
            line: line_of(version).unwrap_or_default(),
            version: version.to_string(),
            url,
            sha256,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeTransport;
    use tempfile::TempDir;

    const INDEX: &str = "https://www.php.net/releases/index.php";

    fn release_json(version: &str) -> String {
        format!(
            r#"{{
                "announcement": true,
                "date": "26 Sep 2024",
                "source": [
                    {{"filename": "php-{v}.tar.bz2", "name": "PHP {v} (tar.bz2)", "sha256": "aaa"}},
                    {{"filename": "php-{v}.tar.gz", "name": "PHP {v} (tar.gz)", "sha256": "bbb"}},
                    {{"filename": "php-{v}.tar.xz", "name": "PHP {v} (tar.xz)", "sha256": "ccc"}}
                ],
                "version": "{v}"
            }}"#,
            v = version
        )
    }

    fn config(lines: &[&str]) -> RegistryConfig {
        RegistryConfig {
            lines: lines.iter().map(|s| s.to_string()).collect(),
            ..RegistryConfig::default()
        }
    }

    fn registry(transport: Arc<FakeTransport>, lines: &[&str], dir: &TempDir) -> VersionRegistry {
        VersionRegistry::new(transport, &config(lines), dir.path().join("versions.json"))
    }

    #[test]
    fn parses_tar_gz_artifact() {
        let info = parse_release("8.3", &release_json("8.3.12")).unwrap();
        assert_eq!(info.version, "8.3.12");
        assert_eq!(info.filename, "php-8.3.12.tar.gz");
        assert_eq!(info.sha256.as_deref(), Some("bbb"));
    }

    #[test]
    fn rejects_error_response() {
        let err = parse_release("5.1", r#"{"error":"Unknown version"}"#).unwrap_err();
        assert!(err.to_string().contains("Unknown version"));
    }

    #[test]
    fn rejects_version_from_other_line() {
        assert!(parse_release("8.2", &release_json("8.3.12")).is_err());
    }

    #[tokio::test]
    async fn fetches_and_caches_every_line() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(
            FakeTransport::default()
                .with_text(&format!("{INDEX}?json&version=8.3"), &release_json("8.3.12"))
                .with_text(&format!("{INDEX}?json&version=8.2"), &release_json("8.2.24")),
        );
        let registry = registry(Arc::clone(&transport), &["8.2", "8.3"], &dir);

        let cache = registry.get_latest_versions(false).await.unwrap();

        assert_eq!(cache.latest("8.3"), Some("8.3.12"));
        assert_eq!(
            cache.download_url("8.3.12"),
            Some("https://www.php.net/distributions/php-8.3.12.tar.gz")
        );
        assert_eq!(cache.checksum("8.2.24"), Some("bbb"));
        assert!(dir.path().join("versions.json").exists());
    }

    #[tokio::test]
    async fn fresh_cache_skips_network() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(
            FakeTransport::default()
                .with_text(&format!("{INDEX}?json&version=8.3"), &release_json("8.3.12")),
        );
        let registry = registry(Arc::clone(&transport), &["8.3"], &dir);
        let written = Utc::now();
        let ttl = Duration::hours(1);
        let epsilon = Duration::seconds(5);

        registry.get_latest_versions_at(false, written).await.unwrap();
        assert_eq!(transport.request_count(), 1);

        registry
            .get_latest_versions_at(false, written + ttl - epsilon)
            .await
            .unwrap();
        assert_eq!(transport.request_count(), 1);

        registry
            .get_latest_versions_at(false, written + ttl + epsilon)
            .await
            .unwrap();
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn force_refresh_bypasses_cache() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(
            FakeTransport::default()
                .with_text(&format!("{INDEX}?json&version=8.3"), &release_json("8.3.12")),
        );
        let registry = registry(Arc::clone(&transport), &["8.3"], &dir);

        registry.get_latest_versions(false).await.unwrap();
        registry.get_latest_versions(true).await.unwrap();
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn partial_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let transport = Arc::new(
            FakeTransport::default()
                .with_text(&format!("{INDEX}?json&version=8.3"), &release_json("8.3.12")),
        );
        let registry = registry(Arc::clone(&transport), &["8.3", "8.4"], &dir);

        let err = registry.get_latest_versions(false).await.unwrap_err();

        assert!(matches!(err, PhpsmithError::RegistryFetch { ref line, .. } if line == "8.4"));
        assert!(!dir.path().join("versions.json").exists());
    }

    #[tokio::test]
    async fn resolve_rejects_unsupported_line() {
        let dir = TempDir::new().unwrap();
        let registry = registry(Arc::new(FakeTransport::default()), &["8.3"], &dir);
        let err = registry.resolve("7.4", false).await.unwrap_err();
        assert!(matches!(err, PhpsmithError::UnsupportedLine(_)));
    }

    #[tokio::test]
    async fn release_for_uses_template_when_uncached() {
        let dir = TempDir::new().unwrap();
        let registry = registry(Arc::new(FakeTransport::default()), &["8.3"], &dir);
        let release = registry.release_for("8.3.9").await;
        assert_eq!(release.line, "8.3");
        assert_eq!(
            release.url,
            "https://www.php.net/distributions/php-8.3.9.tar.gz"
        );
        assert!(release.sha256.is_none());
    }
}
