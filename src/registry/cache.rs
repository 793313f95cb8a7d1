//! Release index cache with a validity window

use crate::error::PhpsmithResult;
use crate::fsutil::write_json_atomic;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Latest release per line, as last fetched from the release index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCache {
    pub last_updated: DateTime<Utc>,

    /// major.minor -> exact version
    pub latest_by_line: BTreeMap<String, String>,

    /// exact version -> source tarball URL
    #[serde(rename = "downloadURLByVersion")]
    pub download_url_by_version: BTreeMap<String, String>,

    /// exact version -> sha256 of the tarball
    #[serde(default)]
    pub checksum_by_version: BTreeMap<String, String>,
}

impl VersionCache {
    pub fn new(last_updated: DateTime<Utc>) -> Self {
        Self {
            last_updated,
            latest_by_line: BTreeMap::new(),
            download_url_by_version: BTreeMap::new(),
            checksum_by_version: BTreeMap::new(),
        }
    }

    /// Whether the cache is still inside its validity window at `now`.
    ///
    /// A timestamp in the future (clock change, copied file) counts as stale.
    pub fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now >= self.last_updated && now < self.last_updated + ttl
    }

    /// Latest exact version for a line
    pub fn latest(&self, line: &str) -> Option<&str> {
        self.latest_by_line.get(line).map(String::as_str)
    }

    pub fn download_url(&self, version: &str) -> Option<&str> {
        self.download_url_by_version.get(version).map(String::as_str)
    }

    pub fn checksum(&self, version: &str) -> Option<&str> {
        self.checksum_by_version.get(version).map(String::as_str)
    }

    /// Whether every line in `lines` has an entry
    pub fn covers(&self, lines: &[String]) -> bool {
        lines.iter().all(|l| self.latest_by_line.contains_key(l))
    }
}

/// On-disk location of the cache
pub struct CacheFile {
    path: PathBuf,
}

impl CacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cache; unreadable or corrupt files count as absent
    pub async fn read(&self) -> Option<VersionCache> {
        let content = fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(cache) => Some(cache),
            Err(e) => {
                debug!("Ignoring corrupt version cache {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Replace the cache atomically
    pub async fn write(&self, cache: &VersionCache) -> PhpsmithResult<()> {
        write_json_atomic(&self.path, cache).await
    }
}
