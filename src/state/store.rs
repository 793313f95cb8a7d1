//! Installed-state store
//!
//! One JSON document keyed by major.minor line. Every mutation builds the
//! next document, persists it with write-temp-then-rename, and only then
//! replaces the in-memory copy.

use crate::config::Layout;
use crate::error::{PhpsmithError, PhpsmithResult};
use crate::fsutil::write_json_atomic;
use crate::registry::compare_versions;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// One managed major.minor line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledVersion {
    pub major_minor: String,
    pub exact_version: String,
    pub install_path: PathBuf,
    pub extensions: BTreeSet<String>,
    #[serde(rename = "isCLI")]
    pub is_cli: bool,
    #[serde(default)]
    pub needs_rebuild: bool,
    pub fpm_socket_path: PathBuf,
    pub ini_path: PathBuf,
    #[serde(default = "Utc::now")]
    pub installed_at: DateTime<Utc>,
}

impl InstalledVersion {
    /// Record for a fresh install, paths taken from the layout
    pub fn new(
        layout: &Layout,
        line: &str,
        exact_version: &str,
        extensions: BTreeSet<String>,
    ) -> Self {
        Self {
            major_minor: line.to_string(),
            exact_version: exact_version.to_string(),
            install_path: layout.install_prefix(line),
            extensions,
            is_cli: false,
            needs_rebuild: false,
            fpm_socket_path: layout.fpm_socket(line),
            ini_path: layout.ini_path(line),
            installed_at: Utc::now(),
        }
    }
}

/// Persisted record of every installed line
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    records: BTreeMap<String, InstalledVersion>,
}

impl StateStore {
    /// Load the store; a missing file is an empty store
    pub async fn load(path: impl Into<PathBuf>) -> PhpsmithResult<Self> {
        let path = path.into();
        let records = match fs::read_to_string(&path).await {
            Ok(content) => {
                serde_json::from_str(&content).map_err(|e| PhpsmithError::StateCorrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(PhpsmithError::io(format!("reading {}", path.display()), e));
            }
        };
        debug!("Loaded {} installed versions", records.len());
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, line: &str) -> Option<&InstalledVersion> {
        self.records.get(line)
    }

    pub fn contains(&self, line: &str) -> bool {
        self.records.contains_key(line)
    }

    /// Installed versions, oldest line first
    pub fn list(&self) -> Vec<&InstalledVersion> {
        let mut all: Vec<_> = self.records.values().collect();
        all.sort_by(|a, b| compare_versions(&a.major_minor, &b.major_minor));
        all
    }

    /// The CLI-bound version, if any
    pub fn cli_version(&self) -> Option<&InstalledVersion> {
        self.records.values().find(|r| r.is_cli)
    }

    async fn commit(&mut self, next: BTreeMap<String, InstalledVersion>) -> PhpsmithResult<()> {
        write_json_atomic(&self.path, &next)
            .await
            .map_err(|e| PhpsmithError::StatePersist {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        self.records = next;
        Ok(())
    }

    async fn mutate<F>(&mut self, line: &str, change: F) -> PhpsmithResult<()>
    where
        F: FnOnce(&mut InstalledVersion),
    {
        let mut next = self.records.clone();
        let record = next
            .get_mut(line)
            .ok_or_else(|| PhpsmithError::NotInstalled(line.to_string()))?;
        change(record);
        self.commit(next).await
    }

    /// Add a new record; the line must not be present
    pub async fn add_installed(&mut self, record: InstalledVersion) -> PhpsmithResult<()> {
        if self.contains(&record.major_minor) {
            return Err(PhpsmithError::AlreadyInstalled(record.major_minor));
        }
        let mut next = self.records.clone();
        next.insert(record.major_minor.clone(), record);
        self.commit(next).await
    }

    pub async fn remove_installed(&mut self, line: &str) -> PhpsmithResult<InstalledVersion> {
        let mut next = self.records.clone();
        let removed = next
            .remove(line)
            .ok_or_else(|| PhpsmithError::NotInstalled(line.to_string()))?;
        self.commit(next).await?;
        Ok(removed)
    }

    /// Bind the CLI to `line`, clearing it on every other record
    pub async fn set_cli(&mut self, line: &str) -> PhpsmithResult<()> {
        if !self.contains(line) {
            return Err(PhpsmithError::NotInstalled(line.to_string()));
        }
        let mut next = self.records.clone();
        for (key, record) in next.iter_mut() {
            record.is_cli = key == line;
        }
        self.commit(next).await
    }

    pub async fn update_extensions(
        &mut self,
        line: &str,
        extensions: BTreeSet<String>,
    ) -> PhpsmithResult<()> {
        self.mutate(line, |r| r.extensions = extensions).await
    }

    pub async fn set_needs_rebuild(&mut self, line: &str, needs_rebuild: bool) -> PhpsmithResult<()> {
        self.mutate(line, |r| r.needs_rebuild = needs_rebuild).await
    }

    /// Commit a successful rebuild
    pub async fn record_rebuild(
        &mut self,
        line: &str,
        exact_version: &str,
        extensions: BTreeSet<String>,
    ) -> PhpsmithResult<()> {
        self.mutate(line, |r| {
            r.exact_version = exact_version.to_string();
            r.extensions = extensions;
            r.needs_rebuild = false;
        })
        .await
    }
}
