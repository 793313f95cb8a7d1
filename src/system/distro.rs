//! Distribution detection
//!
//! Probes, in order: `/etc/os-release`, `lsb_release -si`, then well-known
//! marker files. Every probe is read-only and bounded in time.

use crate::error::{PhpsmithError, PhpsmithResult};
use crate::system::process::{CommandRunner, Invocation};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const LSB_RELEASE_TIMEOUT: Duration = Duration::from_secs(5);

/// Marker files and the distribution they identify
const MARKER_FILES: &[(&str, &str)] = &[
    ("etc/debian_version", "debian"),
    ("etc/fedora-release", "fedora"),
    ("etc/redhat-release", "rhel"),
    ("etc/arch-release", "arch"),
    ("etc/alpine-release", "alpine"),
    ("etc/SuSE-release", "opensuse"),
    ("etc/gentoo-release", "gentoo"),
];

/// A detected distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distribution {
    /// Lowercase identifier, e.g. `ubuntu`
    pub id: String,
    /// Parent distributions from `ID_LIKE`
    pub id_like: Vec<String>,
    /// Human-readable name when known
    pub pretty_name: Option<String>,
}

impl Distribution {
    fn from_id(id: &str) -> Self {
        Self {
            id: id.trim().to_lowercase(),
            id_like: vec![],
            pretty_name: None,
        }
    }

    /// Sentinel for an undetectable host
    pub fn unknown() -> Self {
        Self::from_id("unknown")
    }

    pub fn is_unknown(&self) -> bool {
        self.id == "unknown"
    }

    /// Whether this distribution is, or derives from, `family`
    pub fn is_like(&self, family: &str) -> bool {
        self.id == family || self.id_like.iter().any(|f| f == family)
    }
}

impl fmt::Display for Distribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pretty_name {
            Some(ref name) => write!(f, "{}", name),
            None => write!(f, "{}", self.id),
        }
    }
}

/// Parse the contents of an os-release file
pub fn parse_os_release(content: &str) -> Option<Distribution> {
    let mut id = None;
    let mut id_like = vec![];
    let mut pretty_name = None;

    for line in content.lines() {
        let Some((key, value)) = line.trim().split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"').trim_matches('\'');
        match key {
            "ID" => id = Some(value.to_lowercase()),
            "ID_LIKE" => {
                id_like = value
                    .split_whitespace()
                    .map(|s| s.to_lowercase())
                    .collect()
            }
            "PRETTY_NAME" => pretty_name = Some(value.to_string()),
            _ => {}
        }
    }

    let id = id.filter(|id| !id.is_empty())?;
    Some(Distribution {
        id,
        id_like,
        pretty_name,
    })
}

/// Distribution detector rooted at a filesystem root
pub struct DistroDetector {
    root: PathBuf,
}

impl DistroDetector {
    pub fn new() -> Self {
        Self::with_root("/")
    }

    /// Probe files relative to `root` instead of `/`
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Return the first recognized distribution
    pub async fn detect(&self, runner: &dyn CommandRunner) -> PhpsmithResult<Distribution> {
        if std::env::consts::OS == "macos" && self.root == Path::new("/") {
            return Ok(Distribution {
                id: "macos".to_string(),
                id_like: vec![],
                pretty_name: Some("macOS".to_string()),
            });
        }

        for candidate in ["etc/os-release", "usr/lib/os-release"] {
            let path = self.root.join(candidate);
            if let Ok(content) = tokio::fs::read_to_string(&path).await {
                if let Some(distro) = parse_os_release(&content) {
                    debug!("Detected {} from {}", distro.id, path.display());
                    return Ok(distro);
                }
            }
        }

        if let Some(distro) = self.probe_lsb_release(runner).await {
            return Ok(distro);
        }

        for (marker, id) in MARKER_FILES {
            if self.root.join(marker).exists() {
                debug!("Detected {} from marker {}", id, marker);
                return Ok(Distribution::from_id(id));
            }
        }

        Err(PhpsmithError::DistributionUnknown)
    }

    async fn probe_lsb_release(&self, runner: &dyn CommandRunner) -> Option<Distribution> {
        let probe = Invocation::new("lsb_release")
            .arg("-si")
            .timeout(LSB_RELEASE_TIMEOUT);
        match runner.run(&probe).await {
            Ok(out) if out.success() && !out.stdout.trim().is_empty() => {
                debug!("Detected {} from lsb_release", out.stdout.trim());
                Some(Distribution::from_id(&out.stdout))
            }
            _ => None,
        }
    }
}

impl Default for DistroDetector {
    fn default() -> Self {
        Self::new()
    }
}
