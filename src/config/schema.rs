//! Configuration schema for phpsmith
//!
//! Configuration is stored at `~/.config/phpsmith/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Filesystem locations
    pub paths: PathsConfig,

    /// Upstream release index settings
    pub registry: RegistryConfig,

    /// Source build settings
    pub build: BuildConfig,

    /// System dependency settings
    pub deps: DepsConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,

    /// Record operations in the history log
    pub history: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
            history: true,
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the managed tree (versions, config, logs, state)
    pub root: PathBuf,

    /// System-wide directory receiving the published symlinks
    pub system_bin_dir: PathBuf,

    /// Paths probed for a PHP that phpsmith does not manage
    pub conflict_probe: Vec<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            root: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("phpsmith"),
            system_bin_dir: PathBuf::from("/usr/local/bin"),
            conflict_probe: vec![
                PathBuf::from("/usr/bin/php"),
                PathBuf::from("/usr/local/bin/php"),
                PathBuf::from("/bin/php"),
            ],
        }
    }
}

/// Release index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Release index endpoint, queried once per line
    pub index_url: String,

    /// Host prefix for source tarballs
    pub distribution_url: String,

    /// PECL download prefix for module extensions
    pub pecl_url: String,

    /// Supported major.minor lines
    pub lines: Vec<String>,

    /// Version cache validity in seconds
    pub cache_ttl_secs: u64,

    /// Timeout for release index queries in seconds
    pub timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            index_url: "https://www.php.net/releases/index.php".to_string(),
            distribution_url: "https://www.php.net/distributions".to_string(),
            pecl_url: "https://pecl.php.net/get".to_string(),
            lines: ["8.1", "8.2", "8.3", "8.4"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            cache_ttl_secs: 3600,
            timeout_secs: 15,
        }
    }
}

/// Source build settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Parallel compile jobs (autodetected when unset)
    pub jobs: Option<u32>,

    /// Extensions enabled when none are requested
    pub default_extensions: Vec<String>,

    /// Keep the build workspace after a failed build
    pub keep_workspace_on_failure: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: None,
            default_extensions: crate::deps::DEFAULT_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            keep_workspace_on_failure: false,
        }
    }
}

/// System dependency settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepsConfig {
    /// Install missing system packages before building
    pub auto_install: bool,

    /// Abort the install when the package manager fails
    pub fail_on_error: bool,

    /// Suppress dependency progress narration
    pub quiet: bool,
}

impl Default for DepsConfig {
    fn default() -> Self {
        Self {
            auto_install: true,
            fail_on_error: false,
            quiet: false,
        }
    }
}
