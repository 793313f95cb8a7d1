//! Filesystem layout of the managed tree
//!
//! ```text
//! <root>/
//!   versions/<mm>/          install prefix per major.minor line
//!   bin/php<mm>             managed binaries (symlinks into the prefixes)
//!   etc/<mm>/php.ini        per-line configuration
//!   etc/<mm>/conf.d/
//!   etc/<mm>/php-fpm.conf
//!   build/<mm>/             transient build workspaces
//!   logs/                   build logs, retained on failure
//!   run/php<mm>-fpm.sock    FPM sockets
//!   cache/versions.json     release index cache
//!   state.json              installed-state store
//!   history.log             operation history
//! ```
//!
//! The published `php<mm>` and `php` symlinks land in `system_bin_dir`.

use crate::config::Config;
use crate::error::{PhpsmithError, PhpsmithResult};
use std::path::{Path, PathBuf};
use tokio::fs;

/// Resolved paths for one phpsmith root
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
    system_bin_dir: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>, system_bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            system_bin_dir: system_bin_dir.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.paths.root, &config.paths.system_bin_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.root.join("versions")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn etc_dir(&self) -> PathBuf {
        self.root.join("etc")
    }

    pub fn build_dir(&self) -> PathBuf {
        self.root.join("build")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn run_dir(&self) -> PathBuf {
        self.root.join("run")
    }

    pub fn system_bin_dir(&self) -> &Path {
        &self.system_bin_dir
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.join("state.json")
    }

    pub fn cache_file(&self) -> PathBuf {
        self.root.join("cache").join("versions.json")
    }

    pub fn history_file(&self) -> PathBuf {
        self.root.join("history.log")
    }

    /// Install prefix for a line
    pub fn install_prefix(&self, line: &str) -> PathBuf {
        self.versions_dir().join(line)
    }

    /// Per-line config directory (`--with-config-file-path`)
    pub fn config_dir(&self, line: &str) -> PathBuf {
        self.etc_dir().join(line)
    }

    /// Scan directory for extension ini snippets
    pub fn conf_d_dir(&self, line: &str) -> PathBuf {
        self.config_dir(line).join("conf.d")
    }

    pub fn ini_path(&self, line: &str) -> PathBuf {
        self.config_dir(line).join("php.ini")
    }

    pub fn fpm_config_path(&self, line: &str) -> PathBuf {
        self.config_dir(line).join("php-fpm.conf")
    }

    pub fn fpm_socket(&self, line: &str) -> PathBuf {
        self.run_dir().join(format!("php{}-fpm.sock", line))
    }

    /// Version-scoped binary name, e.g. `php8.3`
    pub fn versioned_name(line: &str) -> String {
        format!("php{}", line)
    }

    /// Managed binary symlink under the tool's own bin directory
    pub fn managed_binary(&self, line: &str) -> PathBuf {
        self.bin_dir().join(Self::versioned_name(line))
    }

    /// Published version-scoped symlink in the system bin directory
    pub fn published_binary(&self, line: &str) -> PathBuf {
        self.system_bin_dir.join(Self::versioned_name(line))
    }

    /// Generic `php` symlink for the CLI-bound version
    pub fn generic_binary(&self) -> PathBuf {
        self.system_bin_dir.join("php")
    }

    /// Transient build workspace for a line
    pub fn workspace(&self, line: &str) -> PathBuf {
        self.build_dir().join(line)
    }

    /// Transient workspace for one module build
    pub fn module_workspace(&self, line: &str, module: &str) -> PathBuf {
        self.build_dir().join(format!("{}-{}", line, module))
    }

    /// Extension ini snippet for a module
    pub fn module_ini(&self, line: &str, module: &str) -> PathBuf {
        self.conf_d_dir(line).join(format!("{}.ini", module))
    }

    /// Whether a path lives inside the managed tree
    pub fn is_managed(&self, path: &Path) -> bool {
        path.starts_with(&self.root)
    }

    /// Create the persistent directories of the tree
    pub async fn ensure_dirs(&self) -> PhpsmithResult<()> {
        let dirs = [
            self.versions_dir(),
            self.bin_dir(),
            self.etc_dir(),
            self.build_dir(),
            self.logs_dir(),
            self.run_dir(),
        ];

        for dir in &dirs {
            fs::create_dir_all(dir).await.map_err(|e| {
                PhpsmithError::io(format!("creating directory {}", dir.display()), e)
            })?;
        }

        Ok(())
    }
}
