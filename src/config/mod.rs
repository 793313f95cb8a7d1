//! Configuration loading
//!
//! The file is optional; every section falls back to its defaults. The
//! state root can be moved with `PHPSMITH_ROOT` without touching the file.

pub mod layout;
pub mod schema;

pub use layout::Layout;
pub use schema::Config;

use crate::error::{PhpsmithError, PhpsmithResult};
use crate::fsutil::write_atomic;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Environment variable overriding `paths.root`
pub const ROOT_ENV: &str = "PHPSMITH_ROOT";

const FILE_HEADER: &str = "# phpsmith configuration\n# Every key is optional; removed keys fall back to their defaults.\n\n";

/// Locates, reads and writes the TOML config file
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Use `explicit` when given, the per-user config dir otherwise
    pub fn locate(explicit: Option<PathBuf>) -> Self {
        let config_path = explicit.unwrap_or_else(|| {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("phpsmith")
                .join("config.toml")
        });
        Self { config_path }
    }

    pub async fn load(&self) -> PhpsmithResult<Config> {
        let mut config = match fs::read_to_string(&self.config_path).await {
            Ok(content) => parse(&self.config_path, &content)?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No config at {}, using defaults", self.config_path.display());
                Config::default()
            }
            Err(e) => {
                return Err(PhpsmithError::io(
                    format!("reading config from {}", self.config_path.display()),
                    e,
                ))
            }
        };

        if let Some(root) = std::env::var_os(ROOT_ENV) {
            debug!("{} overrides paths.root", ROOT_ENV);
            config.paths.root = PathBuf::from(root);
        }
        Ok(config)
    }

    /// Replace the file with `config`, creating parent directories
    pub async fn save(&self, config: &Config) -> PhpsmithResult<()> {
        let body = toml::to_string_pretty(config)?;
        let content = format!("{}{}", FILE_HEADER, body);
        write_atomic(&self.config_path, content.as_bytes()).await?;
        info!("Wrote {}", self.config_path.display());
        Ok(())
    }

    pub fn exists(&self) -> bool {
        self.config_path.is_file()
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

fn parse(path: &Path, content: &str) -> PhpsmithResult<Config> {
    toml::from_str(content).map_err(|e| PhpsmithError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: e.message().to_string(),
    })
}
