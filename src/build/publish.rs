//! Symlink publication and conflict probing
//!
//! Link chain for line `8.3`:
//!
//! ```text
//! <system_bin>/php     -> <root>/bin/php8.3   (CLI-bound line only)
//! <system_bin>/php8.3  -> <root>/bin/php8.3
//! <root>/bin/php8.3    -> <root>/versions/8.3/bin/php
//! ```

use crate::config::Layout;
use crate::error::{PhpsmithError, PhpsmithResult};
use crate::system::process::{remove_symlink, replace_symlink, CommandRunner};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Publishes and retracts the links of installed lines
pub struct Publisher<'a> {
    runner: &'a dyn CommandRunner,
    layout: &'a Layout,
}

impl<'a> Publisher<'a> {
    pub fn new(runner: &'a dyn CommandRunner, layout: &'a Layout) -> Self {
        Self { runner, layout }
    }

    /// Expose `binary` under the line's names, plus `php` when `cli` is set
    pub async fn publish(&self, line: &str, binary: &Path, cli: bool) -> PhpsmithResult<()> {
        let managed = self.layout.managed_binary(line);
        fs::create_dir_all(self.layout.bin_dir()).await.map_err(|e| {
            PhpsmithError::io(format!("creating {}", self.layout.bin_dir().display()), e)
        })?;

        replace_symlink(self.runner, binary, &managed).await?;
        replace_symlink(self.runner, &managed, &self.layout.published_binary(line)).await?;
        debug!("Published {} -> {}", managed.display(), binary.display());

        if cli {
            match self.generic_conflict().await {
                Some(conflict) => warn!(
                    "Leaving unmanaged {} in place; php is not bound to {}",
                    conflict.display(),
                    line
                ),
                None => self.link_generic(line).await?,
            }
        }
        Ok(())
    }

    /// Point the generic `php` name at `line`.
    ///
    /// Refuses to replace a `php` that phpsmith does not own.
    pub async fn bind_cli(&self, line: &str) -> PhpsmithResult<()> {
        if let Some(conflict) = self.generic_conflict().await {
            return Err(PhpsmithError::CliConflict(conflict));
        }
        self.link_generic(line).await
    }

    async fn link_generic(&self, line: &str) -> PhpsmithResult<()> {
        let generic = self.layout.generic_binary();
        replace_symlink(self.runner, &self.layout.managed_binary(line), &generic).await?;
        info!("{} now runs PHP {}", generic.display(), line);
        Ok(())
    }

    /// Remove every link of a line; the generic link only when `cli` is set
    pub async fn unpublish(&self, line: &str, cli: bool) -> PhpsmithResult<()> {
        if cli && self.generic_conflict().await.is_none() {
            remove_symlink(self.runner, &self.layout.generic_binary()).await?;
        }
        let published = self.layout.published_binary(line);
        if self.is_managed_link(&published).await {
            remove_symlink(self.runner, &published).await?;
        }
        remove_symlink(self.runner, &self.layout.managed_binary(line)).await
    }

    /// The generic `php` path when it exists and is not ours
    pub async fn generic_conflict(&self) -> Option<PathBuf> {
        let generic = self.layout.generic_binary();
        if fs::symlink_metadata(&generic).await.is_err() {
            return None;
        }
        if self.is_managed_link(&generic).await {
            None
        } else {
            Some(generic)
        }
    }

    /// First probe path holding a PHP that phpsmith does not manage
    pub async fn find_conflict(&self, probes: &[PathBuf]) -> Option<PathBuf> {
        for probe in probes {
            if fs::try_exists(probe).await.unwrap_or(false) && !self.is_managed_link(probe).await {
                return Some(probe.clone());
            }
        }
        None
    }

    async fn is_managed_link(&self, path: &Path) -> bool {
        let Ok(target) = fs::read_link(path).await else {
            return false;
        };
        let target = if target.is_relative() {
            path.parent().unwrap_or(Path::new("/")).join(target)
        } else {
            target
        };
        self.layout.is_managed(&target)
    }
}
