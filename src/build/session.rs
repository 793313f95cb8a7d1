//! Build session and per-build log

use crate::error::{PhpsmithError, PhpsmithResult};
use crate::system::process::{remove_tree, CommandOutput, CommandRunner, Invocation};
use chrono::Utc;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// Pipeline stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    PrepareWorkspace,
    Download,
    Extract,
    Configure,
    Compile,
    Install,
    Discover,
    Verify,
    Activate,
    Provision,
    Publish,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PrepareWorkspace => "workspace preparation",
            Self::Download => "download",
            Self::Extract => "extraction",
            Self::Configure => "configure",
            Self::Compile => "compilation",
            Self::Install => "install",
            Self::Discover => "binary discovery",
            Self::Verify => "binary verification",
            Self::Activate => "activation",
            Self::Provision => "runtime configuration",
            Self::Publish => "symlink publication",
        };
        write!(f, "{}", name)
    }
}

/// Append-only plain-text log of one build attempt
#[derive(Debug)]
pub struct BuildLog {
    path: PathBuf,
}

impl BuildLog {
    /// Create a fresh log under `logs_dir`
    pub async fn create(logs_dir: &Path, label: &str) -> PhpsmithResult<Self> {
        fs::create_dir_all(logs_dir)
            .await
            .map_err(|e| PhpsmithError::io(format!("creating {}", logs_dir.display()), e))?;

        let id = Uuid::new_v4().simple().to_string();
        let name = format!(
            "{}-{}-{}.log",
            label,
            Utc::now().format("%Y%m%d-%H%M%S"),
            &id[..8]
        );
        let log = Self {
            path: logs_dir.join(name),
        };

        fs::write(
            &log.path,
            format!("# {} build started {}\n", label, Utc::now().to_rfc3339()),
        )
        .await
        .map_err(|e| PhpsmithError::io(format!("creating {}", log.path.display()), e))?;

        Ok(log)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append raw text. Log IO failures never abort a build.
    pub async fn append(&self, text: &str) {
        if let Err(e) = self.write(text).await {
            warn!("Failed to write build log {}: {}", self.path.display(), e);
        }
    }

    async fn write(&self, text: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().append(true).open(&self.path).await?;
        file.write_all(text.as_bytes()).await?;
        if !text.ends_with('\n') {
            file.write_all(b"\n").await?;
        }
        file.flush().await
    }

    pub async fn section(&self, step: BuildStep) {
        self.append(&format!("\n==> {} ({})", step, Utc::now().format("%H:%M:%S")))
            .await;
    }

    /// Record a finished command with its full output
    pub async fn record(&self, invocation: &Invocation, output: &CommandOutput) {
        let mut entry = format!("$ {}\n", invocation.display());
        entry.push_str(&output.combined());
        if !entry.ends_with('\n') {
            entry.push('\n');
        }
        entry.push_str(&format!("[exit {}]", output.exit_code()));
        self.append(&entry).await;
    }

    /// Delete the log after a successful build
    pub async fn discard(self) {
        match fs::remove_file(&self.path).await {
            Ok(()) => debug!("Removed build log {}", self.path.display()),
            Err(e) => warn!("Failed to remove build log {}: {}", self.path.display(), e),
        }
    }
}

/// Run one build command, capturing its output to the log only
pub async fn run_logged(
    runner: &dyn CommandRunner,
    log: &BuildLog,
    invocation: Invocation,
) -> PhpsmithResult<()> {
    let output = match runner.run(&invocation).await {
        Ok(output) => output,
        Err(e) => {
            log.append(&format!("$ {}\n{}", invocation.display(), e))
                .await;
            return Err(e);
        }
    };
    log.record(&invocation, &output).await;

    if output.success() {
        Ok(())
    } else {
        Err(PhpsmithError::StepFailed {
            command: invocation.program.clone(),
            code: output.exit_code(),
        })
    }
}

/// Recreate a workspace, owned by the invoking user under sudo
pub async fn prepare_workspace(runner: &dyn CommandRunner, dir: &Path) -> PhpsmithResult<()> {
    remove_tree(runner, dir).await?;
    fs::create_dir_all(dir)
        .await
        .map_err(|e| PhpsmithError::io(format!("creating {}", dir.display()), e))?;

    if let Some((uid, gid)) = runner.invoking_owner() {
        std::os::unix::fs::chown(dir, Some(uid), Some(gid))
            .map_err(|e| PhpsmithError::io(format!("chown {}", dir.display()), e))?;
    }
    Ok(())
}

/// One in-flight build of an exact version
#[derive(Debug)]
pub struct BuildSession {
    pub line: String,
    pub version: String,
    pub url: String,
    pub sha256: Option<String>,
    pub extensions: BTreeSet<String>,
    pub configure_flags: Vec<String>,
    pub work_dir: PathBuf,
    pub log: BuildLog,
    pub step: BuildStep,
    pub succeeded: bool,
}

impl BuildSession {
    /// Move to the next stage and mark it in the log
    pub async fn enter(&mut self, step: BuildStep) {
        self.step = step;
        self.log.section(step).await;
    }

    pub fn tarball(&self) -> PathBuf {
        self.work_dir.join(format!("php-{}.tar.gz", self.version))
    }

    /// Top-level directory the tarball unpacks into
    pub fn source_dir(&self) -> PathBuf {
        self.work_dir.join(format!("php-{}", self.version))
    }

    /// `INSTALL_ROOT` for the staged install
    pub fn stage_dir(&self) -> PathBuf {
        self.work_dir.join("stage")
    }

    /// Where `prefix` lands inside the stage
    pub fn staged(&self, prefix: &Path) -> PathBuf {
        self.stage_dir()
            .join(prefix.strip_prefix("/").unwrap_or(prefix))
    }
}
