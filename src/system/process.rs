//! External command execution with explicit privilege
//!
//! Every spawned process declares whether it runs as the invoking user or
//! elevated. Compilation runs as the invoking user even when phpsmith itself
//! was started through `sudo`; writes outside the user's area run elevated.

use crate::error::{PhpsmithError, PhpsmithResult};
use async_trait::async_trait;
use nix::unistd::{access, geteuid, AccessFlags};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Credentials a spawned process runs with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// The invoking, non-elevated user
    User,
    /// Root, via `sudo` when phpsmith is not already root
    Elevated,
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Elevated => write!(f, "elevated"),
        }
    }
}

/// One external command to spawn
#[derive(Debug, Clone)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub privilege: Privilege,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            privilege: Privilege::User,
            timeout: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn privilege(mut self, privilege: Privilege) -> Self {
        self.privilege = privilege;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Shell-like rendering for logs and errors
    pub fn display(&self) -> String {
        let mut out = self.program.clone();
        for arg in &self.args {
            out.push(' ');
            out.push_str(arg);
        }
        out
    }
}

/// Captured result of a finished process
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Exit code with signals mapped to -1
    pub fn exit_code(&self) -> i32 {
        self.code.unwrap_or(-1)
    }

    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.stderr);
        }
        out
    }
}

/// Spawns external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion, capturing output. A non-zero exit is not an error here.
    async fn run(&self, invocation: &Invocation) -> PhpsmithResult<CommandOutput>;

    /// Privilege needed to write into `path`
    fn privilege_for(&self, path: &Path) -> Privilege {
        if is_writable(path) {
            Privilege::User
        } else {
            Privilege::Elevated
        }
    }

    /// uid/gid of the user behind `sudo`, when running elevated
    fn invoking_owner(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Effective and invoking identities of this process
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub euid: u32,
    pub invoking: Option<(u32, u32)>,
}

impl Identity {
    /// Read the effective uid and the `SUDO_UID`/`SUDO_GID` pair
    pub fn detect() -> Self {
        let euid = geteuid().as_raw();
        let invoking = match (std::env::var("SUDO_UID"), std::env::var("SUDO_GID")) {
            (Ok(uid), Ok(gid)) => uid.parse().ok().zip(gid.parse().ok()),
            _ => None,
        };
        Self { euid, invoking }
    }

    pub fn is_root(&self) -> bool {
        self.euid == 0
    }
}

/// Runs commands on the host
pub struct HostRunner {
    identity: Identity,
}

impl HostRunner {
    pub fn new() -> Self {
        Self {
            identity: Identity::detect(),
        }
    }

    pub fn with_identity(identity: Identity) -> Self {
        Self { identity }
    }

    fn command_for(&self, invocation: &Invocation) -> Command {
        let mut cmd = match invocation.privilege {
            Privilege::Elevated if !self.identity.is_root() => {
                let mut cmd = Command::new("sudo");
                cmd.arg("--").arg(&invocation.program);
                cmd
            }
            _ => Command::new(&invocation.program),
        };
        cmd.args(&invocation.args);

        if invocation.privilege == Privilege::User && self.identity.is_root() {
            if let Some((uid, gid)) = self.identity.invoking {
                cmd.uid(uid).gid(gid);
            }
        }

        if let Some(ref dir) = invocation.cwd {
            cmd.current_dir(dir);
        }

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for HostRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandRunner for HostRunner {
    async fn run(&self, invocation: &Invocation) -> PhpsmithResult<CommandOutput> {
        debug!(
            "Executing ({}): {}",
            invocation.privilege,
            invocation.display()
        );

        let output = self.command_for(invocation).output();
        let output = match invocation.timeout {
            Some(limit) => tokio::time::timeout(limit, output)
                .await
                .map_err(|_| PhpsmithError::CommandTimeout(invocation.display()))?,
            None => output.await,
        }
        .map_err(|e| PhpsmithError::command_failed(invocation.display(), e))?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn privilege_for(&self, path: &Path) -> Privilege {
        if self.identity.is_root() || !is_writable(path) {
            Privilege::Elevated
        } else {
            Privilege::User
        }
    }

    fn invoking_owner(&self) -> Option<(u32, u32)> {
        if self.identity.is_root() {
            self.identity.invoking
        } else {
            None
        }
    }
}

/// Whether the current process may write into `path`, or into its nearest
/// existing ancestor when `path` does not exist yet.
pub fn is_writable(path: &Path) -> bool {
    let mut probe = Some(path);
    while let Some(candidate) = probe {
        if candidate.exists() {
            return access_writable(candidate);
        }
        probe = candidate.parent();
    }
    false
}

fn access_writable(path: &Path) -> bool {
    access(path, AccessFlags::W_OK).is_ok()
}

/// Whether `name` resolves on the search path
pub async fn command_exists(runner: &dyn CommandRunner, name: &str) -> bool {
    let probe = Invocation::new("which")
        .arg(name)
        .timeout(Duration::from_secs(5));
    runner
        .run(&probe)
        .await
        .map(|out| out.success())
        .unwrap_or(false)
}

/// Replace `link` with a symlink to `target`, elevating when the directory
/// is not writable.
pub async fn replace_symlink(
    runner: &dyn CommandRunner,
    target: &Path,
    link: &Path,
) -> PhpsmithResult<()> {
    let dir = link.parent().unwrap_or(Path::new("/"));
    if is_writable(dir) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| PhpsmithError::io(format!("creating {}", dir.display()), e))?;
        if tokio::fs::symlink_metadata(link).await.is_ok() {
            tokio::fs::remove_file(link)
                .await
                .map_err(|e| PhpsmithError::io(format!("removing {}", link.display()), e))?;
        }
        tokio::fs::symlink(target, link).await.map_err(|e| {
            PhpsmithError::io(
                format!("linking {} -> {}", link.display(), target.display()),
                e,
            )
        })?;
        return Ok(());
    }

    let invocation = Invocation::new("ln")
        .arg("-sfn")
        .arg(target.display().to_string())
        .arg(link.display().to_string())
        .privilege(Privilege::Elevated);
    run_checked(runner, &invocation).await
}

/// Remove a symlink if present, elevating when the directory is not writable
pub async fn remove_symlink(runner: &dyn CommandRunner, link: &Path) -> PhpsmithResult<()> {
    if tokio::fs::symlink_metadata(link).await.is_err() {
        return Ok(());
    }

    let dir = link.parent().unwrap_or(Path::new("/"));
    if is_writable(dir) {
        return tokio::fs::remove_file(link)
            .await
            .map_err(|e| PhpsmithError::io(format!("removing {}", link.display()), e));
    }

    let invocation = Invocation::new("rm")
        .arg("-f")
        .arg(link.display().to_string())
        .privilege(Privilege::Elevated);
    run_checked(runner, &invocation).await
}

/// Rename `from` to `to`, elevating when the destination directory is not writable
pub async fn move_path(runner: &dyn CommandRunner, from: &Path, to: &Path) -> PhpsmithResult<()> {
    let dir = to.parent().unwrap_or(Path::new("/"));
    if is_writable(dir) {
        return tokio::fs::rename(from, to).await.map_err(|e| {
            PhpsmithError::io(format!("moving {} to {}", from.display(), to.display()), e)
        });
    }

    let invocation = Invocation::new("mv")
        .arg(from.display().to_string())
        .arg(to.display().to_string())
        .privilege(Privilege::Elevated);
    run_checked(runner, &invocation).await
}

/// Recursively delete `path` if present.
///
/// Falls back to an elevated `rm -rf` when the tree holds files this
/// process cannot remove, e.g. an install step that ran elevated.
pub async fn remove_tree(runner: &dyn CommandRunner, path: &Path) -> PhpsmithResult<()> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            debug!("Removing {} elevated: {}", path.display(), e);
            let invocation = Invocation::new("rm")
                .arg("-rf")
                .arg(path.display().to_string())
                .privilege(Privilege::Elevated);
            run_checked(runner, &invocation).await
        }
        Err(e) => Err(PhpsmithError::io(format!("removing {}", path.display()), e)),
    }
}

/// Run and turn a non-zero exit into an error carrying the output
pub async fn run_checked(runner: &dyn CommandRunner, invocation: &Invocation) -> PhpsmithResult<()> {
    let output = runner.run(invocation).await?;
    if output.success() {
        Ok(())
    } else {
        Err(PhpsmithError::command_exec(
            invocation.display(),
            output.combined().trim(),
        ))
    }
}
