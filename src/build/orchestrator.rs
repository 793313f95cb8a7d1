//! Source build pipeline
//!
//! One build runs the stages of [`BuildStep`] in order and stops at the
//! first failure. The install step targets a staging root inside the
//! workspace; the live prefix is only replaced once the staged binary
//! verifies, so a failed build never touches a working installation.

use crate::build::discover::{discover_binary, Discovery, VerifyBinary};
use crate::build::publish::Publisher;
use crate::build::runtime_config;
use crate::build::session::{
    prepare_workspace, run_logged, BuildLog, BuildSession, BuildStep,
};
use crate::config::Layout;
use crate::deps::configure_flags;
use crate::error::{PhpsmithError, PhpsmithResult};
use crate::http::HttpTransport;
use crate::registry::ResolvedRelease;
use crate::report::Reporter;
use crate::system::process::{
    move_path, remove_tree, run_checked, CommandRunner, Invocation, Privilege,
};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

const FALLBACK_JOBS: u32 = 4;

/// Processor count for `make -j`, 4 when undetectable
pub fn detect_jobs() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(FALLBACK_JOBS)
}

/// What to build
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub release: ResolvedRelease,
    pub extensions: BTreeSet<String>,
    /// Also bind the generic `php` name
    pub cli: bool,
}

/// A verified, activated installation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    pub version: String,
    pub install_path: PathBuf,
    pub binary: PathBuf,
}

/// Drives one version's source-to-binary pipeline
pub struct BuildOrchestrator {
    runner: Arc<dyn CommandRunner>,
    transport: Arc<dyn HttpTransport>,
    verifier: Arc<dyn VerifyBinary>,
    layout: Layout,
    jobs: u32,
    keep_workspace_on_failure: bool,
    reporter: Reporter,
}

impl BuildOrchestrator {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        transport: Arc<dyn HttpTransport>,
        verifier: Arc<dyn VerifyBinary>,
        layout: Layout,
        reporter: Reporter,
    ) -> Self {
        Self {
            runner,
            transport,
            verifier,
            layout,
            jobs: detect_jobs(),
            keep_workspace_on_failure: false,
            reporter,
        }
    }

    /// Override the autodetected job count
    pub fn with_jobs(mut self, jobs: Option<u32>) -> Self {
        if let Some(jobs) = jobs.filter(|j| *j > 0) {
            self.jobs = jobs;
        }
        self
    }

    pub fn keep_workspace_on_failure(mut self, keep: bool) -> Self {
        self.keep_workspace_on_failure = keep;
        self
    }

    pub fn jobs(&self) -> u32 {
        self.jobs
    }

    /// Flags every build gets regardless of extensions
    pub fn fixed_flags(&self, line: &str) -> Vec<String> {
        vec![
            format!("--prefix={}", self.layout.install_prefix(line).display()),
            format!(
                "--with-config-file-path={}",
                self.layout.config_dir(line).display()
            ),
            format!(
                "--with-config-file-scan-dir={}",
                self.layout.conf_d_dir(line).display()
            ),
            "--enable-fpm".to_string(),
        ]
    }

    /// Full `configure` argument list for a line and extension set
    pub fn configure_arguments(&self, line: &str, extensions: &BTreeSet<String>) -> Vec<String> {
        let mut args = self.fixed_flags(line);
        args.extend(configure_flags(extensions));
        args
    }

    /// Build, verify, activate and publish one release.
    ///
    /// The workspace is removed whatever the outcome. The build log is
    /// deleted on success and named in the returned error otherwise.
    pub async fn build(&self, request: &BuildRequest) -> PhpsmithResult<BuildOutcome> {
        let release = &request.release;
        let log = BuildLog::create(&self.layout.logs_dir(), &format!("php{}", release.line)).await?;
        let mut session = BuildSession {
            line: release.line.clone(),
            version: release.version.clone(),
            url: release.url.clone(),
            sha256: release.sha256.clone(),
            configure_flags: self.configure_arguments(&release.line, &request.extensions),
            extensions: request.extensions.clone(),
            work_dir: self.layout.workspace(&release.line),
            log,
            step: BuildStep::PrepareWorkspace,
            succeeded: false,
        };

        info!("Building PHP {} ({} jobs)", session.version, self.jobs);
        let result = self.run_pipeline(&mut session, request.cli).await;

        if result.is_err() && self.keep_workspace_on_failure {
            info!("Keeping workspace {}", session.work_dir.display());
        } else if let Err(e) = remove_tree(self.runner.as_ref(), &session.work_dir).await {
            warn!("Failed to clean workspace {}: {}", session.work_dir.display(), e);
        }

        match result {
            Ok(outcome) => {
                session.succeeded = true;
                session.log.discard().await;
                info!("PHP {} installed at {}", outcome.version, outcome.install_path.display());
                Ok(outcome)
            }
            Err(e) => {
                session.log.append(&format!("\nerror: {}", e)).await;
                Err(Self::failure(&session, e))
            }
        }
    }

    fn failure(session: &BuildSession, err: PhpsmithError) -> PhpsmithError {
        match err {
            e @ PhpsmithError::VerificationFailed { .. } => e,
            other => PhpsmithError::BuildFailed {
                version: session.version.clone(),
                step: session.step.to_string(),
                cause: other.to_string(),
                log: session.log.path().to_path_buf(),
            },
        }
    }

    async fn run_pipeline(
        &self,
        session: &mut BuildSession,
        cli: bool,
    ) -> PhpsmithResult<BuildOutcome> {
        let prefix = self.layout.install_prefix(&session.line);

        session.enter(BuildStep::PrepareWorkspace).await;
        prepare_workspace(self.runner.as_ref(), &session.work_dir).await?;

        session.enter(BuildStep::Download).await;
        self.reporter
            .step(&format!("Downloading PHP {} source", session.version));
        self.transport.download(&session.url, &session.tarball()).await?;
        if let Some(ref expected) = session.sha256 {
            verify_checksum(&session.tarball(), expected).await?;
        }

        session.enter(BuildStep::Extract).await;
        self.reporter.step("Extracting source");
        let extract = Invocation::new("tar")
            .arg("-xzf")
            .arg(session.tarball().display().to_string())
            .arg("-C")
            .arg(session.work_dir.display().to_string());
        self.exec(session, extract).await?;
        if !fs::try_exists(session.source_dir()).await.unwrap_or(false) {
            return Err(PhpsmithError::command_exec(
                "tar",
                format!("expected {} after extraction", session.source_dir().display()),
            ));
        }

        session.enter(BuildStep::Configure).await;
        self.reporter
            .step(&format!("Configuring PHP {}", session.version));
        let configure = Invocation::new("./configure")
            .args(session.configure_flags.clone())
            .cwd(session.source_dir());
        self.exec(session, configure).await?;

        session.enter(BuildStep::Compile).await;
        self.reporter
            .step(&format!("Compiling with {} jobs", self.jobs));
        let compile = Invocation::new("make")
            .arg(format!("-j{}", self.jobs))
            .cwd(session.source_dir());
        self.exec(session, compile).await?;

        session.enter(BuildStep::Install).await;
        self.reporter.step("Installing");
        let install = Invocation::new("make")
            .arg("install")
            .arg(format!("INSTALL_ROOT={}", session.stage_dir().display()))
            .cwd(session.source_dir())
            .privilege(self.runner.privilege_for(&self.layout.versions_dir()));
        self.exec(session, install).await?;

        session.enter(BuildStep::Discover).await;
        self.reporter.step("Verifying binary");
        let staged = session.staged(&prefix);
        let found = match discover_binary(
            &staged,
            &session.line,
            &session.version,
            self.verifier.as_ref(),
            &session.log,
        )
        .await
        {
            Discovery::Found(path) => path,
            Discovery::Unverified => {
                session.step = BuildStep::Verify;
                return Err(self.verification_failed(session));
            }
            Discovery::Missing => return Err(self.verification_failed(session)),
        };
        let binary = match found.strip_prefix(&staged) {
            Ok(relative) => prefix.join(relative),
            Err(_) => found,
        };

        session.enter(BuildStep::Activate).await;
        let previous = self.activate(&session.line, &staged, &prefix).await?;

        if let Err(e) = self.provision_and_publish(session, &binary, cli).await {
            self.roll_back(&prefix, previous.as_deref()).await;
            return Err(e);
        }
        if let Some(previous) = previous {
            if let Err(e) = remove_tree(self.runner.as_ref(), &previous).await {
                warn!("Failed to remove {}: {}", previous.display(), e);
            }
        }

        Ok(BuildOutcome {
            version: session.version.clone(),
            install_path: prefix,
            binary,
        })
    }

    fn verification_failed(&self, session: &BuildSession) -> PhpsmithError {
        PhpsmithError::VerificationFailed {
            version: session.version.clone(),
            log: session.log.path().to_path_buf(),
        }
    }

    async fn exec(&self, session: &BuildSession, invocation: Invocation) -> PhpsmithResult<()> {
        run_logged(self.runner.as_ref(), &session.log, invocation).await
    }

    async fn provision_and_publish(
        &self,
        session: &mut BuildSession,
        binary: &Path,
        cli: bool,
    ) -> PhpsmithResult<()> {
        session.enter(BuildStep::Provision).await;
        runtime_config::provision(&self.layout, &session.line, Some(&session.source_dir())).await?;

        session.enter(BuildStep::Publish).await;
        self.reporter.step("Publishing symlinks");
        Publisher::new(self.runner.as_ref(), &self.layout)
            .publish(&session.line, binary, cli)
            .await
    }

    /// Swap the staged prefix in.
    ///
    /// Returns where the replaced prefix was parked; it stays there until
    /// the caller either discards it or hands it to [`Self::roll_back`].
    async fn activate(
        &self,
        line: &str,
        staged: &Path,
        prefix: &Path,
    ) -> PhpsmithResult<Option<PathBuf>> {
        let runner = self.runner.as_ref();
        self.ensure_versions_dir().await?;

        let previous = self.layout.versions_dir().join(format!(".{}.previous", line));
        let had_previous = fs::try_exists(prefix).await.unwrap_or(false);
        if had_previous {
            remove_tree(runner, &previous).await?;
            move_path(runner, prefix, &previous).await?;
        }

        if let Err(e) = move_path(runner, staged, prefix).await {
            if had_previous {
                if let Err(restore) = move_path(runner, &previous, prefix).await {
                    warn!("Failed to restore {}: {}", prefix.display(), restore);
                }
            }
            return Err(e);
        }

        debug!("Activated {}", prefix.display());
        Ok(had_previous.then_some(previous))
    }

    /// Drop the activated prefix and put the parked one back
    async fn roll_back(&self, prefix: &Path, previous: Option<&Path>) {
        let runner = self.runner.as_ref();
        if let Err(e) = remove_tree(runner, prefix).await {
            warn!("Failed to remove {}: {}", prefix.display(), e);
            return;
        }
        if let Some(previous) = previous {
            match move_path(runner, previous, prefix).await {
                Ok(()) => info!("Restored previous installation at {}", prefix.display()),
                Err(e) => warn!("Failed to restore {}: {}", prefix.display(), e),
            }
        }
    }

    async fn ensure_versions_dir(&self) -> PhpsmithResult<()> {
        let dir = self.layout.versions_dir();
        if fs::create_dir_all(&dir).await.is_ok() {
            return Ok(());
        }
        let mkdir = Invocation::new("mkdir")
            .arg("-p")
            .arg(dir.display().to_string())
            .privilege(Privilege::Elevated);
        run_checked(self.runner.as_ref(), &mkdir).await
    }
}

/// Compare a file's sha256 with the expected hex digest
pub async fn verify_checksum(path: &Path, expected: &str) -> PhpsmithResult<()> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| PhpsmithError::io(format!("reading {}", path.display()), e))?;
    let actual = hex::encode(Sha256::digest(&bytes));
    if actual.eq_ignore_ascii_case(expected.trim()) {
        return Ok(());
    }
    Err(PhpsmithError::ChecksumMismatch {
        file: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        expected: expected.to_string(),
        actual,
    })
}
