//! PECL module extensions
//!
//! Modules are built against an installed line with its own `phpize` and
//! `php-config`, then enabled through an ini snippet in `conf.d`.

use crate::build::session::{prepare_workspace, run_logged, BuildLog};
use crate::config::Layout;
use crate::deps::{ExtensionDefinition, InstallMechanism};
use crate::error::{PhpsmithError, PhpsmithResult};
use crate::http::HttpTransport;
use crate::report::Reporter;
use crate::system::process::{remove_tree, run_checked, CommandRunner, Invocation, Privilege};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, info, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// ini line enabling a module
pub fn ini_directive(ext: &ExtensionDefinition) -> String {
    match ext.mechanism {
        InstallMechanism::Module { zend: true } => format!("zend_extension={}\n", ext.name),
        _ => format!("extension={}\n", ext.name),
    }
}

/// Whether `php -m` output lists `name`
pub fn is_loaded(modules_output: &str, name: &str) -> bool {
    modules_output
        .lines()
        .map(str::trim)
        .any(|l| l.eq_ignore_ascii_case(name))
}

/// Builds, enables and removes PECL modules
pub struct ModuleInstaller {
    runner: Arc<dyn CommandRunner>,
    transport: Arc<dyn HttpTransport>,
    layout: Layout,
    pecl_url: String,
    jobs: u32,
    reporter: Reporter,
}

impl ModuleInstaller {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        transport: Arc<dyn HttpTransport>,
        layout: Layout,
        pecl_url: impl Into<String>,
        jobs: u32,
        reporter: Reporter,
    ) -> Self {
        Self {
            runner,
            transport,
            layout,
            pecl_url: pecl_url.into().trim_end_matches('/').to_string(),
            jobs,
            reporter,
        }
    }

    fn bin(&self, line: &str, tool: &str) -> PathBuf {
        self.layout.install_prefix(line).join("bin").join(tool)
    }

    /// Build and enable one module for an installed line
    pub async fn install(&self, line: &str, ext: &ExtensionDefinition) -> PhpsmithResult<()> {
        self.reporter
            .step(&format!("Building {} for PHP {}", ext.name, line));
        let log = BuildLog::create(&self.layout.logs_dir(), &format!("php{}-{}", line, ext.name))
            .await?;
        let workspace = self.layout.module_workspace(line, ext.name);

        let result = self.build(line, ext, &workspace, &log).await;

        if let Err(e) = remove_tree(self.runner.as_ref(), &workspace).await {
            warn!("Failed to clean workspace {}: {}", workspace.display(), e);
        }

        match result {
            Ok(()) => {
                log.discard().await;
                info!("Enabled {} for PHP {}", ext.name, line);
                Ok(())
            }
            Err(e) => {
                log.append(&format!("\nerror: {}", e)).await;
                self.remove_ini(line, ext.name).await;
                Err(PhpsmithError::ModuleFailed {
                    name: ext.name.to_string(),
                    line: line.to_string(),
                    log: log.path().to_path_buf(),
                })
            }
        }
    }

    async fn build(
        &self,
        line: &str,
        ext: &ExtensionDefinition,
        workspace: &Path,
        log: &BuildLog,
    ) -> PhpsmithResult<()> {
        let runner = self.runner.as_ref();
        prepare_workspace(runner, workspace).await?;

        let archive = workspace.join(format!("{}.tgz", ext.name));
        let url = format!("{}/{}", self.pecl_url, ext.name);
        log.append(&format!("downloading {}", url)).await;
        self.transport.download(&url, &archive).await?;

        let extract = Invocation::new("tar")
            .arg("-xzf")
            .arg(archive.display().to_string())
            .arg("-C")
            .arg(workspace.display().to_string());
        run_logged(runner, log, extract).await?;
        let source = find_source_dir(workspace, ext.name).await?;

        run_logged(
            runner,
            log,
            Invocation::new(self.bin(line, "phpize").display().to_string()).cwd(&source),
        )
        .await?;
        run_logged(
            runner,
            log,
            Invocation::new("./configure")
                .arg(format!(
                    "--with-php-config={}",
                    self.bin(line, "php-config").display()
                ))
                .cwd(&source),
        )
        .await?;
        run_logged(
            runner,
            log,
            Invocation::new("make")
                .arg(format!("-j{}", self.jobs))
                .cwd(&source),
        )
        .await?;
        let prefix = self.layout.install_prefix(line);
        run_logged(
            runner,
            log,
            Invocation::new("make")
                .arg("install")
                .cwd(&source)
                .privilege(runner.privilege_for(&prefix)),
        )
        .await?;

        let ini = self.layout.module_ini(line, ext.name);
        let conf_d = self.layout.conf_d_dir(line);
        fs::create_dir_all(&conf_d)
            .await
            .map_err(|e| PhpsmithError::io(format!("creating {}", conf_d.display()), e))?;
        fs::write(&ini, ini_directive(ext))
            .await
            .map_err(|e| PhpsmithError::io(format!("writing {}", ini.display()), e))?;

        let probe = Invocation::new(self.bin(line, "php").display().to_string())
            .arg("-m")
            .timeout(PROBE_TIMEOUT);
        let output = runner.run(&probe).await?;
        log.record(&probe, &output).await;
        if !output.success() || !is_loaded(&output.stdout, ext.name) {
            return Err(PhpsmithError::command_exec(
                probe.display(),
                format!("{} is not loaded", ext.name),
            ));
        }
        Ok(())
    }

    /// Disable a module and delete its shared object
    pub async fn remove(&self, line: &str, ext: &ExtensionDefinition) -> PhpsmithResult<()> {
        self.reporter
            .step(&format!("Removing {} from PHP {}", ext.name, line));
        self.remove_ini(line, ext.name).await;

        let query = Invocation::new(self.bin(line, "php-config").display().to_string())
            .arg("--extension-dir")
            .timeout(PROBE_TIMEOUT);
        let output = match self.runner.run(&query).await {
            Ok(out) if out.success() => out,
            Ok(out) => {
                warn!("{} exited with {}", query.display(), out.exit_code());
                return Ok(());
            }
            Err(e) => {
                warn!("{} failed: {}", query.display(), e);
                return Ok(());
            }
        };

        let shared = Path::new(output.stdout.trim()).join(format!("{}.so", ext.name));
        match fs::remove_file(&shared).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                let rm = Invocation::new("rm")
                    .arg("-f")
                    .arg(shared.display().to_string())
                    .privilege(Privilege::Elevated);
                run_checked(self.runner.as_ref(), &rm).await
            }
            Err(e) => Err(PhpsmithError::io(format!("removing {}", shared.display()), e)),
        }
    }

    async fn remove_ini(&self, line: &str, name: &str) {
        let ini = self.layout.module_ini(line, name);
        match fs::remove_file(&ini).await {
            Ok(()) => debug!("Removed {}", ini.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", ini.display(), e),
        }
    }
}

/// The single `<name>-<version>` directory a PECL archive unpacks into
async fn find_source_dir(workspace: &Path, name: &str) -> PhpsmithResult<PathBuf> {
    let mut entries = fs::read_dir(workspace)
        .await
        .map_err(|e| PhpsmithError::io(format!("reading {}", workspace.display()), e))?;
    let prefix = format!("{}-", name);

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| PhpsmithError::io(format!("reading {}", workspace.display()), e))?
    {
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        if is_dir && entry.file_name().to_string_lossy().starts_with(&prefix) {
            return Ok(entry.path());
        }
    }

    Err(PhpsmithError::command_exec(
        "tar",
        format!("no {}* directory in {}", prefix, workspace.display()),
    ))
}
