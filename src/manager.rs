//! Version manager
//!
//! The boundary the command front end talks to. Each operation reads the
//! installed state, runs the fallible steps, and commits to the store once,
//! after the last step succeeded.

use crate::build::{
    BuildOrchestrator, BuildRequest, ModuleInstaller, Publisher, VerifyBinary, VersionProbe,
};
use crate::config::{Config, Layout};
use crate::deps::{
    find_extension, module_extensions, requires_rebuild, validate_extensions, DependencyResolver,
};
use crate::error::{PhpsmithError, PhpsmithResult};
use crate::history::History;
use crate::http::{HttpTransport, UreqTransport};
use crate::registry::{compare_versions, parse_line, ResolvedRelease, VersionCache, VersionRegistry};
use crate::report::Reporter;
use crate::state::{InstalledVersion, StateStore};
use crate::system::process::{remove_tree, CommandRunner, HostRunner};
use crate::system::{Distribution, PackageManager};
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Result of a dependency check
#[derive(Debug, Clone)]
pub struct DependencyReport {
    pub manager: PackageManager,
    pub distro: Distribution,
    /// Base build prerequisites not found
    pub missing_prerequisites: Vec<&'static str>,
    /// Extensions with at least one dependency not found
    pub missing_extensions: Vec<String>,
}

impl DependencyReport {
    pub fn is_satisfied(&self) -> bool {
        self.missing_prerequisites.is_empty() && self.missing_extensions.is_empty()
    }
}

/// An installed line behind the upstream latest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutdatedVersion {
    pub line: String,
    pub installed: String,
    pub latest: String,
}

/// Install, rebuild and bind PHP versions
pub struct VersionManager {
    config: Config,
    layout: Layout,
    runner: Arc<dyn CommandRunner>,
    transport: Arc<dyn HttpTransport>,
    verifier: Arc<dyn VerifyBinary>,
    registry: VersionRegistry,
    store: StateStore,
    history: History,
    reporter: Reporter,
}

impl VersionManager {
    /// Manager wired to this host's processes and the network
    pub async fn open(config: Config, reporter: Reporter) -> PhpsmithResult<Self> {
        let runner: Arc<dyn CommandRunner> = Arc::new(HostRunner::new());
        let transport: Arc<dyn HttpTransport> = Arc::new(UreqTransport::new(
            Duration::from_secs(config.registry.timeout_secs),
        ));
        let verifier = Arc::new(VersionProbe::new(Arc::clone(&runner)));
        Self::with_parts(config, runner, transport, verifier, reporter).await
    }

    pub async fn with_parts(
        config: Config,
        runner: Arc<dyn CommandRunner>,
        transport: Arc<dyn HttpTransport>,
        verifier: Arc<dyn VerifyBinary>,
        reporter: Reporter,
    ) -> PhpsmithResult<Self> {
        let layout = Layout::from_config(&config);
        let registry =
            VersionRegistry::new(Arc::clone(&transport), &config.registry, layout.cache_file());
        let store = StateStore::load(layout.state_file()).await?;
        let history = History::new(layout.history_file(), config.general.history);

        Ok(Self {
            config,
            layout,
            runner,
            transport,
            verifier,
            registry,
            store,
            history,
            reporter,
        })
    }


    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn registry(&self) -> &VersionRegistry {
        &self.registry
    }

    fn orchestrator(&self) -> BuildOrchestrator {
        BuildOrchestrator::new(
            Arc::clone(&self.runner),
            Arc::clone(&self.transport),
            Arc::clone(&self.verifier),
            self.layout.clone(),
            self.reporter.clone(),
        )
        .with_jobs(self.config.build.jobs)
        .keep_workspace_on_failure(self.config.build.keep_workspace_on_failure)
    }

    fn modules(&self) -> ModuleInstaller {
        let jobs = self
            .config
            .build
            .jobs
            .unwrap_or_else(crate::build::detect_jobs);
        ModuleInstaller::new(
            Arc::clone(&self.runner),
            Arc::clone(&self.transport),
            self.layout.clone(),
            self.config.registry.pecl_url.clone(),
            jobs,
            self.reporter.clone(),
        )
    }

    fn publisher(&self) -> Publisher<'_> {
        Publisher::new(self.runner.as_ref(), &self.layout)
    }

    fn installed(&self, line: &str) -> PhpsmithResult<InstalledVersion> {
        self.store
            .get(line)
            .cloned()
            .ok_or_else(|| PhpsmithError::NotInstalled(line.to_string()))
    }

    /// Installed versions, oldest line first
    pub fn list(&self) -> Vec<InstalledVersion> {
        self.store.list().into_iter().cloned().collect()
    }

    pub fn get(&self, line: &str) -> Option<&InstalledVersion> {
        self.store.get(line)
    }

    /// Latest upstream release per supported line
    pub async fn available_versions(&self, force_refresh: bool) -> PhpsmithResult<VersionCache> {
        self.registry.get_latest_versions(force_refresh).await
    }

    /// Build and install the latest release of a line.
    ///
    /// `extensions` defaults to the configured default set. The first
    /// installed line becomes CLI-bound unless an unmanaged PHP is present.
    pub async fn install(
        &mut self,
        input: &str,
        extensions: Option<Vec<String>>,
    ) -> PhpsmithResult<InstalledVersion> {
        let line = parse_line(input)?;
        if self.store.contains(&line) {
            return Err(PhpsmithError::AlreadyInstalled(line));
        }
        if !self.registry.supports(&line) {
            return Err(PhpsmithError::UnsupportedLine(line));
        }

        let requested = extensions.unwrap_or_else(|| self.config.build.default_extensions.clone());
        let extensions = validate_extensions(requested)?;

        let conflict = self
            .publisher()
            .find_conflict(&self.config.paths.conflict_probe)
            .await;
        if let Some(ref path) = conflict {
            warn!("Unmanaged PHP found at {}", path.display());
            self.reporter.step(&format!(
                "Found an unmanaged PHP at {}. The php command stays unbound until it is removed.",
                path.display()
            ));
        }

        self.ensure_dependencies(&extensions).await?;
        let release = self.registry.resolve(&line, false).await?;
        self.layout.ensure_dirs().await?;

        let cli = self.store.cli_version().is_none()
            && conflict.is_none()
            && self.publisher().generic_conflict().await.is_none();

        let outcome = self
            .orchestrator()
            .build(&BuildRequest {
                release,
                extensions: extensions.clone(),
                cli,
            })
            .await?;
        let committed = self.install_modules(&line, &extensions).await;

        let mut record = InstalledVersion::new(&self.layout, &line, &outcome.version, committed);
        record.install_path = outcome.install_path;
        record.is_cli = cli;
        self.store.add_installed(record.clone()).await?;

        self.history
            .record(
                "install",
                serde_json::json!({
                    "line": line,
                    "version": record.exact_version,
                    "extensions": record.extensions,
                    "cli": cli,
                }),
            )
            .await;
        info!("Installed PHP {}", record.exact_version);
        Ok(record)
    }

    /// Remove a line's prefix, configuration and links
    pub async fn uninstall(&mut self, input: &str) -> PhpsmithResult<InstalledVersion> {
        let line = parse_line(input)?;
        let record = self.installed(&line)?;

        self.publisher().unpublish(&line, record.is_cli).await?;
        remove_tree(self.runner.as_ref(), &record.install_path).await?;
        remove_tree(self.runner.as_ref(), &self.layout.config_dir(&line)).await?;
        let removed = self.store.remove_installed(&line).await?;

        self.history
            .record(
                "uninstall",
                serde_json::json!({ "line": line, "version": removed.exact_version }),
            )
            .await;
        info!("Uninstalled PHP {}", removed.exact_version);
        Ok(removed)
    }

    /// Rebuild a line with its recorded extensions.
    ///
    /// With `upgrade`, builds the registry's latest release instead of the
    /// recorded exact version.
    pub async fn rebuild(&mut self, input: &str, upgrade: bool) -> PhpsmithResult<InstalledVersion> {
        let line = parse_line(input)?;
        let record = self.installed(&line)?;

        let release = if upgrade {
            self.registry.resolve(&line, false).await?
        } else {
            self.registry.release_for(&record.exact_version).await
        };

        self.ensure_dependencies(&record.extensions).await?;
        self.rebuild_with(&record, release, record.extensions.clone())
            .await?;

        let updated = self.installed(&line)?;
        self.history
            .record(
                "rebuild",
                serde_json::json!({
                    "line": line,
                    "from": record.exact_version,
                    "to": updated.exact_version,
                }),
            )
            .await;
        Ok(updated)
    }

    /// Full rebuild, then module reinstall, then one commit
    async fn rebuild_with(
        &mut self,
        record: &InstalledVersion,
        release: ResolvedRelease,
        extensions: BTreeSet<String>,
    ) -> PhpsmithResult<()> {
        let line = &record.major_minor;
        self.layout.ensure_dirs().await?;

        let outcome = self
            .orchestrator()
            .build(&BuildRequest {
                release,
                extensions: extensions.clone(),
                cli: record.is_cli,
            })
            .await?;
        let committed = self.install_modules(line, &extensions).await;
        self.drop_modules(line, record.extensions.difference(&extensions))
            .await;

        self.store
            .record_rebuild(line, &outcome.version, committed)
            .await
    }

    /// Disable modules left out of a rebuilt line; failures only warn
    async fn drop_modules<'a>(&self, line: &str, names: impl Iterator<Item = &'a String>) {
        let installer = self.modules();
        for name in names {
            let Some(ext) = find_extension(name).filter(|e| e.is_alternate_mechanism()) else {
                continue;
            };
            if let Err(e) = installer.remove(line, ext).await {
                warn!("Failed to disable {} on PHP {}: {}", ext.name, line, e);
            }
        }
    }

    /// Install every module of `extensions`; failures are dropped with a warning
    async fn install_modules(&self, line: &str, extensions: &BTreeSet<String>) -> BTreeSet<String> {
        let mut committed = extensions.clone();
        let modules = module_extensions(extensions);
        if modules.is_empty() {
            return committed;
        }

        let installer = self.modules();
        for ext in modules {
            if let Err(e) = installer.install(line, ext).await {
                warn!("Dropping {} from PHP {}: {}", ext.name, line, e);
                self.reporter
                    .step(&format!("Skipped {}: {}", ext.name, e));
                committed.remove(ext.name);
            }
        }
        committed
    }

    /// Bind the generic `php` command to a line
    pub async fn set_cli(&mut self, input: &str) -> PhpsmithResult<()> {
        let line = parse_line(input)?;
        self.installed(&line)?;

        self.publisher().bind_cli(&line).await?;
        self.store.set_cli(&line).await?;

        self.history
            .record("cli.set", serde_json::json!({ "line": line }))
            .await;
        Ok(())
    }

    pub async fn add_extensions(
        &mut self,
        input: &str,
        names: &[String],
    ) -> PhpsmithResult<InstalledVersion> {
        let line = parse_line(input)?;
        let mut proposed = self.installed(&line)?.extensions;
        proposed.extend(validate_extensions(names)?);
        self.update_extensions(&line, proposed).await
    }

    pub async fn remove_extensions(
        &mut self,
        input: &str,
        names: &[String],
    ) -> PhpsmithResult<InstalledVersion> {
        let line = parse_line(input)?;
        let mut proposed = self.installed(&line)?.extensions;
        for name in validate_extensions(names)? {
            proposed.remove(&name);
        }
        self.update_extensions(&line, proposed).await
    }

    /// Replace a line's extension set.
    ///
    /// Changes to configure-flag extensions rebuild the line; module-only
    /// changes build or remove modules against the existing install. The
    /// store is only updated after every step succeeded.
    pub async fn update_extensions(
        &mut self,
        input: &str,
        proposed: BTreeSet<String>,
    ) -> PhpsmithResult<InstalledVersion> {
        let line = parse_line(input)?;
        let record = self.installed(&line)?;
        let proposed = validate_extensions(proposed)?;
        let current = record.extensions.clone();

        if proposed == current {
            debug!("Extension set of PHP {} unchanged", line);
            return Ok(record);
        }

        let added: BTreeSet<String> = proposed.difference(&current).cloned().collect();
        let removed: BTreeSet<String> = current.difference(&proposed).cloned().collect();

        if !added.is_empty() {
            self.ensure_dependencies(&added).await?;
        }

        if requires_rebuild(&current, &proposed) {
            self.reporter
                .step(&format!("Rebuilding PHP {} with the new extension set", line));
            let release = self.registry.release_for(&record.exact_version).await;
            self.rebuild_with(&record, release, proposed).await?;
        } else {
            self.swap_modules(&line, &added, &removed).await?;
            self.store.update_extensions(&line, proposed).await?;
        }

        let updated = self.installed(&line)?;
        self.history
            .record(
                "extensions.update",
                serde_json::json!({
                    "line": line,
                    "added": added,
                    "removed": removed,
                    "extensions": updated.extensions,
                }),
            )
            .await;
        Ok(updated)
    }

    /// Module-only change: add first, undo the additions if one fails
    async fn swap_modules(
        &self,
        line: &str,
        added: &BTreeSet<String>,
        removed: &BTreeSet<String>,
    ) -> PhpsmithResult<()> {
        let installer = self.modules();
        let mut done = Vec::new();

        for ext in module_extensions(added) {
            if let Err(e) = installer.install(line, ext).await {
                for undo in done {
                    if let Err(undo_err) = installer.remove(line, undo).await {
                        warn!("Failed to undo {}: {}", undo.name, undo_err);
                    }
                }
                return Err(e);
            }
            done.push(ext);
        }

        for name in removed {
            if let Some(ext) = find_extension(name).filter(|e| e.is_alternate_mechanism()) {
                installer.remove(line, ext).await?;
            }
        }
        Ok(())
    }

    /// Install system packages for `extensions` when enabled.
    ///
    /// Detection failures are fatal; package manager failures only warn
    /// unless `deps.fail_on_error` is set.
    async fn ensure_dependencies(&self, extensions: &BTreeSet<String>) -> PhpsmithResult<()> {
        if !self.config.deps.auto_install {
            debug!("Skipping system dependency installation");
            return Ok(());
        }

        let reporter = self.reporter.clone().quiet(self.config.deps.quiet);
        let resolver = DependencyResolver::detect(Arc::clone(&self.runner), reporter).await?;
        match resolver.install_extension_dependencies(extensions).await {
            Ok(packages) => {
                debug!("Requested {} system packages", packages.len());
                Ok(())
            }
            Err(e) if self.config.deps.fail_on_error => Err(e),
            Err(e) => {
                warn!("{}", e);
                self.reporter
                    .step("System package installation failed, continuing with the build");
                Ok(())
            }
        }
    }

    /// Probe this host for the build prerequisites and extension dependencies
    pub async fn check_dependencies(
        &self,
        extensions: Option<Vec<String>>,
    ) -> PhpsmithResult<DependencyReport> {
        let requested = extensions.unwrap_or_else(|| self.config.build.default_extensions.clone());
        let extensions = validate_extensions(requested)?;

        let resolver =
            DependencyResolver::detect(Arc::clone(&self.runner), Reporter::silent()).await?;
        Ok(DependencyReport {
            manager: resolver.manager(),
            distro: resolver.distro().clone(),
            missing_prerequisites: resolver.check_build_prerequisites().await,
            missing_extensions: resolver.check_system_dependencies(&extensions).await,
        })
    }

    /// Compare installed versions with upstream and flag the ones behind
    pub async fn refresh_outdated(
        &mut self,
        force_refresh: bool,
    ) -> PhpsmithResult<Vec<OutdatedVersion>> {
        let cache = self.registry.get_latest_versions(force_refresh).await?;
        let mut outdated = Vec::new();

        for record in self.list() {
            let Some(latest) = cache.latest(&record.major_minor) else {
                continue;
            };
            let behind = compare_versions(&record.exact_version, latest) == Ordering::Less;
            if behind != record.needs_rebuild {
                self.store
                    .set_needs_rebuild(&record.major_minor, behind)
                    .await?;
            }
            if behind {
                outdated.push(OutdatedVersion {
                    line: record.major_minor.clone(),
                    installed: record.exact_version.clone(),
                    latest: latest.to_string(),
                });
            }
        }
        Ok(outdated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::FakeTransport;
    use crate::test_support::{build_host, ContentVerifier, FakeRunner};
    use sha2::{Digest, Sha256};
    use tempfile::TempDir;

    const INDEX: &str = "https://www.php.net/releases/index.php";

    struct Fixture {
        temp: TempDir,
        config: Config,
        transport: Arc<FakeTransport>,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let mut config = Config::default();
            config.paths.root = temp.path().join("root");
            config.paths.system_bin_dir = temp.path().join("sysbin");
            config.paths.conflict_probe = vec![temp.path().join("usr-bin-php")];
            config.registry.lines = vec!["8.2".to_string(), "8.3".to_string()];
            config.deps.auto_install = false;
            config.build.jobs = Some(2);
            std::fs::create_dir_all(&config.paths.system_bin_dir).unwrap();

            let fixture = Self {
                temp,
                config,
                transport: Arc::new(
                    FakeTransport::default()
                        .with_file("https://pecl.php.net/get/redis", b"redis")
                        .with_file("https://pecl.php.net/get/apcu", b"apcu"),
                ),
            };
            fixture.release("8.2.24");
            fixture.release("8.3.12");
            fixture
        }

        /// Publish `version` as the latest of its line
        fn release(&self, version: &str) {
            let line = crate::registry::line_of(version).unwrap();
            let tarball = format!("php-{} source", version);
            let sha = hex::encode(Sha256::digest(tarball.as_bytes()));
            let body = serde_json::json!({
                "version": version,
                "source": [
                    {"filename": format!("php-{version}.tar.bz2"), "sha256": "unused"},
                    {"filename": format!("php-{version}.tar.gz"), "sha256": sha},
                ],
            });
            self.transport
                .texts
                .lock()
                .unwrap()
                .insert(format!("{INDEX}?json&version={line}"), body.to_string());
            self.transport.files.lock().unwrap().insert(
                format!("https://www.php.net/distributions/php-{version}.tar.gz"),
                tarball.into_bytes(),
            );
        }

        async fn manager(&self, runner: FakeRunner) -> VersionManager {
            VersionManager::with_parts(
                self.config.clone(),
                Arc::new(runner),
                self.transport.clone(),
                Arc::new(ContentVerifier),
                Reporter::silent(),
            )
            .await
            .unwrap()
        }

        fn layout(&self) -> Layout {
            Layout::from_config(&self.config)
        }
    }

    fn defaults() -> BTreeSet<String> {
        crate::deps::DEFAULT_EXTENSIONS
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn install_with_empty_cache_end_to_end() {
        let f = Fixture::new();
        let mut manager = f.manager(build_host(None)).await;

        let record = manager.install("8.3", None).await.unwrap();

        assert_eq!(record.major_minor, "8.3");
        assert_eq!(record.exact_version, "8.3.12");
        assert_eq!(record.extensions, defaults());
        assert!(record.is_cli);

        let layout = f.layout();
        let cache: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(layout.cache_file()).unwrap()).unwrap();
        assert_eq!(cache["latestByLine"]["8.3"], "8.3.12");
        assert!(cache["downloadURLByVersion"]["8.3.12"]
            .as_str()
            .unwrap()
            .ends_with("/php-8.3.12.tar.gz"));

        let logs: Vec<_> = std::fs::read_dir(layout.logs_dir()).unwrap().collect();
        assert!(logs.is_empty());
        assert!(layout.install_prefix("8.3").join("bin").join("php").exists());
        assert_eq!(
            std::fs::read_link(layout.generic_binary()).unwrap(),
            layout.managed_binary("8.3")
        );

        let reloaded = StateStore::load(layout.state_file()).await.unwrap();
        assert_eq!(reloaded.get("8.3"), Some(&record));
    }

    #[tokio::test]
    async fn installing_twice_touches_nothing() {
        let f = Fixture::new();
        let mut manager = f.manager(build_host(None)).await;
        manager.install("8.3", None).await.unwrap();

        let requests = f.transport.request_count();
        let state = std::fs::read_to_string(f.layout().state_file()).unwrap();
        let history = std::fs::read_to_string(f.layout().history_file()).unwrap();

        let err = manager.install("8.3", None).await.unwrap_err();

        assert!(matches!(err, PhpsmithError::AlreadyInstalled(ref l) if l == "8.3"));
        assert_eq!(f.transport.request_count(), requests);
        assert_eq!(std::fs::read_to_string(f.layout().state_file()).unwrap(), state);
        assert_eq!(
            std::fs::read_to_string(f.layout().history_file()).unwrap(),
            history
        );
    }

    #[tokio::test]
    async fn failed_extension_rebuild_rolls_back() {
        let f = Fixture::new();
        f.manager(build_host(None))
            .await
            .install("8.3", None)
            .await
            .unwrap();
        let binary = f.layout().install_prefix("8.3").join("bin").join("php");
        let before = std::fs::read_to_string(&binary).unwrap();

        let mut failing = f.manager(build_host(Some("make -j"))).await;
        let err = failing
            .add_extensions("8.3", &names(&["intl", "gd"]))
            .await
            .unwrap_err();

        assert!(matches!(err, PhpsmithError::BuildFailed { ref step, .. } if step == "compilation"));
        assert!(err.log_path().unwrap().exists());
        assert_eq!(failing.get("8.3").unwrap().extensions, defaults());
        assert_eq!(std::fs::read_to_string(&binary).unwrap(), before);

        let reloaded = StateStore::load(f.layout().state_file()).await.unwrap();
        assert_eq!(reloaded.get("8.3").unwrap().extensions, defaults());
    }

    #[tokio::test]
    async fn module_only_change_skips_core_rebuild() {
        let f = Fixture::new();
        f.manager(build_host(None))
            .await
            .install("8.3", None)
            .await
            .unwrap();

        let runner = Arc::new(build_host(None));
        let mut manager = VersionManager::with_parts(
            f.config.clone(),
            runner.clone(),
            f.transport.clone(),
            Arc::new(ContentVerifier),
            Reporter::silent(),
        )
        .await
        .unwrap();

        let record = manager.add_extensions("8.3", &names(&["redis"])).await.unwrap();

        assert!(record.extensions.contains("redis"));
        assert!(f.layout().module_ini("8.3", "redis").exists());
        assert!(!runner
            .commands()
            .iter()
            .any(|c| c.contains("INSTALL_ROOT=")));

        let record = manager
            .remove_extensions("8.3", &names(&["redis"]))
            .await
            .unwrap();
        assert!(!record.extensions.contains("redis"));
        assert!(!f.layout().module_ini("8.3", "redis").exists());
    }

    #[tokio::test]
    async fn rebuild_forcing_change_disables_removed_module() {
        let f = Fixture::new();
        let mut extensions = defaults();
        extensions.insert("redis".to_string());
        let mut manager = f.manager(build_host(None)).await;
        manager
            .install("8.3", Some(extensions.iter().cloned().collect()))
            .await
            .unwrap();
        assert!(f.layout().module_ini("8.3", "redis").exists());

        extensions.remove("redis");
        extensions.insert("gd".to_string());
        let record = manager.update_extensions("8.3", extensions).await.unwrap();

        assert!(record.extensions.contains("gd"));
        assert!(!record.extensions.contains("redis"));
        assert!(!f.layout().module_ini("8.3", "redis").exists());
    }

    #[tokio::test]
    async fn failed_publication_keeps_previous_install() {
        let f = Fixture::new();
        f.manager(build_host(None))
            .await
            .install("8.3", None)
            .await
            .unwrap();
        let layout = f.layout();
        let prefix = layout.install_prefix("8.3");
        std::fs::write(prefix.join("MARKER"), "8.3.12").unwrap();
        std::fs::remove_file(layout.published_binary("8.3")).unwrap();
        std::fs::create_dir_all(layout.published_binary("8.3")).unwrap();

        let mut manager = f.manager(build_host(None)).await;
        let err = manager
            .add_extensions("8.3", &names(&["gd"]))
            .await
            .unwrap_err();

        assert!(matches!(err, PhpsmithError::BuildFailed { ref step, .. } if step == "symlink publication"));
        assert!(!manager.get("8.3").unwrap().extensions.contains("gd"));
        assert_eq!(std::fs::read_to_string(prefix.join("MARKER")).unwrap(), "8.3.12");
        assert!(prefix.join("bin").join("php").exists());
    }

    #[tokio::test]
    async fn failed_module_leaves_extensions_unchanged() {
        let f = Fixture::new();
        f.manager(build_host(None))
            .await
            .install("8.3", None)
            .await
            .unwrap();

        let mut manager = f.manager(build_host(Some("make -j"))).await;
        let err = manager
            .add_extensions("8.3", &names(&["apcu"]))
            .await
            .unwrap_err();

        assert!(matches!(err, PhpsmithError::ModuleFailed { .. }));
        assert_eq!(manager.get("8.3").unwrap().extensions, defaults());
    }

    #[tokio::test]
    async fn cli_binding_moves_between_lines() {
        let f = Fixture::new();
        let mut manager = f.manager(build_host(None)).await;
        manager.install("8.2", None).await.unwrap();
        let second = manager.install("8.3", None).await.unwrap();
        assert!(!second.is_cli);

        manager.set_cli("8.3").await.unwrap();

        let bound: Vec<_> = manager.list().into_iter().filter(|r| r.is_cli).collect();
        assert_eq!(bound.len(), 1);
        assert_eq!(bound[0].major_minor, "8.3");
        assert_eq!(
            std::fs::read_link(f.layout().generic_binary()).unwrap(),
            f.layout().managed_binary("8.3")
        );
    }

    #[tokio::test]
    async fn unmanaged_php_blocks_cli_binding() {
        let f = Fixture::new();
        std::fs::write(f.temp.path().join("usr-bin-php"), "system php").unwrap();
        let mut manager = f.manager(build_host(None)).await;

        let record = manager.install("8.3", None).await.unwrap();
        assert!(!record.is_cli);

        std::fs::write(f.layout().generic_binary(), "system php").unwrap();
        let err = manager.set_cli("8.3").await.unwrap_err();
        assert!(matches!(err, PhpsmithError::CliConflict(_)));
        assert!(manager.get("8.3").map(|r| !r.is_cli).unwrap());
    }

    #[tokio::test]
    async fn uninstall_removes_prefix_and_links() {
        let f = Fixture::new();
        let mut manager = f.manager(build_host(None)).await;
        manager.install("8.3", None).await.unwrap();
        let layout = f.layout();

        let removed = manager.uninstall("8.3").await.unwrap();

        assert_eq!(removed.exact_version, "8.3.12");
        assert!(manager.list().is_empty());
        assert!(!layout.install_prefix("8.3").exists());
        assert!(!layout.config_dir("8.3").exists());
        assert!(std::fs::symlink_metadata(layout.generic_binary()).is_err());
        assert!(std::fs::symlink_metadata(layout.managed_binary("8.3")).is_err());
        assert!(matches!(
            manager.uninstall("8.3").await.unwrap_err(),
            PhpsmithError::NotInstalled(_)
        ));
    }

    #[tokio::test]
    async fn outdated_lines_are_flagged_and_upgraded() {
        let f = Fixture::new();
        f.release("8.3.11");
        let mut manager = f.manager(build_host(None)).await;
        manager.install("8.3", None).await.unwrap();
        assert!(manager.refresh_outdated(false).await.unwrap().is_empty());

        f.release("8.3.12");
        let outdated = manager.refresh_outdated(true).await.unwrap();
        assert_eq!(
            outdated,
            vec![OutdatedVersion {
                line: "8.3".to_string(),
                installed: "8.3.11".to_string(),
                latest: "8.3.12".to_string(),
            }]
        );
        assert!(manager.get("8.3").unwrap().needs_rebuild);

        let record = manager.rebuild("8.3", true).await.unwrap();
        assert_eq!(record.exact_version, "8.3.12");
        assert!(!record.needs_rebuild);
        let binary = f.layout().install_prefix("8.3").join("bin").join("php");
        assert!(std::fs::read_to_string(binary).unwrap().contains("8.3.12"));
    }

    #[tokio::test]
    async fn unknown_extension_is_rejected_before_any_work() {
        let f = Fixture::new();
        let mut manager = f.manager(build_host(None)).await;

        let err = manager
            .install("8.3", Some(names(&["mbstring", "nope"])))
            .await
            .unwrap_err();

        assert!(matches!(err, PhpsmithError::UnknownExtension(_)));
        assert_eq!(f.transport.request_count(), 0);
    }

    #[tokio::test]
    async fn unsupported_line_is_rejected() {
        let f = Fixture::new();
        let mut manager = f.manager(build_host(None)).await;
        let err = manager.install("7.4", None).await.unwrap_err();
        assert!(matches!(err, PhpsmithError::UnsupportedLine(_)));
    }
}
