//! Dependency resolution and installation
//!
//! Turns a set of extensions into system packages for the bound package
//! manager, installs them in one invocation, and probes whether each
//! dependency is already available.
//!
//! Availability is best-effort. A dependency counts as present when any of
//! these succeeds:
//! 1. the package manager reports every registered package installed
//! 2. a probe command resolves on the search path
//! 3. a probe library exists under one of `LIBRARY_DIRS`
//! 4. a pkg-config name resolves

use crate::deps::catalog::{find_dependency, DependencyConfig, BASE_DEPENDENCIES, LIBRARY_DIRS};
use crate::deps::extensions::find_extension;
use crate::error::{PhpsmithError, PhpsmithResult};
use crate::report::Reporter;
use crate::system::process::{command_exists, CommandRunner, Invocation};
use crate::system::{DistroDetector, Distribution, PackageManager};
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Logical dependencies of an extension set, base build prerequisites included
pub fn logical_dependencies<I, S>(extensions: I) -> BTreeSet<&'static str>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut deps: BTreeSet<&'static str> = BASE_DEPENDENCIES.iter().copied().collect();
    for name in extensions {
        match find_extension(name.as_ref()) {
            Some(ext) => deps.extend(ext.dependencies.iter().copied()),
            None => debug!("No catalog entry for extension {}", name.as_ref()),
        }
    }
    deps
}

/// Deduplicated, sorted system packages for an extension set.
/// The result does not depend on input order.
pub fn resolve_packages<I, S>(manager: PackageManager, extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    logical_dependencies(extensions)
        .into_iter()
        .filter_map(find_dependency)
        .flat_map(|dep| dep.packages.for_manager(manager).iter())
        .map(|pkg| pkg.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Resolver bound to one host's package manager
pub struct DependencyResolver {
    runner: Arc<dyn CommandRunner>,
    manager: PackageManager,
    distro: Distribution,
    library_dirs: Vec<PathBuf>,
    reporter: Reporter,
}

impl DependencyResolver {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        manager: PackageManager,
        distro: Distribution,
        reporter: Reporter,
    ) -> Self {
        Self {
            runner,
            manager,
            distro,
            library_dirs: LIBRARY_DIRS.iter().map(PathBuf::from).collect(),
            reporter,
        }
    }

    /// Detect the distribution and package manager of this host
    pub async fn detect(runner: Arc<dyn CommandRunner>, reporter: Reporter) -> PhpsmithResult<Self> {
        let distro = DistroDetector::new().detect(runner.as_ref()).await?;
        let manager = PackageManager::detect(runner.as_ref()).await?;
        debug!("Resolver bound to {} on {}", manager, distro.id);
        Ok(Self::new(runner, manager, distro, reporter))
    }

    /// Search these directories for probe libraries instead of the defaults
    pub fn with_library_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.library_dirs = dirs;
        self
    }

    pub fn manager(&self) -> PackageManager {
        self.manager
    }

    pub fn distro(&self) -> &Distribution {
        &self.distro
    }

    /// Install the system packages needed by `extensions` in one invocation.
    ///
    /// Returns the package list that was requested.
    pub async fn install_extension_dependencies(
        &self,
        extensions: &BTreeSet<String>,
    ) -> PhpsmithResult<Vec<String>> {
        let packages = resolve_packages(self.manager, extensions);
        if packages.is_empty() {
            return Ok(packages);
        }

        if let Some(refresh) = self.manager.refresh_invocation() {
            self.reporter
                .step(&format!("Refreshing {} package index", self.manager));
            match self.runner.run(&refresh).await {
                Ok(out) if out.success() => {}
                Ok(out) => warn!(
                    "{} exited with {}, continuing",
                    refresh.display(),
                    out.exit_code()
                ),
                Err(e) => warn!("{} failed: {}, continuing", refresh.display(), e),
            }
        }

        self.reporter.step(&format!(
            "Installing {} system packages via {}",
            packages.len(),
            self.manager
        ));

        let install = self.manager.install_invocation(&packages);
        let output = self.runner.run(&install).await?;
        if !output.success() {
            return Err(PhpsmithError::DependencyInstall {
                manager: self.manager.to_string(),
                output: output.combined().trim().to_string(),
            });
        }

        Ok(packages)
    }

    /// Extensions whose dependencies could not be found on the host.
    ///
    /// Extensions without a catalog entry are not reported.
    pub async fn check_system_dependencies(&self, extensions: &BTreeSet<String>) -> Vec<String> {
        let mut verdicts: HashMap<&'static str, bool> = HashMap::new();
        let mut missing = Vec::new();

        for name in extensions {
            let Some(ext) = find_extension(name) else {
                continue;
            };

            let mut satisfied = true;
            for dep_name in ext.dependencies {
                let Some(dep) = find_dependency(dep_name) else {
                    continue;
                };
                let present = match verdicts.get(dep.name) {
                    Some(&present) => present,
                    None => {
                        let present = self.is_available(dep).await;
                        verdicts.insert(dep.name, present);
                        present
                    }
                };
                if !present {
                    debug!("{} needs {}, which was not found", name, dep.name);
                    satisfied = false;
                }
            }

            if !satisfied {
                missing.push(name.clone());
            }
        }

        missing
    }

    /// Base build prerequisites that could not be found
    pub async fn check_build_prerequisites(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        for name in BASE_DEPENDENCIES {
            if let Some(dep) = find_dependency(name) {
                if !self.is_available(dep).await {
                    missing.push(dep.name);
                }
            }
        }
        missing
    }

    /// Layered availability probe for one dependency
    pub async fn is_available(&self, dep: &DependencyConfig) -> bool {
        if self.packages_installed(dep).await {
            return true;
        }

        for command in dep.probe_commands {
            if command_exists(self.runner.as_ref(), command).await {
                return true;
            }
        }

        if self.library_present(dep).await {
            return true;
        }

        for name in dep.pkg_config {
            let probe = Invocation::new("pkg-config")
                .arg("--exists")
                .arg(*name)
                .timeout(PROBE_TIMEOUT);
            if let Ok(out) = self.runner.run(&probe).await {
                if out.success() {
                    return true;
                }
            }
        }

        false
    }

    async fn packages_installed(&self, dep: &DependencyConfig) -> bool {
        let packages = dep.packages.for_manager(self.manager);
        if packages.is_empty() {
            return false;
        }

        for package in packages {
            let query = self.manager.query_invocation(package).timeout(PROBE_TIMEOUT);
            let installed = match self.runner.run(&query).await {
                // dpkg keeps records of removed packages
                Ok(out) if self.manager == PackageManager::Apt => {
                    out.success() && out.stdout.contains("install ok installed")
                }
                Ok(out) => out.success(),
                Err(_) => false,
            };
            if !installed {
                return false;
            }
        }
        true
    }

    async fn library_present(&self, dep: &DependencyConfig) -> bool {
        if dep.probe_libraries.is_empty() {
            return false;
        }

        for dir in &self.library_dirs {
            let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
                continue;
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let file_name = entry.file_name();
                let file_name = file_name.to_string_lossy();
                if dep
                    .probe_libraries
                    .iter()
                    .any(|lib| file_name.starts_with(lib))
                {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fail, ok, ok_with, FakeRunner};
    use tempfile::TempDir;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn resolver(runner: Arc<FakeRunner>, manager: PackageManager) -> DependencyResolver {
        DependencyResolver::new(runner, manager, Distribution::unknown(), Reporter::silent())
            .with_library_dirs(vec![])
    }

    #[test]
    fn resolution_is_order_independent_and_deduplicated() {
        let a = resolve_packages(PackageManager::Apt, ["pgsql", "gd", "pdo_pgsql", "curl"]);
        let b = resolve_packages(PackageManager::Apt, ["curl", "pdo_pgsql", "gd", "pgsql"]);
        assert_eq!(a, b);

        let unique: BTreeSet<_> = a.iter().collect();
        assert_eq!(unique.len(), a.len());
        assert_eq!(a.iter().filter(|p| *p == "libpq-dev").count(), 1);
    }

    #[test]
    fn base_packages_always_included() {
        let packages = resolve_packages(PackageManager::Dnf, Vec::<String>::new());
        assert!(packages.contains(&"libxml2-devel".to_string()));
        assert!(packages.contains(&"gcc".to_string()));
    }

    #[test]
    fn extensions_without_dependencies_are_skipped() {
        let plain = resolve_packages(PackageManager::Apk, ["bcmath", "sockets", "unknown"]);
        let base = resolve_packages(PackageManager::Apk, Vec::<String>::new());
        assert_eq!(plain, base);
    }

    #[tokio::test]
    async fn installs_with_single_invocation() {
        let runner = Arc::new(FakeRunner::succeeding());
        let resolver = resolver(Arc::clone(&runner), PackageManager::Dnf);

        let packages = resolver
            .install_extension_dependencies(&set(&["intl", "zip"]))
            .await
            .unwrap();

        let calls = runner.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "dnf");
        assert!(calls[0].args.ends_with(&packages));
        assert!(packages.contains(&"libicu-devel".to_string()));
    }

    #[tokio::test]
    async fn apt_refreshes_before_install() {
        let runner = Arc::new(FakeRunner::succeeding());
        let resolver = resolver(Arc::clone(&runner), PackageManager::Apt);

        resolver
            .install_extension_dependencies(&set(&["curl"]))
            .await
            .unwrap();

        let commands = runner.commands();
        assert_eq!(commands[0], "apt-get update");
        assert!(commands[1].starts_with("apt-get install -y"));
    }

    #[tokio::test]
    async fn install_failure_carries_output() {
        let runner = Arc::new(FakeRunner::new(|inv| {
            if inv.program == "pacman" {
                fail(1, "error: target not found: libfoo")
            } else {
                ok()
            }
        }));
        let resolver = resolver(runner, PackageManager::Pacman);

        let err = resolver
            .install_extension_dependencies(&set(&["gmp"]))
            .await
            .unwrap_err();
        match err {
            PhpsmithError::DependencyInstall { manager, output } => {
                assert_eq!(manager, "pacman");
                assert!(output.contains("target not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn package_query_satisfies_dependency() {
        let runner = Arc::new(FakeRunner::new(|inv| {
            if inv.program == "dpkg" {
                ok_with("Package: libgmp-dev\nStatus: install ok installed\n")
            } else {
                fail(1, "")
            }
        }));
        let resolver = resolver(runner, PackageManager::Apt);

        let missing = resolver.check_system_dependencies(&set(&["gmp"])).await;
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn removed_apt_package_is_not_installed() {
        let runner = Arc::new(FakeRunner::new(|inv| match inv.program.as_str() {
            "dpkg" => ok_with("Status: deinstall ok config-files\n"),
            _ => fail(1, ""),
        }));
        let resolver = resolver(runner, PackageManager::Apt);

        let missing = resolver.check_system_dependencies(&set(&["gmp"])).await;
        assert_eq!(missing, vec!["gmp"]);
    }

    #[tokio::test]
    async fn pkg_config_fallback_satisfies_dependency() {
        let runner = Arc::new(FakeRunner::new(|inv| {
            if inv.program == "pkg-config" && inv.args.contains(&"libzip".to_string()) {
                ok()
            } else {
                fail(1, "")
            }
        }));
        let resolver = resolver(runner, PackageManager::Dnf);

        let missing = resolver
            .check_system_dependencies(&set(&["zip", "sodium"]))
            .await;
        assert_eq!(missing, vec!["sodium"]);
    }

    #[tokio::test]
    async fn probe_command_satisfies_dependency() {
        let runner = Arc::new(FakeRunner::new(|inv| {
            if inv.program == "which" && inv.args[0] == "curl-config" {
                ok()
            } else {
                fail(1, "")
            }
        }));
        let resolver = resolver(runner, PackageManager::Zypper);

        assert!(resolver
            .check_system_dependencies(&set(&["curl"]))
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn library_file_satisfies_dependency() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("libsodium.so.23"), "").unwrap();
        let runner = Arc::new(FakeRunner::new(|_| fail(1, "")));
        let resolver = resolver(runner, PackageManager::Apk)
            .with_library_dirs(vec![temp.path().to_path_buf()]);

        let missing = resolver
            .check_system_dependencies(&set(&["sodium", "bcmath"]))
            .await;
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn shared_dependency_probed_once() {
        let runner = Arc::new(FakeRunner::new(|_| fail(1, "")));
        let resolver = resolver(Arc::clone(&runner), PackageManager::Dnf);

        let missing = resolver
            .check_system_dependencies(&set(&["pgsql", "pdo_pgsql"]))
            .await;
        assert_eq!(missing, vec!["pdo_pgsql", "pgsql"]);

        let pg_config_probes = runner
            .commands()
            .iter()
            .filter(|c| c.as_str() == "which pg_config")
            .count();
        assert_eq!(pg_config_probes, 1);
    }
}
