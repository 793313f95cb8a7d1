//! Package-manager profiles and detection
//!
//! Static table mapping each supported system package manager to its
//! install and query invocations. Detection binds to the first manager
//! found on the search path, in table order.

use crate::error::{PhpsmithError, PhpsmithResult};
use crate::system::process::{command_exists, CommandRunner, Invocation, Privilege};
use std::fmt;
use tracing::debug;

/// Supported system package managers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PackageManager {
    Apt,
    Dnf,
    Yum,
    Pacman,
    Zypper,
    Apk,
    Brew,
}

/// Install/query invocation profile of one package manager
#[derive(Debug, Clone, Copy)]
pub struct ManagerProfile {
    pub manager: PackageManager,
    /// Executable probed on the search path
    pub executable: &'static str,
    /// Arguments preceding the package list on install
    pub install_args: &'static [&'static str],
    /// Optional index refresh run before installing
    pub refresh_args: Option<&'static [&'static str]>,
    /// Executable reporting whether one package is installed
    pub query_program: &'static str,
    /// Arguments preceding the package name on query
    pub query_args: &'static [&'static str],
    /// Whether installing requires root
    pub needs_root: bool,
}

/// Profiles in detection priority order
pub const PROFILES: &[ManagerProfile] = &[
    ManagerProfile {
        manager: PackageManager::Apt,
        executable: "apt-get",
        install_args: &["install", "-y", "--no-install-recommends"],
        refresh_args: Some(&["update"]),
        query_program: "dpkg",
        query_args: &["-s"],
        needs_root: true,
    },
    ManagerProfile {
        manager: PackageManager::Dnf,
        executable: "dnf",
        install_args: &["install", "-y"],
        refresh_args: None,
        query_program: "rpm",
        query_args: &["-q"],
        needs_root: true,
    },
    ManagerProfile {
        manager: PackageManager::Yum,
        executable: "yum",
        install_args: &["install", "-y"],
        refresh_args: None,
        query_program: "rpm",
        query_args: &["-q"],
        needs_root: true,
    },
    ManagerProfile {
        manager: PackageManager::Pacman,
        executable: "pacman",
        install_args: &["-S", "--noconfirm", "--needed"],
        refresh_args: None,
        query_program: "pacman",
        query_args: &["-Q"],
        needs_root: true,
    },
    ManagerProfile {
        manager: PackageManager::Zypper,
        executable: "zypper",
        install_args: &["--non-interactive", "install"],
        refresh_args: None,
        query_program: "rpm",
        query_args: &["-q"],
        needs_root: true,
    },
    ManagerProfile {
        manager: PackageManager::Apk,
        executable: "apk",
        install_args: &["add", "--no-cache"],
        refresh_args: None,
        query_program: "apk",
        query_args: &["info", "-e"],
        needs_root: true,
    },
    ManagerProfile {
        manager: PackageManager::Brew,
        executable: "brew",
        install_args: &["install"],
        refresh_args: None,
        query_program: "brew",
        query_args: &["list", "--versions"],
        needs_root: false,
    },
];

impl PackageManager {
    /// Profile of this manager
    pub fn profile(&self) -> &'static ManagerProfile {
        PROFILES
            .iter()
            .find(|p| p.manager == *self)
            .unwrap_or(&PROFILES[0])
    }

    /// Name of the executable
    pub fn name(&self) -> &'static str {
        self.profile().executable
    }

    fn install_privilege(&self) -> Privilege {
        if self.profile().needs_root {
            Privilege::Elevated
        } else {
            Privilege::User
        }
    }

    /// Optional index refresh run before installing
    pub fn refresh_invocation(&self) -> Option<Invocation> {
        let profile = self.profile();
        profile.refresh_args.map(|args| {
            Invocation::new(profile.executable)
                .args(args.iter().copied())
                .privilege(self.install_privilege())
        })
    }

    /// One install invocation for the full package list
    pub fn install_invocation(&self, packages: &[String]) -> Invocation {
        let profile = self.profile();
        Invocation::new(profile.executable)
            .args(profile.install_args.iter().copied())
            .args(packages.iter().cloned())
            .privilege(self.install_privilege())
    }

    /// Query whether one package is installed
    pub fn query_invocation(&self, package: &str) -> Invocation {
        let profile = self.profile();
        Invocation::new(profile.query_program)
            .args(profile.query_args.iter().copied())
            .arg(package)
    }

    /// Bind to the first manager found on the search path
    pub async fn detect(runner: &dyn CommandRunner) -> PhpsmithResult<Self> {
        for profile in PROFILES {
            if command_exists(runner, profile.executable).await {
                debug!("Detected package manager: {}", profile.executable);
                return Ok(profile.manager);
            }
        }

        Err(PhpsmithError::PackageManagerNotFound {
            supported: PROFILES
                .iter()
                .map(|p| p.executable)
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::process::CommandOutput;
    use async_trait::async_trait;

    /// Answers `which <name>` successfully only for the listed names
    struct PathRunner(Vec<&'static str>);

    #[async_trait]
    impl CommandRunner for PathRunner {
        async fn run(&self, invocation: &Invocation) -> PhpsmithResult<CommandOutput> {
            let found = invocation.program == "which"
                && self.0.contains(&invocation.args[0].as_str());
            Ok(CommandOutput {
                code: Some(if found { 0 } else { 1 }),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn detect_follows_table_order() {
        let runner = PathRunner(vec!["yum", "dnf"]);
        let manager = PackageManager::detect(&runner).await.unwrap();
        assert_eq!(manager, PackageManager::Dnf);
    }

    #[tokio::test]
    async fn detect_fails_when_none_found() {
        let runner = PathRunner(vec![]);
        let err = PackageManager::detect(&runner).await.unwrap_err();
        match err {
            PhpsmithError::PackageManagerNotFound { supported } => {
                assert!(supported.starts_with("apt-get, dnf"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn install_invocation_appends_packages() {
        let inv = PackageManager::Pacman.install_invocation(&["gmp".to_string()]);
        assert_eq!(inv.display(), "pacman -S --noconfirm --needed gmp");
        assert_eq!(inv.privilege, Privilege::Elevated);

        let inv = PackageManager::Brew.install_invocation(&["icu4c".to_string()]);
        assert_eq!(inv.privilege, Privilege::User);
    }

    #[test]
    fn only_apt_refreshes() {
        assert!(PackageManager::Apt.refresh_invocation().is_some());
        assert!(PackageManager::Dnf.refresh_invocation().is_none());
    }

    #[test]
    fn query_uses_package_database() {
        assert_eq!(
            PackageManager::Apt.query_invocation("libxml2-dev").display(),
            "dpkg -s libxml2-dev"
        );
        assert_eq!(
            PackageManager::Zypper.query_invocation("libxml2-devel").display(),
            "rpm -q libxml2-devel"
        );
    }
}
