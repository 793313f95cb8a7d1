//! Binary discovery after install
//!
//! The installed binary's location has moved between upstream releases, so
//! discovery walks an ordered list of candidate generators and accepts the
//! first candidate that passes verification.

use crate::build::session::BuildLog;
use crate::system::process::{CommandRunner, Invocation};
use async_trait::async_trait;
use std::collections::HashSet;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const SEARCH_DEPTH: usize = 6;
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Produces candidate binary paths under an install prefix
pub type CandidateGenerator = fn(prefix: &Path, line: &str) -> Vec<PathBuf>;

/// Generators in priority order
pub const GENERATORS: &[(&str, CandidateGenerator)] = &[
    ("conventional", conventional),
    ("alternate", alternates),
    ("search", search),
];

fn conventional(prefix: &Path, _line: &str) -> Vec<PathBuf> {
    vec![prefix.join("bin").join("php")]
}

fn alternates(prefix: &Path, line: &str) -> Vec<PathBuf> {
    vec![
        prefix.join("bin").join(format!("php{}", line)),
        prefix.join("sbin").join("php"),
        prefix.join("usr").join("local").join("bin").join("php"),
        prefix.join("usr").join("bin").join("php"),
    ]
}

/// Executables named `php` or `php<mm>` anywhere under the prefix
fn search(prefix: &Path, line: &str) -> Vec<PathBuf> {
    let names = ["php".to_string(), format!("php{}", line)];
    let mut found = Vec::new();
    walk(prefix, 0, &names, &mut found);
    found.sort();
    found
}

fn walk(dir: &Path, depth: usize, names: &[String], found: &mut Vec<PathBuf>) {
    if depth > SEARCH_DEPTH {
        return;
    }
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            walk(&path, depth + 1, names, found);
        } else if names.iter().any(|n| entry.file_name() == n.as_str()) && is_executable(&path) {
            found.push(path);
        }
    }
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

/// Whether version output names exactly `version`.
///
/// `8.3.1` must not match output reporting `8.3.12`.
pub fn output_matches(output: &str, version: &str) -> bool {
    if version.is_empty() {
        return false;
    }
    output.match_indices(version).any(|(start, _)| {
        let before = output[..start].chars().next_back();
        let after = output[start + version.len()..].chars().next();
        let boundary = |c: Option<char>| c.map_or(true, |c| !c.is_ascii_digit() && c != '.');
        boundary(before) && after.map_or(true, |c| !c.is_ascii_digit())
    })
}

/// Confirms a candidate binary reports the expected version
#[async_trait]
pub trait VerifyBinary: Send + Sync {
    /// `Err` carries the reason the candidate was rejected
    async fn verify(&self, binary: &Path, version: &str) -> Result<(), String>;
}

/// Runs `<binary> -v` and checks the reported version
pub struct VersionProbe {
    runner: Arc<dyn CommandRunner>,
}

impl VersionProbe {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl VerifyBinary for VersionProbe {
    async fn verify(&self, binary: &Path, version: &str) -> Result<(), String> {
        let probe = Invocation::new(binary.display().to_string())
            .arg("-v")
            .timeout(PROBE_TIMEOUT);
        let output = self.runner.run(&probe).await.map_err(|e| e.to_string())?;
        if !output.success() {
            return Err(format!("exited with status {}", output.exit_code()));
        }
        if !output_matches(&output.stdout, version) {
            let first = output.stdout.lines().next().unwrap_or("").trim();
            return Err(format!("reported '{}'", first));
        }
        Ok(())
    }
}

/// Result of a discovery pass
#[derive(Debug, PartialEq, Eq)]
pub enum Discovery {
    /// First verified candidate
    Found(PathBuf),
    /// Candidates existed but none verified
    Unverified,
    /// No candidate exists at all
    Missing,
}

/// Walk the generators under `prefix` and return the first verified binary
pub async fn discover_binary(
    prefix: &Path,
    line: &str,
    version: &str,
    verifier: &dyn VerifyBinary,
    log: &BuildLog,
) -> Discovery {
    let mut seen = HashSet::new();
    let mut any_candidate = false;

    for (name, generate) in GENERATORS {
        for candidate in generate(prefix, line) {
            if !seen.insert(candidate.clone()) || !candidate.exists() {
                continue;
            }
            any_candidate = true;
            match verifier.verify(&candidate, version).await {
                Ok(()) => {
                    debug!("Verified {} ({} candidate)", candidate.display(), name);
                    log.append(&format!("verified {}", candidate.display()))
                        .await;
                    return Discovery::Found(candidate);
                }
                Err(reason) => {
                    log.append(&format!("skipped {}: {}", candidate.display(), reason))
                        .await;
                }
            }
        }
    }

    if any_candidate {
        Discovery::Unverified
    } else {
        Discovery::Missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ok_with, FakeRunner};
    use tempfile::TempDir;

    struct AcceptOnly(PathBuf);

    #[async_trait]
    impl VerifyBinary for AcceptOnly {
        async fn verify(&self, binary: &Path, _version: &str) -> Result<(), String> {
            if binary == self.0 {
                Ok(())
            } else {
                Err("wrong binary".to_string())
            }
        }
    }

    fn executable(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "#!/bin/sh\n").unwrap();
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn version_match_respects_boundaries() {
        let output = "PHP 8.3.12 (cli) (built: Sep 26 2024 10:00:00) (NTS)";
        assert!(output_matches(output, "8.3.12"));
        assert!(!output_matches(output, "8.3.1"));
        assert!(!output_matches(output, "3.12"));
        assert!(!output_matches("PHP 8.2.24 (cli)", "8.3.12"));
    }

    #[test]
    fn search_is_bounded_to_prefix() {
        let temp = TempDir::new().unwrap();
        let deep = temp.path().join("lib").join("php").join("bin").join("php8.3");
        executable(&deep);
        std::fs::write(temp.path().join("php"), "not executable").unwrap();

        assert_eq!(search(temp.path(), "8.3"), vec![deep]);
    }

    #[tokio::test]
    async fn unverified_candidates_are_skipped() {
        let temp = TempDir::new().unwrap();
        let log = BuildLog::create(&temp.path().join("logs"), "php8.3")
            .await
            .unwrap();
        let prefix = temp.path().join("prefix");
        let conventional = prefix.join("bin").join("php");
        let alternate = prefix.join("sbin").join("php");
        executable(&conventional);
        executable(&alternate);

        let found = discover_binary(
            &prefix,
            "8.3",
            "8.3.12",
            &AcceptOnly(alternate.clone()),
            &log,
        )
        .await;

        assert_eq!(found, Discovery::Found(alternate));
        let content = std::fs::read_to_string(log.path()).unwrap();
        assert!(content.contains("skipped"));
    }

    #[tokio::test]
    async fn reports_missing_and_unverified() {
        let temp = TempDir::new().unwrap();
        let log = BuildLog::create(temp.path(), "php8.3").await.unwrap();
        let prefix = temp.path().join("prefix");
        let nobody = AcceptOnly(PathBuf::from("/nowhere"));

        assert_eq!(
            discover_binary(&prefix, "8.3", "8.3.12", &nobody, &log).await,
            Discovery::Missing
        );

        executable(&prefix.join("bin").join("php"));
        assert_eq!(
            discover_binary(&prefix, "8.3", "8.3.12", &nobody, &log).await,
            Discovery::Unverified
        );
    }

    #[tokio::test]
    async fn probe_checks_reported_version() {
        let runner = Arc::new(FakeRunner::new(|_| ok_with("PHP 8.3.12 (cli) (NTS)\n")));
        let probe = VersionProbe::new(runner.clone());

        assert!(probe.verify(Path::new("/x/bin/php"), "8.3.12").await.is_ok());
        assert!(probe.verify(Path::new("/x/bin/php"), "8.3.11").await.is_err());
        assert_eq!(runner.commands(), vec!["/x/bin/php -v", "/x/bin/php -v"]);
    }
}
