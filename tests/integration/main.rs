//! Integration tests for phpsmith
//!
//! Every test points `PHPSMITH_CONFIG` and `PHPSMITH_ROOT` into its own
//! temporary directory and never reaches the network.

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let sandbox = Self {
                dir: TempDir::new().unwrap(),
            };
            let config = format!(
                r#"
[paths]
system_bin_dir = "{bin}"
conflict_probe = []

[registry]
index_url = "http://127.0.0.1:9/releases"
lines = ["8.2", "8.3"]
timeout_secs = 1

[deps]
auto_install = false
"#,
                bin = sandbox.path("sysbin").display()
            );
            std::fs::write(sandbox.config(), config).unwrap();
            sandbox
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.dir.path().join(rel)
        }

        fn config(&self) -> PathBuf {
            self.path("config.toml")
        }

        fn root(&self) -> PathBuf {
            self.path("root")
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("phpsmith");
            cmd.env("PHPSMITH_CONFIG", self.config())
                .env("PHPSMITH_ROOT", self.root())
                .env("CI", "1")
                .env_remove("RUST_LOG");
            cmd
        }

        fn write(&self, rel: &str, content: &str) {
            let path = self.root().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }

        fn seed_cache(&self) {
            let cache = serde_json::json!({
                "lastUpdated": chrono::Utc::now().to_rfc3339(),
                "latestByLine": {"8.2": "8.2.24", "8.3": "8.3.12"},
                "downloadURLByVersion": {
                    "8.2.24": "https://www.php.net/distributions/php-8.2.24.tar.gz",
                    "8.3.12": "https://www.php.net/distributions/php-8.3.12.tar.gz",
                },
            });
            self.write("cache/versions.json", &cache.to_string());
        }

        fn seed_state(&self) {
            let prefix = self.root().join("versions").join("8.3");
            let state = serde_json::json!({
                "8.3": {
                    "majorMinor": "8.3",
                    "exactVersion": "8.3.11",
                    "installPath": prefix,
                    "extensions": ["intl", "mbstring"],
                    "isCLI": true,
                    "needsRebuild": false,
                    "fpmSocketPath": self.root().join("run/php8.3-fpm.sock"),
                    "iniPath": self.root().join("etc/8.3/php.ini"),
                }
            });
            self.write("state.json", &state.to_string());
        }
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn help_displays() {
        cargo_bin_cmd!("phpsmith")
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("build and manage PHP versions from source"));
    }

    #[test]
    fn version_displays() {
        cargo_bin_cmd!("phpsmith")
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("phpsmith"));
    }

    #[test]
    fn list_empty() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("No PHP versions installed"));
        sandbox
            .cmd()
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::diff("[]\n"));
    }

    #[test]
    fn list_shows_recorded_versions() {
        let sandbox = Sandbox::new();
        sandbox.seed_state();

        sandbox
            .cmd()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("8.3.11"))
            .stdout(predicate::str::contains("intl, mbstring"));

        let output = sandbox
            .cmd()
            .args(["list", "-f", "json"])
            .output()
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(json[0]["majorMinor"], "8.3");
        assert_eq!(json[0]["isCLI"], true);
    }

    #[test]
    fn corrupt_state_is_reported() {
        let sandbox = Sandbox::new();
        sandbox.write("state.json", "{ not json");

        sandbox
            .cmd()
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("is unreadable"));
    }

    #[test]
    fn config_path() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_merges_defaults() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[registry]"))
            .stdout(predicate::str::contains("cache_ttl_secs = 3600"))
            .stdout(predicate::str::contains("auto_install = false"));
    }

    #[test]
    fn config_init_keeps_existing_file() {
        let sandbox = Sandbox::new();
        let fresh = sandbox.path("fresh.toml");

        cargo_bin_cmd!("phpsmith")
            .args(["config", "init"])
            .env("PHPSMITH_CONFIG", &fresh)
            .env("CI", "1")
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(std::fs::read_to_string(&fresh)
            .unwrap()
            .contains("[build]"));

        sandbox
            .cmd()
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn invalid_config_is_reported() {
        let sandbox = Sandbox::new();
        std::fs::write(sandbox.config(), "[build]\njobs = \"all\"\n").unwrap();

        sandbox
            .cmd()
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn install_rejects_malformed_line() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["install", "eight"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid PHP line"));
    }

    #[test]
    fn install_rejects_unsupported_line() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["install", "7.4"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unsupported PHP line: 7.4"))
            .stderr(predicate::str::contains("phpsmith versions"));
    }

    #[test]
    fn install_rejects_unknown_extension() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["install", "8.3", "--extensions", "intl,nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown extension: nope"));
        assert!(!sandbox.root().join("state.json").exists());
    }

    #[test]
    fn install_of_recorded_line_changes_nothing() {
        let sandbox = Sandbox::new();
        sandbox.seed_state();
        let before = std::fs::read_to_string(sandbox.root().join("state.json")).unwrap();

        sandbox
            .cmd()
            .args(["install", "8.3"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("PHP 8.3 is already installed"))
            .stderr(predicate::str::contains("phpsmith rebuild 8.3"));

        let after = std::fs::read_to_string(sandbox.root().join("state.json")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn uninstall_missing_line() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["uninstall", "8.2", "--yes"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("PHP 8.2 is not installed"))
            .stderr(predicate::str::contains("phpsmith install 8.2"));
    }

    #[test]
    fn uninstall_without_confirmation_keeps_state() {
        let sandbox = Sandbox::new();
        sandbox.seed_state();

        sandbox
            .cmd()
            .args(["uninstall", "8.3"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing removed"));

        let state = read_json(&sandbox.root().join("state.json"));
        assert_eq!(state["8.3"]["exactVersion"], "8.3.11");
    }

    #[test]
    fn uninstall_with_yes_removes_record() {
        let sandbox = Sandbox::new();
        sandbox.seed_state();
        std::fs::create_dir_all(sandbox.path("sysbin")).unwrap();
        sandbox.write("versions/8.3/bin/php", "");

        sandbox
            .cmd()
            .args(["uninstall", "8.3", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed PHP 8.3.11"));

        let state = read_json(&sandbox.root().join("state.json"));
        assert!(state.as_object().unwrap().is_empty());
        assert!(!sandbox.root().join("versions/8.3").exists());
    }

    #[test]
    fn use_missing_line() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["use", "8.2"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("PHP 8.2 is not installed"));
    }

    #[test]
    fn use_refuses_unmanaged_php() {
        let sandbox = Sandbox::new();
        sandbox.seed_state();
        std::fs::create_dir_all(sandbox.path("sysbin")).unwrap();
        std::fs::write(sandbox.path("sysbin/php"), "#!/bin/sh\n").unwrap();

        sandbox
            .cmd()
            .args(["use", "8.3"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("is not managed by phpsmith"));
    }

    #[test]
    fn ext_available_lists_catalog() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["ext", "available"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--enable-intl"))
            .stdout(predicate::str::contains("xdebug"));
    }

    #[test]
    fn ext_add_to_missing_line() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["ext", "add", "8.3", "redis"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("PHP 8.3 is not installed"));
    }

    #[test]
    fn versions_from_fresh_cache() {
        let sandbox = Sandbox::new();
        sandbox.seed_cache();

        sandbox
            .cmd()
            .arg("versions")
            .assert()
            .success()
            .stdout(predicate::str::contains("8.2.24"))
            .stdout(predicate::str::contains("8.3.12"));

        sandbox
            .cmd()
            .args(["versions", "-f", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff("8.2.24\n8.3.12\n"));
    }

    #[test]
    fn versions_refresh_without_network_fails() {
        let sandbox = Sandbox::new();
        sandbox.seed_cache();
        let before = std::fs::read_to_string(sandbox.root().join("cache/versions.json")).unwrap();

        sandbox
            .cmd()
            .args(["versions", "--refresh", "-f", "json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Release index request failed"));

        let after = std::fs::read_to_string(sandbox.root().join("cache/versions.json")).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn outdated_flags_recorded_version() {
        let sandbox = Sandbox::new();
        sandbox.seed_cache();
        sandbox.seed_state();

        sandbox
            .cmd()
            .args(["outdated", "-f", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff("8.3\n"));

        let state = read_json(&sandbox.root().join("state.json"));
        assert_eq!(state["8.3"]["needsRebuild"], true);
    }

    #[test]
    fn completions_generate() {
        cargo_bin_cmd!("phpsmith")
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("phpsmith"));
    }
}
