//! Recording fakes shared by unit tests

use crate::build::discover::{output_matches, VerifyBinary};
use crate::error::PhpsmithResult;
use crate::system::process::{CommandOutput, CommandRunner, Invocation};
use async_trait::async_trait;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

type Handler = Box<dyn Fn(&Invocation) -> CommandOutput + Send + Sync>;

/// Command runner answering from a closure and recording every invocation
pub struct FakeRunner {
    calls: Mutex<Vec<Invocation>>,
    handler: Handler,
}

impl FakeRunner {
    pub fn new(handler: impl Fn(&Invocation) -> CommandOutput + Send + Sync + 'static) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            handler: Box::new(handler),
        }
    }

    /// Every command exits 0 with no output
    pub fn succeeding() -> Self {
        Self::new(|_| ok())
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Rendered command lines, in call order
    pub fn commands(&self) -> Vec<String> {
        self.calls().iter().map(Invocation::display).collect()
    }
}

#[async_trait]
impl CommandRunner for FakeRunner {
    async fn run(&self, invocation: &Invocation) -> PhpsmithResult<CommandOutput> {
        self.calls.lock().unwrap().push(invocation.clone());
        Ok((self.handler)(invocation))
    }
}

pub fn ok() -> CommandOutput {
    CommandOutput {
        code: Some(0),
        ..Default::default()
    }
}

pub fn ok_with(stdout: &str) -> CommandOutput {
    CommandOutput {
        code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

pub fn fail(code: i32, stderr: &str) -> CommandOutput {
    CommandOutput {
        code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
    }
}

/// A host where every build command succeeds and leaves the files a real
/// toolchain would: `tar` unpacks a source tree, `make install` stages a
/// `bin/php` reporting the version, `php -m` lists the PECL modules.
///
/// Commands whose rendering starts with `fail_on` exit 2 instead.
pub fn build_host(fail_on: Option<&'static str>) -> FakeRunner {
    let prefix: Mutex<Option<PathBuf>> = Mutex::new(None);

    FakeRunner::new(move |inv| {
        if let Some(pattern) = fail_on {
            if inv.display().starts_with(pattern) {
                return fail(2, "error: simulated failure");
            }
        }

        let arg = |flag: &str| {
            inv.args
                .iter()
                .position(|a| a == flag)
                .and_then(|i| inv.args.get(i + 1))
                .cloned()
        };

        match inv.program.as_str() {
            "tar" => {
                let (Some(archive), Some(dest)) = (arg("-xzf"), arg("-C")) else {
                    return fail(2, "tar: bad arguments");
                };
                let file = Path::new(&archive)
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let dir = match file.strip_suffix(".tar.gz") {
                    Some(source) => source.to_string(),
                    None => format!("{}-1.0.0", file.trim_end_matches(".tgz")),
                };
                let tree = Path::new(&dest).join(dir);
                std::fs::create_dir_all(&tree).unwrap();
                std::fs::write(tree.join("php.ini-development"), "; development\n").unwrap();
                ok()
            }
            "./configure" => {
                if let Some(p) = inv.args.iter().find_map(|a| a.strip_prefix("--prefix=")) {
                    *prefix.lock().unwrap() = Some(PathBuf::from(p));
                }
                ok()
            }
            "make" => {
                let Some(root) = inv.args.iter().find_map(|a| a.strip_prefix("INSTALL_ROOT="))
                else {
                    return ok();
                };
                let version = inv
                    .cwd
                    .as_ref()
                    .and_then(|d| d.file_name())
                    .map(|n| n.to_string_lossy().trim_start_matches("php-").to_string())
                    .unwrap_or_default();
                let prefix = prefix.lock().unwrap().clone().unwrap();
                let bin = Path::new(root)
                    .join(prefix.strip_prefix("/").unwrap())
                    .join("bin");
                std::fs::create_dir_all(&bin).unwrap();
                let php = bin.join("php");
                std::fs::write(&php, format!("PHP {} (cli) (NTS)\n", version)).unwrap();
                std::fs::set_permissions(&php, std::fs::Permissions::from_mode(0o755)).unwrap();
                ok()
            }
            program if program.ends_with("php-config") => ok_with("/nonexistent/extensions\n"),
            program if program.ends_with("/php") && inv.args == ["-m"] => ok_with(
                "[PHP Modules]\nCore\napcu\nimagick\nmongodb\nredis\nxdebug\n\n[Zend Modules]\nXdebug\n",
            ),
            _ => ok(),
        }
    })
}

/// Accepts a binary when its file content names the expected version
pub struct ContentVerifier;

#[async_trait]
impl VerifyBinary for ContentVerifier {
    async fn verify(&self, binary: &Path, version: &str) -> Result<(), String> {
        let content = std::fs::read_to_string(binary).map_err(|e| e.to_string())?;
        if output_matches(&content, version) {
            Ok(())
        } else {
            Err(format!("reported '{}'", content.trim()))
        }
    }
}

/// Rejects every candidate
pub struct RejectingVerifier;

#[async_trait]
impl VerifyBinary for RejectingVerifier {
    async fn verify(&self, _binary: &Path, _version: &str) -> Result<(), String> {
        Err("exited with status 127".to_string())
    }
}
