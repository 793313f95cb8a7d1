//! Error types for phpsmith
//!
//! All modules use `PhpsmithResult<T>` as their return type.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for phpsmith operations
pub type PhpsmithResult<T> = Result<T, PhpsmithError>;

/// All errors that can occur in phpsmith
#[derive(Error, Debug)]
pub enum PhpsmithError {
    // Environment errors
    #[error("No supported package manager found. Supported: {supported}")]
    PackageManagerNotFound { supported: String },

    #[error("Could not detect the Linux distribution")]
    DistributionUnknown,

    // Registry / network errors
    #[error("Unsupported PHP line: {0}")]
    UnsupportedLine(String),

    #[error("Release index request failed for PHP {line}: {reason}")]
    RegistryFetch { line: String, reason: String },

    #[error("Unexpected release index response for PHP {line}: {reason}")]
    RegistryParse { line: String, reason: String },

    #[error("Download failed: {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Checksum mismatch for {file}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    // Build errors
    #[error("Build of PHP {version} failed during {step}: {cause}")]
    BuildFailed {
        version: String,
        step: String,
        cause: String,
        log: PathBuf,
    },

    #[error("Command exited with status {code}: {command}")]
    StepFailed { command: String, code: i32 },

    #[error("No working PHP {version} binary found after install")]
    VerificationFailed { version: String, log: PathBuf },

    #[error("Module {name} failed to build for PHP {line}")]
    ModuleFailed {
        name: String,
        line: String,
        log: PathBuf,
    },

    // State errors
    #[error("PHP {0} is already installed")]
    AlreadyInstalled(String),

    #[error("PHP {0} is not installed")]
    NotInstalled(String),

    #[error("Failed to persist state to {path}: {reason}")]
    StatePersist { path: PathBuf, reason: String },

    #[error("State file {path} is unreadable: {reason}")]
    StateCorrupt { path: PathBuf, reason: String },

    #[error("Cannot bind the php command: {0} is not managed by phpsmith")]
    CliConflict(PathBuf),

    // Dependency errors
    #[error("Unknown extension: {0}")]
    UnknownExtension(String),

    #[error("{manager} failed to install system packages: {output}")]
    DependencyInstall { manager: String, output: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command execution error: {command}, output: {output}")]
    CommandExecution { command: String, output: String },

    #[error("Command timed out: {0}")]
    CommandTimeout(String),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl PhpsmithError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Create a command execution error
    pub fn command_exec(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            output: output.into(),
        }
    }

    /// Build log retained for this failure, if any
    pub fn log_path(&self) -> Option<&Path> {
        match self {
            Self::BuildFailed { log, .. }
            | Self::VerificationFailed { log, .. }
            | Self::ModuleFailed { log, .. } => Some(log),
            _ => None,
        }
    }

    /// Network failures may succeed when retried
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RegistryFetch { .. } | Self::Download { .. } | Self::CommandTimeout(_)
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<String> {
        if let Some(log) = self.log_path() {
            return Some(format!("Inspect the build log: tail -n 50 {}", log.display()));
        }
        match self {
            Self::PackageManagerNotFound { .. } => {
                Some("Install build dependencies manually, then retry".to_string())
            }
            Self::AlreadyInstalled(line) => Some(format!("Run: phpsmith rebuild {}", line)),
            Self::NotInstalled(line) => Some(format!("Run: phpsmith install {}", line)),
            Self::CliConflict(path) => Some(format!(
                "Remove the system PHP at {} to let phpsmith manage the php command",
                path.display()
            )),
            Self::RegistryFetch { .. } => {
                Some("Check network access to php.net and retry".to_string())
            }
            Self::UnsupportedLine(_) => Some("Run: phpsmith versions".to_string()),
            Self::DistributionUnknown => Some(
                "Set deps.auto_install = false and install build dependencies manually".to_string(),
            ),
            Self::ChecksumMismatch { .. } => {
                Some("Clear the release cache with: phpsmith versions --refresh".to_string())
            }
            _ => None,
        }
    }
}
