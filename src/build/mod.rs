//! Source build pipeline
//!
//! - `session`: build session state, steps, per-build log
//! - `discover`: candidate binary generators and verification
//! - `orchestrator`: the download-to-publish state machine
//! - `modules`: PECL module extensions
//! - `publish`: symlink publication and conflict probing
//! - `runtime_config`: php.ini and php-fpm.conf provisioning

pub mod discover;
pub mod modules;
pub mod orchestrator;
pub mod publish;
pub mod runtime_config;
pub mod session;

pub use discover::{discover_binary, output_matches, Discovery, VerifyBinary, VersionProbe};
pub use modules::ModuleInstaller;
pub use orchestrator::{detect_jobs, BuildOrchestrator, BuildOutcome, BuildRequest};
pub use publish::Publisher;
pub use session::{BuildLog, BuildSession, BuildStep};
