//! CLI command implementations
//!
//! Each command renders progress and results; decisions stay in
//! [`VersionManager`].

pub mod check;
pub mod config;
pub mod ext;
pub mod install;
pub mod list;
pub mod rebuild;
pub mod uninstall;
pub mod use_line;
pub mod versions;

pub use check::execute as check;
pub use config::execute as config;
pub use ext::execute as ext;
pub use install::execute as install;
pub use list::execute as list;
pub use rebuild::execute as rebuild;
pub use uninstall::execute as uninstall;
pub use use_line::execute as use_line;
pub use versions::{execute as versions, outdated};

use crate::config::Config;
use crate::error::PhpsmithResult;
use crate::manager::VersionManager;
use crate::report::Reporter;

async fn open_manager(config: &Config, reporter: Reporter) -> PhpsmithResult<VersionManager> {
    VersionManager::open(config.clone(), reporter).await
}
