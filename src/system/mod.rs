//! Host system probing and process execution
//!
//! - `process`: spawning external commands as the user or elevated
//! - `package_manager`: supported package managers and detection
//! - `distro`: distribution detection

pub mod distro;
pub mod package_manager;
pub mod process;

pub use distro::{DistroDetector, Distribution};
pub use package_manager::{ManagerProfile, PackageManager, PROFILES};
pub use process::{
    command_exists, is_writable, move_path, remove_symlink, remove_tree, replace_symlink,
    run_checked, CommandOutput, CommandRunner, HostRunner, Identity, Invocation, Privilege,
};
