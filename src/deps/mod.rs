//! Extensions and their system dependencies
//!
//! Two independently maintained catalogs joined by extension name:
//! `extensions` (configure flags, install mechanism) and `catalog`
//! (per-manager package names and availability probes).

pub mod catalog;
pub mod extensions;
pub mod resolver;

pub use catalog::{find_dependency, DependencyConfig, BASE_DEPENDENCIES};
pub use extensions::{
    configure_flags, find_extension, module_extensions, requires_rebuild, validate_extensions,
    ExtensionDefinition, InstallMechanism, DEFAULT_EXTENSIONS, EXTENSIONS,
};
pub use resolver::{logical_dependencies, resolve_packages, DependencyResolver};
