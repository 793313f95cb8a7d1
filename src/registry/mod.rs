//! Upstream version discovery
//!
//! - `version`: numeric version comparison and line parsing
//! - `cache`: the time-boxed release index cache
//! - `client`: release index queries and download URL construction

pub mod cache;
pub mod client;
pub mod version;

pub use cache::{CacheFile, VersionCache};
pub use client::{parse_release, ReleaseInfo, ResolvedRelease, VersionRegistry};
pub use version::{compare_versions, line_of, parse_line};
