//! phpsmith - source-based PHP version manager
//!
//! Builds several PHP lines from php.net source releases side by side,
//! tracks their extension sets and keeps one bound to the `php` command.

pub mod build;
pub mod cli;
pub mod config;
pub mod deps;
pub mod error;
pub mod fsutil;
pub mod history;
pub mod http;
pub mod manager;
pub mod registry;
pub mod report;
pub mod state;
pub mod system;
pub mod ui;

#[cfg(test)]
mod test_support;

pub use error::{PhpsmithError, PhpsmithResult};
pub use manager::VersionManager;
