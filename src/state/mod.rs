//! Installed-version state

pub mod store;

pub use store::{InstalledVersion, StateStore};
