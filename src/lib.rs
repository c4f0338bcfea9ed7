//! ProxySync - proxy list downloader, validator and distributor
//!
//! Loads proxy lists from plain-text files, checks them concurrently
//! through "what is my IP" endpoints and copies the working ones into
//! consumer directories.

pub mod config;
pub mod console;
pub mod menu;
pub mod pipeline;
pub mod proxy;
pub mod tui;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::Settings;
pub use pipeline::{Pipeline, RunOutcome};
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
