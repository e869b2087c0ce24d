// src/config/mod.rs

//! Configuration loading and validation for webdag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file and the bundle manifest from disk (`loader.rs`).
//! - Validate paths, globs and command tasks (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{BundleManifest, load_and_validate, load_from_path, load_manifest};
pub use model::{
    CommandTaskConfig, ConfigFile, PathsConfig, RawConfigFile, ServerConfig, TestConfig,
    ToolsConfig, WatchConfig,
};
