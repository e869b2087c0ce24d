// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// A missing file is not an error: every section has defaults, so we return
/// `RawConfigFile::default()`. This only performs TOML deserialization; use
/// [`load_and_validate`] for semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(?path, "config file not found; using defaults");
        return Ok(RawConfigFile::default());
    }

    let contents = fs::read_to_string(path)?;
    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path, validate it, and anchor it at the
/// directory containing the file.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    let raw_config = load_from_path(path)?;
    let config = ConfigFile::try_from(raw_config)?.with_root(config_root_dir(path));
    Ok(config)
}

/// Figure out the project root for a config path.
///
/// - `configs/Webdag.toml` → `configs`
/// - bare `Webdag.toml` → the current working directory
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

/// Contents of the bundle manifest (`tsd.json`).
///
/// Only `bundle` is read; other keys are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct BundleManifest {
    pub bundle: String,
}

/// Read the bundle manifest configured in `[paths].manifest`.
///
/// Returns `Ok(None)` when the file does not exist; the `ts` task then
/// compiles without a library bundle.
pub fn load_manifest(cfg: &ConfigFile) -> Result<Option<BundleManifest>> {
    let path = cfg.resolve(&cfg.paths.manifest);
    if !path.exists() {
        warn!(?path, "bundle manifest not found; compiling without a library bundle");
        return Ok(None);
    }

    let contents = fs::read_to_string(&path)?;
    let manifest: BundleManifest = serde_json::from_str(&contents)?;
    debug!(bundle = %manifest.bundle, "loaded bundle manifest");
    Ok(Some(manifest))
}
