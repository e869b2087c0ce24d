// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling a watch glob into a [`WatchBinding`] with its task sequence.
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Optional content hashing so that touching a file without changing it
//!   does not re-run anything.
//!
//! It does **not** run tasks; [`crate::engine::Orchestrator::listen`] turns
//! change batches into runs.

pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::ContentHashes;
pub use patterns::WatchBinding;
pub use watcher::{WatcherHandle, spawn_watcher};
