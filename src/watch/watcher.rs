// src/watch/watcher.rs

use std::path::PathBuf;

use anyhow::{Context, Result};
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Handle for the filesystem watcher.
///
/// This exists mainly so the underlying `RecommendedWatcher` is kept alive for
/// as long as needed. Dropping this handle will stop file watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch `root` recursively and forward the paths of every content event as
/// one batch on `tx`.
///
/// One notify event becomes one batch; access-only events are dropped.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    tx: mpsc::UnboundedSender<Vec<PathBuf>>,
) -> Result<WatcherHandle> {
    let root = root.into();
    // Canonicalize once so we have a stable base path.
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    // Closure called synchronously by notify whenever an event arrives.
    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Access(_)) || event.paths.is_empty() {
                    return;
                }
                debug!(?event, "received notify event");
                if tx.send(event.paths).is_err() {
                    debug!("watch listener gone; dropping event");
                }
            }
            Err(err) => {
                warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )
    .context("creating file watcher")?;

    watcher
        .watch(&root, RecursiveMode::Recursive)
        .with_context(|| format!("watching {:?}", root))?;

    info!("file watcher started on {:?}", root);

    Ok(WatcherHandle { _inner: watcher })
}
