// src/server/mod.rs

//! Development server: static files, SPA fallback and live reload.
//!
//! - [`ServerSettings`] mirrors the `[server]` config section.
//! - [`start`] binds the listener and spawns the server; the returned
//!   [`ServerHandle`] must be kept alive.
//! - [`livereload`] holds the WebSocket endpoint, the client script and the
//!   HTML injection middleware.

pub mod livereload;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::Router;
use axum::middleware;
use axum::routing::get;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, error, info};

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::types::ServerLogLevel;
use crate::watch::{WatcherHandle, spawn_watcher};

pub use livereload::{CLIENT_SCRIPT_PATH, LIVERELOAD_PATH};

#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// `0` picks a free port.
    pub port: u16,
    pub base_dir: PathBuf,
    pub spa_fallback: bool,
    pub notify: bool,
    pub log_level: ServerLogLevel,
}

impl ServerSettings {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            port: cfg.server.port,
            base_dir: cfg.server_base_dir(),
            spa_fallback: cfg.server.spa_fallback,
            notify: cfg.server.notify,
            log_level: cfg.server.log_level,
        }
    }
}

#[derive(Clone)]
pub(crate) struct ServerState {
    reload: broadcast::Sender<()>,
    notify: bool,
}

/// A running server. Dropping it stops the live-reload watcher; the HTTP
/// task is aborted as well.
pub struct ServerHandle {
    addr: SocketAddr,
    reload: broadcast::Sender<()>,
    task: JoinHandle<()>,
    _watcher: WatcherHandle,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Ask every connected browser to reload.
    pub fn reload(&self) {
        // No receivers just means no browser is connected.
        let _ = self.reload.send(());
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

fn router(settings: &ServerSettings, state: ServerState) -> Router {
    let routes = Router::new()
        .route(LIVERELOAD_PATH, get(livereload::socket))
        .route(CLIENT_SCRIPT_PATH, get(livereload::client_script));

    let routes = if settings.spa_fallback {
        let index = settings.base_dir.join("index.html");
        routes.fallback_service(ServeDir::new(&settings.base_dir).fallback(ServeFile::new(index)))
    } else {
        routes.fallback_service(ServeDir::new(&settings.base_dir))
    };

    routes
        .layer(middleware::from_fn(livereload::inject_client))
        .with_state(state)
}

/// Bind `127.0.0.1:<port>`, serve `base_dir` and broadcast a reload whenever
/// something below it changes.
pub async fn start(settings: ServerSettings) -> Result<ServerHandle> {
    std::fs::create_dir_all(&settings.base_dir)
        .with_context(|| format!("creating served directory {:?}", settings.base_dir))?;

    let (reload, _) = broadcast::channel(16);
    let state = ServerState {
        reload: reload.clone(),
        notify: settings.notify,
    };
    let app = router(&settings, state);

    let listener = tokio::net::TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], settings.port)))
        .await
        .with_context(|| format!("binding development server on port {}", settings.port))?;
    let addr = listener.local_addr()?;

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            error!(error = %err, "development server stopped");
        }
    });

    let (tx, mut changes) = mpsc::unbounded_channel();
    let watcher = spawn_watcher(&settings.base_dir, tx)?;
    {
        let reload = reload.clone();
        let log_level = settings.log_level;
        tokio::spawn(async move {
            while let Some(paths) = changes.recv().await {
                if log_level >= ServerLogLevel::Debug {
                    for path in &paths {
                        info!(?path, "served file changed");
                    }
                }
                let browsers = reload.send(()).unwrap_or(0);
                if log_level >= ServerLogLevel::Info {
                    info!(browsers, "reloading browsers");
                } else {
                    debug!(browsers, "reloading browsers");
                }
            }
        });
    }

    if settings.log_level >= ServerLogLevel::Info {
        info!(url = %format!("http://localhost:{}/", addr.port()), base_dir = ?settings.base_dir, "development server listening");
    } else {
        debug!(%addr, "development server listening");
    }

    Ok(ServerHandle {
        addr,
        reload,
        task,
        _watcher: watcher,
    })
}
