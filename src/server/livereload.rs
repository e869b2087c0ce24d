// src/server/livereload.rs

use axum::body::{Body, to_bytes};
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::server::ServerState;

pub const LIVERELOAD_PATH: &str = "/__webdag/livereload";
pub const CLIENT_SCRIPT_PATH: &str = "/__webdag/livereload.js";

const SCRIPT_TAG: &str = r#"<script src="/__webdag/livereload.js"></script>"#;

/// Upgrade to a WebSocket that receives `reload` on every change.
pub(crate) async fn socket(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    let rx = state.reload.subscribe();
    ws.on_upgrade(move |socket| forward_reloads(socket, rx))
}

async fn forward_reloads(mut socket: WebSocket, mut reloads: broadcast::Receiver<()>) {
    debug!("live-reload client connected");
    loop {
        tokio::select! {
            event = reloads.recv() => match event {
                Ok(()) | Err(RecvError::Lagged(_)) => {
                    if socket.send(Message::Text("reload".into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("live-reload client disconnected");
}

pub fn client_source(notify: bool) -> String {
    let before_reload = if notify {
        "var note = document.createElement('div');\n      \
         note.textContent = 'webdag: reloading';\n      \
         note.style.cssText = 'position:fixed;top:0;right:0;z-index:99999;padding:6px 12px;\
         background:#222;color:#fff;font:13px sans-serif';\n      \
         document.body.appendChild(note);\n      \
         setTimeout(function () { location.reload(); }, 300);"
    } else {
        "location.reload();"
    };

    format!(
        r#"(function () {{
  var proto = location.protocol === 'https:' ? 'wss://' : 'ws://';
  var socket = new WebSocket(proto + location.host + '{LIVERELOAD_PATH}');
  socket.onmessage = function (event) {{
    if (event.data === 'reload') {{
      {before_reload}
    }}
  }};
}})();
"#
    )
}

pub(crate) async fn client_script(State(state): State<ServerState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        client_source(state.notify),
    )
}

/// Insert the client script tag before `</body>` (or append it).
pub fn inject_script(html: &str) -> String {
    match html.rfind("</body>") {
        Some(at) => format!("{}{}{}", &html[..at], SCRIPT_TAG, &html[at..]),
        None => format!("{html}{SCRIPT_TAG}"),
    }
}

/// Middleware: rewrite HTML responses so pages connect to the reload socket.
pub(crate) async fn inject_client(request: Request, next: Next) -> Response {
    let response = next.run(request).await;

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/html"));
    if !is_html || !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(error = %err, "failed to buffer HTML response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let html = inject_script(&String::from_utf8_lossy(&bytes));
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(html))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_goes_before_closing_body() {
        assert_eq!(
            inject_script("<html><body><p>hi</p></body></html>"),
            format!("<html><body><p>hi</p>{SCRIPT_TAG}</body></html>")
        );
        assert_eq!(inject_script("<p>bare</p>"), format!("<p>bare</p>{SCRIPT_TAG}"));
    }

    #[test]
    fn notify_adds_a_banner() {
        assert!(client_source(true).contains("webdag: reloading"));
        assert!(!client_source(false).contains("webdag: reloading"));
        assert!(client_source(false).contains(LIVERELOAD_PATH));
    }
}
