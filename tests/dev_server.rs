mod common;

use std::net::SocketAddr;

use common::{ProjectDir, init_tracing, with_timeout};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use webdag::server::{self, CLIENT_SCRIPT_PATH, ServerSettings};
use webdag::types::ServerLogLevel;

fn settings(project: &ProjectDir, spa_fallback: bool) -> ServerSettings {
    ServerSettings {
        port: 0,
        base_dir: project.path().join("dist"),
        spa_fallback,
        notify: false,
        log_level: ServerLogLevel::Silent,
    }
}

/// Minimal HTTP/1.1 GET; returns the status code and body.
async fn get(addr: SocketAddr, path: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8_lossy(&raw).to_string();

    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    (status, body)
}

#[tokio::test]
async fn html_pages_get_the_reload_client() {
    init_tracing();
    let project = ProjectDir::new();
    project
        .file("dist/index.html", "<html><body><h1>hi</h1></body></html>")
        .file("dist/app.js", "var a = 1;");
    let handle = server::start(settings(&project, true)).await.unwrap();

    let (status, body) = with_timeout(get(handle.local_addr(), "/index.html")).await;
    assert_eq!(status, 200);
    assert!(body.contains(r#"<script src="/__webdag/livereload.js"></script></body>"#));

    let (status, body) = with_timeout(get(handle.local_addr(), "/app.js")).await;
    assert_eq!(status, 200);
    assert_eq!(body, "var a = 1;");
}

#[tokio::test]
async fn unknown_routes_fall_back_to_index() {
    init_tracing();
    let project = ProjectDir::new();
    project.file("dist/index.html", "<html><body>spa</body></html>");
    let handle = server::start(settings(&project, true)).await.unwrap();

    let (status, body) = with_timeout(get(handle.local_addr(), "/users/42")).await;
    assert_eq!(status, 200);
    assert!(body.contains("spa"));
}

#[tokio::test]
async fn without_fallback_unknown_routes_are_not_found() {
    init_tracing();
    let project = ProjectDir::new();
    project.file("dist/index.html", "<html><body>spa</body></html>");
    let handle = server::start(settings(&project, false)).await.unwrap();

    let (status, _) = with_timeout(get(handle.local_addr(), "/users/42")).await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn client_script_connects_to_the_reload_socket() {
    init_tracing();
    let project = ProjectDir::new();
    let handle = server::start(settings(&project, true)).await.unwrap();

    let (status, body) = with_timeout(get(handle.local_addr(), CLIENT_SCRIPT_PATH)).await;
    assert_eq!(status, 200);
    assert!(body.contains("/__webdag/livereload"));
    assert!(body.contains("location.reload()"));
    // The served directory is created on start.
    assert!(project.exists("dist"));
}
