//! File server behaviour over real sockets

use autoshare_core::Error;
use autoshare_core::config::ServerConfig;
use autoshare_server::{DRAIN_TIMEOUT, FileServer, StaticServer};
use reqwest::StatusCode;
use reqwest::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, LOCATION};
use std::net::SocketAddr;
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Temp tree:
///
/// ```text
/// <tmp>/outside.txt
/// <tmp>/share/index.html
/// <tmp>/share/clip.mp4
/// <tmp>/share/clip.webm
/// <tmp>/share/clip.ogv
/// <tmp>/share/docs/notes.txt
/// <tmp>/share/docs/<b>.txt
/// <tmp>/share/site/index.html
/// ```
fn fixture() -> TempDir {
    let tmp = tempfile::tempdir().unwrap();
    let share = tmp.path().join("share");
    std::fs::create_dir_all(share.join("docs")).unwrap();
    std::fs::create_dir_all(share.join("site")).unwrap();

    std::fs::write(tmp.path().join("outside.txt"), "top secret").unwrap();
    std::fs::write(share.join("index.html"), "<h1>hello</h1>").unwrap();
    std::fs::write(share.join("clip.mp4"), [0u8; 16]).unwrap();
    std::fs::write(share.join("clip.webm"), [0u8; 16]).unwrap();
    std::fs::write(share.join("clip.ogv"), [0u8; 16]).unwrap();
    std::fs::write(share.join("docs").join("notes.txt"), "some notes").unwrap();
    std::fs::write(share.join("docs").join("<b>.txt"), "x").unwrap();
    std::fs::write(share.join("site").join("index.html"), "<p>site</p>").unwrap();
    tmp
}

async fn start(tmp: &TempDir, listing: bool) -> (FileServer, SocketAddr) {
    let config = ServerConfig::new(tmp.path().join("share"), "127.0.0.1", 0, listing).unwrap();
    let mut server = FileServer::new(config);
    let addr = server.start().await.unwrap();
    (server, addr)
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Send a request line verbatim, bypassing URL normalisation
async fn raw_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
        path, addr
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn listing_disabled_forbids_directories_but_serves_files() {
    let tmp = fixture();
    let (mut server, addr) = start(&tmp, false).await;
    let client = client();

    let resp = client
        .get(format!("http://{}/docs/", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(resp.text().await.unwrap(), "Directory listing forbidden");

    let resp = client
        .get(format!("http://{}/index.html", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(
        resp.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );
    assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(resp.text().await.unwrap(), "<h1>hello</h1>");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn directory_with_index_serves_it() {
    let tmp = fixture();
    let (mut server, addr) = start(&tmp, false).await;

    let resp = client()
        .get(format!("http://{}/site/", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "<p>site</p>");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn directory_without_slash_redirects() {
    let tmp = fixture();
    let (mut server, addr) = start(&tmp, true).await;

    let resp = client()
        .get(format!("http://{}/docs", addr))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(resp.headers()[LOCATION], "/docs/");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn listing_enabled_renders_index() {
    let tmp = fixture();
    let (mut server, addr) = start(&tmp, true).await;

    let resp = client()
        .get(format!("http://{}/docs/", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert!(
        resp.headers()[CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/html")
    );

    let body = resp.text().await.unwrap();
    assert!(body.contains("Directory listing for /docs/"));
    assert!(body.contains("href=\"notes.txt\""));
    assert!(body.contains("&lt;b&gt;.txt"));
    assert!(body.contains("href=\"%3Cb%3E.txt\""));

    server.stop().await.unwrap();
}

#[tokio::test]
async fn video_content_types() {
    let tmp = fixture();
    let (mut server, addr) = start(&tmp, false).await;
    let client = client();

    for (file, expected) in [
        ("clip.mp4", "video/mp4"),
        ("clip.webm", "video/webm"),
        ("clip.ogv", "video/ogg"),
    ] {
        let resp = client
            .get(format!("http://{}/{}", addr, file))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{}", file);
        assert_eq!(resp.headers()[CONTENT_TYPE], expected, "{}", file);
    }

    server.stop().await.unwrap();
}

#[tokio::test]
async fn stalled_client_does_not_block_others() {
    let tmp = fixture();
    let (mut server, addr) = start(&tmp, false).await;

    // Half a request line, never finished
    let mut stalled = tokio::net::TcpStream::connect(addr).await.unwrap();
    stalled.write_all(b"GET /index.html HTTP/1.1\r\nHost:").await.unwrap();

    let resp = tokio::time::timeout(
        Duration::from_secs(2),
        client().get(format!("http://{}/index.html", addr)).send(),
    )
    .await
    .expect("second request should not wait on the stalled one")
    .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "<h1>hello</h1>");

    // The stalled connection may hold the drain open, but only up to the bound
    let started = Instant::now();
    server.stop().await.unwrap();
    assert!(started.elapsed() < DRAIN_TIMEOUT + Duration::from_secs(2));
    assert!(!server.is_running());
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());

    drop(stalled);
}

#[tokio::test]
async fn missing_file_is_404_with_cors() {
    let tmp = fixture();
    let (mut server, addr) = start(&tmp, false).await;

    let resp = client()
        .get(format!("http://{}/nope.txt", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    server.stop().await.unwrap();
}

#[tokio::test]
async fn traversal_never_leaves_the_root() {
    let tmp = fixture();
    let (mut server, addr) = start(&tmp, true).await;

    for path in ["/../outside.txt", "/docs/../../outside.txt", "/..%2foutside.txt", "/%2e%2e/outside.txt"] {
        let response = raw_get(addr, path).await;
        assert!(
            response.starts_with("HTTP/1.1 404"),
            "{} gave: {}",
            path,
            response.lines().next().unwrap_or_default()
        );
        assert!(!response.contains("top secret"));
    }

    server.stop().await.unwrap();
}

#[tokio::test]
async fn double_start_is_a_usage_error_and_keeps_listener() {
    let tmp = fixture();
    let (mut server, addr) = start(&tmp, false).await;

    let err = server.start().await.unwrap_err();
    assert!(matches!(err, Error::Usage(_)));
    assert_eq!(server.local_addr(), Some(addr));

    let resp = client()
        .get(format!("http://{}/index.html", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    server.stop().await.unwrap();
}

#[tokio::test]
async fn stop_is_idempotent_and_restart_works() {
    let tmp = fixture();
    let config = ServerConfig::new(tmp.path().join("share"), "127.0.0.1", 0, false).unwrap();
    let mut server = FileServer::new(config);

    // Never started
    server.stop().await.unwrap();
    assert!(!server.is_running());
    assert_eq!(server.local_addr(), None);

    let addr = server.start().await.unwrap();
    assert!(server.is_running());

    server.stop().await.unwrap();
    server.stop().await.unwrap();
    assert!(!server.is_running());
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());

    server.start().await.unwrap();
    assert!(server.is_running());
    server.stop().await.unwrap();
}

#[tokio::test]
async fn drop_releases_listener() {
    let tmp = fixture();
    let (server, addr) = start(&tmp, false).await;
    drop(server);

    let mut released = false;
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_err() {
            released = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(released, "listener should be closed after drop");
}

#[tokio::test]
async fn port_in_use_is_a_server_error() {
    let tmp = fixture();
    let (mut first, addr) = start(&tmp, false).await;

    let config =
        ServerConfig::new(tmp.path().join("share"), "127.0.0.1", addr.port(), false).unwrap();
    let mut second = FileServer::new(config);
    let err = second.start().await.unwrap_err();
    assert!(matches!(err, Error::Server(_)));
    assert!(!second.is_running());

    first.stop().await.unwrap();
}

#[test]
fn config_rejects_missing_directory() {
    let tmp = tempfile::tempdir().unwrap();
    let missing = tmp.path().join("nope");
    assert!(ServerConfig::new(&missing, "127.0.0.1", 0, false).is_err());
    assert!(!Path::new(&missing).exists());
}
