//! End-to-end tests: a real server on an ephemeral port, a real hyper
//! client, and a stub renderer standing in for wkhtmltoimage so the wire
//! contract is testable everywhere. The one test that exercises the real
//! renderer is ignored unless wkhtmltoimage is installed.

use std::net::SocketAddr;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Method, StatusCode};
use hyper_util::rt::TokioIo;
use rasterd::{Renderer, Server};
use tokio::net::TcpStream;
use tokio::sync::oneshot;

const PNG_MAGIC: &[u8; 8] = b"\x89PNG\r\n\x1a\n";
const URLENCODED: Option<&str> = Some("application/x-www-form-urlencoded");

// ── Test harness ──────────────────────────────────────────────────────────────

/// A running server plus the trigger that stops it.
struct TestServer {
    addr: SocketAddr,
    stop: oneshot::Sender<()>,
    done: tokio::task::JoinHandle<Result<(), rasterd::Error>>,
}

async fn spawn_server(renderer: Renderer) -> TestServer {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel();
    let done = tokio::spawn(server.serve_until(renderer, async move {
        let _ = stopped.await;
    }));
    TestServer { addr, stop, done }
}

impl TestServer {
    async fn shutdown(self) {
        let _ = self.stop.send(());
        self.done.await.unwrap().unwrap();
    }
}

async fn post(
    addr: SocketAddr,
    content_type: Option<&str>,
    body: &[u8],
) -> (StatusCode, hyper::HeaderMap, Bytes) {
    request(addr, Method::POST, "/", content_type, body).await
}

async fn request(
    addr: SocketAddr,
    method: Method,
    path: &str,
    content_type: Option<&str>,
    body: &[u8],
) -> (StatusCode, hyper::HeaderMap, Bytes) {
    let stream = TcpStream::connect(addr).await.unwrap();
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream))
        .await
        .unwrap();
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let mut req = hyper::Request::builder().method(method).uri(path);
    if let Some(ct) = content_type {
        req = req.header(CONTENT_TYPE, ct);
    }
    let req = req.body(Full::new(Bytes::copy_from_slice(body))).unwrap();

    let res = sender.send_request(req).await.unwrap();
    let status = res.status();
    let headers = res.headers().clone();
    let body = res.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body)
}

// ── Stub renderers ────────────────────────────────────────────────────────────
//
// The wire contract does not depend on what the renderer draws, so most
// tests run against a tiny script that consumes stdin and prints PNG-shaped
// bytes. Each stub gets a unique path: tests run in parallel and rewriting a
// script while another test executes it would fail.

#[cfg(unix)]
fn stub_renderer(name: &str, script: &str) -> std::path::PathBuf {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::sync::atomic::{AtomicU32, Ordering};

    static SEQ: AtomicU32 = AtomicU32::new(0);
    let seq = SEQ.fetch_add(1, Ordering::Relaxed);
    let path = std::env::temp_dir().join(format!(
        "rasterd-{name}-{}-{seq}",
        std::process::id()
    ));
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(script.as_bytes()).unwrap();
    file.set_permissions(std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
fn png_stub() -> Renderer {
    let path = stub_renderer(
        "ok",
        "#!/bin/sh\ncat >/dev/null\nprintf '\\211PNG\\r\\n\\032\\n'\nprintf 'deterministic-stub-payload'\n",
    );
    Renderer::with_program(path)
}

#[cfg(unix)]
fn failing_stub() -> Renderer {
    let path = stub_renderer("fail", "#!/bin/sh\ncat >/dev/null\nexit 1\n");
    Renderer::with_program(path)
}

#[cfg(unix)]
fn silent_stub() -> Renderer {
    let path = stub_renderer("silent", "#!/bin/sh\ncat >/dev/null\nexit 0\n");
    Renderer::with_program(path)
}

// ── The wire contract ─────────────────────────────────────────────────────────

#[cfg(unix)]
#[tokio::test]
async fn urlencoded_post_returns_png() {
    let server = spawn_server(png_stub()).await;

    let (status, headers, body) =
        post(server.addr, URLENCODED, b"html=%3Ch1%3Ehello%3C%2Fh1%3E").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[CONTENT_TYPE], "image/png");
    assert_eq!(headers[CONTENT_LENGTH], body.len().to_string().as_str());
    assert_eq!(&body[..8], PNG_MAGIC);

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn multipart_post_returns_png() {
    let server = spawn_server(png_stub()).await;

    // Built the way form-data writers put it on the wire.
    let boundary = "------------------------d74496d66958873e";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"html\"\r\n\r\n");
    body.extend_from_slice(b"<h1>card</h1>");
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let ct = format!("multipart/form-data; boundary={boundary}");
    let (status, headers, body) = post(server.addr, Some(&ct), &body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[CONTENT_TYPE], "image/png");
    assert_eq!(&body[..8], PNG_MAGIC);

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn every_path_is_the_same_endpoint() {
    let server = spawn_server(png_stub()).await;

    for path in ["/", "/render", "/some/deep/path?ignored=1"] {
        let (status, _, body) =
            request(server.addr, Method::POST, path, URLENCODED, b"html=x").await;
        assert_eq!(status, StatusCode::OK, "path {path}");
        assert_eq!(&body[..8], PNG_MAGIC, "path {path}");
    }

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn identical_posts_get_identical_responses() {
    let server = spawn_server(png_stub()).await;

    let body = b"html=%3Cp%3Etwice%3C%2Fp%3E";
    let first = post(server.addr, URLENCODED, body).await;
    let second = post(server.addr, URLENCODED, body).await;

    assert_eq!(first.0, StatusCode::OK);
    assert_eq!(second.0, StatusCode::OK);
    assert_eq!(first.2, second.2);

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn missing_html_field_is_rejected() {
    let server = spawn_server(png_stub()).await;

    let (status, headers, body) = post(server.addr, URLENCODED, b"title=x").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    // Never a 200 with a PNG body.
    assert_ne!(headers[CONTENT_TYPE], "image/png");
    assert!(!body.starts_with(PNG_MAGIC));

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn empty_body_is_rejected() {
    let server = spawn_server(png_stub()).await;

    let (status, _, body) = post(server.addr, None, b"").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!body.starts_with(PNG_MAGIC));

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn non_post_methods_are_rejected() {
    let server = spawn_server(png_stub()).await;

    for method in [Method::GET, Method::PUT, Method::DELETE] {
        let (status, _, _) = request(server.addr, method.clone(), "/", None, b"").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "method {method}");
    }

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn renderer_failure_maps_to_bad_gateway() {
    let server = spawn_server(failing_stub()).await;

    let (status, headers, _) = post(server.addr, URLENCODED, b"html=x").await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_ne!(headers[CONTENT_TYPE], "image/png");

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn empty_renderer_output_maps_to_bad_gateway() {
    let server = spawn_server(silent_stub()).await;

    let (status, _, _) = post(server.addr, URLENCODED, b"html=x").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    server.shutdown().await;
}

#[tokio::test]
async fn missing_renderer_binary_maps_to_bad_gateway() {
    let server = spawn_server(Renderer::with_program("/nonexistent/renderer-binary")).await;

    let (status, _, body) = post(server.addr, URLENCODED, b"html=x").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(!body.starts_with(PNG_MAGIC));

    server.shutdown().await;
}

#[cfg(unix)]
#[tokio::test]
async fn shutdown_closes_the_listening_socket() {
    let server = spawn_server(png_stub()).await;
    let addr = server.addr;

    // Healthy before shutdown…
    let (status, _, _) = post(addr, URLENCODED, b"html=x").await;
    assert_eq!(status, StatusCode::OK);

    server.shutdown().await;

    // …and the port no longer accepts connections after.
    assert!(TcpStream::connect(addr).await.is_err());
}

// ── The real thing ────────────────────────────────────────────────────────────

#[tokio::test]
#[ignore] // Requires wkhtmltoimage to be installed
async fn real_wkhtmltoimage_end_to_end() {
    let server = spawn_server(Renderer::new()).await;

    let (status, headers, body) = post(
        server.addr,
        URLENCODED,
        b"html=%3Ch1%3Ehello%20from%20rasterd%3C%2Fh1%3E",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[CONTENT_TYPE], "image/png");
    assert_eq!(headers[CONTENT_LENGTH], body.len().to_string().as_str());
    assert_eq!(&body[..8], PNG_MAGIC);

    server.shutdown().await;
}
