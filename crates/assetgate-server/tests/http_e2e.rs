//! HTTP client ↔ gateway E2E integration tests.
//!
//! These tests start a real gateway in-process on a random port, backed by a
//! build directory on disk, and talk to it over TCP. No mocks.

use assetgate_manifest::AliasTable;
use assetgate_server::{Gateway, GatewayConfig, ResponseStrategy, TestServer, MAX_BODY_BYTES};
use assetgate_store::{DirStore, OriginConfig};
use std::collections::HashMap;
use std::fs;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::path::Path;

const MANIFEST: &str = r#"{
  "src/js/main.js": {
    "file": "js/main.ab12cd34.js",
    "src": "src/js/main.js",
    "isEntry": true,
    "css": ["css/main.ab12cd34.css"]
  },
  "src/js/parallax-image.js": {
    "file": "js/parallax-image.0badc0de.js",
    "isEntry": true
  }
}"#;

fn write_dist(root: &Path, manifest: &str) {
    fs::create_dir_all(root.join(".vite")).unwrap();
    fs::create_dir_all(root.join("js")).unwrap();
    fs::create_dir_all(root.join("css")).unwrap();
    fs::write(root.join(".vite/manifest.json"), manifest).unwrap();
    fs::write(root.join("js/main.ab12cd34.js"), "console.log('main')").unwrap();
    fs::write(root.join("js/parallax-image.0badc0de.js"), "parallax()").unwrap();
    fs::write(root.join("css/main.ab12cd34.css"), "body{margin:0}").unwrap();
    fs::write(root.join("robots.txt"), "User-agent: *").unwrap();
}

fn start(strategy: ResponseStrategy, manifest: &str) -> (TestServer, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    write_dist(dir.path(), manifest);
    let gateway = Gateway::new(
        Box::new(DirStore::new(dir.path())),
        AliasTable::from_preset("webflow").unwrap(),
    )
    .with_strategy(strategy);
    (TestServer::start(gateway), dir)
}

struct RawResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

/// Send one request over a fresh connection and read the whole response.
fn raw_request(server: &TestServer, method: &str, path: &str) -> RawResponse {
    let request = format!("{method} {path} HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n");
    exchange(server, request.as_bytes())
}

/// Write raw request bytes, close the sending half and read the response.
fn exchange(server: &TestServer, request: &[u8]) -> RawResponse {
    let mut stream = TcpStream::connect(("127.0.0.1", server.port)).unwrap();
    stream.write_all(request).unwrap();
    stream.shutdown(Shutdown::Write).unwrap();
    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).unwrap();

    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("response has a header block");
    let head = String::from_utf8_lossy(&raw[..split]).into_owned();
    let body = raw[split + 4..].to_vec();

    let mut lines = head.lines();
    let status_line = lines.next().unwrap();
    let status = status_line.split(' ').nth(1).unwrap().parse().unwrap();
    let headers = lines
        .filter_map(|l| l.split_once(": "))
        .map(|(k, v)| (k.to_lowercase(), v.to_owned()))
        .collect();
    RawResponse {
        status,
        headers,
        body,
    }
}

fn assert_cors(resp: &RawResponse) {
    assert_eq!(
        resp.headers.get("access-control-allow-origin").map(String::as_str),
        Some("*")
    );
    assert_eq!(
        resp.headers.get("access-control-allow-methods").map(String::as_str),
        Some("GET, HEAD, POST, OPTIONS")
    );
    assert_eq!(
        resp.headers.get("access-control-allow-headers").map(String::as_str),
        Some("Content-Type")
    );
}

#[test]
fn http_e2e_preflight() {
    let (server, _dir) = start(ResponseStrategy::Redirect, MANIFEST);
    for path in ["/main.js", "/does/not/exist"] {
        let resp = raw_request(&server, "OPTIONS", path);
        assert_eq!(resp.status, 200);
        assert!(resp.body.is_empty());
        assert_cors(&resp);
    }
}

#[test]
fn http_e2e_redirect_strategy() {
    let (server, _dir) = start(ResponseStrategy::Redirect, MANIFEST);

    let js = raw_request(&server, "GET", "/main.js");
    assert_eq!(js.status, 302);
    assert_eq!(
        js.headers.get("location").map(String::as_str),
        Some("/js/main.ab12cd34.js")
    );
    assert_eq!(
        js.headers.get("cache-control").map(String::as_str),
        Some("no-cache")
    );
    assert_cors(&js);

    let css = raw_request(&server, "GET", "/main.css");
    assert_eq!(css.status, 302);
    assert_eq!(
        css.headers.get("location").map(String::as_str),
        Some("/css/main.ab12cd34.css")
    );
}

#[test]
fn http_e2e_client_follows_redirect_to_content() {
    let (server, _dir) = start(ResponseStrategy::Redirect, MANIFEST);
    let body = ureq::get(&format!("{}/parallax-image.js", server.url))
        .call()
        .unwrap()
        .into_body()
        .read_to_string()
        .unwrap();
    assert_eq!(body, "parallax()");
}

#[test]
fn http_e2e_proxy_strategy() {
    let (server, _dir) = start(ResponseStrategy::Proxy, MANIFEST);
    let resp = raw_request(&server, "GET", "/main.js");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, b"console.log('main')");
    assert_eq!(
        resp.headers.get("content-type").map(String::as_str),
        Some("text/javascript; charset=utf-8")
    );
    assert_cors(&resp);
}

#[test]
fn http_e2e_entry_not_found() {
    let (server, _dir) = start(ResponseStrategy::Redirect, "{}");
    let resp = raw_request(&server, "GET", "/main.js");
    assert_eq!(resp.status, 404);
    assert_eq!(resp.body, b"Entry not found in manifest");
    assert_cors(&resp);
}

#[test]
fn http_e2e_manifest_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = Gateway::new(
        Box::new(DirStore::new(dir.path())),
        AliasTable::from_preset("webflow").unwrap(),
    );
    let server = TestServer::start(gateway);
    let resp = raw_request(&server, "GET", "/main.css");
    assert_eq!(resp.status, 500);
    assert_eq!(resp.body, b"Manifest not found");
    assert_cors(&resp);
}

#[test]
fn http_e2e_pass_through_cache_control() {
    let (server, _dir) = start(ResponseStrategy::Redirect, MANIFEST);

    let hashed = raw_request(&server, "GET", "/js/main.ab12cd34.js");
    assert_eq!(hashed.status, 200);
    assert_eq!(
        hashed.headers.get("cache-control").map(String::as_str),
        Some("public, max-age=31536000, immutable")
    );
    assert_cors(&hashed);

    let plain = raw_request(&server, "GET", "/robots.txt");
    assert_eq!(plain.status, 200);
    assert_eq!(plain.body, b"User-agent: *");
    assert_eq!(
        plain.headers.get("cache-control").map(String::as_str),
        Some("no-cache")
    );

    let missing = raw_request(&server, "GET", "/missing.js");
    assert_eq!(missing.status, 404);
    assert_cors(&missing);
}

#[test]
fn http_e2e_head_reports_entity_length() {
    let (server, _dir) = start(ResponseStrategy::Proxy, MANIFEST);

    let plain = raw_request(&server, "HEAD", "/robots.txt");
    assert_eq!(plain.status, 200);
    assert!(plain.body.is_empty());
    assert_eq!(
        plain.headers.get("content-length").map(String::as_str),
        Some("13")
    );
    assert_cors(&plain);

    let proxied = raw_request(&server, "HEAD", "/main.js");
    assert_eq!(proxied.status, 200);
    assert!(proxied.body.is_empty());
    assert_eq!(
        proxied.headers.get("content-length").map(String::as_str),
        Some("19")
    );

    let get = raw_request(&server, "GET", "/robots.txt");
    assert_eq!(
        get.headers.get("content-length").map(String::as_str),
        Some("13")
    );
}

#[test]
fn http_e2e_oversized_body_is_rejected() {
    let (server, _dir) = start(ResponseStrategy::Redirect, MANIFEST);
    let request = format!(
        "POST /api/form HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\nContent-Length: {}\r\n\r\n",
        MAX_BODY_BYTES + 1
    );
    let resp = exchange(&server, request.as_bytes());
    assert_eq!(resp.status, 413);
    assert_eq!(resp.body, b"Payload too large");
    assert_cors(&resp);
}

#[test]
fn http_e2e_truncated_body_is_rejected() {
    let (server, _dir) = start(ResponseStrategy::Redirect, MANIFEST);
    let request = b"POST /api/form HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\nContent-Length: 4096\r\n\r\nonly-a-bit";
    let resp = exchange(&server, request);
    assert_eq!(resp.status, 400);
    assert_eq!(resp.body, b"Bad request");
    assert_cors(&resp);
}

#[test]
fn http_e2e_unsupported_method() {
    let (server, _dir) = start(ResponseStrategy::Redirect, MANIFEST);
    let resp = raw_request(&server, "PATCH", "/robots.txt");
    assert_eq!(resp.status, 405);
    assert_cors(&resp);
}

#[test]
fn http_e2e_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let dist = dir.path().join("dist");
    write_dist(&dist, MANIFEST);
    fs::write(dist.join("manifest.json"), MANIFEST).unwrap();

    let mut config = GatewayConfig::default();
    config.origin = OriginConfig::dir(&dist);
    config.manifest.path = "/manifest.json".to_owned();
    config.aliases.preset = "nested".to_owned();
    let gateway = Gateway::from_config(&config).unwrap();
    let server = TestServer::start(gateway);

    let resp = raw_request(&server, "GET", "/js/main.js");
    assert_eq!(resp.status, 302);
    assert_eq!(
        resp.headers.get("location").map(String::as_str),
        Some("/js/main.ab12cd34.js")
    );
    // /main.js is not an alias in this preset
    let passthrough = raw_request(&server, "GET", "/main.js");
    assert_eq!(passthrough.status, 404);
    assert_eq!(
        passthrough.headers.get("cache-control").map(String::as_str),
        Some("no-cache")
    );
}
