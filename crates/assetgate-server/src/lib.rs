//! HTTP gateway that answers stable asset URLs from a build manifest.
//!
//! Requests for configured aliases (`/main.js`, `/main.css`, ...) are resolved
//! through the bundler manifest to the current content-hashed file and
//! answered with a redirect or the proxied file. Everything else passes
//! through to the asset store. All responses carry a permissive CORS header
//! set.
//!
//! The [`TestServer`] helper starts a gateway on a random port for integration testing.

pub mod config;
pub mod cors;
pub mod gateway;
pub mod loader;

pub use config::{ConfigError, GatewayConfig, ResponseStrategy};
pub use gateway::{Gateway, Route};

use assetgate_store::{is_hop_by_hop, AssetRequest, AssetResponse, Headers, Method};
use std::io::{Cursor, Read};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tiny_http::{Header, Response, Server, StatusCode};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {reason}")]
    Bind { addr: String, reason: String },
    #[error("listener is not bound to an IP address")]
    NotIp,
}

/// Largest request body the gateway buffers and forwards.
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Why an incoming request was answered without reaching the gateway.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("unsupported method {0}")]
    Method(String),
    #[error("request body exceeds {} bytes", MAX_BODY_BYTES)]
    BodyTooLarge,
    #[error("request body ended after {received} of {expected} bytes")]
    Truncated { received: usize, expected: usize },
    #[error("failed to read request body: {0}")]
    Body(#[from] std::io::Error),
}

impl RequestError {
    pub fn response(&self) -> AssetResponse {
        match self {
            Self::Method(_) => gateway::method_not_allowed(),
            Self::BodyTooLarge => gateway::rejected(413, gateway::PAYLOAD_TOO_LARGE),
            Self::Truncated { .. } | Self::Body(_) => {
                gateway::rejected(400, gateway::BAD_REQUEST)
            }
        }
    }
}

/// Convert a tiny_http request into a store request, reading the whole body.
fn read_request(req: &mut tiny_http::Request) -> Result<AssetRequest, RequestError> {
    let method = Method::parse(req.method().as_str())
        .ok_or_else(|| RequestError::Method(req.method().to_string()))?;
    let declared = req.body_length();
    if declared.is_some_and(|len| len > MAX_BODY_BYTES) {
        return Err(RequestError::BodyTooLarge);
    }
    let headers: Headers = req
        .headers()
        .iter()
        .map(|h| (h.field.as_str().as_str(), h.value.as_str()))
        .collect();

    let mut body = Vec::new();
    req.as_reader()
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut body)?;
    if body.len() > MAX_BODY_BYTES {
        return Err(RequestError::BodyTooLarge);
    }
    if let Some(expected) = declared {
        if body.len() < expected {
            return Err(RequestError::Truncated {
                received: body.len(),
                expected,
            });
        }
    }

    Ok(AssetRequest {
        method,
        target: req.url().to_owned(),
        headers,
        body,
    })
}

/// Length to advertise for a response. HEAD answers carry no body, so the
/// store's `Content-Length` is trusted when present.
fn entity_length(resp: &AssetResponse, head: bool) -> usize {
    if head {
        if let Some(len) = resp
            .headers
            .get("content-length")
            .and_then(|v| v.trim().parse().ok())
        {
            return len;
        }
    }
    resp.body.len()
}

fn respond(req: tiny_http::Request, resp: AssetResponse) {
    let head = *req.method() == tiny_http::Method::Head;
    let length = entity_length(&resp, head);

    let mut headers = Vec::with_capacity(resp.headers.len());
    for (name, value) in resp.headers.iter() {
        if is_hop_by_hop(name) || name.eq_ignore_ascii_case("content-length") {
            continue;
        }
        match Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => headers.push(header),
            Err(()) => debug!("dropping invalid header {name}"),
        }
    }

    let mut out = Response::new(
        StatusCode(resp.status),
        headers,
        Cursor::new(resp.body),
        Some(length),
        None,
    );
    if head {
        // Large HEAD answers must not switch to chunked framing, which
        // would hide the length.
        out = out.with_chunked_threshold(usize::MAX);
    }
    if let Err(e) = req.respond(out) {
        debug!("failed to send response: {e}");
    }
}

/// Handle a single HTTP request.
pub fn handle_request(gateway: &Gateway, mut req: tiny_http::Request) {
    let resp = match read_request(&mut req) {
        Ok(request) => gateway.handle(&request),
        Err(e) => {
            warn!("{} {}: {e}", req.method(), req.url());
            e.response()
        }
    };
    respond(req, resp);
}

/// A bound listener, ready to serve.
pub struct GatewayServer {
    server: Arc<Server>,
    addr: SocketAddr,
}

impl GatewayServer {
    pub fn bind(addr: &str) -> Result<Self, ServerError> {
        let server = Server::http(addr).map_err(|e| ServerError::Bind {
            addr: addr.to_owned(),
            reason: e.to_string(),
        })?;
        let addr = server.server_addr().to_ip().ok_or(ServerError::NotIp)?;
        Ok(Self {
            server: Arc::new(server),
            addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Handle that stops `workers` request loops when triggered.
    pub fn shutdown_handle(&self, workers: usize) -> impl Fn() + Send + 'static {
        let server = Arc::clone(&self.server);
        move || {
            for _ in 0..workers.max(1) {
                server.unblock();
            }
        }
    }

    /// Serve requests on `workers` threads until unblocked.
    pub fn run(self, gateway: Arc<Gateway>, workers: usize) {
        let workers = workers.max(1);
        info!("listening on http://{} with {workers} workers", self.addr);
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let server = Arc::clone(&self.server);
                let gateway = Arc::clone(&gateway);
                std::thread::spawn(move || {
                    for request in server.incoming_requests() {
                        handle_request(&gateway, request);
                    }
                })
            })
            .collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!("request worker panicked");
            }
        }
        info!("server stopped");
    }
}

/// Bind `addr` and serve until a shutdown signal arrives.
pub fn run_server(gateway: Gateway, addr: &str, workers: usize) -> Result<(), ServerError> {
    let server = GatewayServer::bind(addr)?;
    let shutdown = server.shutdown_handle(workers);
    if let Err(e) = ctrlc::set_handler(move || {
        info!("shutdown requested");
        shutdown();
    }) {
        warn!("failed to install signal handler: {e}");
    }
    server.run(Arc::new(gateway), workers);
    Ok(())
}

/// A test helper that starts a gateway on a random port in a background thread.
///
/// The server listens on `127.0.0.1:{port}`. Dropping the `TestServer`
/// stops it via `Server::unblock`.
pub struct TestServer {
    pub url: String,
    pub port: u16,
    server: Arc<Server>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl TestServer {
    pub fn start(gateway: Gateway) -> Self {
        let server =
            Arc::new(Server::http("127.0.0.1:0").expect("failed to bind test HTTP server"));
        let port = server.server_addr().to_ip().expect("not an IP addr").port();
        let url = format!("http://127.0.0.1:{port}");

        let srv = Arc::clone(&server);
        let handle = std::thread::spawn(move || {
            for request in srv.incoming_requests() {
                handle_request(&gateway, request);
            }
        });

        Self {
            url,
            port,
            server,
            handle: Some(handle),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
