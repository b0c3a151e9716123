//! Static asset stores sitting behind the assetgate resolver.
//!
//! A store answers plain HTTP-shaped requests for built files. Three backends
//! are provided: [`HttpStore`] forwards to a remote origin, [`DirStore`] serves
//! a local build output directory, and [`MemoryStore`] holds canned responses
//! for tests. Non-2xx answers are ordinary responses; [`StoreError`] is kept
//! for failures where no response exists at all.

pub mod config;
pub mod dir;
pub mod http;
pub mod memory;
pub mod mime;

pub use config::OriginConfig;
pub use dir::DirStore;
pub use http::HttpStore;
pub use memory::MemoryStore;

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("origin config error: {0}")]
    Config(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Options,
}

impl Method {
    /// Parse an HTTP method token. Returns `None` for methods stores can't forward.
    pub fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_uppercase().as_str() {
            "GET" => Some(Self::Get),
            "HEAD" => Some(Self::Head),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            "OPTIONS" => Some(Self::Options),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Head => "HEAD",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An ordered header list with case-insensitive names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Replace every value of `name` with a single `value`.
    pub fn set(&mut self, name: &str, value: &str) {
        self.remove(name);
        self.append(name, value);
    }

    pub fn append(&mut self, name: &str, value: &str) {
        self.0.push((name.to_owned(), value.to_owned()));
    }

    pub fn remove(&mut self, name: &str) {
        self.0.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Headers {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (name, value) in iter {
            headers.append(name, value);
        }
        headers
    }
}

/// Connection-scoped headers that must not be relayed between hops.
pub fn is_hop_by_hop(name: &str) -> bool {
    const HOP_BY_HOP: &[&str] = &[
        "connection",
        "keep-alive",
        "proxy-authenticate",
        "proxy-authorization",
        "te",
        "trailer",
        "transfer-encoding",
        "upgrade",
    ];
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// A request for a stored asset. `target` is the path plus any query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRequest {
    pub method: Method,
    pub target: String,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl AssetRequest {
    pub fn new(method: Method, target: &str) -> Self {
        Self {
            method,
            target: target.to_owned(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn get(target: &str) -> Self {
        Self::new(Method::Get, target)
    }

    /// The target without its query string.
    pub fn path(&self) -> &str {
        split_target(&self.target).0
    }
}

/// Split a request target into path and optional query.
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (target, None),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl AssetResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self::new(status)
            .with_header("Content-Type", mime::PLAIN)
            .with_body(body.as_bytes().to_vec())
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.set(name, value);
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Trait for asset store backends.
pub trait AssetStore: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fetch a stored asset. Upstream error statuses come back as `Ok`.
    fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, StoreError>;
}

impl<T: AssetStore + ?Sized> AssetStore for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, StoreError> {
        (**self).fetch(request)
    }
}
