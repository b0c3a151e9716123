//! Request handling: classification, alias resolution and pass-through.
//!
//! Every request is handled on its own; the gateway holds no per-request
//! state. Each response leaves through [`Gateway::handle`], which attaches
//! the CORS header set.

use crate::config::{ConfigError, GatewayConfig, ResponseStrategy, DEFAULT_MANIFEST_PATH};
use crate::cors;
use crate::loader::ManifestLoader;
use assetgate_manifest::{is_content_hashed, resolve, Alias, AliasTable};
use assetgate_store::{AssetRequest, AssetResponse, AssetStore, Method};
use std::time::Duration;
use tracing::{debug, error, info, warn};

pub const MANIFEST_NOT_FOUND: &str = "Manifest not found";
pub const ENTRY_NOT_FOUND: &str = "Entry not found in manifest";
pub const UPSTREAM_FAILED: &str = "Upstream fetch failed";
pub const METHOD_NOT_ALLOWED: &str = "Method not allowed";
pub const BAD_REQUEST: &str = "Bad request";
pub const PAYLOAD_TOO_LARGE: &str = "Payload too large";

/// How a request is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    /// `OPTIONS` on any path.
    Preflight,
    /// A stable alias answered from the manifest.
    Alias(&'a Alias),
    /// Anything else, forwarded to the store.
    PassThrough,
}

pub struct Gateway {
    store: Box<dyn AssetStore>,
    aliases: AliasTable,
    loader: ManifestLoader,
    strategy: ResponseStrategy,
}

impl Gateway {
    pub fn new(store: Box<dyn AssetStore>, aliases: AliasTable) -> Self {
        Self {
            store,
            aliases,
            loader: ManifestLoader::new(DEFAULT_MANIFEST_PATH, Duration::ZERO),
            strategy: ResponseStrategy::default(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = config.origin.open()?;
        Ok(Self::new(store, config.alias_table()?)
            .with_strategy(config.response.strategy)
            .with_manifest(&config.manifest.path, config.manifest.cache_ttl()))
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: ResponseStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_manifest(mut self, path: &str, ttl: Duration) -> Self {
        self.loader = ManifestLoader::new(path, ttl);
        self
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn strategy(&self) -> ResponseStrategy {
        self.strategy
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }

    pub fn manifest_path(&self) -> &str {
        self.loader.path()
    }

    pub fn classify(&self, request: &AssetRequest) -> Route<'_> {
        if request.method == Method::Options {
            return Route::Preflight;
        }
        match self.aliases.classify(request.path()) {
            Some(alias) => Route::Alias(alias),
            None => Route::PassThrough,
        }
    }

    pub fn handle(&self, request: &AssetRequest) -> AssetResponse {
        let route = self.classify(request);
        debug!("{} {} -> {route:?}", request.method, request.target);
        let mut resp = match route {
            Route::Preflight => AssetResponse::new(200),
            Route::Alias(alias) => self.serve_alias(request, alias),
            Route::PassThrough => self.pass_through(request),
        };
        cors::apply(&mut resp.headers);
        resp
    }

    fn serve_alias(&self, request: &AssetRequest, alias: &Alias) -> AssetResponse {
        let manifest = match self.loader.load(self.store.as_ref()) {
            Ok(manifest) => manifest,
            Err(e) => {
                warn!("{}: {e}", alias.path);
                return AssetResponse::text(500, MANIFEST_NOT_FOUND);
            }
        };
        let Some(resolution) = resolve(&manifest, alias) else {
            warn!(
                "{}: no {} output for keys {:?} among {} manifest entries",
                alias.path,
                alias.kind(),
                alias.keys,
                manifest.len()
            );
            return AssetResponse::text(404, ENTRY_NOT_FOUND);
        };
        info!(
            "{} -> {} (key '{}', {})",
            alias.path,
            resolution.location(),
            resolution.key,
            resolution.phase
        );

        let location = resolution.location();
        match self.strategy {
            ResponseStrategy::Redirect => AssetResponse::new(302)
                .with_header("Location", &location)
                .with_header("Cache-Control", "no-cache"),
            ResponseStrategy::Proxy => {
                let method = if request.method == Method::Head {
                    Method::Head
                } else {
                    Method::Get
                };
                match self.store.fetch(&AssetRequest::new(method, &location)) {
                    Ok(resp) => resp,
                    Err(e) => {
                        error!("{} -> {location}: {e}", alias.path);
                        AssetResponse::text(502, UPSTREAM_FAILED)
                    }
                }
            }
        }
    }

    fn pass_through(&self, request: &AssetRequest) -> AssetResponse {
        let mut resp = match self.store.fetch(request) {
            Ok(resp) => resp,
            Err(e) => {
                error!("{} {}: {e}", request.method, request.target);
                AssetResponse::text(502, UPSTREAM_FAILED)
            }
        };
        if !is_content_hashed(request.path()) {
            resp.headers.set("Cache-Control", "no-cache");
        }
        resp
    }
}

/// Plain-text answer for a request rejected before routing.
pub fn rejected(status: u16, message: &str) -> AssetResponse {
    let mut resp = AssetResponse::text(status, message);
    cors::apply(&mut resp.headers);
    resp
}

/// Response for methods the gateway cannot forward.
pub fn method_not_allowed() -> AssetResponse {
    rejected(405, METHOD_NOT_ALLOWED)
        .with_header("Allow", "GET, HEAD, POST, PUT, DELETE, OPTIONS")
}
