use crate::{mime, AssetRequest, AssetResponse, AssetStore, Method, StoreError};
use assetgate_manifest::is_content_hashed;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

pub const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";
pub const REVALIDATE_CACHE: &str = "public, max-age=0, must-revalidate";

/// Serves a build output directory, the way a static-asset host would.
///
/// Only `GET` and `HEAD` are answered. Directory targets fall back to their
/// `index.html`. Content-hashed names are marked immutable, everything else
/// must revalidate.
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a URL path onto the root. `None` if it tries to leave the root.
    fn local_path(&self, url_path: &str) -> Option<PathBuf> {
        let relative = Path::new(url_path.trim_start_matches('/'));
        let mut full = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => full.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        if full.is_dir() {
            full.push("index.html");
        }
        Some(full)
    }
}

impl AssetStore for DirStore {
    fn name(&self) -> &'static str {
        "dir"
    }

    fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, StoreError> {
        if !matches!(request.method, Method::Get | Method::Head) {
            return Ok(
                AssetResponse::text(405, "Method Not Allowed").with_header("Allow", "GET, HEAD")
            );
        }

        let url_path = request.path();
        let Some(path) = self.local_path(url_path) else {
            tracing::debug!("rejecting traversal outside store root: {url_path}");
            return Ok(AssetResponse::text(404, "Not Found"));
        };

        let body = match fs::read(&path) {
            Ok(body) => body,
            Err(e) if e.kind() == ErrorKind::NotFound || !path.is_file() => {
                return Ok(AssetResponse::text(404, "Not Found"));
            }
            Err(e) => return Err(e.into()),
        };

        let cache = if is_content_hashed(url_path) {
            IMMUTABLE_CACHE
        } else {
            REVALIDATE_CACHE
        };
        let resp = AssetResponse::new(200)
            .with_header("Content-Type", mime::from_path(&path))
            .with_header("Cache-Control", cache);

        if request.method == Method::Head {
            return Ok(resp.with_header("Content-Length", &body.len().to_string()));
        }
        Ok(resp.with_body(body))
    }
}
