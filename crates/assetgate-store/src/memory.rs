use crate::{AssetRequest, AssetResponse, AssetStore, Method, StoreError};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, RwLock};

/// In-process store with canned responses, for tests.
///
/// Responses are keyed by the full request target first, then by the path
/// alone. Unknown targets answer 404. Every fetch is recorded.
#[derive(Default)]
pub struct MemoryStore {
    responses: RwLock<HashMap<String, AssetResponse>>,
    failing: RwLock<HashSet<String>>,
    requests: Mutex<Vec<(Method, String)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, target: &str, response: AssetResponse) {
        let mut responses = self.responses.write().expect("responses lock poisoned");
        responses.insert(target.to_owned(), response);
    }

    /// Store `body` as a 200 response with the given Content-Type.
    pub fn insert_file(&self, target: &str, content_type: &str, body: &[u8]) {
        self.insert(
            target,
            AssetResponse::new(200)
                .with_header("Content-Type", content_type)
                .with_body(body.to_vec()),
        );
    }

    /// Make fetches of `target` fail as if the origin were unreachable.
    pub fn fail(&self, target: &str) {
        let mut failing = self.failing.write().expect("failing lock poisoned");
        failing.insert(target.to_owned());
    }

    pub fn requests(&self) -> Vec<(Method, String)> {
        self.requests.lock().expect("requests lock poisoned").clone()
    }

    pub fn request_count(&self, target: &str) -> usize {
        self.requests
            .lock()
            .expect("requests lock poisoned")
            .iter()
            .filter(|(_, t)| t == target)
            .count()
    }
}

impl AssetStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, StoreError> {
        self.requests
            .lock()
            .map_err(|e| StoreError::Http(format!("mutex poisoned: {e}")))?
            .push((request.method, request.target.clone()));

        let failing = self
            .failing
            .read()
            .map_err(|e| StoreError::Http(format!("lock poisoned: {e}")))?;
        if failing.contains(&request.target) || failing.contains(request.path()) {
            return Err(StoreError::Http(format!(
                "connection refused: {}",
                request.target
            )));
        }
        drop(failing);

        let responses = self
            .responses
            .read()
            .map_err(|e| StoreError::Http(format!("lock poisoned: {e}")))?;
        let found = responses
            .get(&request.target)
            .or_else(|| responses.get(request.path()));
        let mut resp = found
            .cloned()
            .unwrap_or_else(|| AssetResponse::text(404, "Not Found"));
        if request.method == Method::Head {
            resp.body.clear();
        }
        Ok(resp)
    }
}
