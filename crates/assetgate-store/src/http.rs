use crate::{is_hop_by_hop, AssetRequest, AssetResponse, AssetStore, Headers, Method, StoreError};
use std::io::Read;

/// Request headers that the agent sets itself or that would change the
/// encoding of the relayed body.
const DROPPED_REQUEST_HEADERS: &[&str] = &["host", "content-length", "accept-encoding"];

/// Response headers describing the upstream body framing, which the agent
/// has already consumed. A `HEAD` answer has no body to decode, so its
/// `Content-Length` is kept as the entity length.
const DROPPED_RESPONSE_HEADERS: &[&str] = &["content-length", "content-encoding"];

/// Asset store backed by a remote HTTP origin.
///
/// Requests are forwarded as `{base_url}{target}` with method, headers and
/// body preserved. Error statuses are relayed as responses.
pub struct HttpStore {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpStore {
    pub fn new(base_url: &str) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .build()
            .into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, target: &str) -> String {
        if target.starts_with('/') {
            format!("{}{target}", self.base_url)
        } else {
            format!("{}/{target}", self.base_url)
        }
    }
}

fn forward_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &Headers,
) -> ureq::RequestBuilder<B> {
    for (name, value) in headers.iter() {
        if is_hop_by_hop(name)
            || DROPPED_REQUEST_HEADERS
                .iter()
                .any(|d| d.eq_ignore_ascii_case(name))
        {
            continue;
        }
        builder = builder.header(name, value);
    }
    builder
}

impl AssetStore for HttpStore {
    fn name(&self) -> &'static str {
        "http"
    }

    fn fetch(&self, request: &AssetRequest) -> Result<AssetResponse, StoreError> {
        let url = self.url(&request.target);
        tracing::debug!("{} {url}", request.method);

        let headers = &request.headers;
        let body: &[u8] = &request.body;
        let result = match request.method {
            Method::Get => forward_headers(self.agent.get(&url), headers).call(),
            Method::Head => forward_headers(self.agent.head(&url), headers)
                .header("Accept-Encoding", "identity")
                .call(),
            Method::Delete => forward_headers(self.agent.delete(&url), headers).call(),
            Method::Options => forward_headers(self.agent.options(&url), headers).call(),
            Method::Post => forward_headers(self.agent.post(&url), headers).send(body),
            Method::Put => forward_headers(self.agent.put(&url), headers).send(body),
        };
        let resp = result.map_err(|e| StoreError::Http(format!("{} {url}: {e}", request.method)))?;

        let status = resp.status().as_u16();
        let mut relayed = Headers::new();
        for (name, value) in resp.headers() {
            let name = name.as_str();
            let keep_length = request.method == Method::Head && name == "content-length";
            if is_hop_by_hop(name)
                || (!keep_length
                    && DROPPED_RESPONSE_HEADERS
                        .iter()
                        .any(|d| d.eq_ignore_ascii_case(name)))
            {
                continue;
            }
            match value.to_str() {
                Ok(value) => relayed.append(name, value),
                Err(_) => tracing::debug!("dropping non-ASCII header {name} from {url}"),
            }
        }

        let mut body = Vec::new();
        if request.method != Method::Head {
            resp.into_body()
                .into_reader()
                .read_to_end(&mut body)
                .map_err(|e| StoreError::Http(format!("reading body of {url}: {e}")))?;
        }

        Ok(AssetResponse {
            status,
            headers: relayed,
            body,
        })
    }
}
