//! The CORS header set attached to every gateway response.

use assetgate_store::Headers;

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, HEAD, POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Content-Type";

pub const CORS_HEADERS: &[(&str, &str)] = &[
    ("Access-Control-Allow-Origin", ALLOW_ORIGIN),
    ("Access-Control-Allow-Methods", ALLOW_METHODS),
    ("Access-Control-Allow-Headers", ALLOW_HEADERS),
];

/// Set the CORS headers, overriding any values relayed from upstream.
pub fn apply(headers: &mut Headers) {
    for (name, value) in CORS_HEADERS {
        headers.set(name, value);
    }
}
