use regex::Regex;
use std::sync::LazyLock;

/// A dot, eight or more hex digits, then another dot: `name.<hash>.ext`.
static CONTENT_HASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.[a-f0-9]{8,}\.").expect("content-hash pattern is a valid regex")
});

/// Whether a request path names a content-hashed (immutable) build output.
pub fn is_content_hashed(path: &str) -> bool {
    CONTENT_HASH.is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_paths_match() {
        assert!(is_content_hashed("/assets/app.a1b2c3d4e5.js"));
        assert!(is_content_hashed("/js/main.ab12cd34.js"));
        assert!(is_content_hashed("/css/main.ABCDEF0123.css"));
    }

    #[test]
    fn short_or_missing_hash_does_not_match() {
        assert!(!is_content_hashed("/main.js"));
        assert!(!is_content_hashed("/assets/app.9f8e.js"));
        assert!(!is_content_hashed("/assets/app.1234567.js"));
    }

    #[test]
    fn non_hex_run_does_not_match() {
        assert!(!is_content_hashed("/assets/app.deadbeefzz.js"));
        assert!(!is_content_hashed("/assets/main-BxT3k9aZ.js"));
    }

    #[test]
    fn hash_needs_trailing_dot() {
        assert!(!is_content_hashed("/assets/app.a1b2c3d4e5"));
    }
}
