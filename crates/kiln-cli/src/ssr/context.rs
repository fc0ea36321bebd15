//! Per-request render context.

use axum::http::{header, HeaderMap, Uri};
use regex::Regex;
use std::sync::LazyLock;

static ACCESS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"accessToken=(\w+)").expect("valid regex"));

/// URL and auth token of one incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Path and query as received
    pub url: String,
    pub auth_token: Option<String>,
}

impl RequestContext {
    pub fn new(url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            url: url.into(),
            auth_token,
        }
    }

    pub fn from_parts(uri: &Uri, headers: &HeaderMap) -> Self {
        let url = uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| uri.path().to_string());

        // Several Cookie headers are allowed over HTTP/2
        let auth_token = headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(extract_access_token);

        Self { url, auth_token }
    }
}

/// First `accessToken=<word>` in a cookie header.
pub fn extract_access_token(cookie: &str) -> Option<String> {
    ACCESS_TOKEN
        .captures(cookie)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
