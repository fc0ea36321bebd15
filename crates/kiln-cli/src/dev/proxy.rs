//! Backend proxy for the dev server.
//!
//! Requests whose path matches a [`ProxyRule`] are forwarded to the rule's
//! target with the original method, headers and body; the upstream response
//! is streamed back. Everything else continues down the handler list.

use crate::dev::config::ProxyRule;
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

#[derive(Clone)]
pub struct ProxyState {
    rule: Arc<ProxyRule>,
    client: reqwest::Client,
}

impl ProxyState {
    pub fn new(rule: ProxyRule) -> Self {
        Self {
            rule: Arc::new(rule),
            client: reqwest::Client::new(),
        }
    }

    fn upstream_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.rule.target.trim_end_matches('/'), path_and_query)
    }
}

/// Axum middleware: forward matching requests, pass on the rest.
pub async fn proxy_middleware(
    State(proxy): State<ProxyState>,
    request: Request,
    next: Next,
) -> Response {
    if !proxy.rule.matches(request.uri().path()) {
        return next.run(request).await;
    }

    match forward(&proxy, request).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

async fn forward(proxy: &ProxyState, request: Request) -> Result<Response, StatusCode> {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or(request.uri().path());
    let url = proxy.upstream_url(path_and_query);

    let method = reqwest::Method::from_bytes(request.method().as_str().as_bytes())
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    let mut builder = proxy.client.request(method, &url);

    // The upstream sees its own host
    for (key, value) in request.headers() {
        if key != header::HOST {
            builder = builder.header(key.as_str(), value.as_bytes());
        }
    }

    let body = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;
    if !body.is_empty() {
        builder = builder.body(body);
    }

    let upstream = builder.send().await.map_err(|e| {
        tracing::warn!("Proxy to {} failed: {}", url, e);
        StatusCode::BAD_GATEWAY
    })?;
    tracing::debug!("Proxied {} -> {}", url, upstream.status());

    let status = StatusCode::from_u16(upstream.status().as_u16())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let mut response = Response::builder().status(status);
    for (key, value) in upstream.headers() {
        response = response.header(key.as_str(), value.as_bytes());
    }

    response
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_url() {
        let proxy = ProxyState::new(ProxyRule {
            context: vec!["/api".to_string()],
            target: "http://localhost:8080/".to_string(),
        });
        assert_eq!(
            proxy.upstream_url("/api/users?page=2"),
            "http://localhost:8080/api/users?page=2"
        );
    }
}
