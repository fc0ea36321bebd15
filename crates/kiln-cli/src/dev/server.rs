//! Dev server router.
//!
//! Handlers run in a fixed order:
//!
//! 1. `GET /__kiln_sse__`: live reload events
//! 2. backend proxy (`/api`, `/backend` by default)
//! 3. SSR gateway, when enabled
//! 4. static files from the output directory, then the history fallback
//!
//! Every response carries the configured extra headers and permissive CORS.

use crate::dev::proxy::{proxy_middleware, ProxyState};
use crate::dev::{DevEvent, DevOptions, SharedState};
use crate::ssr::SharedGateway;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::{self, Next},
    response::{
        sse::{Event, KeepAlive},
        Response, Sse,
    },
    routing::get,
    Router,
};
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};

/// Server-Sent-Events endpoint the reload client connects to.
pub const SSE_PATH: &str = "/__kiln_sse__";

/// Assemble the dev server's ordered handler list.
pub fn dev_router(
    options: &DevOptions,
    state: SharedState,
    gateway: Option<&SharedGateway>,
) -> Router {
    let mut app = static_files(options);

    if let Some(gateway) = gateway {
        app = gateway.in_front_of(app);
    }

    if let Some(rule) = &options.proxy {
        tracing::debug!("Proxying {:?} to {}", rule.context, rule.target);
        app = app.layer(middleware::from_fn_with_state(
            ProxyState::new(rule.clone()),
            proxy_middleware,
        ));
    }

    // Routes added after the layers above bypass them
    app.route(SSE_PATH, get(handle_sse).with_state(state))
        .layer(middleware::from_fn_with_state(
            Arc::new(header_map(&options.headers)),
            apply_headers,
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

fn static_files(options: &DevOptions) -> Router {
    let dir = ServeDir::new(&options.content_base);

    match &options.history_fallback {
        Some(index) => {
            let index = options.content_base.join(index.trim_start_matches('/'));
            Router::new().fallback_service(dir.fallback(ServeFile::new(index)))
        }
        None => Router::new().fallback_service(dir),
    }
}

/// Handle SSE connections for reload events.
async fn handle_sse(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, rx) = state.register_client();
    tracing::debug!("Reload client {} connected", id);

    state.broadcast(&DevEvent::ClientConnected { id });

    let stream = ReceiverStream::new(rx).map(|data| Ok(Event::default().data(data)));

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

async fn apply_headers(
    State(headers): State<Arc<HeaderMap>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    for (name, value) in headers.iter() {
        response.headers_mut().insert(name.clone(), value.clone());
    }
    response
}

fn header_map(headers: &BTreeMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!("Ignoring invalid dev server header {}: {}", name, value),
        }
    }
    map
}
