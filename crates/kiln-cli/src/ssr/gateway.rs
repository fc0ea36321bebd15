//! SSR request gateway.
//!
//! Sits in front of static or dev serving as axum middleware. For each
//! `GET` it asks the [`Renderer`] for HTML; a decline passes the request on
//! unchanged to the next handler.

use crate::config::KilnConfig;
use crate::error::RenderError;
use crate::manifest::ManifestAccessor;
use crate::ssr::render::init_render_environment;
use crate::ssr::{RequestContext, Renderer};
use axum::{
    extract::{Request, State},
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use std::sync::Arc;
use std::time::Duration;

/// How a single request was handled.
#[derive(Debug)]
pub enum RenderDecision {
    Rendered(String),
    Declined,
    Failed(RenderError),
}

/// Render capability plus everything a render needs.
pub struct SsrGateway {
    renderer: Arc<dyn Renderer>,
    config: Arc<KilnConfig>,
    manifest: ManifestAccessor,
    timeout: Option<Duration>,
}

pub type SharedGateway = Arc<SsrGateway>;

impl SsrGateway {
    /// Create a gateway and prepare the render environment.
    pub async fn start(
        renderer: Arc<dyn Renderer>,
        config: Arc<KilnConfig>,
        manifest: ManifestAccessor,
    ) -> Result<SharedGateway, RenderError> {
        init_render_environment();
        renderer.prepare().await?;

        let timeout = config.ssr.render_timeout_ms.map(Duration::from_millis);
        Ok(Arc::new(Self {
            renderer,
            config,
            manifest,
            timeout,
        }))
    }

    /// Render one request.
    pub async fn render(&self, ctx: &RequestContext) -> RenderDecision {
        let render = self.renderer.render(
            &ctx.url,
            ctx.auth_token.as_deref(),
            &self.config,
            &self.manifest,
        );

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, render).await {
                Ok(result) => result,
                Err(_) => Err(RenderError::Timeout {
                    url: ctx.url.clone(),
                    timeout_ms: limit.as_millis() as u64,
                }),
            },
            None => render.await,
        };

        match result {
            Ok(Some(html)) => RenderDecision::Rendered(html),
            Ok(None) => RenderDecision::Declined,
            Err(e) => RenderDecision::Failed(e),
        }
    }

    /// Wrap `next` so that the gateway runs before it.
    pub fn in_front_of(self: &Arc<Self>, next: Router) -> Router {
        next.layer(middleware::from_fn_with_state(Arc::clone(self), ssr_middleware))
    }
}

/// Axum middleware: render, or defer to `next`.
pub async fn ssr_middleware(
    State(gateway): State<SharedGateway>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() != Method::GET {
        return next.run(request).await;
    }

    let ctx = RequestContext::from_parts(request.uri(), request.headers());

    match gateway.render(&ctx).await {
        RenderDecision::Rendered(html) => html_response(html),
        RenderDecision::Declined => {
            tracing::trace!("Render declined {}", ctx.url);
            next.run(request).await
        }
        RenderDecision::Failed(error) => {
            tracing::error!(url = %ctx.url, error = %error, "SSR render failed");
            (StatusCode::INTERNAL_SERVER_ERROR, public_message(&error)).into_response()
        }
    }
}

fn html_response(html: String) -> Response {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/html")], html).into_response()
}

/// Client-facing message without internal detail.
pub fn public_message(error: &RenderError) -> String {
    match error {
        RenderError::Timeout { timeout_ms, .. } => {
            format!("Render timed out after {}ms", timeout_ms)
        }
        RenderError::Prepare(_) => "Service temporarily unavailable".to_string(),
        RenderError::Failed { .. } | RenderError::InvalidResponse { .. } => {
            "Render failed".to_string()
        }
    }
}
