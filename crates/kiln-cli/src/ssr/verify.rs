//! One-shot render verification (`kiln serve --verify`).

use crate::build::RunStatus;
use crate::config::KilnConfig;
use crate::manifest::ManifestAccessor;
use crate::ssr::{RenderDecision, Renderer, RequestContext, SsrGateway};
use crate::ui;
use std::sync::Arc;

/// Render `url` once. A rejected render fails the run; a decline does not.
pub async fn verify(
    renderer: Arc<dyn Renderer>,
    config: Arc<KilnConfig>,
    manifest: ManifestAccessor,
    url: &str,
) -> RunStatus {
    let gateway = match SsrGateway::start(renderer, config, manifest).await {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::error!("Render environment failed to start: {}", e);
            ui::error(&format!("SSR verification failed: {}", e));
            return RunStatus::Failure;
        }
    };

    match gateway.render(&RequestContext::new(url, None)).await {
        RenderDecision::Rendered(html) => {
            ui::success(&format!("Rendered {} ({} bytes)", url, html.len()));
            RunStatus::Success
        }
        RenderDecision::Declined => {
            ui::info(&format!("Renderer declined {}; nothing to verify", url));
            RunStatus::Success
        }
        RenderDecision::Failed(e) => {
            tracing::error!(url, error = %e, "SSR verification render failed");
            ui::error(&format!("SSR verification failed: {}", e));
            RunStatus::Failure
        }
    }
}
