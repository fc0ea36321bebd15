//! Setup shared by the commands: configuration, entries and HTTP serving.

use crate::cli::{GlobalArgs, ServerArgs};
use crate::config::{BuildMode, ConfigOverrides, KilnConfig};
use crate::entry::{EntryMap, EntryResolver};
use crate::error::{CliError, Result};
use crate::manifest::ManifestAccessor;
use crate::ssr::{NodeRenderer, SsrGateway};
use crate::ui;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::services::ServeDir;

/// Load configuration with the command-line overrides applied.
pub fn load_config(global: &GlobalArgs, server: &ServerArgs) -> Result<KilnConfig> {
    let overrides = ConfigOverrides {
        cwd: global.cwd.clone(),
        host: server.host.clone(),
        port: server.port,
    };

    let config = KilnConfig::load(&overrides, global.config.as_deref())?;
    tracing::debug!("Project root: {}", config.cwd.display());
    Ok(config)
}

/// Resolve the configured entries and report what was found.
pub async fn resolve_entries(config: &KilnConfig) -> Result<EntryMap> {
    let entries = EntryResolver::from_config(config)
        .resolve(&config.entries)
        .await?;

    for (name, files) in entries.iter() {
        tracing::debug!("Entry {}: {:?}", name, files);
    }
    ui::info(&format!(
        "Resolved {} entr{}: {}",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        entries.names().collect::<Vec<_>>().join(", ")
    ));

    Ok(entries)
}

/// Serve a production build: the SSR gateway in front of the output directory.
pub async fn serve_ssr(config: Arc<KilnConfig>, manifest: ManifestAccessor) -> Result<()> {
    let renderer = Arc::new(NodeRenderer::for_mode(&config, BuildMode::Production));
    tracing::debug!("Render script: {}", renderer.script().display());

    let gateway = SsrGateway::start(renderer, Arc::clone(&config), manifest).await?;
    let static_files = Router::new().fallback_service(ServeDir::new(config.output_dir()));
    let router = gateway.in_front_of(static_files);

    let addr = resolve_addr(&config.host, config.port).await?;
    serve(router, addr).await
}

/// First socket address `host:port` resolves to.
pub async fn resolve_addr(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| CliError::Server(format!("Cannot resolve {}:{}", host, port)))
}

/// Bind `addr` and serve `router` until Ctrl+C.
pub async fn serve(router: Router, addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| CliError::Server(format!("Failed to bind to {}: {}", addr, e)))?;

    ui::success(&format!("Listening at http://{}", listener.local_addr()?));
    ui::info("Press Ctrl+C to stop");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| CliError::Server(format!("Server error: {}", e)))?;

    ui::success("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    ui::info("Shutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EntryPattern;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_resolve_addr() {
        let addr = resolve_addr("127.0.0.1", 9991).await.unwrap();
        assert_eq!(addr, "127.0.0.1:9991".parse().unwrap());
    }

    #[test]
    #[serial]
    fn test_load_config_applies_overrides() {
        let temp = TempDir::new().unwrap();
        let global = GlobalArgs {
            cwd: Some(temp.path().to_path_buf()),
            ..Default::default()
        };
        let server = ServerArgs {
            port: Some(4000),
            host: None,
        };

        let config = load_config(&global, &server).unwrap();
        assert_eq!(config.port, 4000);
        assert_eq!(config.cwd, temp.path());
    }

    #[tokio::test]
    async fn test_resolve_entries() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("src")).unwrap();
        std::fs::write(temp.path().join("src/admin.ts"), "").unwrap();

        let mut config = KilnConfig::default_config(temp.path().to_path_buf());
        config.entries = vec![EntryPattern::entry("src/admin.ts", "admin")];

        let entries = resolve_entries(&config).await.unwrap();
        assert!(entries.contains("admin"));
    }
}
