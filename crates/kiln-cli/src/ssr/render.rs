//! The render contract and its Node.js implementation.

use crate::config::{BuildMode, KilnConfig};
use crate::error::RenderError;
use crate::manifest::{Manifest, ManifestAccessor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Once};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Renders HTML for a URL, or declines.
///
/// `Ok(None)` means the URL is not a page and the request should fall
/// through to the next handler.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// One-time preparation before the first render.
    async fn prepare(&self) -> Result<(), RenderError> {
        Ok(())
    }

    async fn render(
        &self,
        url: &str,
        auth_token: Option<&str>,
        config: &KilnConfig,
        manifest: &ManifestAccessor,
    ) -> Result<Option<String>, RenderError>;
}

static RENDER_ENVIRONMENT: Once = Once::new();

/// Environment every render process runs with.
///
/// Render scripts fetch from backends with self-signed certificates, so
/// certificate verification is turned off for them. Kiln's own environment
/// is left untouched.
const RENDER_ENV: [(&str, &str); 2] = [("NODE_TLS_REJECT_UNAUTHORIZED", "0"), ("IS_SSR", "true")];

/// One-time render environment announcement, applied once per process.
pub fn init_render_environment() {
    RENDER_ENVIRONMENT.call_once(|| {
        tracing::warn!("TLS certificate verification is disabled for render scripts");
    });
}

/// JSON document written to the render script's stdin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RenderRequest<'a> {
    url: &'a str,
    auth_token: Option<&'a str>,
    config: &'a KilnConfig,
    stats: &'a Manifest,
}

/// What the render script prints: `false`, an HTML string, or `{"html": ...}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RenderResponse {
    Declined(bool),
    Html(String),
    Document { html: Option<String> },
}

/// Runs a render script with Node.js, one process per request.
#[derive(Debug, Clone)]
pub struct NodeRenderer {
    node_binary: String,
    node_args: Vec<String>,
    script: PathBuf,
    cwd: PathBuf,
}

impl NodeRenderer {
    pub fn new(node_binary: impl Into<String>, script: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            node_binary: node_binary.into(),
            node_args: Vec::new(),
            script: script.into(),
            cwd: cwd.into(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.node_args = args;
        self
    }

    /// Production renders the compiled server bundle, development the
    /// configured server entry.
    pub fn for_mode(config: &KilnConfig, mode: BuildMode) -> Self {
        let script = match mode {
            BuildMode::Production => config.server_bundle_path(),
            BuildMode::Development => config.resolve(&config.server_path),
        };
        Self::new(config.ssr.node_binary.clone(), script, config.cwd.clone())
            .with_args(config.ssr.node_args.clone())
    }

    pub fn script(&self) -> &std::path::Path {
        &self.script
    }

    fn command(&self, config: &KilnConfig) -> Command {
        let mut cmd = Command::new(&self.node_binary);
        cmd.args(&self.node_args)
            .arg(&self.script)
            .current_dir(&self.cwd)
            .envs(RENDER_ENV)
            .env("APP_SSR_OUTPUT_PATH", config.output_dir())
            .env("APP_SSR_HOST", &config.host)
            .env("APP_SSR_PORT", config.port.to_string())
            .env(
                "APP_SSR_LANGUAGES",
                serde_json::to_string(&config.languages).unwrap_or_default(),
            )
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Renderer for NodeRenderer {
    async fn prepare(&self) -> Result<(), RenderError> {
        if !self.script.is_file() {
            return Err(RenderError::Prepare(format!(
                "render script {} does not exist",
                self.script.display()
            )));
        }

        let status = Command::new(&self.node_binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| RenderError::Prepare(format!("cannot run {}: {}", self.node_binary, e)))?;

        if !status.success() {
            return Err(RenderError::Prepare(format!(
                "{} --version exited with {}",
                self.node_binary, status
            )));
        }

        Ok(())
    }

    async fn render(
        &self,
        url: &str,
        auth_token: Option<&str>,
        config: &KilnConfig,
        manifest: &ManifestAccessor,
    ) -> Result<Option<String>, RenderError> {
        let failed = |reason: String| RenderError::Failed {
            url: url.to_string(),
            reason,
        };

        let accessor = manifest.clone();
        let stats: Arc<Manifest> = tokio::task::spawn_blocking(move || accessor.try_get())
            .await
            .map_err(|e| failed(e.to_string()))?
            .map_err(|e| failed(e.to_string()))?;

        let request = serde_json::to_vec(&RenderRequest {
            url,
            auth_token,
            config,
            stats: &stats,
        })
        .map_err(|e| failed(e.to_string()))?;

        let mut child = self
            .command(config)
            .spawn()
            .map_err(|e| failed(format!("cannot start {}: {}", self.node_binary, e)))?;

        // Feed stdin while stdout and stderr drain; a script that logs a
        // pipe buffer's worth before reading would otherwise block us both
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                if let Err(e) = stdin.write_all(&request).await {
                    // The script may exit without reading its input
                    tracing::debug!("Render script stopped reading stdin: {}", e);
                }
                // Dropping stdin closes it so the script sees EOF
            }
        };

        let ((), output) = tokio::join!(feed, child.wait_with_output());
        let output = output.map_err(|e| failed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let last = stderr.lines().rev().find(|l| !l.trim().is_empty());
            return Err(failed(format!(
                "render script exited with {}: {}",
                output.status,
                last.unwrap_or("no output")
            )));
        }

        parse_response(url, &String::from_utf8_lossy(&output.stdout))
    }
}

fn parse_response(url: &str, stdout: &str) -> Result<Option<String>, RenderError> {
    let response: RenderResponse =
        serde_json::from_str(stdout.trim()).map_err(|e| RenderError::InvalidResponse {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    match response {
        RenderResponse::Declined(false) | RenderResponse::Document { html: None } => Ok(None),
        RenderResponse::Html(html) | RenderResponse::Document { html: Some(html) } => Ok(Some(html)),
        RenderResponse::Declined(true) => Err(RenderError::InvalidResponse {
            url: url.to_string(),
            reason: "expected HTML or false, got true".to_string(),
        }),
    }
}
