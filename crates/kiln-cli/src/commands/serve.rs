//! `kiln serve`: SSR gateway over an existing production build.
//!
//! The manifest is read from disk once at startup. With `--verify` a single
//! URL is rendered instead and the result decides the exit code.

use crate::build::RunStatus;
use crate::cli::{GlobalArgs, ServeArgs};
use crate::commands::utils;
use crate::config::{BuildMode, RunMode};
use crate::error::{Result, ResultExt};
use crate::manifest::ManifestStore;
use crate::ssr::{verify, NodeRenderer};
use std::sync::Arc;

pub async fn execute(args: ServeArgs, global: &GlobalArgs) -> Result<RunStatus> {
    let mode = RunMode {
        verify_ssr: args.verify,
        ..RunMode::production(true)
    };
    let config = Arc::new(utils::load_config(global, &args.server)?);

    let manifest = ManifestStore::for_config(&config);
    manifest
        .read()
        .await
        .with_hint("Run `kiln build --ssr` first")?;

    if mode.verify_ssr {
        let url = args
            .verify_url
            .unwrap_or_else(|| config.ssr.verify_url.clone());
        let renderer = Arc::new(NodeRenderer::for_mode(&config, BuildMode::Production));
        return Ok(verify(renderer, config, manifest.accessor(), &url).await);
    }

    utils::serve_ssr(config, manifest.accessor()).await?;
    Ok(RunStatus::Success)
}
