//! `kiln build`: one-shot production build.
//!
//! Resolves entries, builds the client bundle (and the server bundle with
//! `--ssr`) and returns the exit decision. With `--serve`, a successful
//! build continues straight into the SSR gateway using the manifest held in
//! memory.

use crate::build::{BuildPlan, CommandBundler, JsonDescriptionFactory, Orchestrator, RunStatus};
use crate::cli::{BuildArgs, GlobalArgs};
use crate::commands::utils;
use crate::config::RunMode;
use crate::error::Result;
use crate::manifest::ManifestStore;
use crate::ui;
use std::sync::Arc;

pub async fn execute(args: BuildArgs, global: &GlobalArgs) -> Result<RunStatus> {
    let mode = RunMode::production(args.ssr);
    let config = Arc::new(utils::load_config(global, &args.server)?);

    ui::info(&format!(
        "Building for {}{}",
        mode.build.as_str(),
        if mode.ssr { " with SSR" } else { "" }
    ));

    let entries = utils::resolve_entries(&config).await?;
    let plan = BuildPlan::new(&JsonDescriptionFactory::new(), &config, mode, &entries)?;

    let orchestrator = Orchestrator::new(
        Arc::clone(&config),
        Arc::new(CommandBundler::from_config(&config)),
        ManifestStore::for_config(&config),
    );

    let status = orchestrator.run(&plan).await;

    if !args.serve {
        return Ok(status);
    }
    if !status.is_success() {
        ui::warning("Not serving: the build failed");
        return Ok(status);
    }

    utils::serve_ssr(config, orchestrator.manifest().accessor()).await?;
    Ok(RunStatus::Success)
}
