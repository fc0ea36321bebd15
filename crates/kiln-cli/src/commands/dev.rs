//! `kiln dev`: development server.
//!
//! Flow:
//! 1. Load configuration and pick a free port
//! 2. Resolve entries and describe the development client build
//! 3. With `--ssr`, prepare the renderer for the configured server entry
//! 4. Start the dev adapter (initial build, watcher, rebuild loop)
//! 5. Serve its handler list until Ctrl+C

use crate::build::{BuildPlan, CommandBundler, JsonDescriptionFactory, Orchestrator, RunStatus};
use crate::cli::{DevArgs, GlobalArgs};
use crate::commands::utils;
use crate::config::RunMode;
use crate::dev::{find_available_port, DevOptions, DevServerAdapter};
use crate::error::Result;
use crate::manifest::ManifestStore;
use crate::ssr::{NodeRenderer, SsrGateway};
use crate::ui;
use std::sync::Arc;

pub async fn execute(args: DevArgs, global: &GlobalArgs) -> Result<RunStatus> {
    ui::info("Starting development server...");

    let mode = RunMode::development(args.ssr);
    let mut config = utils::load_config(global, &args.server)?;

    let mut options = DevOptions::from_config(&config)?;
    options.addr = find_available_port(options.addr)?;
    // Public paths in the client build point at the port actually bound
    config.port = options.addr.port();
    let config = Arc::new(config);

    ui::info(&format!("Working directory: {}", config.cwd.display()));

    let entries = utils::resolve_entries(&config).await?;
    let factory = JsonDescriptionFactory::with_dev_client(&options.reload_client);
    let plan = BuildPlan::new(&factory, &config, mode, &entries)?;

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&config),
        Arc::new(CommandBundler::from_config(&config)),
        ManifestStore::for_config(&config),
    ));

    let mut adapter = DevServerAdapter::new(Arc::clone(&orchestrator), options.clone());
    if mode.ssr {
        let renderer = Arc::new(NodeRenderer::for_mode(&config, mode.build));
        ui::info(&format!(
            "SSR enabled, rendering with {}",
            renderer.script().display()
        ));
        let gateway =
            SsrGateway::start(renderer, Arc::clone(&config), orchestrator.manifest().accessor())
                .await?;
        adapter = adapter.with_gateway(gateway);
    }

    let handle = adapter.start(plan.client).await?;
    utils::serve(handle.middleware(), options.addr).await?;

    ui::success("Development server stopped");
    Ok(RunStatus::Success)
}
