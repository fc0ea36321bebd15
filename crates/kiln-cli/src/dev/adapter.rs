//! Watch, rebuild and serve for `kiln dev`.
//!
//! [`DevServerAdapter::start`] runs the initial client build, starts the
//! watcher and a background rebuild loop, and hands back a [`DevHandle`]
//! whose router is ready to be served. Each successful rebuild publishes the
//! new manifest and notifies reload clients.

use crate::build::{BuildCompletion, BuildDescription, BuildState, Orchestrator};
use crate::dev::{
    dev_router, DevEvent, DevOptions, DevServerState, FileChange, FileWatcher, SharedState,
    SSE_PATH,
};
use crate::error::{Result, ResultExt};
use crate::manifest::{Manifest, SharedManifestStore};
use crate::ssr::SharedGateway;
use crate::ui;
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const RELOAD_CLIENT: &str = include_str!("../../assets/dev/reload-client.js");

pub struct DevServerAdapter {
    orchestrator: Arc<Orchestrator>,
    options: DevOptions,
    gateway: Option<SharedGateway>,
}

impl DevServerAdapter {
    pub fn new(orchestrator: Arc<Orchestrator>, options: DevOptions) -> Self {
        Self {
            orchestrator,
            options,
            gateway: None,
        }
    }

    /// Render pages through `gateway` before falling back to static files.
    pub fn with_gateway(mut self, gateway: SharedGateway) -> Self {
        self.gateway = Some(gateway);
        self
    }

    pub async fn start(self, description: BuildDescription) -> Result<DevHandle> {
        write_reload_client(&self.options).await?;

        let state = Arc::new(DevServerState::new());

        ui::info("Performing initial build...");
        build_and_notify(&self.orchestrator, &description, &state).await;

        let (watcher, changes) = FileWatcher::new(
            self.options.watch_root.clone(),
            self.options.watch_ignore.clone(),
            self.options.debounce_ms,
        )?;
        ui::info(&format!("Watching for changes in {}", watcher.root().display()));

        let rebuild_loop = tokio::spawn(watch_and_rebuild(
            Arc::clone(&self.orchestrator),
            description,
            Arc::clone(&state),
            changes,
            Duration::from_millis(self.options.debounce_ms),
        ));

        let router = dev_router(&self.options, Arc::clone(&state), self.gateway.as_ref());

        Ok(DevHandle {
            router,
            state,
            manifest: Arc::clone(self.orchestrator.manifest()),
            _watcher: watcher,
            rebuild_loop,
        })
    }
}

/// A running dev pipeline. Dropping it stops watching and rebuilding.
pub struct DevHandle {
    router: Router,
    state: SharedState,
    manifest: SharedManifestStore,
    _watcher: FileWatcher,
    rebuild_loop: JoinHandle<()>,
}

impl DevHandle {
    /// Manifest of the latest settled build, if any.
    pub fn manifest_snapshot(&self) -> Option<Arc<Manifest>> {
        self.manifest.current()
    }

    pub fn middleware(&self) -> Router {
        self.router.clone()
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }
}

impl Drop for DevHandle {
    fn drop(&mut self) {
        self.rebuild_loop.abort();
    }
}

/// Write the reload client with the SSE address filled in.
async fn write_reload_client(options: &DevOptions) -> Result<()> {
    let script = RELOAD_CLIENT.replace(
        "__KILN_SSE_URL__",
        &format!("{}{}", options.server_url(), SSE_PATH),
    );

    if let Some(parent) = options.reload_client.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_path(parent)?;
    }
    tokio::fs::write(&options.reload_client, script)
        .await
        .with_path(&options.reload_client)?;

    tracing::debug!("Reload client written to {}", options.reload_client.display());
    Ok(())
}

async fn watch_and_rebuild(
    orchestrator: Arc<Orchestrator>,
    description: BuildDescription,
    state: SharedState,
    mut changes: mpsc::Receiver<FileChange>,
    settle: Duration,
) {
    while let Some(change) = changes.recv().await {
        ui::info(&format!("File changed: {}", change.path().display()));

        // Editors save in bursts; one rebuild covers them all
        tokio::time::sleep(settle).await;
        while changes.try_recv().is_ok() {}

        build_and_notify(&orchestrator, &description, &state).await;
    }
}

async fn build_and_notify(
    orchestrator: &Orchestrator,
    description: &BuildDescription,
    state: &DevServerState,
) -> BuildCompletion {
    state.broadcast(&DevEvent::BuildStarted);

    let completion = orchestrator.rebuild(description).await;

    match BuildState::settled(&completion) {
        BuildState::Ready { duration } => {
            ui::success(&format!("Compiled in {}", ui::format_duration(duration)));
            state.broadcast(&DevEvent::BuildCompleted {
                duration_ms: duration.as_millis() as u64,
            });
        }
        BuildState::Failed { error } => {
            ui::error(&format!("Build failed: {}", error));
            ui::print_diagnostics(&completion.outcome);
            state.broadcast(&DevEvent::BuildFailed { error });
        }
        BuildState::Idle | BuildState::Building { .. } => {}
    }

    completion
}
