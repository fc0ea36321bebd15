//! Drives build tasks and decides how the process ends.
//!
//! The orchestrator never exits the process itself. [`Orchestrator::run`]
//! returns a [`RunStatus`] and `main` turns it into an exit code.

use crate::build::{
    BuildCompletion, BuildDescription, BuildState, BuildTarget, Bundler, DescriptionFactory,
};
use crate::config::{KilnConfig, RunMode};
use crate::entry::EntryMap;
use crate::error::Result;
use crate::manifest::{Manifest, SharedManifestStore};
use crate::ui;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;

/// Exit decision of a one-shot run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failure,
}

impl RunStatus {
    pub fn code(self) -> i32 {
        match self {
            RunStatus::Success => 0,
            RunStatus::Failure => 1,
        }
    }

    pub fn is_success(self) -> bool {
        self == RunStatus::Success
    }

    /// Failure if either side failed.
    pub fn and(self, other: RunStatus) -> RunStatus {
        if self.is_success() && other.is_success() {
            RunStatus::Success
        } else {
            RunStatus::Failure
        }
    }
}

/// The build tasks of one run.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    pub mode: RunMode,
    pub client: BuildDescription,
    /// Present only for production SSR runs
    pub server: Option<BuildDescription>,
}

impl BuildPlan {
    pub fn new(
        factory: &dyn DescriptionFactory,
        config: &KilnConfig,
        mode: RunMode,
        entries: &EntryMap,
    ) -> Result<Self> {
        let client = factory.describe(config, mode.build, BuildTarget::Client, entries)?;

        // Development SSR renders from the source entry; no server bundle
        let server = if mode.build.is_production() && mode.ssr {
            Some(factory.describe(config, mode.build, BuildTarget::Server, entries)?)
        } else {
            None
        };

        Ok(Self {
            mode,
            client,
            server,
        })
    }
}

/// Owns the build state machine and the manifest writes that follow builds.
pub struct Orchestrator {
    config: Arc<KilnConfig>,
    bundler: Arc<dyn Bundler>,
    manifest: SharedManifestStore,
    state: RwLock<BuildState>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<KilnConfig>,
        bundler: Arc<dyn Bundler>,
        manifest: SharedManifestStore,
    ) -> Self {
        Self {
            config,
            bundler,
            manifest,
            state: RwLock::new(BuildState::Idle),
        }
    }

    pub fn state(&self) -> BuildState {
        self.state.read().clone()
    }

    pub fn manifest(&self) -> &SharedManifestStore {
        &self.manifest
    }

    fn set_state(&self, state: BuildState) {
        tracing::debug!("Build state: {:?}", state);
        *self.state.write() = state;
    }

    /// One-shot production run.
    ///
    /// Client and server tasks start together. Each settles on its own
    /// (logging, manifest write) and the exit decision is made once both
    /// have finished: any build errors on either side mean failure.
    pub async fn run(&self, plan: &BuildPlan) -> RunStatus {
        let started_at = Instant::now();
        self.set_state(BuildState::Building { started_at });

        let label = if plan.server.is_some() {
            "Building client and server bundles..."
        } else {
            "Building client bundle..."
        };
        let spinner = ui::Spinner::new(label);

        let client = async {
            let completion = self.bundler.build(&plan.client).await;
            let manifest_written = self.settle_client(&completion).await;
            (completion, manifest_written)
        };

        let server = async {
            match &plan.server {
                Some(description) => {
                    let completion = self.bundler.build(description).await;
                    self.settle_server(&completion);
                    Some(completion)
                }
                None => None,
            }
        };

        let ((client, manifest_written), server) = tokio::join!(client, server);

        let mut status = report(&client);
        if !manifest_written {
            status = RunStatus::Failure;
        }
        if let Some(server) = &server {
            status = status.and(report(server));
        }

        match status {
            RunStatus::Success => spinner.finish(&format!(
                "Build finished in {}",
                ui::format_duration(started_at.elapsed())
            )),
            RunStatus::Failure => spinner.fail("Build failed"),
        }

        for completion in std::iter::once(&client).chain(server.as_ref()) {
            if completion.transport_error.is_none() {
                ui::print_build_summary(&completion.outcome);
            }
            ui::print_diagnostics(&completion.outcome);
        }

        self.set_state(match (&status, BuildState::settled(&client)) {
            (RunStatus::Success, ready) => ready,
            (RunStatus::Failure, BuildState::Failed { error }) => BuildState::Failed { error },
            (RunStatus::Failure, _) => BuildState::Failed {
                error: "server build failed".to_string(),
            },
        });

        status
    }

    /// Build the client bundle once (development rebuilds).
    ///
    /// Only a successful compile replaces the manifest; after a failed one
    /// the last good manifest keeps serving.
    pub async fn rebuild(&self, description: &BuildDescription) -> BuildCompletion {
        self.set_state(BuildState::Building {
            started_at: Instant::now(),
        });

        let completion = self.bundler.build(description).await;
        if completion.transport_error.is_none() && completion.outcome.has_errors() {
            tracing::warn!(
                "Client build reported {} error(s); keeping the previous manifest",
                completion.outcome.errors.len()
            );
        } else {
            self.settle_client(&completion).await;
        }
        self.set_state(BuildState::settled(&completion));

        completion
    }

    /// Log the client result and persist its manifest. Returns `false` if a
    /// manifest should have been written but could not be.
    async fn settle_client(&self, completion: &BuildCompletion) -> bool {
        if let Some(error) = &completion.transport_error {
            tracing::error!("Client build could not run: {}", error);
            return true;
        }

        let outcome = &completion.outcome;
        tracing::info!(
            "Client build finished: {} asset(s), {} error(s), {} warning(s)",
            outcome.assets.len(),
            outcome.errors.len(),
            outcome.warnings.len()
        );

        match self.manifest.write(Manifest::from_outcome(outcome)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to write {}: {}", self.manifest.path().display(), e);
                false
            }
        }
    }

    fn settle_server(&self, completion: &BuildCompletion) {
        if let Some(error) = &completion.transport_error {
            tracing::error!("Server build could not run: {}", error);
            return;
        }

        tracing::info!(
            "SSR enabled, source dir: {}; server build finished with {} error(s)",
            self.config.source_dir().display(),
            completion.outcome.errors.len()
        );
    }
}

/// Exit decision for one settled task. Transport errors alone never fail.
fn report(completion: &BuildCompletion) -> RunStatus {
    if completion.outcome.has_errors() {
        RunStatus::Failure
    } else {
        RunStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::{AssetInfo, BuildOutcome, ErrorDetail, JsonDescriptionFactory};
    use crate::config::BuildMode;
    use crate::error::BuildError;
    use crate::manifest::ManifestStore;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Answers each target with a fixed completion, optionally after a delay.
    struct FakeBundler {
        client_errors: usize,
        server_errors: usize,
        client_transport: bool,
        server_delay: Duration,
    }

    impl FakeBundler {
        fn clean() -> Self {
            Self {
                client_errors: 0,
                server_errors: 0,
                client_transport: false,
                server_delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl Bundler for FakeBundler {
        async fn build(&self, description: &BuildDescription) -> BuildCompletion {
            let target = description.target;
            let errors = match target {
                BuildTarget::Client => self.client_errors,
                BuildTarget::Server => {
                    tokio::time::sleep(self.server_delay).await;
                    self.server_errors
                }
            };

            if target == BuildTarget::Client && self.client_transport {
                return BuildCompletion::transport(target, BuildError::Custom("offline".into()));
            }

            let mut outcome = BuildOutcome::empty(target);
            outcome.assets.push(AssetInfo {
                name: format!("bundle-{}.js", target),
                size: 10,
            });
            outcome
                .errors
                .extend((0..errors).map(|i| ErrorDetail::new(format!("error {}", i))));
            BuildCompletion::completed(outcome)
        }
    }

    fn setup(bundler: FakeBundler, ssr: bool) -> (TempDir, Orchestrator, BuildPlan) {
        let temp = TempDir::new().unwrap();
        let config = Arc::new(KilnConfig::default_config(temp.path().to_path_buf()));
        let entries: EntryMap = [("index".to_string(), vec![PathBuf::from("src/index.tsx")])]
            .into_iter()
            .collect();
        let plan = BuildPlan::new(
            &JsonDescriptionFactory::new(),
            &config,
            RunMode::production(ssr),
            &entries,
        )
        .unwrap();

        let manifest = ManifestStore::for_config(&config);
        let orchestrator = Orchestrator::new(config, Arc::new(bundler), manifest);
        (temp, orchestrator, plan)
    }

    #[test]
    fn test_plan_includes_server_only_for_production_ssr() {
        let config = KilnConfig::default_config(PathBuf::from("/app"));
        let entries: EntryMap = [("index".to_string(), vec![PathBuf::from("a.tsx")])]
            .into_iter()
            .collect();
        let factory = JsonDescriptionFactory::new();

        let plan = BuildPlan::new(&factory, &config, RunMode::production(true), &entries).unwrap();
        assert_eq!(plan.server.unwrap().target, BuildTarget::Server);

        let plan = BuildPlan::new(&factory, &config, RunMode::development(true), &entries).unwrap();
        assert!(plan.server.is_none());
        assert_eq!(plan.client.mode, BuildMode::Development);
    }

    #[tokio::test]
    async fn test_clean_build_succeeds_and_writes_manifest() {
        let (temp, orchestrator, plan) = setup(FakeBundler::clean(), false);

        assert_eq!(orchestrator.run(&plan).await, RunStatus::Success);
        assert!(orchestrator.state().is_ready());
        assert!(temp.path().join("public/stats.json").exists());

        let manifest = orchestrator.manifest().accessor().get();
        assert_eq!(manifest.assets_urls, vec!["bundle-client.js"]);
    }

    #[tokio::test]
    async fn test_client_errors_fail() {
        let bundler = FakeBundler {
            client_errors: 2,
            ..FakeBundler::clean()
        };
        let (temp, orchestrator, plan) = setup(bundler, false);

        assert_eq!(orchestrator.run(&plan).await, RunStatus::Failure);
        assert!(orchestrator.state().error().is_some());
        // Manifest is still written when the bundler ran
        assert!(temp.path().join("public/stats.json").exists());
    }

    #[tokio::test]
    async fn test_server_errors_fail_even_when_client_is_clean() {
        let bundler = FakeBundler {
            server_errors: 1,
            server_delay: Duration::from_millis(20),
            ..FakeBundler::clean()
        };
        let (_temp, orchestrator, plan) = setup(bundler, true);

        assert_eq!(orchestrator.run(&plan).await, RunStatus::Failure);
        assert_eq!(
            orchestrator.state().error(),
            Some("server build failed")
        );
    }

    #[tokio::test]
    async fn test_transport_error_skips_manifest_without_failing() {
        let bundler = FakeBundler {
            client_transport: true,
            ..FakeBundler::clean()
        };
        let (temp, orchestrator, plan) = setup(bundler, true);

        assert_eq!(orchestrator.run(&plan).await, RunStatus::Success);
        assert!(!temp.path().join("public/stats.json").exists());
    }

    #[tokio::test]
    async fn test_rebuild_publishes_manifest() {
        let (_temp, orchestrator, plan) = setup(FakeBundler::clean(), false);

        let completion = orchestrator.rebuild(&plan.client).await;
        assert!(completion.outcome.success());
        assert!(orchestrator.manifest().current().is_some());
        assert!(orchestrator.state().is_ready());
    }

    /// Clean on the first build, compile errors afterwards.
    struct BreaksAfterFirstBuild {
        builds: AtomicUsize,
    }

    #[async_trait]
    impl Bundler for BreaksAfterFirstBuild {
        async fn build(&self, description: &BuildDescription) -> BuildCompletion {
            let mut outcome = BuildOutcome::empty(description.target);
            if self.builds.fetch_add(1, Ordering::SeqCst) == 0 {
                outcome.assets.push(AssetInfo {
                    name: "bundle-index.good.js".to_string(),
                    size: 10,
                });
            } else {
                outcome.errors.push(ErrorDetail::new("Syntax error"));
            }
            BuildCompletion::completed(outcome)
        }
    }

    #[tokio::test]
    async fn test_failed_rebuild_keeps_last_good_manifest() {
        let temp = TempDir::new().unwrap();
        let config = Arc::new(KilnConfig::default_config(temp.path().to_path_buf()));
        let entries: EntryMap = [("index".to_string(), vec![PathBuf::from("src/index.tsx")])]
            .into_iter()
            .collect();
        let plan = BuildPlan::new(
            &JsonDescriptionFactory::new(),
            &config,
            RunMode::development(false),
            &entries,
        )
        .unwrap();
        let orchestrator = Orchestrator::new(
            Arc::clone(&config),
            Arc::new(BreaksAfterFirstBuild {
                builds: AtomicUsize::new(0),
            }),
            ManifestStore::for_config(&config),
        );

        orchestrator.rebuild(&plan.client).await;
        let completion = orchestrator.rebuild(&plan.client).await;
        assert!(completion.outcome.has_errors());
        assert!(orchestrator.state().error().is_some());

        let manifest = orchestrator.manifest().accessor().get();
        assert_eq!(manifest.assets_urls, vec!["bundle-index.good.js"]);

        let on_disk = ManifestStore::new(config.stats_path()).read().await.unwrap();
        assert_eq!(on_disk.assets_urls, vec!["bundle-index.good.js"]);
    }

    #[test]
    fn test_run_status() {
        assert_eq!(RunStatus::Success.code(), 0);
        assert_eq!(RunStatus::Failure.code(), 1);
        assert_eq!(RunStatus::Success.and(RunStatus::Failure), RunStatus::Failure);
        assert_eq!(RunStatus::Success.and(RunStatus::Success), RunStatus::Success);
    }
}
