//! Build orchestration.
//!
//! - [`description`]: build descriptions and the factory that produces them
//! - [`bundler`]: the [`Bundler`] seam and the external-command implementation
//! - [`outcome`]: what a finished build reports
//! - [`orchestrator`]: one-shot production builds and the exit decision

pub mod bundler;
pub mod description;
pub mod orchestrator;
pub mod outcome;

pub use bundler::{Bundler, CommandBundler};
pub use description::{BuildDescription, BuildTarget, DescriptionFactory, JsonDescriptionFactory};
pub use orchestrator::{BuildPlan, Orchestrator, RunStatus};
pub use outcome::{AssetInfo, BuildCompletion, BuildOutcome, ErrorDetail};

use std::time::{Duration, Instant};

/// Build state machine: `Idle -> Building -> {Ready, Failed}`.
///
/// Rebuilds move `Ready`/`Failed` back to `Building`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildState {
    /// No build has been started yet
    Idle,
    /// A build is running
    Building { started_at: Instant },
    /// Last build finished without errors
    Ready { duration: Duration },
    /// Last build reported errors or could not run
    Failed { error: String },
}

impl BuildState {
    pub fn is_ready(&self) -> bool {
        matches!(self, BuildState::Ready { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BuildState::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Terminal state for a settled build.
    pub fn settled(completion: &BuildCompletion) -> Self {
        if let Some(error) = &completion.transport_error {
            return BuildState::Failed {
                error: error.to_string(),
            };
        }

        let outcome = &completion.outcome;
        match outcome.errors.first() {
            None => BuildState::Ready {
                duration: outcome.duration,
            },
            Some(first) => BuildState::Failed {
                error: format!("{} error(s); first: {}", outcome.errors.len(), first.message),
            },
        }
    }
}
