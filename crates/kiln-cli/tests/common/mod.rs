//! Shared fixtures: fake collaborators and throwaway projects.

#![allow(dead_code)]

use async_trait::async_trait;
use kiln_cli::build::{AssetInfo, BuildCompletion, BuildDescription, BuildOutcome, Bundler, ErrorDetail};
use kiln_cli::config::KilnConfig;
use kiln_cli::error::RenderError;
use kiln_cli::manifest::ManifestAccessor;
use kiln_cli::ssr::Renderer;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// A project with `src/index.tsx` and an output directory.
pub fn project() -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("src")).unwrap();
    std::fs::write(temp.path().join("src/index.tsx"), "render(<App />)").unwrap();
    temp
}

pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, contents).unwrap();
}

/// Bundler that reports one asset per build and optional errors.
pub struct FakeBundler {
    pub errors: usize,
    pub builds: AtomicUsize,
}

impl FakeBundler {
    pub fn clean() -> Self {
        Self {
            errors: 0,
            builds: AtomicUsize::new(0),
        }
    }

    pub fn failing(errors: usize) -> Self {
        Self {
            errors,
            builds: AtomicUsize::new(0),
        }
    }

    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Bundler for FakeBundler {
    async fn build(&self, description: &BuildDescription) -> BuildCompletion {
        let n = self.builds.fetch_add(1, Ordering::SeqCst);

        let mut outcome = BuildOutcome::empty(description.target);
        outcome.assets.push(AssetInfo {
            name: format!("bundle-index.{}.js", n),
            size: 128,
        });
        outcome
            .errors
            .extend((0..self.errors).map(|i| ErrorDetail::new(format!("error {}", i))));
        BuildCompletion::completed(outcome)
    }
}

/// Renders `<html/>` for `/`, declines everything else, fails on `/boom`.
///
/// Remembers the auth token of the last request.
#[derive(Default)]
pub struct FakeRenderer {
    pub last_token: Mutex<Option<String>>,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(
        &self,
        url: &str,
        auth_token: Option<&str>,
        _config: &KilnConfig,
        _manifest: &ManifestAccessor,
    ) -> Result<Option<String>, RenderError> {
        *self.last_token.lock() = auth_token.map(str::to_string);

        match url {
            "/" => Ok(Some("<html/>".to_string())),
            "/boom" => Err(RenderError::Failed {
                url: url.to_string(),
                reason: "ReferenceError: window is not defined".to_string(),
            }),
            _ => Ok(None),
        }
    }
}
