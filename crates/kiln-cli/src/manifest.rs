//! Build manifest (`stats.json`) persistence.
//!
//! The store holds at most one current [`Manifest`]. Writers replace the
//! file with an atomic rename and then swap the in-memory `Arc`, so readers
//! always see a complete manifest: either the previous one or the next.

use crate::build::{AssetInfo, BuildOutcome};
use crate::config::KilnConfig;
use crate::error::ManifestError;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of one successful build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub assets: Vec<AssetInfo>,
    #[serde(default)]
    pub chunks: serde_json::Value,
    pub captured_at: DateTime<Utc>,
    /// Every emitted asset name, sorted
    pub assets_urls: Vec<String>,
}

impl Manifest {
    pub fn from_outcome(outcome: &BuildOutcome) -> Self {
        Self {
            assets: outcome.assets.clone(),
            chunks: outcome.chunks.clone(),
            captured_at: Utc::now(),
            assets_urls: outcome.asset_names().into_iter().collect(),
        }
    }
}

/// Reads and writes the manifest and caches the current value.
#[derive(Debug)]
pub struct ManifestStore {
    path: PathBuf,
    current: RwLock<Option<Arc<Manifest>>>,
}

pub type SharedManifestStore = Arc<ManifestStore>;

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            current: RwLock::new(None),
        }
    }

    pub fn for_config(config: &KilnConfig) -> SharedManifestStore {
        Arc::new(Self::new(config.stats_path()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current in-memory manifest, if any.
    pub fn current(&self) -> Option<Arc<Manifest>> {
        self.current.read().clone()
    }

    /// Replace the in-memory manifest without touching disk.
    pub fn publish(&self, manifest: Manifest) -> Arc<Manifest> {
        let manifest = Arc::new(manifest);
        *self.current.write() = Some(Arc::clone(&manifest));
        manifest
    }

    /// Persist `manifest` atomically and publish it.
    pub async fn write(&self, manifest: Manifest) -> Result<Arc<Manifest>, ManifestError> {
        let dir = self
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        tokio::fs::create_dir_all(&dir).await?;

        let body = serde_json::to_vec_pretty(&manifest).map_err(|e| ManifestError::Malformed {
            path: self.path.clone(),
            reason: e.to_string(),
        })?;

        // Same directory so the rename stays on one filesystem
        let temp = dir.join(format!(
            ".{}.{}.{}.tmp",
            self.file_name(),
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        tokio::fs::write(&temp, &body).await?;
        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::debug!("Wrote manifest {}", self.path.display());
        Ok(self.publish(manifest))
    }

    /// Load the manifest from disk and publish it.
    pub async fn read(&self) -> Result<Arc<Manifest>, ManifestError> {
        let body = match tokio::fs::read(&self.path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(self.publish(self.parse(&body)?))
    }

    /// Blocking variant of [`ManifestStore::read`] for synchronous accessors.
    pub fn read_blocking(&self) -> Result<Arc<Manifest>, ManifestError> {
        let body = match std::fs::read(&self.path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManifestError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        Ok(self.publish(self.parse(&body)?))
    }

    /// Accessor handed to the renderer.
    pub fn accessor(self: &Arc<Self>) -> ManifestAccessor {
        ManifestAccessor {
            store: Arc::clone(self),
        }
    }

    fn parse(&self, body: &[u8]) -> Result<Manifest, ManifestError> {
        serde_json::from_slice(body).map_err(|e| ManifestError::Malformed {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "stats.json".to_string())
    }
}

/// Zero-argument view of the current manifest.
///
/// Yields the in-memory manifest, or loads it from disk on first use.
#[derive(Debug, Clone)]
pub struct ManifestAccessor {
    store: SharedManifestStore,
}

impl ManifestAccessor {
    pub fn try_get(&self) -> Result<Arc<Manifest>, ManifestError> {
        match self.store.current() {
            Some(manifest) => Ok(manifest),
            None => self.store.read_blocking(),
        }
    }

    /// Like [`ManifestAccessor::try_get`] but panics when no build or read
    /// has ever produced a manifest.
    pub fn get(&self) -> Arc<Manifest> {
        self.try_get().unwrap_or_else(|e| {
            panic!("manifest requested before any build completed: {}", e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BuildTarget;
    use tempfile::TempDir;

    fn outcome() -> BuildOutcome {
        let mut outcome = BuildOutcome::empty(BuildTarget::Client);
        outcome.assets = vec![
            AssetInfo {
                name: "frontend/bundle-index.js".to_string(),
                size: 2048,
            },
            AssetInfo {
                name: "frontend/bundle-common.js".to_string(),
                size: 512,
            },
        ];
        outcome.chunks = serde_json::json!([{"id": "index"}]);
        outcome
    }

    #[tokio::test]
    async fn test_write_then_read_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = ManifestStore::new(temp.path().join("public/stats.json"));
        let manifest = Manifest::from_outcome(&outcome());

        store.write(manifest.clone()).await.unwrap();

        let fresh = ManifestStore::new(store.path());
        let read = fresh.read().await.unwrap();
        assert_eq!(*read, manifest);
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = ManifestStore::new(temp.path().join("stats.json"));
        store.write(Manifest::from_outcome(&outcome())).await.unwrap();
        store.write(Manifest::from_outcome(&outcome())).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["stats.json"]);
    }

    #[test]
    fn test_file_format_is_camel_case() {
        let json = serde_json::to_value(Manifest::from_outcome(&outcome())).unwrap();
        assert!(json.get("capturedAt").is_some());
        assert_eq!(
            json["assetsUrls"],
            serde_json::json!(["frontend/bundle-common.js", "frontend/bundle-index.js"])
        );
    }

    #[tokio::test]
    async fn test_accessor_reflects_latest_build() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(ManifestStore::new(temp.path().join("stats.json")));
        let accessor = store.accessor();

        let outcome = outcome();
        store.write(Manifest::from_outcome(&outcome)).await.unwrap();

        let urls: Vec<String> = outcome.asset_names().into_iter().collect();
        assert_eq!(accessor.get().assets_urls, urls);
    }

    #[test]
    fn test_accessor_lazily_reads_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stats.json");
        let manifest = Manifest::from_outcome(&outcome());
        std::fs::write(&path, serde_json::to_vec(&manifest).unwrap()).unwrap();

        let store = Arc::new(ManifestStore::new(&path));
        assert!(store.current().is_none());
        assert_eq!(*store.accessor().get(), manifest);
        assert!(store.current().is_some());
    }

    #[test]
    fn test_accessor_without_manifest() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(ManifestStore::new(temp.path().join("stats.json")));
        assert!(matches!(
            store.accessor().try_get(),
            Err(ManifestError::NotFound(_))
        ));
    }

    #[test]
    #[should_panic(expected = "manifest requested before any build completed")]
    fn test_accessor_get_panics_without_manifest() {
        let temp = TempDir::new().unwrap();
        let store = Arc::new(ManifestStore::new(temp.path().join("stats.json")));
        store.accessor().get();
    }

    #[tokio::test]
    async fn test_read_malformed() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stats.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = ManifestStore::new(&path);
        assert!(matches!(
            store.read().await,
            Err(ManifestError::Malformed { .. })
        ));
    }
}
