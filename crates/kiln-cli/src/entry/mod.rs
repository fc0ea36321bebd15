//! Entry resolution.
//!
//! Expands the ordered `entries` registrations from [`KilnConfig`] into an
//! [`EntryMap`]: bundle name to the sorted list of source files it bundles.
//! The map is built once at startup and never mutated afterwards.

mod glob;

pub use glob::GlobPattern;

use crate::config::{EntryKind, EntryPattern, KilnConfig, DEFAULT_ENTRY_EXTENSIONS};
use crate::error::{CliError, ConfigError, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Bundle name of the primary entry.
pub const INDEX_ENTRY: &str = "index";

/// Bundle name to ordered source files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EntryMap(BTreeMap<String, Vec<PathBuf>>);

impl EntryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&[PathBuf]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether the primary `index` bundle is present.
    pub fn has_index(&self) -> bool {
        self.contains(INDEX_ENTRY)
    }
}

impl FromIterator<(String, Vec<PathBuf>)> for EntryMap {
    fn from_iter<I: IntoIterator<Item = (String, Vec<PathBuf>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolves entry registrations against the project tree.
#[derive(Debug, Clone)]
pub struct EntryResolver {
    cwd: PathBuf,
    source_dir: PathBuf,
}

impl EntryResolver {
    pub fn new(cwd: impl Into<PathBuf>, source_dir: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            source_dir: source_dir.into(),
        }
    }

    pub fn from_config(config: &KilnConfig) -> Self {
        Self::new(config.cwd.clone(), config.source_dir())
    }

    /// Resolve `patterns` into an [`EntryMap`].
    ///
    /// The directory walk runs on the blocking pool.
    pub async fn resolve(&self, patterns: &[EntryPattern]) -> Result<EntryMap> {
        let resolver = self.clone();
        let patterns = patterns.to_vec();

        tokio::task::spawn_blocking(move || resolver.resolve_blocking(&patterns))
            .await
            .map_err(|e| CliError::Custom(format!("Entry resolution task failed: {}", e)))?
    }

    /// Synchronous resolution, used by [`EntryResolver::resolve`].
    pub fn resolve_blocking(&self, patterns: &[EntryPattern]) -> Result<EntryMap> {
        let mut map = BTreeMap::new();

        for registration in patterns {
            let glob = GlobPattern::new(&registration.pattern, &self.cwd)?;
            let files = glob.expand();

            if files.is_empty() {
                tracing::warn!("Entry pattern '{}' matched no files", registration.pattern);
            }

            // Later registrations replace earlier bundles of the same name
            for (name, files) in group(registration, files) {
                if map.insert(name.clone(), files).is_some() {
                    tracing::warn!("Entry '{}' registered more than once; last one wins", name);
                }
            }
        }

        if patterns.is_empty() {
            if let Some(index) = self.conventional_entry() {
                tracing::debug!("Using conventional entry {}", index.display());
                map.insert(INDEX_ENTRY.to_string(), vec![index]);
            }
        }

        if map.is_empty() {
            return Err(ConfigError::NoEntries {
                patterns: patterns.len(),
                source_path: self.source_dir.clone(),
            }
            .into());
        }

        tracing::debug!("Resolved {} entr{}", map.len(), if map.len() == 1 { "y" } else { "ies" });
        Ok(EntryMap(map))
    }

    /// First existing `<source>/index.<ext>` in extension priority order.
    fn conventional_entry(&self) -> Option<PathBuf> {
        DEFAULT_ENTRY_EXTENSIONS
            .iter()
            .map(|ext| self.source_dir.join(format!("index.{}", ext)))
            .find(|path| path.is_file())
    }
}

/// Group one registration's matched files into named bundles.
fn group(registration: &EntryPattern, files: Vec<PathBuf>) -> BTreeMap<String, Vec<PathBuf>> {
    let mut bundles = BTreeMap::new();

    match (registration.kind, registration.name.as_deref()) {
        (EntryKind::Base, _) => {
            bundles.insert(INDEX_ENTRY.to_string(), files);
        }
        (EntryKind::Entry, Some(name)) if !name.is_empty() => {
            bundles.insert(name.to_string(), files);
        }
        // An explicit empty name means the plain `style` bundle
        (EntryKind::Styles, Some("")) => {
            bundles.insert("style".to_string(), files);
        }
        (EntryKind::Styles, Some(name)) => {
            bundles.insert(format!("style-{}", name), files);
        }
        (EntryKind::Entry | EntryKind::Styles, _) => {
            for file in files {
                match style_bundle_name(&file) {
                    Some(name) => bundles.entry(name).or_insert_with(Vec::new).push(file),
                    None => tracing::warn!(
                        "Cannot derive a bundle name for {}; only .less and .scss files are classified",
                        file.display()
                    ),
                }
            }
        }
    }

    bundles
}

/// `index.scss` -> `style`, `index-admin.less` -> `style-admin`, `print.scss` -> `print`.
pub fn style_bundle_name(file: &Path) -> Option<String> {
    let ext = file.extension()?.to_str()?;
    if ext != "less" && ext != "scss" {
        return None;
    }

    let stem = file.file_stem()?.to_str()?;
    Some(match stem.strip_prefix("index") {
        Some(rest) => format!("style{}", rest),
        None => stem.to_string(),
    })
}
