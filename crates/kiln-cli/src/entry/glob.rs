//! Glob expansion for entry patterns.
//!
//! Patterns are compiled with `globset` over absolute paths and matched
//! while walking the longest wildcard-free prefix. Supported syntax: `*`,
//! `**`, `?`, `[abc]`, `[!abc]` and `{a,b}`; `*` never crosses a `/`.

use crate::error::ConfigError;
use globset::{GlobBuilder, GlobMatcher};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const WILDCARDS: &[char] = &['*', '?', '[', '{'];

/// A compiled glob pattern anchored at a base directory.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    raw: String,
    base: PathBuf,
    matcher: GlobMatcher,
    literal: bool,
    include_hidden: bool,
}

impl GlobPattern {
    /// Compile `pattern`, resolving relative patterns against `cwd`.
    pub fn new(pattern: &str, cwd: &Path) -> Result<Self, ConfigError> {
        let full = normalize(&cwd.join(pattern));

        let mut base = String::new();
        for segment in full.split('/') {
            if segment.contains(WILDCARDS) {
                break;
            }
            base.push_str(segment);
            base.push('/');
        }
        let literal = !full.contains(WILDCARDS);
        let base = if literal {
            PathBuf::from(&full)
        } else {
            PathBuf::from(base.trim_end_matches('/'))
        };

        let matcher = GlobBuilder::new(&full)
            .literal_separator(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.kind().to_string(),
            })?
            .compile_matcher();

        Ok(Self {
            raw: pattern.to_string(),
            base,
            matcher,
            literal,
            include_hidden: full.contains("/."),
        })
    }

    /// The pattern as written in the configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Directory the walk starts from.
    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn matches(&self, path: &Path) -> bool {
        self.matcher.is_match(normalize(path))
    }

    /// Matching files, sorted by path.
    pub fn expand(&self) -> Vec<PathBuf> {
        if self.literal {
            return if self.base.is_file() {
                vec![self.base.clone()]
            } else {
                vec![]
            };
        }

        let include_hidden = self.include_hidden;
        let mut files: Vec<PathBuf> = WalkDir::new(&self.base)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || include_hidden
                    || !entry.file_name().to_string_lossy().starts_with('.')
            })
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| self.matches(path))
            .collect();

        files.sort();
        files
    }
}

fn normalize(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
