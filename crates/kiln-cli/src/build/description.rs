//! Build descriptions handed to the bundler.
//!
//! A [`BuildDescription`] is opaque to the pipeline: it is produced by a
//! [`DescriptionFactory`] and only ever serialized for the bundler.
//! [`JsonDescriptionFactory`] emits a webpack-compatible JSON document.

use crate::config::{BuildMode, KilnConfig};
use crate::entry::EntryMap;
use crate::error::Result;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Which bundle a task produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildTarget {
    /// Browser bundles from the entry map
    Client,
    /// Node bundle executed by the SSR gateway
    Server,
}

impl BuildTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            BuildTarget::Client => "client",
            BuildTarget::Server => "server",
        }
    }
}

impl std::fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for one build task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildDescription {
    pub mode: BuildMode,
    pub target: BuildTarget,
    /// Bundler configuration document
    pub body: Value,
}

/// Produces build descriptions from configuration and resolved entries.
pub trait DescriptionFactory: Send + Sync {
    fn describe(
        &self,
        config: &KilnConfig,
        mode: BuildMode,
        target: BuildTarget,
        entries: &EntryMap,
    ) -> Result<BuildDescription>;
}

const RESOLVE_EXTENSIONS: [&str; 5] = [".ts", ".tsx", ".js", ".jsx", ".json"];
const MAX_ASSET_SIZE: u64 = 12_000_000;

/// Emits webpack-style JSON descriptions.
#[derive(Debug, Clone, Default)]
pub struct JsonDescriptionFactory {
    /// Script prepended to every client entry in development
    dev_client: Option<PathBuf>,
}

impl JsonDescriptionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend `script` to every client entry (live reload client).
    pub fn with_dev_client(script: impl Into<PathBuf>) -> Self {
        Self {
            dev_client: Some(script.into()),
        }
    }

    fn client(&self, config: &KilnConfig, mode: BuildMode, entries: &EntryMap) -> Value {
        let production = mode.is_production();
        let hash = if config.use_hash_for(mode) { ".[hash]" } else { "" };
        let prefix = format!("{}{}", config.static_path, config.normalized_base_url());

        let mut entry = Map::new();
        for (name, files) in entries.iter() {
            let mut sources: Vec<Value> = Vec::with_capacity(files.len() + 1);
            if let (false, Some(client)) = (production, &self.dev_client) {
                sources.push(path_value(client));
            }
            sources.extend(files.iter().map(|f| path_value(f)));
            entry.insert(name.to_string(), Value::Array(sources));
        }

        let public_path = if production {
            "/".to_string()
        } else {
            format!("{}/", config.public_url())
        };

        let mut body = json!({
            "mode": mode.as_str(),
            "target": "web",
            "entry": entry,
            "devtool": if production { Value::Bool(false) } else { json!("eval-source-map") },
            "output": {
                "publicPath": public_path,
                "path": path_value(&config.output_dir()),
                "filename": format!("{}bundle-[name]{}.js", prefix, hash),
                "chunkFilename": format!("{}bundle-[name]{}.js", prefix, hash),
            },
            "resolve": {
                "extensions": RESOLVE_EXTENSIONS,
                "modules": module_dirs(config),
            },
            "optimization": {
                "runtimeChunk": { "name": "common" },
                "minimize": production,
            },
            "performance": {
                "maxEntrypointSize": MAX_ASSET_SIZE,
                "maxAssetSize": MAX_ASSET_SIZE,
            },
            "module": { "rules": asset_rules(config, true) },
            "cache": if config.use_cache { json!({ "type": "filesystem" }) } else { Value::Bool(false) },
        });

        // A primary entry splits shared scripts into a `common` chunk
        if entries.has_index() {
            body["optimization"]["splitChunks"] = json!({
                "cacheGroups": {
                    "commonJs": {
                        "name": "common",
                        "chunks": "initial",
                        "minChunks": 2,
                        "minSize": 0,
                    }
                }
            });
        }

        merge(&mut body, &config.webpack);
        body
    }

    fn server(&self, config: &KilnConfig, mode: BuildMode) -> Value {
        let production = mode.is_production();

        let mut body = json!({
            "mode": mode.as_str(),
            "target": "node",
            "node": { "__dirname": false },
            "entry": path_value(&config.resolve(&config.server_path)),
            "devtool": if production { Value::Bool(false) } else { json!("eval-source-map") },
            "output": {
                "filename": "server.js",
                "path": path_value(&config.output_dir()),
                "publicPath": "/",
                "library": { "type": "commonjs2" },
            },
            "externalsPresets": { "node": true },
            "module": { "rules": asset_rules(config, false) },
            "resolve": {
                "extensions": RESOLVE_EXTENSIONS,
                "exportsFields": [],
                "modules": module_dirs(config),
                "alias": {
                    "_SsrApplication": path_value(&config.resolve(&config.application_path)),
                    "_SsrRoutes": path_value(&config.resolve(&config.routes_path)),
                    "_SsrComponents": path_value(&config.resolve(&config.components_path)),
                    "_SsrStats": path_value(&config.stats_path()),
                },
            },
            "performance": {
                "maxEntrypointSize": MAX_ASSET_SIZE,
                "maxAssetSize": MAX_ASSET_SIZE,
            },
        });

        merge(&mut body, &config.ssr.overrides);
        body
    }
}

impl DescriptionFactory for JsonDescriptionFactory {
    fn describe(
        &self,
        config: &KilnConfig,
        mode: BuildMode,
        target: BuildTarget,
        entries: &EntryMap,
    ) -> Result<BuildDescription> {
        let body = match target {
            BuildTarget::Client => self.client(config, mode, entries),
            BuildTarget::Server => self.server(config, mode),
        };

        tracing::debug!("Created {} description for {} mode", target, mode.as_str());

        Ok(BuildDescription { mode, target, body })
    }
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}

/// Image loading, with SVG inlined into the bundle when `inlineSvg` is set.
///
/// Only the client emits image files; the server bundle reuses their names.
fn asset_rules(config: &KilnConfig, emit_files: bool) -> Value {
    let images = if config.inline_svg {
        r"\.(jpe?g|gif|png)$"
    } else {
        r"\.(jpe?g|gif|png|svg)$"
    };

    let mut rules = vec![json!({
        "test": images,
        "use": [{
            "loader": "file-loader",
            "options": {
                "name": format!("{}{}images/[name].[hash].[ext]", config.static_path, config.normalized_base_url()),
                "emitFile": emit_files,
            },
        }],
    })];

    if config.inline_svg {
        rules.push(json!({
            "test": r"\.svg$",
            "use": [{
                "loader": "svg-inline-loader",
                "options": { "removeSVGTagAttrs": false },
            }],
        }));
    }

    Value::Array(rules)
}

/// Module lookup directories that exist on disk.
fn module_dirs(config: &KilnConfig) -> Vec<Value> {
    [
        config.source_dir(),
        config.cwd.join("../node_modules"),
        config.cwd.join("node_modules"),
    ]
    .iter()
    .filter(|dir| dir.is_dir())
    .map(|dir| path_value(dir))
    .collect()
}

/// Deep-merge `overlay` into `base`: objects merge key by key, anything else replaces.
pub fn merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (_, Value::Null) => {}
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                merge(base.entry(key.clone()).or_insert(Value::Null), value);
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> KilnConfig {
        KilnConfig::default_config(PathBuf::from("/app"))
    }

    fn entries() -> EntryMap {
        [
            ("index".to_string(), vec![PathBuf::from("/app/src/index.tsx")]),
            ("style".to_string(), vec![PathBuf::from("/app/src/index.scss")]),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_client_production_description() {
        let desc = JsonDescriptionFactory::new()
            .describe(&config(), BuildMode::Production, BuildTarget::Client, &entries())
            .unwrap();

        assert_eq!(desc.target, BuildTarget::Client);
        let body = &desc.body;
        assert_eq!(body["mode"], "production");
        assert_eq!(body["output"]["publicPath"], "/");
        assert_eq!(body["output"]["path"], "/app/public");
        assert_eq!(body["output"]["filename"], "frontend/bundle-[name].[hash].js");
        assert_eq!(body["optimization"]["minimize"], true);
        assert_eq!(body["entry"]["index"][0], "/app/src/index.tsx");
        assert_eq!(
            body["optimization"]["splitChunks"]["cacheGroups"]["commonJs"]["name"],
            "common"
        );
    }

    #[test]
    fn test_client_development_injects_dev_client() {
        let factory = JsonDescriptionFactory::with_dev_client("/app/.kiln/reload-client.js");
        let desc = factory
            .describe(&config(), BuildMode::Development, BuildTarget::Client, &entries())
            .unwrap();

        let body = &desc.body;
        assert_eq!(body["output"]["publicPath"], "http://127.0.0.1:9991/");
        assert_eq!(body["output"]["filename"], "frontend/bundle-[name].js");
        assert_eq!(body["devtool"], "eval-source-map");
        assert_eq!(body["entry"]["index"][0], "/app/.kiln/reload-client.js");
        assert_eq!(body["entry"]["index"][1], "/app/src/index.tsx");
    }

    #[test]
    fn test_no_split_chunks_without_index() {
        let entries: EntryMap = [("admin".to_string(), vec![PathBuf::from("/app/a.tsx")])]
            .into_iter()
            .collect();
        let desc = JsonDescriptionFactory::new()
            .describe(&config(), BuildMode::Production, BuildTarget::Client, &entries)
            .unwrap();
        assert!(desc.body["optimization"].get("splitChunks").is_none());
    }

    #[test]
    fn test_user_overrides_merge_last() {
        let mut config = config();
        config.webpack = json!({"output": {"publicPath": "/cdn/"}, "stats": "minimal"});
        config.ssr.overrides = json!({"target": "node18"});

        let factory = JsonDescriptionFactory::new();
        let client = factory
            .describe(&config, BuildMode::Production, BuildTarget::Client, &entries())
            .unwrap();
        assert_eq!(client.body["output"]["publicPath"], "/cdn/");
        assert_eq!(client.body["output"]["path"], "/app/public");
        assert_eq!(client.body["stats"], "minimal");

        let server = factory
            .describe(&config, BuildMode::Production, BuildTarget::Server, &entries())
            .unwrap();
        assert_eq!(server.body["target"], "node18");
        assert_eq!(server.body["output"]["filename"], "server.js");
        assert_eq!(server.body["entry"], "/app/src/ssr/index.js");
        assert_eq!(server.body["resolve"]["alias"]["_SsrStats"], "/app/public/stats.json");
    }

    #[test]
    fn test_inline_svg_switches_loaders() {
        let factory = JsonDescriptionFactory::new();
        let client = factory
            .describe(&config(), BuildMode::Production, BuildTarget::Client, &entries())
            .unwrap();
        let rules = client.body["module"]["rules"].as_array().unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0]["test"], r"\.(jpe?g|gif|png|svg)$");
        assert_eq!(
            rules[0]["use"][0]["options"]["name"],
            "frontend/images/[name].[hash].[ext]"
        );

        let inline = KilnConfig {
            inline_svg: true,
            ..config()
        };
        let server = factory
            .describe(&inline, BuildMode::Production, BuildTarget::Server, &entries())
            .unwrap();
        let rules = server.body["module"]["rules"].as_array().unwrap();
        assert_eq!(rules[0]["test"], r"\.(jpe?g|gif|png)$");
        assert_eq!(rules[0]["use"][0]["options"]["emitFile"], false);
        assert_eq!(rules[1]["use"][0]["loader"], "svg-inline-loader");
    }

    #[test]
    fn test_merge_replaces_non_objects() {
        let mut base = json!({"a": {"b": 1, "c": [1, 2]}, "d": true});
        merge(&mut base, &json!({"a": {"c": [3]}, "d": null, "e": "x"}));
        assert_eq!(base, json!({"a": {"b": 1, "c": [3]}, "d": true, "e": "x"}));
    }
}
