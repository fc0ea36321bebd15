use std::path::PathBuf;

pub fn default_host() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    9991
}

pub fn default_output_path() -> PathBuf {
    PathBuf::from("public")
}

pub fn default_source_path() -> PathBuf {
    PathBuf::from("src")
}

pub fn default_base_url() -> String {
    "frontend/".to_string()
}

pub fn default_server_path() -> PathBuf {
    PathBuf::from("src/ssr/index.js")
}

pub fn default_application_path() -> PathBuf {
    PathBuf::from("src/Application.tsx")
}

pub fn default_routes_path() -> PathBuf {
    PathBuf::from("src/routes/index.ts")
}

pub fn default_components_path() -> PathBuf {
    PathBuf::from("src/components/config.ts")
}

pub fn default_bundler_command() -> String {
    "npx".to_string()
}

pub fn default_bundler_args() -> Vec<String> {
    vec!["webpack".to_string()]
}

pub fn default_node_binary() -> String {
    "node".to_string()
}

pub fn default_verify_url() -> String {
    "/".to_string()
}

/// Source extensions probed for a conventional `index.<ext>` entry, in priority order.
pub const DEFAULT_ENTRY_EXTENSIONS: [&str; 4] = ["tsx", "ts", "jsx", "js"];

/// Name of the manifest file written into `outputPath`.
pub const STATS_FILE_NAME: &str = "stats.json";

/// Default configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = "kiln.config.json";
