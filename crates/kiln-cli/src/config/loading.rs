use crate::config::{KilnConfig, CONFIG_FILE_NAME};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized},
    Figment,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Values supplied on the command line. Only `Some` fields override.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

/// Environment keys that are process switches, not configuration.
const SWITCH_KEYS: &[&str] = &["production", "ssr", "test_ssr"];

impl KilnConfig {
    /// Load configuration from multiple sources.
    /// Priority: CLI args > environment variables > config file > defaults
    pub fn load(overrides: &ConfigOverrides, config_path: Option<&Path>) -> Result<Self> {
        let cwd = match &overrides.cwd {
            Some(cwd) => cwd.clone(),
            None => std::env::current_dir()?,
        };

        let mut figment = Figment::new().merge(Serialized::defaults(Self::default_config(
            cwd.clone(),
        )));

        // Explicit --config must exist; the implicit file is optional
        let config_file = match config_path {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound(path.to_path_buf()).into());
            }
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default_path = cwd.join(CONFIG_FILE_NAME);
                default_path.exists().then_some(default_path)
            }
        };

        if let Some(path) = config_file {
            tracing::debug!("Loading config file {}", path.display());
            figment = figment.merge(Json::file(path));
        }

        // KILN_OUTPUT_PATH -> outputPath, KILN_SSR__RENDER_TIMEOUT_MS -> ssr.renderTimeoutMs
        figment = figment.merge(
            Env::prefixed("KILN_")
                .ignore(SWITCH_KEYS)
                .split("__")
                .map(|key| snake_to_camel(key.as_str()).into()),
        );

        // The dev server proxy has always honoured APP_BACKEND_URL
        if let Ok(url) = std::env::var("APP_BACKEND_URL") {
            figment = figment.join(("backendUrl", url));
        }

        figment = figment.merge(Serialized::defaults(overrides));

        let mut config: Self = figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            value: e.to_string(),
            hint: "Check kiln.config.json syntax and field types".to_string(),
        })?;

        // A relative cwd from the config file is relative to the process cwd
        if config.cwd.is_relative() {
            config.cwd = cwd.join(&config.cwd);
        }

        config.validate()?;
        Ok(config)
    }

    /// Get default configuration values.
    pub fn default_config(cwd: PathBuf) -> Self {
        use crate::config::{defaults::*, types::*};

        Self {
            cwd,
            host: default_host(),
            port: default_port(),
            output_path: default_output_path(),
            static_path: String::new(),
            source_path: default_source_path(),
            base_url: default_base_url(),
            use_hash: None,
            use_cache: false,
            inline_svg: false,
            server_path: default_server_path(),
            application_path: default_application_path(),
            routes_path: default_routes_path(),
            components_path: default_components_path(),
            languages: vec![],
            entries: vec![],
            bundler: BundlerConfig::default(),
            backend_url: None,
            ssr: SsrSettings::default(),
            webpack: serde_json::Value::Null,
            dev_server: serde_json::Value::Null,
        }
    }
}

/// `output_path` -> `outputPath`; dots separating nested keys are kept.
pub(crate) fn snake_to_camel(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper = false;
    for c in key.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
