use crate::config::{EntryKind, KilnConfig};
use crate::error::{ConfigError, Result};

impl KilnConfig {
    /// Validate configuration for logical consistency.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "host".to_string(),
                value: self.host.clone(),
                hint: "Host cannot be empty (e.g. 127.0.0.1)".to_string(),
            }
            .into());
        }

        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".to_string(),
                value: "0".to_string(),
                hint: "Choose a fixed port between 1 and 65535".to_string(),
            }
            .into());
        }

        if self.bundler.command.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "bundler.command".to_string(),
                hint: "Set the bundler program, e.g. \"npx\" with args [\"webpack\"]".to_string(),
            }
            .into());
        }

        if self.base_url.contains("://") || self.base_url.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidValue {
                field: "baseUrl".to_string(),
                value: self.base_url.clone(),
                hint: "baseUrl is a path segment such as \"frontend/\"".to_string(),
            }
            .into());
        }

        for pattern in &self.entries {
            if pattern.pattern.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "entries[].pattern".to_string(),
                    hint: "Every entry needs a glob pattern".to_string(),
                }
                .into());
            }

            if pattern.kind == EntryKind::Entry
                && pattern.name.as_deref().map_or(true, str::is_empty)
            {
                return Err(ConfigError::MissingField {
                    field: "entries[].name".to_string(),
                    hint: format!("Entry '{}' needs a bundle name", pattern.pattern),
                }
                .into());
            }
        }

        if let Some(url) = &self.backend_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue {
                    field: "backendUrl".to_string(),
                    value: url.clone(),
                    hint: "Backend URL must start with http:// or https://".to_string(),
                }
                .into());
            }
        }

        Ok(())
    }
}
