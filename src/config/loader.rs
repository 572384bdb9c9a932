//! Configuration loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::IndexerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `chain.rpc_url`.
pub const RPC_URL_ENV_VAR: &str = "BASE_RPC_URL";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Command-line values layered over file and environment.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub rpc_url: Option<String>,
    pub rules_path: Option<String>,
    /// Appended to the configured treasuries, duplicates ignored.
    pub treasuries: Vec<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut IndexerConfig) {
        if let Some(url) = &self.rpc_url {
            config.chain.rpc_url = url.clone();
        }
        if let Some(path) = &self.rules_path {
            config.rules.path = path.clone();
        }
        for treasury in &self.treasuries {
            if !config.treasuries.contains(treasury) {
                config.treasuries.push(treasury.clone());
            }
        }
    }
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<IndexerConfig, ConfigError> {
    load_with_overrides(Some(path), &ConfigOverrides::default())
}

/// Build the effective configuration: file (or defaults when `path` is
/// `None`), then `BASE_RPC_URL`, then `overrides`. Validated once, at the end.
pub fn load_with_overrides(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<IndexerConfig, ConfigError> {
    let content = match path {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };
    parse_config(&content, overrides)
}

/// Parse configuration text, layer environment and `overrides`, then validate.
pub fn parse_config(content: &str, overrides: &ConfigOverrides) -> Result<IndexerConfig, ConfigError> {
    let mut config: IndexerConfig = toml::from_str(content)?;
    apply_env_overrides(&mut config);
    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply environment overrides on top of file values.
pub fn apply_env_overrides(config: &mut IndexerConfig) {
    if let Ok(url) = std::env::var(RPC_URL_ENV_VAR) {
        if !url.is_empty() {
            config.chain.rpc_url = url;
        }
    }
}
