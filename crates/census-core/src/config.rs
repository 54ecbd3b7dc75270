use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::types::OutputFormat;

pub const CONFIG_FILE: &str = ".census.toml";

/// Top-level configuration from `.census.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Repository manager connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: None,
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Defaults for the text and CSV channels
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub all_versions: bool,
    #[serde(default)]
    pub since_days: Option<u32>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
}

impl Config {
    /// Load configuration from a `.census.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `census init` to create a valid config file",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.census.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!(
                            "failed to load config from '{}': {e:#}. Using defaults.",
                            config_path.display()
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Generate default TOML content for `census init`.
    pub fn default_toml() -> String {
        r#"# cache-census configuration
# Command-line flags override every value here.

[server]
# Repository URL as configured in pip/npm/maven, e.g.
# url = "https://example.jfrog.io/artifactory/api/pypi/python-remote/simple"
# username = "reader"
# Prefer the CENSUS_PASSWORD environment variable over storing a password here.
# password = ""
timeout_secs = 60

[output]
# Report every cached version instead of only the latest
all_versions = false
# Restrict the text output to packages downloaded in the last N days
# since_days = 30
# simple | csv | maven | gradle | npm | package-json
# format = "simple"
"#
        .to_string()
    }
}
