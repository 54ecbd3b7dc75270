use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;

use census_core::aggregate::Mode;
use census_core::config::Config;
use census_core::error::ConfigError;
use census_core::query::RepositoryLocator;
use census_core::types::{Ecosystem, OutputFormat};

/// Environment variable consulted when no password is given.
pub const PASSWORD_ENV: &str = "CENSUS_PASSWORD";

/// Flags shared by the `python`, `maven` and `npm` subcommands.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Repository URL as configured in the package manager
    #[arg(long)]
    pub url: Option<String>,
    /// Username for basic authentication
    #[arg(short, long)]
    pub username: Option<String>,
    /// Password or API token (or set CENSUS_PASSWORD)
    #[arg(short, long)]
    pub password: Option<String>,
    /// Report every cached version instead of only the latest
    #[arg(long)]
    pub all_versions: bool,
    /// Only report this package
    #[arg(long)]
    pub package: Option<String>,
    /// Output format for the text channel
    #[arg(short, long)]
    pub format: Option<String>,
    /// Only list packages downloaded in the last N days (text channel only)
    #[arg(long)]
    pub since_days: Option<u32>,
    /// Write the text channel to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Write every cached version with download statistics as CSV
    #[arg(long)]
    pub csv_output: Option<PathBuf>,
    /// Log raw repository items and every skipped path
    #[arg(long)]
    pub debug: bool,
    /// Config file path (defaults to .census.toml in the working directory or above)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Read a saved AQL search response instead of querying the server
    #[arg(long, value_name = "FILE")]
    pub from_json: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Where the artifact records come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Remote {
        locator: RepositoryLocator,
        credentials: Option<Credentials>,
        timeout: Duration,
    },
    Saved(PathBuf),
}

/// Command-line flags merged over the config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub ecosystem: Ecosystem,
    pub source: Source,
    pub mode: Mode,
    pub package: Option<String>,
    pub format: OutputFormat,
    pub since_days: Option<u32>,
    pub output: Option<PathBuf>,
    pub csv_output: Option<PathBuf>,
    pub debug: bool,
}

impl Settings {
    pub fn resolve(
        ecosystem: Ecosystem,
        args: &RunArgs,
        config: &Config,
        env_password: Option<String>,
    ) -> Result<Self> {
        let format = match args.format.as_deref() {
            Some(raw) => raw.parse::<OutputFormat>()?,
            None => config.output.format.unwrap_or(OutputFormat::Simple),
        };
        if !ecosystem.supports(format) {
            return Err(ConfigError::UnsupportedFormat {
                ecosystem: ecosystem.to_string(),
                format: format.to_string(),
                choices: ecosystem
                    .supported_formats()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            }
            .into());
        }

        let source = match &args.from_json {
            Some(path) => Source::Saved(path.clone()),
            None => {
                let Some(url) = args.url.as_deref().or(config.server.url.as_deref()) else {
                    bail!("no repository URL; pass --url or set [server] url in .census.toml");
                };
                Source::Remote {
                    locator: RepositoryLocator::parse(url)?,
                    credentials: credentials(args, config, env_password)?,
                    timeout: Duration::from_secs(config.server.timeout_secs),
                }
            }
        };

        let mode = if args.all_versions || config.output.all_versions {
            Mode::All
        } else {
            Mode::Latest
        };

        Ok(Self {
            ecosystem,
            source,
            mode,
            package: args.package.clone(),
            format,
            since_days: args.since_days.or(config.output.since_days),
            output: args.output.clone(),
            csv_output: args.csv_output.clone(),
            debug: args.debug,
        })
    }
}

fn credentials(
    args: &RunArgs,
    config: &Config,
    env_password: Option<String>,
) -> Result<Option<Credentials>, ConfigError> {
    let username = args.username.clone().or_else(|| config.server.username.clone());
    let password = args
        .password
        .clone()
        .or(env_password)
        .or_else(|| config.server.password.clone());

    match (username, password) {
        (Some(username), Some(password)) => Ok(Some(Credentials { username, password })),
        (None, None) => Ok(None),
        _ => Err(ConfigError::IncompleteCredentials),
    }
}
