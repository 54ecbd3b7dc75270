mod client;
mod settings;

use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use census_core::config::{Config, CONFIG_FILE};
use census_core::parser::ArtifactParser;
use census_core::pipeline::{CensusPipeline, PipelineOptions};
use census_core::query::AqlResponse;
use census_core::types::{ArtifactRecord, Ecosystem, OutputFormat};

use census_maven::MavenParser;
use census_npm::NpmParser;
use census_python::PythonParser;
use census_report::summary::{self, Written};

use crate::client::ArtifactoryClient;
use crate::settings::{RunArgs, Settings, Source, PASSWORD_ENV};

#[derive(Parser)]
#[command(name = "census")]
#[command(about = "Inventory the packages cached in an Artifactory proxy repository")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Wheels, sdists and eggs cached by a PyPI remote
    Python(RunArgs),
    /// Jars, poms and other artifacts cached by a Maven remote
    Maven(RunArgs),
    /// Tarballs and metadata cached by an npm remote
    Npm(RunArgs),
    /// Create a default .census.toml configuration file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Python(args) => cmd_census(Ecosystem::Python, &args),
        Commands::Maven(args) => cmd_census(Ecosystem::Maven, &args),
        Commands::Npm(args) => cmd_census(Ecosystem::Npm, &args),
        Commands::Init { force } => cmd_init(force),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(2);
    }
}

fn init_logging(debug: bool) {
    let default = if debug {
        "info,census=debug,census_core=debug,census_python=debug,census_maven=debug,census_npm=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_census(ecosystem: Ecosystem, args: &RunArgs) -> Result<()> {
    init_logging(args.debug);

    let config = load_config(args.config.as_deref())?;
    let settings = Settings::resolve(ecosystem, args, &config, std::env::var(PASSWORD_ENV).ok())?;
    let parser = parser_for(ecosystem);

    let (repo, records) = collect_records(&settings, parser.as_ref())?;

    let pipeline = CensusPipeline::new(
        parser,
        PipelineOptions {
            mode: settings.mode,
            package: settings.package.clone(),
        },
    );
    let inventory = pipeline.inventory(&records, settings.since_days, Utc::now());

    if inventory.full.is_empty() {
        match &settings.package {
            Some(package) => warn!("no cached {ecosystem} package matches '{package}' in '{repo}'"),
            None => warn!("no cached {ecosystem} packages found in '{repo}'"),
        }
    }
    if let Some(days) = settings.since_days {
        info!(
            "{} of {} versions downloaded in the last {days} days",
            inventory.windowed.len(),
            inventory.full.len()
        );
    }

    let mut written = Vec::new();

    let text = census_report::render(&inventory.windowed, settings.format)?;
    match (&settings.output, &settings.csv_output) {
        (Some(path), _) => {
            write_output(path, &text)?;
            written.push(Written {
                channel: "text",
                destination: path.display().to_string(),
                entries: inventory.windowed.len(),
            });
        }
        // The CSV file is the only output when it has no text file beside it.
        (None, Some(_)) => {}
        (None, None) => {
            print!("{text}");
            written.push(Written {
                channel: "text",
                destination: "stdout".to_string(),
                entries: inventory.windowed.len(),
            });
        }
    }

    if let Some(path) = &settings.csv_output {
        let csv = census_report::render(&inventory.full, OutputFormat::Csv)?;
        write_output(path, &csv)?;
        written.push(Written {
            channel: "csv",
            destination: path.display().to_string(),
            entries: inventory.full.len(),
        });
    }

    eprint!("{}", summary::format_summary(&repo, &inventory.full, &written));
    Ok(())
}

fn cmd_init(force: bool) -> Result<()> {
    let target = PathBuf::from(CONFIG_FILE);
    if target.exists() && !force {
        anyhow::bail!("{CONFIG_FILE} already exists. Use --force to overwrite.");
    }
    std::fs::write(&target, Config::default_toml())
        .with_context(|| format!("failed to write {CONFIG_FILE}"))?;
    println!("Created {CONFIG_FILE} with default configuration.");
    Ok(())
}

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    match config_path {
        Some(p) => Config::load(p),
        None => {
            let cwd = std::env::current_dir().context("failed to read working directory")?;
            Ok(Config::load_or_default(&cwd))
        }
    }
}

fn parser_for(ecosystem: Ecosystem) -> Box<dyn ArtifactParser> {
    match ecosystem {
        Ecosystem::Python => Box::new(PythonParser::new()),
        Ecosystem::Maven => Box::new(MavenParser::new()),
        Ecosystem::Npm => Box::new(NpmParser::new()),
    }
}

/// Repository label and its candidate files, from the server or a saved response.
fn collect_records(
    settings: &Settings,
    parser: &dyn ArtifactParser,
) -> Result<(String, Vec<ArtifactRecord>)> {
    match &settings.source {
        Source::Saved(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let response: AqlResponse = serde_json::from_str(&content)
                .with_context(|| format!("{} is not an AQL search response", path.display()))?;
            let records = response.into_records();
            info!("loaded {} files from {}", records.len(), path.display());
            Ok((path.display().to_string(), records))
        }
        Source::Remote {
            locator,
            credentials,
            timeout,
        } => {
            let client = ArtifactoryClient::new(locator.clone(), credentials.clone(), *timeout)?;
            let repo = client.resolve_repo_name();
            if settings.debug {
                client.sample(&repo)?;
            }
            let records = client.fetch_records(&repo, parser)?;
            Ok((repo, records))
        }
    }
}

fn write_output(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}
